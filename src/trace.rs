//! Origin tracing.
//!
//! Given a seed value (typically a branch condition), walk the def-use
//! graph backward to find where the value's data came from: function
//! parameters, locals, globals, stores, or calls. Calls to known
//! input routines (`scanf` and friends) mark the origin as a *seminal
//! input*, i.e. data supplied from outside the program.
//!
//! The walk is a depth-first preorder over operand edges. Terminal
//! categories stop the walk; storage origins additionally get a
//! one-level forward scan over their users so that, e.g., an alloca
//! whose address is later handed to `scanf` is linked to that call.
//!
//! All state lives in a [`Ledger`] of two independent mark-sets; its
//! lifetime is chosen by [`LedgerScope`]. The engine sees the host IR
//! only through the [`InstructionGraph`] trait and never mutates it.

mod classify;
mod config;
mod graph;
mod ledger;
mod location;
mod report;
mod tracer;

pub use classify::*;
pub use config::*;
pub use graph::*;
pub use ledger::*;
pub use location::*;
pub use report::*;
pub use tracer::*;
