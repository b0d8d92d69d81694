//! Seminal: origin tracing over an SSA instruction graph.
//!
//! Given a module in a small LLVM-shaped IR, find the values that
//! steer control flow and trace each one back to where its data came
//! from: parameters, locals, globals, stores, or calls to routines
//! that read external input.

pub mod entity;
mod errors;
mod frontend;
mod ir;
pub mod passes;
pub mod trace;

pub use errors::*;
pub use ir::*;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
