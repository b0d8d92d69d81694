//! Intermediate representation: an SSA instruction graph with
//! allocas, loads/stores, calls and phis.

use crate::declare_entity;

declare_entity!(Func, "func");
declare_entity!(Block, "block");
declare_entity!(Value, "v");
declare_entity!(Global, "global");

mod debug;
pub use debug::*;
mod display;
pub use display::*;
mod func;
pub use func::*;
mod graph;
pub use graph::*;
mod module;
pub use module::*;
mod value;
pub use value::*;
