//! The read-only view of a host IR that the tracer walks.

use super::Location;
use std::fmt::Debug;
use std::hash::Hash;

/// Structural kind of a node, as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The `n`th formal parameter of a function.
    Parameter(usize),
    Alloca,
    Global,
    Store,
    Load,
    Call,
    Phi,
    /// Arithmetic, comparisons, casts and anything else that computes
    /// a value from its operands.
    Generic,
    Constant,
    Unknown,
}

/// A directed def-use graph over instruction-level values.
///
/// Operand edges point from a node to the nodes it was computed
/// from; user edges are their inverse. The host maintains both.
pub trait InstructionGraph {
    type Node: Copy + Eq + Hash + Debug;

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Operands in order. For a store this is `[value, address]`; for
    /// a phi it is the incoming values in edge order. May be empty.
    fn operands(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Nodes that consume `node`. Order is not significant.
    fn users(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Name of the directly-called function, if `node` is a call and
    /// the callee is known.
    fn callee_name(&self, node: Self::Node) -> Option<&str>;

    fn call_argument(&self, node: Self::Node, index: usize) -> Option<Self::Node>;

    fn debug_location(&self, node: Self::Node) -> Option<Location>;

    /// `(predecessor block name, incoming value)` for each incoming
    /// edge of a phi; empty for anything else.
    fn phi_incoming(&self, node: Self::Node) -> Vec<(String, Self::Node)>;

    /// A short human-readable rendering of `node` for reports.
    fn describe(&self, node: Self::Node) -> String {
        format!("{:?}", node)
    }
}
