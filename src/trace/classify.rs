//! Value classification.

use super::{InputRoutines, InstructionGraph, NodeKind};

/// What a call tells us about where its data comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallOrigin {
    /// A call to a known input routine: its result and the buffers
    /// handed to it carry external data.
    Input { callee: String },
    /// Any other call. `callee` is `None` when the target is not a
    /// known function.
    Opaque { callee: Option<String> },
}

/// The closed set of categories a traced node falls into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category<N> {
    Parameter { index: usize },
    LocalAlloc,
    Global,
    Store { value: N, addr: N },
    Call(CallOrigin),
    Merge,
    Computation,
    Constant,
    Unknown,
}

impl<N> Category<N> {
    /// Does the backward walk stop here?
    pub fn is_terminal(&self) -> bool {
        match self {
            Category::Merge | Category::Computation => false,
            Category::Parameter { .. }
            | Category::LocalAlloc
            | Category::Global
            | Category::Store { .. }
            | Category::Call(..)
            | Category::Constant
            | Category::Unknown => true,
        }
    }

    /// Origins whose users are worth a forward scan.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Category::Parameter { .. } | Category::LocalAlloc | Category::Global
        )
    }

    /// A call to an input routine.
    pub fn is_seminal(&self) -> bool {
        matches!(self, Category::Call(CallOrigin::Input { .. }))
    }

    pub fn label(&self) -> String {
        match self {
            Category::Parameter { index } => format!("function argument #{}", index),
            Category::LocalAlloc => "local variable".to_owned(),
            Category::Global => "global variable".to_owned(),
            Category::Store { .. } => "assigned via store".to_owned(),
            Category::Call(CallOrigin::Input { callee }) => {
                format!("external input from `{}`", callee)
            }
            Category::Call(CallOrigin::Opaque { callee: Some(callee) }) => {
                format!("result of call to `{}`", callee)
            }
            Category::Call(CallOrigin::Opaque { callee: None }) => {
                "result of unknown call".to_owned()
            }
            Category::Merge => "merge point".to_owned(),
            Category::Computation => "computation".to_owned(),
            Category::Constant => "constant".to_owned(),
            Category::Unknown => "unknown".to_owned(),
        }
    }
}

/// Classifies one node. First matching rule wins: parameters,
/// allocas, globals, stores and calls are terminal; phis and other
/// nodes with operands are expanded; everything else is a constant
/// or unknown.
pub fn classify<G: InstructionGraph>(
    graph: &G,
    node: G::Node,
    routines: &InputRoutines,
) -> Category<G::Node> {
    match graph.kind(node) {
        NodeKind::Parameter(index) => Category::Parameter { index },
        NodeKind::Alloca => Category::LocalAlloc,
        NodeKind::Global => Category::Global,
        NodeKind::Store => match graph.operands(node).as_slice() {
            &[value, addr] => Category::Store { value, addr },
            _ => Category::Unknown,
        },
        NodeKind::Call => match graph.callee_name(node) {
            Some(callee) if routines.matches(callee) => Category::Call(CallOrigin::Input {
                callee: callee.to_owned(),
            }),
            callee => Category::Call(CallOrigin::Opaque {
                callee: callee.map(str::to_owned),
            }),
        },
        NodeKind::Phi => Category::Merge,
        NodeKind::Load | NodeKind::Generic => {
            if graph.operands(node).is_empty() {
                Category::Unknown
            } else {
                Category::Computation
            }
        }
        NodeKind::Constant => Category::Constant,
        NodeKind::Unknown => Category::Unknown,
    }
}
