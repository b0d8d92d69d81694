//! The module as an instruction graph for the tracer.

use super::{Func, FunctionBody, Global, InstDisplay, Module, OperandDisplay, Value, ValueDef};
use crate::entity::PerEntity;
use crate::trace::{InstructionGraph, Location, NodeKind};
use smallvec::SmallVec;

/// A value in a particular function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node {
    pub func: Func,
    pub value: Value,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.func, self.value)
    }
}

/// Reverse edges of one function body: for each value, the
/// instructions that use it, in program order.
#[derive(Clone, Debug, Default)]
pub struct UseMap {
    users: PerEntity<Value, SmallVec<[Value; 4]>>,
}

impl UseMap {
    pub fn compute(body: &FunctionBody) -> UseMap {
        let mut users: PerEntity<Value, SmallVec<[Value; 4]>> = PerEntity::default();
        for (_, inst) in body.insts() {
            body.values[inst].visit_uses(|used| {
                if !users[used].contains(&inst) {
                    users[used].push(inst);
                }
            });
        }
        UseMap { users }
    }

    pub fn users(&self, value: Value) -> &[Value] {
        &self.users[value][..]
    }
}

/// Read-only graph view over a whole module.
///
/// Globals are shared: every reference to a global, in any function,
/// is reported as one canonical node (its value in the first function
/// that references it), and its users are collected from every
/// function.
pub struct ModuleGraph<'a> {
    module: &'a Module,
    uses: PerEntity<Func, UseMap>,
    global_users: PerEntity<Global, Vec<Node>>,
    global_nodes: PerEntity<Global, Option<Node>>,
}

impl<'a> ModuleGraph<'a> {
    pub fn new(module: &'a Module) -> ModuleGraph<'a> {
        let mut uses: PerEntity<Func, UseMap> = PerEntity::default();
        let mut global_users: PerEntity<Global, Vec<Node>> = PerEntity::default();
        let mut global_nodes: PerEntity<Global, Option<Node>> = PerEntity::default();
        for (func, decl) in module.funcs.entries() {
            let body = match decl.body() {
                Some(body) => body,
                None => continue,
            };
            let map = UseMap::compute(body);
            for (&global, &value) in &body.global_values {
                if global_nodes[global].is_none() {
                    global_nodes[global] = Some(Node { func, value });
                }
                global_users[global].extend(
                    map.users(value)
                        .iter()
                        .map(|&user| Node { func, value: user }),
                );
            }
            uses[func] = map;
        }
        for global in module.globals.iter() {
            global_users[global].sort();
        }
        ModuleGraph {
            module,
            uses,
            global_users,
            global_nodes,
        }
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    /// The node that stands for `node` in traces: the canonical node
    /// for references to a global, `node` itself otherwise.
    pub fn canonical(&self, node: Node) -> Node {
        match self.def(node) {
            Some((_, &ValueDef::Global(global))) => self.global_nodes[global].unwrap_or(node),
            _ => node,
        }
    }

    fn node(&self, func: Func, value: Value) -> Node {
        self.canonical(Node { func, value })
    }

    fn def(&self, node: Node) -> Option<(&'a FunctionBody, &'a ValueDef)> {
        let body = self.module.funcs.get(node.func)?.body()?;
        let def = body.values.get(node.value)?;
        Some((body, def))
    }
}

impl<'a> InstructionGraph for ModuleGraph<'a> {
    type Node = Node;

    fn kind(&self, node: Node) -> NodeKind {
        match self.def(node) {
            Some((_, def)) => match def {
                &ValueDef::Param(index) => NodeKind::Parameter(index),
                ValueDef::Alloca => NodeKind::Alloca,
                ValueDef::Global(..) => NodeKind::Global,
                ValueDef::Const(..) => NodeKind::Constant,
                ValueDef::Undef => NodeKind::Unknown,
                ValueDef::Load(..) => NodeKind::Load,
                ValueDef::Store { .. } => NodeKind::Store,
                ValueDef::Call { .. } => NodeKind::Call,
                ValueDef::Phi(..) => NodeKind::Phi,
                ValueDef::Operator(..) => NodeKind::Generic,
            },
            None => NodeKind::Unknown,
        }
    }

    fn operands(&self, node: Node) -> Vec<Node> {
        match self.def(node) {
            Some((_, def)) => def
                .operands()
                .into_iter()
                .map(|value| self.node(node.func, value))
                .collect(),
            None => vec![],
        }
    }

    fn users(&self, node: Node) -> Vec<Node> {
        match self.def(node) {
            Some((_, &ValueDef::Global(global))) => self.global_users[global].clone(),
            Some(_) => self.uses[node.func]
                .users(node.value)
                .iter()
                .map(|&value| Node {
                    func: node.func,
                    value,
                })
                .collect(),
            None => vec![],
        }
    }

    fn callee_name(&self, node: Node) -> Option<&str> {
        match self.def(node)? {
            (_, &ValueDef::Call { callee, .. }) => {
                self.module.funcs.get(callee).map(|decl| decl.name())
            }
            _ => None,
        }
    }

    fn call_argument(&self, node: Node, index: usize) -> Option<Node> {
        match self.def(node)? {
            (_, ValueDef::Call { args, .. }) => {
                args.get(index).map(|&value| self.node(node.func, value))
            }
            _ => None,
        }
    }

    fn debug_location(&self, node: Node) -> Option<Location> {
        let (body, def) = self.def(node)?;
        if !def.is_inst() {
            return None;
        }
        let loc = body.value_locs[node.value]?;
        self.module.debug.location(loc)
    }

    fn phi_incoming(&self, node: Node) -> Vec<(String, Node)> {
        match self.def(node) {
            Some((body, ValueDef::Phi(incoming))) => incoming
                .iter()
                .map(|&(block, value)| {
                    let label = body
                        .blocks
                        .get(block)
                        .map(|data| data.name.clone())
                        .unwrap_or_else(|| format!("{}", block));
                    (label, self.node(node.func, value))
                })
                .collect(),
            _ => vec![],
        }
    }

    fn describe(&self, node: Node) -> String {
        let func_name = self
            .module
            .funcs
            .get(node.func)
            .map(|decl| decl.name())
            .unwrap_or("?");
        match self.def(node) {
            Some((body, ValueDef::Param(index))) => format!(
                "{} (parameter {} of @{})",
                OperandDisplay {
                    body,
                    module: self.module,
                    value: node.value,
                },
                index,
                func_name
            ),
            Some((body, def)) if def.is_inst() => format!(
                "`{}` in @{}",
                InstDisplay {
                    body,
                    module: self.module,
                    value: node.value,
                },
                func_name
            ),
            Some((body, _)) => format!(
                "{}",
                OperandDisplay {
                    body,
                    module: self.module,
                    value: node.value,
                }
            ),
            None => format!("{}", node),
        }
    }
}
