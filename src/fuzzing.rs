//! Fuzzing-specific utilities.

use crate::trace::{
    InstructionGraph, LedgerScope, Location, NodeKind, TraceConfig, TraceResult, Tracer,
};
use fxhash::FxHashSet;
use libfuzzer_sys::arbitrary;

const CALLEES: &[&str] = &["scanf", "fgets", "getc", "malloc", "strlen", "__isoc99_sscanf"];
const MAX_NODES: usize = 64;

/// A random, possibly cyclic instruction graph over `usize` nodes.
///
/// Public/exported only for access by fuzzers.
#[derive(Clone, Debug)]
pub struct ArbitraryGraph {
    kinds: Vec<NodeKind>,
    operands: Vec<Vec<usize>>,
    users: Vec<Vec<usize>>,
    callees: Vec<Option<&'static str>>,
    locations: Vec<Option<Location>>,
}

impl ArbitraryGraph {
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl<'a> arbitrary::Arbitrary<'a> for ArbitraryGraph {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let n = u.int_in_range(1..=MAX_NODES)?;
        let mut kinds = Vec::with_capacity(n);
        let mut operands = Vec::with_capacity(n);
        let mut callees = Vec::with_capacity(n);
        let mut locations = Vec::with_capacity(n);
        for i in 0..n {
            let kind = match u.int_in_range(0..=9u8)? {
                0 => NodeKind::Parameter(u.int_in_range(0..=3)?),
                1 => NodeKind::Alloca,
                2 => NodeKind::Global,
                3 => NodeKind::Store,
                4 => NodeKind::Load,
                5 => NodeKind::Call,
                6 => NodeKind::Phi,
                7 => NodeKind::Generic,
                8 => NodeKind::Constant,
                _ => NodeKind::Unknown,
            };
            let count = match kind {
                NodeKind::Store => 2,
                NodeKind::Load => 1,
                NodeKind::Phi | NodeKind::Generic | NodeKind::Call => u.int_in_range(0..=3)?,
                _ => 0,
            };
            let mut ops = Vec::with_capacity(count);
            for _ in 0..count {
                ops.push(u.int_in_range(0..=n - 1)?);
            }
            let callee = if kind == NodeKind::Call && u.arbitrary()? {
                Some(*u.choose(CALLEES)?)
            } else {
                None
            };
            let location = if u.arbitrary()? {
                Some(Location {
                    directory: String::new(),
                    file: "fuzz.c".to_owned(),
                    line: i as u32 + 1,
                    column: 1,
                })
            } else {
                None
            };
            kinds.push(kind);
            operands.push(ops);
            callees.push(callee);
            locations.push(location);
        }

        let mut users = vec![vec![]; n];
        for (node, ops) in operands.iter().enumerate() {
            for &op in ops {
                if !users[op].contains(&node) {
                    users[op].push(node);
                }
            }
        }

        Ok(ArbitraryGraph {
            kinds,
            operands,
            users,
            callees,
            locations,
        })
    }
}

impl InstructionGraph for ArbitraryGraph {
    type Node = usize;

    fn kind(&self, node: usize) -> NodeKind {
        self.kinds.get(node).copied().unwrap_or(NodeKind::Unknown)
    }

    fn operands(&self, node: usize) -> Vec<usize> {
        self.operands.get(node).cloned().unwrap_or_default()
    }

    fn users(&self, node: usize) -> Vec<usize> {
        self.users.get(node).cloned().unwrap_or_default()
    }

    fn callee_name(&self, node: usize) -> Option<&str> {
        self.callees.get(node).copied().flatten()
    }

    fn call_argument(&self, node: usize, index: usize) -> Option<usize> {
        match self.kind(node) {
            NodeKind::Call => self.operands.get(node)?.get(index).copied(),
            _ => None,
        }
    }

    fn debug_location(&self, node: usize) -> Option<Location> {
        self.locations.get(node).cloned().flatten()
    }

    fn phi_incoming(&self, node: usize) -> Vec<(String, usize)> {
        match self.kind(node) {
            NodeKind::Phi => self
                .operands(node)
                .into_iter()
                .enumerate()
                .map(|(i, value)| (format!("b{}", i), value))
                .collect(),
            _ => vec![],
        }
    }
}

/// Checks the properties every trace must have: each node is
/// expanded at most once, and every revisit names a node expanded
/// earlier in the same ledger scope.
pub fn check_trace(result: &TraceResult<usize>, earlier: &mut FxHashSet<usize>) {
    for entry in result.entries() {
        if entry.is_visit() {
            assert!(
                earlier.insert(entry.node),
                "node {} expanded twice",
                entry.node
            );
        } else if entry.revisit {
            assert!(
                earlier.contains(&entry.node),
                "revisit of {} before it was expanded",
                entry.node
            );
        }
    }
}

/// Traces every node of `graph` as a seed under `config`, checking
/// each result.
pub fn trace_all(graph: &ArbitraryGraph, config: &TraceConfig) {
    let mut tracer = Tracer::new(graph, config);
    let mut expanded = FxHashSet::default();
    for seed in 0..graph.len() {
        if config.scope == LedgerScope::PerSeed {
            expanded.clear();
        }
        let result = tracer.trace(seed);
        log::trace!("seed {}: {} entries", seed, result.len());
        assert_eq!(result.entries()[0].node, seed);
        check_trace(&result, &mut expanded);
        assert!(expanded.len() <= graph.len());
    }
}
