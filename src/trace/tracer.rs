//! The origin tracer: a depth-first backward walk with a one-level
//! forward scan at storage origins.

use super::{
    classify, resolve, Category, InstructionGraph, Ledger, LedgerScope, Location, StorePolicy,
    TraceConfig,
};
use smallvec::{smallvec, SmallVec};

/// How a trace entry was reached from its parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Edge<N> {
    /// The entry is the seed itself.
    Seed,
    /// The `n`th operand of the parent.
    Operand(usize),
    /// A phi's incoming value from the named predecessor block.
    Incoming(String),
    /// A user of the storage origin `of`, found by the forward scan.
    Use { of: N },
    /// The value written by `store` into a storage origin.
    StoredValue { store: N },
}

#[derive(Clone, Debug)]
pub struct TraceEntry<N> {
    pub node: N,
    pub category: Category<N>,
    pub location: Option<Location>,
    /// Distance from the seed, counting forward-scan hops.
    pub depth: usize,
    pub edge: Edge<N>,
    /// The node had already been expanded in this ledger scope; it is
    /// recorded to close the path but was not expanded again.
    pub revisit: bool,
}

impl<N> TraceEntry<N> {
    pub fn is_forward(&self) -> bool {
        matches!(self.edge, Edge::Use { .. })
    }

    /// Is this the one entry that expanded `node`?
    pub fn is_visit(&self) -> bool {
        !self.revisit && !self.is_forward()
    }
}

/// The log of one trace, in visitation order.
#[derive(Clone, Debug)]
pub struct TraceResult<N> {
    seed: N,
    entries: Vec<TraceEntry<N>>,
}

impl<N: Copy + Eq> TraceResult<N> {
    pub fn seed(&self) -> N {
        self.seed
    }

    pub fn entries(&self) -> &[TraceEntry<N>] {
        &self.entries[..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for nodes expanded by the backward walk, one per node.
    pub fn visits(&self) -> impl Iterator<Item = &TraceEntry<N>> {
        self.entries.iter().filter(|entry| entry.is_visit())
    }

    /// Terminal nodes reached by the backward walk.
    pub fn origins(&self) -> impl Iterator<Item = &TraceEntry<N>> {
        self.visits().filter(|entry| entry.category.is_terminal())
    }

    /// Calls to input routines, whether reached backward or by the
    /// forward scan.
    pub fn seminal_inputs(&self) -> impl Iterator<Item = &TraceEntry<N>> {
        self.entries
            .iter()
            .filter(|entry| !entry.revisit && entry.category.is_seminal())
    }

    /// The entry that expanded `node`, if the backward walk reached it.
    pub fn visit_of(&self, node: N) -> Option<&TraceEntry<N>> {
        self.visits().find(|entry| entry.node == node)
    }
}

struct Pending<N> {
    node: N,
    depth: usize,
    edge: Edge<N>,
}

/// Traces `seed` against an explicit ledger. Nodes already marked in
/// `ledger` are recorded as revisits and not expanded, so repeated
/// calls with the same ledger share their memo.
pub fn trace_with<G: InstructionGraph>(
    graph: &G,
    config: &TraceConfig,
    ledger: &mut Ledger<G::Node>,
    seed: G::Node,
) -> TraceResult<G::Node> {
    let mut entries = vec![];
    let mut stack: SmallVec<[Pending<G::Node>; 64]> = smallvec![Pending {
        node: seed,
        depth: 0,
        edge: Edge::Seed,
    }];

    // Children are pushed in reverse so they pop in operand order,
    // which makes the explicit stack produce the same preorder as a
    // recursive walk.
    while let Some(Pending { node, depth, edge }) = stack.pop() {
        let category = classify(graph, node, &config.input_routines);
        let location = resolve(graph, node);

        if !ledger.mark_backward(node) {
            log::trace!("trace: {:?} already visited", node);
            entries.push(TraceEntry {
                node,
                category,
                location,
                depth,
                edge,
                revisit: true,
            });
            continue;
        }
        log::trace!(
            "trace: visiting {:?} at depth {}: {}",
            node,
            depth,
            category.label()
        );

        let children: SmallVec<[Pending<G::Node>; 8]> = match &category {
            Category::Merge => graph
                .phi_incoming(node)
                .into_iter()
                .map(|(block, value)| Pending {
                    node: value,
                    depth: depth + 1,
                    edge: Edge::Incoming(block),
                })
                .collect(),
            Category::Computation => graph
                .operands(node)
                .into_iter()
                .enumerate()
                .map(|(index, operand)| Pending {
                    node: operand,
                    depth: depth + 1,
                    edge: Edge::Operand(index),
                })
                .collect(),
            _ => {
                debug_assert!(category.is_terminal());
                SmallVec::new()
            }
        };

        let scan = config.forward_scan && category.is_storage();
        entries.push(TraceEntry {
            node,
            category,
            location,
            depth,
            edge,
            revisit: false,
        });

        if scan {
            let follow = forward_scan(graph, config, ledger, node, depth, &mut entries);
            stack.extend(follow.into_iter().rev());
        }
        stack.extend(children.into_iter().rev());
    }

    TraceResult { seed, entries }
}

/// Reports every user of `origin` not yet seen by a forward scan.
/// Returns the stored values to trace when stores are followed.
fn forward_scan<G: InstructionGraph>(
    graph: &G,
    config: &TraceConfig,
    ledger: &mut Ledger<G::Node>,
    origin: G::Node,
    depth: usize,
    entries: &mut Vec<TraceEntry<G::Node>>,
) -> SmallVec<[Pending<G::Node>; 4]> {
    let mut follow = SmallVec::new();
    for user in graph.users(origin) {
        if !ledger.mark_forward(origin, user) {
            log::trace!("forward scan: {:?} already reported for {:?}", user, origin);
            continue;
        }
        let category = classify(graph, user, &config.input_routines);
        if let Category::Store { value, addr } = category {
            if config.store_policy == StorePolicy::FollowSource && addr == origin {
                follow.push(Pending {
                    node: value,
                    depth: depth + 2,
                    edge: Edge::StoredValue { store: user },
                });
            }
        }
        if category.is_seminal() {
            log::debug!(
                "forward scan: {:?} is handed to an input routine by {:?}",
                origin,
                user
            );
        }
        entries.push(TraceEntry {
            node: user,
            location: resolve(graph, user),
            category,
            depth: depth + 1,
            edge: Edge::Use { of: origin },
            revisit: false,
        });
    }
    follow
}

/// Traces seeds one after another, keeping or resetting its ledger
/// between seeds according to the configured scope.
pub struct Tracer<'a, G: InstructionGraph> {
    graph: &'a G,
    config: &'a TraceConfig,
    ledger: Ledger<G::Node>,
}

impl<'a, G: InstructionGraph> Tracer<'a, G> {
    pub fn new(graph: &'a G, config: &'a TraceConfig) -> Self {
        Tracer {
            graph,
            config,
            ledger: Ledger::new(),
        }
    }

    pub fn trace(&mut self, seed: G::Node) -> TraceResult<G::Node> {
        if self.config.scope == LedgerScope::PerSeed {
            self.ledger.clear();
        }
        log::debug!("trace: seed {}", self.graph.describe(seed));
        let result = trace_with(self.graph, self.config, &mut self.ledger, seed);
        log::debug!(
            "trace: {} entries, {} origins, {} seminal inputs",
            result.len(),
            result.origins().count(),
            result.seminal_inputs().count()
        );
        result
    }

    pub fn ledger(&self) -> &Ledger<G::Node> {
        &self.ledger
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::{CallOrigin, NodeKind};

    /// A hand-built graph; nodes are indices into `nodes`.
    #[derive(Default)]
    struct TestGraph {
        nodes: Vec<TestNode>,
    }

    struct TestNode {
        kind: NodeKind,
        operands: Vec<usize>,
        incoming: Vec<(String, usize)>,
        callee: Option<&'static str>,
        location: Option<Location>,
    }

    impl TestGraph {
        fn add(&mut self, kind: NodeKind, operands: &[usize]) -> usize {
            self.nodes.push(TestNode {
                kind,
                operands: operands.to_vec(),
                incoming: vec![],
                callee: None,
                location: None,
            });
            self.nodes.len() - 1
        }

        fn add_phi(&mut self, incoming: &[(&str, usize)]) -> usize {
            let node = self.add(NodeKind::Phi, &[]);
            self.nodes[node].incoming = incoming
                .iter()
                .map(|&(block, value)| (block.to_owned(), value))
                .collect();
            self.nodes[node].operands = incoming.iter().map(|&(_, value)| value).collect();
            node
        }

        fn add_call(&mut self, callee: &'static str, args: &[usize]) -> usize {
            let node = self.add(NodeKind::Call, args);
            self.nodes[node].callee = Some(callee);
            node
        }

        fn set_operands(&mut self, node: usize, operands: &[usize]) {
            self.nodes[node].operands = operands.to_vec();
        }
    }

    impl InstructionGraph for TestGraph {
        type Node = usize;

        fn kind(&self, node: usize) -> NodeKind {
            self.nodes[node].kind
        }
        fn operands(&self, node: usize) -> Vec<usize> {
            self.nodes[node].operands.clone()
        }
        fn users(&self, node: usize) -> Vec<usize> {
            (0..self.nodes.len())
                .filter(|&user| self.nodes[user].operands.contains(&node))
                .collect()
        }
        fn callee_name(&self, node: usize) -> Option<&str> {
            self.nodes[node].callee
        }
        fn call_argument(&self, node: usize, index: usize) -> Option<usize> {
            self.nodes[node].operands.get(index).copied()
        }
        fn debug_location(&self, node: usize) -> Option<Location> {
            self.nodes[node].location.clone()
        }
        fn phi_incoming(&self, node: usize) -> Vec<(String, usize)> {
            self.nodes[node].incoming.clone()
        }
    }

    fn visited(result: &TraceResult<usize>) -> Vec<usize> {
        result.visits().map(|entry| entry.node).collect()
    }

    #[test]
    fn terminals_are_not_expanded() {
        let _ = env_logger::try_init();
        let mut g = TestGraph::default();
        let hidden = g.add(NodeKind::Constant, &[]);
        // Operands on terminal nodes must be ignored.
        let param = g.add(NodeKind::Parameter(0), &[hidden]);
        let global = g.add(NodeKind::Global, &[hidden]);
        let alloca = g.add(NodeKind::Alloca, &[hidden]);
        let config = TraceConfig {
            forward_scan: false,
            ..TraceConfig::default()
        };
        let mut tracer = Tracer::new(&g, &config);
        for &seed in &[param, global, alloca] {
            let result = tracer.trace(seed);
            assert_eq!(result.len(), 1);
            assert_eq!(visited(&result), vec![seed]);
            assert!(result.entries()[0].category.is_terminal());
        }
    }

    #[test]
    fn phi_cycle_terminates() {
        let _ = env_logger::try_init();
        let mut g = TestGraph::default();
        // i = phi [entry: 0], [loop: i.next]; i.next = add i, 1
        let zero = g.add(NodeKind::Constant, &[]);
        let one = g.add(NodeKind::Constant, &[]);
        let i = g.add_phi(&[("entry", zero)]);
        let next = g.add(NodeKind::Generic, &[i, one]);
        g.nodes[i].incoming.push(("loop".to_owned(), next));
        g.nodes[i].operands.push(next);
        let cond = g.add(NodeKind::Generic, &[next, zero]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(cond);
        assert_eq!(visited(&result), vec![cond, next, i, zero, one]);
        // The back edge from `i` to `next` closes the cycle.
        assert!(result
            .entries()
            .iter()
            .any(|entry| entry.revisit && entry.node == next));
    }

    #[test]
    fn phi_fans_out_over_every_incoming_edge() {
        let mut g = TestGraph::default();
        let a = g.add(NodeKind::Parameter(0), &[]);
        let b = g.add(NodeKind::Global, &[]);
        let phi = g.add_phi(&[("b1", a), ("b2", b), ("b3", a)]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(phi);
        let incoming = result
            .entries()
            .iter()
            .filter(|entry| matches!(entry.edge, Edge::Incoming(..)))
            .map(|entry| (entry.edge.clone(), entry.node, entry.revisit))
            .collect::<Vec<_>>();
        assert_eq!(
            incoming,
            vec![
                (Edge::Incoming("b1".to_owned()), a, false),
                (Edge::Incoming("b2".to_owned()), b, false),
                (Edge::Incoming("b3".to_owned()), a, true),
            ]
        );
        assert_eq!(result.origins().count(), 2);
    }

    #[test]
    fn unknown_kinds_fall_back_to_unknown() {
        let mut g = TestGraph::default();
        let c = g.add(NodeKind::Constant, &[]);
        let weird = g.add(NodeKind::Unknown, &[c]);
        let empty_load = g.add(NodeKind::Load, &[]);
        let bad_store = g.add(NodeKind::Store, &[c]);
        let seed = g.add(NodeKind::Generic, &[weird, empty_load, bad_store]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(seed);
        assert_eq!(visited(&result), vec![seed, weird, empty_load, bad_store]);
        for entry in result.visits().skip(1) {
            assert_eq!(entry.category, Category::Unknown);
        }
    }

    #[test]
    fn calls_to_input_routines_are_seminal() {
        let mut g = TestGraph::default();
        let fmt = g.add(NodeKind::Global, &[]);
        let scanf = g.add_call("__isoc99_scanf", &[fmt]);
        let other = g.add_call("strlen", &[fmt]);
        let seed = g.add(NodeKind::Generic, &[scanf, other]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(seed);
        assert_eq!(
            result.visit_of(scanf).unwrap().category,
            Category::Call(CallOrigin::Input {
                callee: "__isoc99_scanf".to_owned()
            })
        );
        assert_eq!(
            result.visit_of(other).unwrap().category,
            Category::Call(CallOrigin::Opaque {
                callee: Some("strlen".to_owned())
            })
        );
        // Call arguments are not traced.
        assert!(result.visit_of(fmt).is_none());
        assert_eq!(result.seminal_inputs().count(), 1);
    }

    #[test]
    fn forward_scan_is_independent_of_backward_walk() {
        let mut g = TestGraph::default();
        let buf = g.add(NodeKind::Alloca, &[]);
        let fgets = g.add_call("fgets", &[buf]);
        let load = g.add(NodeKind::Load, &[buf]);
        let seed = g.add(NodeKind::Generic, &[load]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(seed);
        assert_eq!(visited(&result), vec![seed, load, buf]);

        // The load was expanded backward and is still reported once
        // as a user of the alloca.
        let uses = result
            .entries()
            .iter()
            .filter(|entry| entry.edge == Edge::Use { of: buf })
            .map(|entry| entry.node)
            .collect::<Vec<_>>();
        assert_eq!(uses, vec![fgets, load]);
        assert_eq!(
            result.seminal_inputs().map(|e| e.node).collect::<Vec<_>>(),
            vec![fgets]
        );
    }

    #[test]
    fn shared_user_is_reported_for_each_origin() {
        let _ = env_logger::try_init();
        let mut g = TestGraph::default();
        // scanf("%d %d", &a, &b); seed = va + vb
        let a = g.add(NodeKind::Alloca, &[]);
        let b = g.add(NodeKind::Alloca, &[]);
        let scanf = g.add_call("scanf", &[a, b]);
        let va = g.add(NodeKind::Load, &[a]);
        let vb = g.add(NodeKind::Load, &[b]);
        let seed = g.add(NodeKind::Generic, &[va, vb]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(seed);
        let scanf_uses = result
            .entries()
            .iter()
            .filter(|entry| entry.node == scanf)
            .map(|entry| entry.edge.clone())
            .collect::<Vec<_>>();
        assert_eq!(scanf_uses, vec![Edge::Use { of: a }, Edge::Use { of: b }]);
        assert_eq!(result.seminal_inputs().count(), 2);
    }

    #[test]
    fn ledger_scope() {
        let mut g = TestGraph::default();
        let x = g.add(NodeKind::Parameter(0), &[]);
        let a = g.add(NodeKind::Generic, &[x]);
        let b = g.add(NodeKind::Generic, &[x]);

        let per_seed = TraceConfig::default();
        let mut tracer = Tracer::new(&g, &per_seed);
        tracer.trace(a);
        let second = tracer.trace(b);
        assert_eq!(visited(&second), vec![b, x]);

        let per_module = TraceConfig {
            scope: LedgerScope::PerModule,
            ..TraceConfig::default()
        };
        let mut tracer = Tracer::new(&g, &per_module);
        tracer.trace(a);
        let second = tracer.trace(b);
        assert_eq!(visited(&second), vec![b]);
        assert!(second.entries()[1].revisit);
        assert_eq!(tracer.ledger().backward_len(), 3);

        // A seed that was already expanded yields one revisit entry.
        let again = tracer.trace(a);
        assert_eq!(again.len(), 1);
        assert_eq!(again.seed(), a);
        assert!(again.entries()[0].revisit);
        assert_eq!(again.entries()[0].edge, Edge::Seed);
    }

    #[test]
    fn store_policy() {
        let mut g = TestGraph::default();
        // slot = alloca; v = load slot; w = add v, 1; store w, slot
        let slot = g.add(NodeKind::Alloca, &[]);
        let one = g.add(NodeKind::Constant, &[]);
        let v = g.add(NodeKind::Load, &[slot]);
        let w = g.add(NodeKind::Generic, &[v, one]);
        let store = g.add(NodeKind::Store, &[w, slot]);
        let seed = g.add(NodeKind::Generic, &[v]);

        let terminal = TraceConfig::default();
        let result = Tracer::new(&g, &terminal).trace(seed);
        assert_eq!(visited(&result), vec![seed, v, slot]);
        assert_eq!(
            result
                .entries()
                .iter()
                .find(|entry| entry.node == store)
                .unwrap()
                .category,
            Category::Store { value: w, addr: slot }
        );

        let follow = TraceConfig {
            store_policy: StorePolicy::FollowSource,
            ..TraceConfig::default()
        };
        let result = Tracer::new(&g, &follow).trace(seed);
        assert_eq!(visited(&result), vec![seed, v, slot, w, one]);
        let stored = result.visit_of(w).unwrap();
        assert_eq!(stored.edge, Edge::StoredValue { store });
        // Every node is expanded at most once even around the
        // store -> load -> store cycle.
        let mut nodes = visited(&result);
        nodes.sort();
        nodes.dedup();
        assert_eq!(nodes.len(), result.visits().count());
    }

    #[test]
    fn missing_locations_are_none() {
        let mut g = TestGraph::default();
        let param = g.add(NodeKind::Parameter(0), &[]);
        g.nodes[param].location = Some(Location {
            directory: "/src".to_owned(),
            file: "a.c".to_owned(),
            line: 1,
            column: 1,
        });
        let seed = g.add(NodeKind::Generic, &[param]);

        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(seed);
        // Parameters never resolve, even when the host offers a location.
        assert!(result.entries().iter().all(|entry| entry.location.is_none()));
    }

    #[test]
    fn self_referential_operand() {
        let mut g = TestGraph::default();
        let node = g.add(NodeKind::Generic, &[]);
        g.set_operands(node, &[node, node]);
        let config = TraceConfig::default();
        let result = Tracer::new(&g, &config).trace(node);
        assert_eq!(visited(&result), vec![node]);
        assert_eq!(result.len(), 3);
    }
}
