//! The visit ledger.

use fxhash::FxHashSet;
use std::hash::Hash;

/// Two independent mark-sets. `backward` holds nodes the backward
/// walk has expanded; `forward` holds `(origin, user)` pairs the
/// forward scan has reported, so a user shared by several origins is
/// reported once for each of them. Being marked in one set never
/// implies anything about the other.
#[derive(Clone, Debug)]
pub struct Ledger<N: Eq + Hash> {
    backward: FxHashSet<N>,
    forward: FxHashSet<(N, N)>,
}

impl<N: Eq + Hash> Default for Ledger<N> {
    fn default() -> Self {
        Ledger {
            backward: FxHashSet::default(),
            forward: FxHashSet::default(),
        }
    }
}

impl<N: Copy + Eq + Hash> Ledger<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `node` for the backward walk. Returns `false` if it was
    /// already marked.
    pub fn mark_backward(&mut self, node: N) -> bool {
        self.backward.insert(node)
    }

    /// Marks `user` as reported for `origin` by the forward scan.
    /// Returns `false` if the pair was already marked.
    pub fn mark_forward(&mut self, origin: N, user: N) -> bool {
        self.forward.insert((origin, user))
    }

    pub fn backward_len(&self) -> usize {
        self.backward.len()
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }

    pub fn clear(&mut self) {
        self.backward.clear();
        self.forward.clear();
    }
}
