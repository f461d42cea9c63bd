//! Incrementally maintained member lists per live cluster.

use cospend_core::{fast_map_with_capacity, FastHashMap};

/// Root node -> member nodes, updated on every merge.
///
/// Absorption moves the smaller list into the larger one, so each node is
/// moved O(log n) times over the whole run.
#[derive(Debug)]
pub struct MembershipIndex {
    members: FastHashMap<usize, Vec<usize>>,
}

impl MembershipIndex {
    /// Create an empty index.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: fast_map_with_capacity(capacity),
        }
    }

    /// Record a freshly registered singleton.
    pub fn insert_singleton(&mut self, node: usize) {
        self.members.entry(node).or_insert_with(|| vec![node]);
    }

    /// Move the members of `absorbed` under `survivor`.
    pub fn absorb(&mut self, survivor: usize, absorbed: usize) {
        let taken = self.members.remove(&absorbed).unwrap_or_default();
        let kept = self.members.remove(&survivor).unwrap_or_default();

        let (mut larger, smaller) = if kept.len() >= taken.len() {
            (kept, taken)
        } else {
            (taken, kept)
        };
        larger.extend(smaller);
        self.members.insert(survivor, larger);
    }

    /// Member nodes of a root, if it is live.
    #[must_use]
    pub fn members(&self, root: usize) -> Option<&[usize]> {
        self.members.get(&root).map(Vec::as_slice)
    }

    /// Number of tracked clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no cluster is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Default for MembershipIndex {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
