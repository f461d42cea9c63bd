//! Union-Find over a growing universe of addresses.
//!
//! Every registered address is a node. A node's index doubles as the
//! [`ClusterId`] it received at registration, so ids are monotonic and never
//! reused. A cluster id is live while its node is a root; once absorbed it is
//! retired and [`DisjointSet::find`] never returns it again.
//!
//! Membership is not maintained here. Use [`DisjointSet::members_of`] or
//! [`DisjointSet::clusters`] for end-of-run enumeration, or the incremental
//! membership index in the engine when queries are frequent.

use crate::config::MergePolicy;
use cospend_core::{fast_map_with_capacity, Address, ClusterError, ClusterId, FastHashMap, Result};
use std::collections::BTreeMap;

/// Result of merging two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Merge {
    /// Root that represents the merged cluster.
    pub survivor: usize,
    /// Root that was absorbed, or `None` if both nodes were already together.
    pub absorbed: Option<usize>,
}

/// Disjoint-set index mapping addresses to clusters.
///
/// Near-constant amortized `find` and `union` through path compression and
/// union by size.
pub struct DisjointSet {
    /// Address -> node index.
    lookup: FastHashMap<Address, usize>,
    /// Node index -> address.
    addresses: Vec<Address>,
    /// Parent pointers. parent[i] = j means i's parent is j.
    parent: Vec<usize>,
    /// Member count, meaningful only at roots.
    size: Vec<usize>,
    /// Number of live roots.
    num_sets: usize,
    policy: MergePolicy,
}

impl DisjointSet {
    /// Create an empty index.
    #[must_use]
    pub fn new(policy: MergePolicy) -> Self {
        Self::with_capacity(policy, 0)
    }

    /// Create an empty index with room for `capacity` addresses.
    #[must_use]
    pub fn with_capacity(policy: MergePolicy, capacity: usize) -> Self {
        Self {
            lookup: fast_map_with_capacity(capacity),
            addresses: Vec::with_capacity(capacity),
            parent: Vec::with_capacity(capacity),
            size: Vec::with_capacity(capacity),
            num_sets: 0,
            policy,
        }
    }

    /// Register an address as a singleton cluster.
    ///
    /// Idempotent: an already registered address keeps its current cluster,
    /// which is returned unchanged.
    pub fn make_set(&mut self, address: &[u8]) -> ClusterId {
        if let Some(&node) = self.lookup.get(address) {
            return Self::id(self.find_node(node));
        }

        let node = self.parent.len();
        let address = Address::from(address);
        self.lookup.insert(address.clone(), node);
        self.addresses.push(address);
        self.parent.push(node);
        self.size.push(1);
        self.num_sets += 1;
        Self::id(node)
    }

    /// Whether the address has been registered.
    #[must_use]
    pub fn contains(&self, address: &[u8]) -> bool {
        self.lookup.contains_key(address)
    }

    /// Node index of a registered address.
    pub(crate) fn node_of(&self, address: &[u8]) -> Result<usize> {
        self.lookup
            .get(address)
            .copied()
            .ok_or_else(|| ClusterError::UnknownAddress(Address::from(address)))
    }

    /// Address stored at a node. Panics if `node` was never registered.
    #[must_use]
    pub(crate) fn address(&self, node: usize) -> &Address {
        &self.addresses[node]
    }

    /// Find the live cluster containing an address.
    pub fn find(&mut self, address: &[u8]) -> Result<ClusterId> {
        let node = self.node_of(address)?;
        Ok(Self::id(self.find_node(node)))
    }

    /// Find the root of a node.
    ///
    /// Uses path compression: all nodes on the path to root
    /// are updated to point directly to the root. Iterative, since the
    /// anchor policy can build long chains before the first compression.
    pub(crate) fn find_node(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Merge the clusters containing two addresses.
    ///
    /// Returns the surviving cluster. A no-op returning the shared cluster
    /// if both are already together.
    pub fn union(&mut self, a: &[u8], b: &[u8]) -> Result<ClusterId> {
        let na = self.node_of(a)?;
        let nb = self.node_of(b)?;
        Ok(Self::id(self.union_nodes(na, nb).survivor))
    }

    /// Merge the clusters containing two nodes.
    ///
    /// With [`MergePolicy::BySize`] the smaller cluster is attached under the
    /// larger one (ties keep `a`'s root). With [`MergePolicy::Anchor`] the
    /// cluster of `a` always survives.
    pub(crate) fn union_nodes(&mut self, a: usize, b: usize) -> Merge {
        let ra = self.find_node(a);
        let rb = self.find_node(b);

        if ra == rb {
            return Merge {
                survivor: ra,
                absorbed: None,
            };
        }

        let (survivor, absorbed) = match self.policy {
            MergePolicy::BySize if self.size[ra] < self.size[rb] => (rb, ra),
            MergePolicy::BySize | MergePolicy::Anchor => (ra, rb),
        };

        self.parent[absorbed] = survivor;
        self.size[survivor] += self.size[absorbed];
        self.num_sets -= 1;

        Merge {
            survivor,
            absorbed: Some(absorbed),
        }
    }

    /// Check if two addresses are in the same cluster.
    pub fn connected(&mut self, a: &[u8], b: &[u8]) -> Result<bool> {
        Ok(self.find(a)? == self.find(b)?)
    }

    /// Whether `cluster` is a live cluster id.
    #[must_use]
    pub fn is_live(&self, cluster: ClusterId) -> bool {
        Self::node(cluster).is_some_and(|node| node < self.parent.len() && self.parent[node] == node)
    }

    /// Number of addresses in a live cluster, 0 for retired or unknown ids.
    #[must_use]
    pub fn cluster_size(&self, cluster: ClusterId) -> usize {
        match Self::node(cluster) {
            Some(node) if self.is_live(cluster) => self.size[node],
            _ => 0,
        }
    }

    /// Largest live cluster and its size.
    #[must_use]
    pub fn largest_cluster(&self) -> Option<(ClusterId, usize)> {
        (0..self.parent.len())
            .filter(|&node| self.parent[node] == node)
            .max_by_key(|&node| (self.size[node], std::cmp::Reverse(node)))
            .map(|node| (Self::id(node), self.size[node]))
    }

    /// Addresses of a cluster, by scanning every node. O(total addresses).
    ///
    /// Empty for retired or unknown ids.
    pub fn members_of(&mut self, cluster: ClusterId) -> Vec<Address> {
        if !self.is_live(cluster) {
            return Vec::new();
        }
        let Some(root) = Self::node(cluster) else {
            return Vec::new();
        };

        let mut members = Vec::with_capacity(self.size[root]);
        for node in 0..self.parent.len() {
            if self.find_node(node) == root {
                members.push(self.addresses[node].clone());
            }
        }
        members
    }

    /// Get all clusters as a map from cluster id -> members.
    ///
    /// Members appear in registration order.
    pub fn clusters(&mut self) -> BTreeMap<ClusterId, Vec<Address>> {
        let mut clusters: BTreeMap<ClusterId, Vec<Address>> = BTreeMap::new();
        for node in 0..self.parent.len() {
            let root = self.find_node(node);
            clusters
                .entry(Self::id(root))
                .or_default()
                .push(self.addresses[node].clone());
        }
        clusters
    }

    /// Number of live clusters.
    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Number of registered addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if no address has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Survivor selection policy.
    #[must_use]
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    fn id(node: usize) -> ClusterId {
        ClusterId::new(node as u64)
    }

    fn node(cluster: ClusterId) -> Option<usize> {
        usize::try_from(cluster.get()).ok()
    }
}

impl Default for DisjointSet {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}
