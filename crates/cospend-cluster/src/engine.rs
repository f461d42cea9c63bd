//! Stream-driven clustering engine.
//!
//! Applies the co-spend heuristic: all inputs consumed by one event are owned
//! by one party, so their clusters are merged when the event closes.
//!
//! ## Usage
//!
//! ```rust
//! use cospend_cluster::{ClusterConfig, ClusterEngine};
//!
//! let mut engine = ClusterEngine::new(ClusterConfig::default());
//! engine.output_address(b"alice-1");
//! engine.output_address(b"alice-2");
//!
//! engine.open_event().unwrap();
//! engine.input_address(b"alice-1").unwrap();
//! engine.input_address(b"alice-2").unwrap();
//! engine.close_event().unwrap();
//!
//! assert_eq!(
//!     engine.cluster_of(b"alice-1").unwrap(),
//!     engine.cluster_of(b"alice-2").unwrap()
//! );
//! assert_eq!(engine.stats().cluster_count, 1);
//! ```

use crate::config::{ClusterConfig, MembershipMode};
use crate::disjoint_set::DisjointSet;
use crate::membership::MembershipIndex;
use crate::report::{ProgressReporter, ProgressRow};
use crate::sink::EventSink;
use cospend_core::{fast_set, Address, ClusterError, ClusterId, FastHashSet, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Where the engine is in the per-event lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Between events.
    Idle,
    /// An event is open and collecting inputs.
    Accumulating,
}

/// What closing an event did to the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Fewer than two distinct inputs: no ownership evidence.
    Degenerate {
        /// Distinct inputs seen (0 or 1).
        distinct_inputs: usize,
    },
    /// Inputs were merged into one cluster.
    Merged {
        /// The cluster now holding every input.
        cluster: ClusterId,
        /// Number of previously separate clusters absorbed into it.
        absorbed: usize,
    },
}

/// Aggregate partition counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    /// Registered addresses.
    pub address_count: usize,
    /// Live clusters.
    pub cluster_count: usize,
}

/// Running counters for the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineCounters {
    /// Events closed.
    pub events: u64,
    /// Events closed with fewer than two distinct inputs.
    pub degenerate_events: u64,
    /// Cluster absorptions performed.
    pub merges: u64,
    /// Last batch boundary seen.
    pub batches: u64,
}

/// Deduplicated inputs of the open event, in first-seen order.
#[derive(Debug)]
struct PendingInputs {
    order: Vec<usize>,
    seen: FastHashSet<usize>,
}

impl PendingInputs {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: fast_set(),
        }
    }

    fn insert(&mut self, node: usize) {
        if self.seen.insert(node) {
            self.order.push(node);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// Incremental co-spend clustering engine.
///
/// Owns the address index exclusively. Every mutation takes `&mut self`, so
/// a single consumer must drive it in stream order.
pub struct ClusterEngine {
    config: ClusterConfig,
    index: DisjointSet,
    membership: Option<MembershipIndex>,
    pending: PendingInputs,
    state: EventState,
    reporter: ProgressReporter,
    counters: EngineCounters,
}

impl ClusterEngine {
    /// Create an engine with no registered addresses.
    #[must_use]
    pub fn new(config: ClusterConfig) -> Self {
        let index = DisjointSet::with_capacity(config.merge_policy, config.expected_addresses);
        let membership = match config.membership {
            MembershipMode::OnDemand => None,
            MembershipMode::Incremental => {
                Some(MembershipIndex::with_capacity(config.expected_addresses))
            }
        };
        let reporter = ProgressReporter::new(config.report_interval);

        Self {
            config,
            index,
            membership,
            pending: PendingInputs::new(),
            state: EventState::Idle,
            reporter,
            counters: EngineCounters::default(),
        }
    }

    /// Begin a new event.
    ///
    /// Fails with [`ClusterError::ReentrantEventOpen`] if an event is already
    /// open; the open event is left untouched.
    pub fn open_event(&mut self) -> Result<()> {
        if self.state == EventState::Accumulating {
            return Err(ClusterError::ReentrantEventOpen);
        }
        self.pending.clear();
        self.state = EventState::Accumulating;
        Ok(())
    }

    /// Declare one input address of the open event.
    ///
    /// The address must already be registered as an output. Nothing is merged
    /// until [`close_event`](Self::close_event).
    pub fn input_address(&mut self, address: &[u8]) -> Result<()> {
        if self.state != EventState::Accumulating {
            return Err(ClusterError::NoOpenEvent {
                operation: "input address",
            });
        }
        let node = self.index.node_of(address)?;
        self.pending.insert(node);
        Ok(())
    }

    /// Close the open event, merging all of its inputs into one cluster.
    pub fn close_event(&mut self) -> Result<MergeOutcome> {
        if self.state != EventState::Accumulating {
            return Err(ClusterError::NoOpenEvent {
                operation: "event close",
            });
        }
        self.state = EventState::Idle;
        self.counters.events += 1;

        let Self {
            index,
            membership,
            pending,
            counters,
            ..
        } = self;

        let outcome = match pending.order.split_first() {
            Some((&anchor, rest)) if !rest.is_empty() => {
                let mut absorbed = 0;
                for &other in rest {
                    let merge = index.union_nodes(anchor, other);
                    if let Some(gone) = merge.absorbed {
                        absorbed += 1;
                        if let Some(membership) = membership.as_mut() {
                            membership.absorb(merge.survivor, gone);
                        }
                    }
                }
                counters.merges += absorbed as u64;
                let cluster = ClusterId::new(index.find_node(anchor) as u64);
                trace!(%cluster, inputs = pending.order.len(), absorbed, "event merged");
                MergeOutcome::Merged { cluster, absorbed }
            }
            _ => {
                counters.degenerate_events += 1;
                MergeOutcome::Degenerate {
                    distinct_inputs: pending.order.len(),
                }
            }
        };

        pending.clear();
        Ok(outcome)
    }

    /// Discard the open event without merging any of its inputs.
    ///
    /// Returns whether an event was open. The partition is left exactly as
    /// it was before the event opened.
    pub fn abort_event(&mut self) -> bool {
        let was_open = self.state == EventState::Accumulating;
        if was_open {
            debug!(buffered = self.pending.order.len(), "event aborted");
        }
        self.pending.clear();
        self.state = EventState::Idle;
        was_open
    }

    /// Register an output address, keeping its cluster if already known.
    pub fn output_address(&mut self, address: &[u8]) -> ClusterId {
        let before = self.index.len();
        let cluster = self.index.make_set(address);
        if self.index.len() > before {
            if let Some(membership) = self.membership.as_mut() {
                membership.insert_singleton(before);
            }
        }
        cluster
    }

    /// Record a completed batch and report if it is on the cadence.
    pub fn batch_boundary(&mut self, count: u64) -> Option<ProgressRow> {
        self.counters.batches = count;
        let stats = self.stats();
        self.reporter
            .batch(count, stats.address_count, stats.cluster_count)
    }

    /// Live cluster of an address.
    pub fn cluster_of(&mut self, address: &[u8]) -> Result<ClusterId> {
        self.index.find(address)
    }

    /// Addresses whose cluster is `cluster`.
    ///
    /// Empty for a retired or unknown id.
    pub fn members_of(&mut self, cluster: ClusterId) -> Vec<Address> {
        match self.membership.as_ref() {
            Some(membership) => usize::try_from(cluster.get())
                .ok()
                .and_then(|root| membership.members(root))
                .map(|nodes| {
                    nodes
                        .iter()
                        .map(|&node| self.index.address(node).clone())
                        .collect()
                })
                .unwrap_or_default(),
            None => self.index.members_of(cluster),
        }
    }

    /// The full partition, keyed by cluster id.
    pub fn clusters(&mut self) -> BTreeMap<ClusterId, Vec<Address>> {
        self.index.clusters()
    }

    /// Number of addresses in a live cluster.
    #[must_use]
    pub fn cluster_size(&self, cluster: ClusterId) -> usize {
        self.index.cluster_size(cluster)
    }

    /// Largest live cluster and its size.
    #[must_use]
    pub fn largest_cluster(&self) -> Option<(ClusterId, usize)> {
        self.index.largest_cluster()
    }

    /// Current address and cluster counts.
    #[must_use]
    pub fn stats(&self) -> ClusterStats {
        ClusterStats {
            address_count: self.index.len(),
            cluster_count: self.index.num_sets(),
        }
    }

    /// Running stream counters.
    #[must_use]
    pub fn counters(&self) -> EngineCounters {
        self.counters
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EventState {
        self.state
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

impl EventSink for ClusterEngine {
    fn on_stream_start(&mut self) {
        debug!(
            policy = ?self.config.merge_policy,
            membership = ?self.config.membership,
            "clustering stream started"
        );
        self.reporter.start();
    }

    fn on_event_open(&mut self) -> Result<()> {
        self.open_event()
    }

    fn on_input_address(&mut self, address: &[u8]) -> Result<()> {
        self.input_address(address)
    }

    fn on_event_close(&mut self) -> Result<MergeOutcome> {
        self.close_event()
    }

    fn on_event_abort(&mut self) {
        self.abort_event();
    }

    fn on_output_address(&mut self, address: &[u8]) -> Result<()> {
        self.output_address(address);
        Ok(())
    }

    fn on_batch_boundary(&mut self, count: u64) {
        self.batch_boundary(count);
    }

    fn on_stream_end(&mut self) {
        let stats = self.stats();
        self.reporter
            .finish(self.counters.batches, stats.address_count, stats.cluster_count);
        debug!(
            events = self.counters.events,
            degenerate = self.counters.degenerate_events,
            merges = self.counters.merges,
            "clustering stream finished"
        );
    }
}
