//! # cospend-cluster
//!
//! Incremental address clustering under the co-spend heuristic: every address
//! consumed as an input of the same transaction is assumed to belong to the
//! same owner.
//!
//! ## Features
//!
//! - **Disjoint-set index**: weighted union with path compression over a
//!   universe of addresses that grows mid-stream
//! - **Event state machine**: open / accumulate / close with illegal
//!   transitions reported as typed errors
//! - **Membership on demand**: scan-based or incrementally maintained
//! - **JSONL replay and export**: drive the engine from a log file and write
//!   the final partition as CSV or JSONL
//!
//! ## Quick Start
//!
//! ```rust
//! use cospend_cluster::{replay, ClusterEngine, EventReader};
//! use std::io::Cursor;
//!
//! let log = r#"{"type":"tx","outputs":["aa","bb"]}
//! {"type":"tx","inputs":["aa","bb"],"outputs":["cc"]}
//! {"type":"block"}"#;
//!
//! let mut engine = ClusterEngine::default();
//! let summary = replay(EventReader::new(Cursor::new(log)), &mut engine).unwrap();
//!
//! assert_eq!(summary.events, 2);
//! assert_eq!(engine.stats().cluster_count, 2);
//! ```
//!
//! ## Modules
//!
//! - [`disjoint_set`]: union-find over addresses
//! - [`engine`]: the per-event clustering state machine
//! - [`membership`]: incremental member lists
//! - [`sink`]: the event source callback trait
//! - [`source`]: JSONL event log reader and replay
//! - [`export`]: partition writers
//! - [`report`]: progress table

pub mod config;
pub mod disjoint_set;
pub mod engine;
pub mod export;
pub mod membership;
pub mod report;
pub mod sink;
pub mod source;

pub use config::{ClusterConfig, MembershipMode, MergePolicy};
pub use cospend_core::{Address, ClusterError, ClusterId, Result};
pub use disjoint_set::DisjointSet;
pub use engine::{ClusterEngine, ClusterStats, EngineCounters, EventState, MergeOutcome};
pub use export::{export_to_path, write_partition, ExportFormat, ExportSummary};
pub use report::{ProgressReporter, ProgressRow};
pub use sink::EventSink;
pub use source::{read_events_parallel, replay, EventReader, EventRecord, ReplaySummary, StreamEvent};
