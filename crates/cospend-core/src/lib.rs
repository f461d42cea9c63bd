//! # cospend-core
//!
//! Shared building blocks for co-spend address clustering.
//!
//! Provides:
//! - Address and cluster identifiers ([`Address`], [`ClusterId`])
//! - The error taxonomy shared by the engine and its collaborators
//! - Fast hash maps keyed by address bytes (xxh3)

pub mod address;
pub mod error;
pub mod hashing;

pub use address::{Address, ClusterId};
pub use error::{ClusterError, Result};
pub use hashing::{fast_map_with_capacity, fast_set, FastHashMap, FastHashSet};
