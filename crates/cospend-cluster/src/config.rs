//! Engine configuration.

use cospend_core::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which cluster id survives a merge.
///
/// Both policies produce the same partition; they differ only in which id
/// represents a merged cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The larger cluster absorbs the smaller one (weighted union).
    #[default]
    BySize,
    /// The cluster of the event's first input always survives.
    ///
    /// Reproduces the representative ids of the original unweighted tool,
    /// at the cost of unbalanced trees.
    Anchor,
}

/// How cluster membership is enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipMode {
    /// Scan every address on each query. No cost at merge time.
    #[default]
    OnDemand,
    /// Keep a member list per live cluster, merged smaller-into-larger.
    Incremental,
}

/// Configuration for the clustering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Batches between progress reports. 0 disables periodic reports.
    pub report_interval: u64,
    /// Survivor selection on merge.
    pub merge_policy: MergePolicy,
    /// Membership enumeration strategy.
    pub membership: MembershipMode,
    /// Expected number of addresses (capacity hint).
    pub expected_addresses: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            report_interval: 1000,
            merge_policy: MergePolicy::BySize,
            membership: MembershipMode::OnDemand,
            expected_addresses: 0,
        }
    }
}

impl ClusterConfig {
    /// Create config sized for an expected number of addresses.
    #[must_use]
    pub fn for_size(expected_addresses: usize) -> Self {
        Self {
            expected_addresses,
            ..Default::default()
        }
    }

    /// Set the reporting cadence.
    #[must_use]
    pub fn with_report_interval(mut self, batches: u64) -> Self {
        self.report_interval = batches;
        self
    }

    /// Set the merge policy.
    #[must_use]
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Set the membership mode.
    #[must_use]
    pub fn with_membership(mut self, mode: MembershipMode) -> Self {
        self.membership = mode;
        self
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ClusterError::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.report_interval, 1000);
        assert_eq!(config.merge_policy, MergePolicy::BySize);
        assert_eq!(config.membership, MembershipMode::OnDemand);
    }

    #[test]
    fn test_builder() {
        let config = ClusterConfig::for_size(1_000_000)
            .with_report_interval(10)
            .with_merge_policy(MergePolicy::Anchor)
            .with_membership(MembershipMode::Incremental);
        assert_eq!(config.expected_addresses, 1_000_000);
        assert_eq!(config.report_interval, 10);
        assert_eq!(config.merge_policy, MergePolicy::Anchor);
        assert_eq!(config.membership, MembershipMode::Incremental);
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"merge_policy": "anchor", "report_interval": 5}}"#).unwrap();

        let config = ClusterConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::Anchor);
        assert_eq!(config.report_interval, 5);
        assert_eq!(config.membership, MembershipMode::OnDemand);
    }

    #[test]
    fn test_from_json_file_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"merge_policy": "random"}}"#).unwrap();

        let err = ClusterConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ClusterError::Config(_)));
    }
}
