//! Periodic progress reporting.
//!
//! Logs a table of batches, addresses, live clusters and elapsed time through
//! `tracing`. Reporting reads engine statistics only.

use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::info;

const RULE: &str = "+--------+-----------+----------+---------+----------+";
const HEADER: &str = "| blocks | addresses | clusters |  delta  |   total  |";

/// One row of the progress table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressRow {
    /// Batches completed so far.
    pub batches: u64,
    /// Registered addresses.
    pub addresses: usize,
    /// Live clusters.
    pub clusters: usize,
    /// Seconds since the previous row.
    pub delta_secs: f64,
    /// Seconds since the stream started.
    pub total_secs: f64,
}

impl fmt::Display for ProgressRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {:6} | {:9} | {:8} | {:7.2} | {:8.2} |",
            self.batches, self.addresses, self.clusters, self.delta_secs, self.total_secs
        )
    }
}

/// Emits a progress row every `interval` batches.
///
/// An interval of 0 silences the reporter entirely, header and final row
/// included.
#[derive(Debug)]
pub struct ProgressReporter {
    interval: u64,
    started: Instant,
    last: Instant,
    /// Batch count of the most recent row, if any.
    last_row: Option<u64>,
}

impl ProgressReporter {
    /// Create a reporter. An interval of 0 disables all output.
    #[must_use]
    pub fn new(interval: u64) -> Self {
        let now = Instant::now();
        Self {
            interval,
            started: now,
            last: now,
            last_row: None,
        }
    }

    /// Whether any output is produced.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.interval > 0
    }

    /// Reset the clocks and log the table header.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.started = now;
        self.last = now;
        self.last_row = None;
        if !self.is_enabled() {
            return;
        }
        info!("{RULE}");
        info!("{HEADER}");
        info!("{RULE}");
        info!("|      0 |         0 |        0 |    -.-- |     0.00 |");
    }

    /// Whether batch number `count` is on the reporting cadence.
    #[must_use]
    pub fn is_due(&self, count: u64) -> bool {
        self.is_enabled() && count > 0 && count % self.interval == 0
    }

    /// Log and return a row if `count` is on the cadence.
    pub fn batch(&mut self, count: u64, addresses: usize, clusters: usize) -> Option<ProgressRow> {
        if !self.is_due(count) {
            return None;
        }
        Some(self.emit(count, addresses, clusters))
    }

    /// Log a final row and close the table.
    ///
    /// The row is skipped when batch `count` was already reported.
    pub fn finish(&mut self, count: u64, addresses: usize, clusters: usize) -> Option<ProgressRow> {
        if !self.is_enabled() {
            return None;
        }
        let row = if self.last_row == Some(count) {
            None
        } else {
            Some(self.emit(count, addresses, clusters))
        };
        info!("{RULE}");
        row
    }

    fn emit(&mut self, count: u64, addresses: usize, clusters: usize) -> ProgressRow {
        let now = Instant::now();
        let row = ProgressRow {
            batches: count,
            addresses,
            clusters,
            delta_secs: now.duration_since(self.last).as_secs_f64(),
            total_secs: now.duration_since(self.started).as_secs_f64(),
        };
        self.last = now;
        self.last_row = Some(count);
        info!("{row}");
        row
    }
}
