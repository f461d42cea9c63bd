//! Error types for co-spend clustering.

use crate::address::Address;
use thiserror::Error;

/// Result type alias for clustering operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur while clustering an event stream.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// An address was looked up or cited as an input before it was ever registered.
    #[error("Unknown address: {0}")]
    UnknownAddress(Address),

    /// An event was opened while another event was still accumulating inputs.
    #[error("Event opened while a previous event is still open")]
    ReentrantEventOpen,

    /// An event operation arrived with no event open.
    #[error("No open event for {operation}")]
    NoOpenEvent {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A failure while replaying a specific event of the stream.
    #[error("Event {event}: {source}")]
    Event {
        /// 1-based ordinal of the event in the stream.
        event: u64,
        /// The underlying failure.
        #[source]
        source: Box<ClusterError>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed event record.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the event log.
        line: usize,
        /// What was wrong with the record.
        message: String,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    /// Attach the ordinal of the event being replayed.
    #[must_use]
    pub fn at_event(self, event: u64) -> Self {
        Self::Event {
            event,
            source: Box::new(self),
        }
    }
}
