//! Callback interface between an event source and the clustering engine.

use crate::engine::MergeOutcome;
use cospend_core::Result;

/// Receiver of an ordered event stream.
///
/// A source calls these in stream order from a single thread. Inputs are
/// only legal between [`on_event_open`](Self::on_event_open) and
/// [`on_event_close`](Self::on_event_close); outputs may arrive at any time.
pub trait EventSink {
    /// The stream is about to start.
    fn on_stream_start(&mut self) {}

    /// A new event begins declaring its inputs.
    fn on_event_open(&mut self) -> Result<()>;

    /// One consumed input's address for the open event. Duplicates are allowed.
    fn on_input_address(&mut self, address: &[u8]) -> Result<()>;

    /// The open event failed and must be dropped without merging.
    ///
    /// Must leave the sink between events.
    fn on_event_abort(&mut self) {}

    /// The open event has declared all of its inputs.
    fn on_event_close(&mut self) -> Result<MergeOutcome>;

    /// A newly produced output's address.
    fn on_output_address(&mut self, address: &[u8]) -> Result<()>;

    /// Batch number `count` (1-based) has completed.
    fn on_batch_boundary(&mut self, _count: u64) {}

    /// The stream has ended.
    fn on_stream_end(&mut self) {}
}
