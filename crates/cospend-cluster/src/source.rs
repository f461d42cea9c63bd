//! JSONL event log reader and replay driver.
//!
//! Each non-blank line is one record:
//!
//! ```text
//! {"type":"tx","inputs":["76a914..."],"outputs":["76a914...","a914..."]}
//! {"type":"block"}
//! ```
//!
//! A `tx` record is replayed as one event: open, inputs, close, then its
//! outputs are registered. A `block` record is a batch boundary.

use crate::engine::MergeOutcome;
use crate::sink::EventSink;
use cospend_core::{ClusterError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Raw record as it appears in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRecord {
    /// A transaction: consumed inputs and produced outputs, as hex.
    Tx {
        /// Consumed input addresses.
        #[serde(default)]
        inputs: Vec<String>,
        /// Produced output addresses.
        #[serde(default)]
        outputs: Vec<String>,
    },
    /// End of a block.
    Block,
}

/// A decoded stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One event with raw address bytes.
    Transaction {
        /// Addresses consumed as inputs.
        inputs: Vec<Vec<u8>>,
        /// Addresses produced as outputs.
        outputs: Vec<Vec<u8>>,
    },
    /// Batch boundary.
    BlockEnd,
}

impl StreamEvent {
    /// Decode one log line. `line` is the 1-based line number for errors.
    pub fn parse_line(text: &str, line: usize) -> Result<Self> {
        let record: EventRecord = serde_json::from_str(text).map_err(|e| ClusterError::Parse {
            line,
            message: e.to_string(),
        })?;
        Self::from_record(record, line)
    }

    fn from_record(record: EventRecord, line: usize) -> Result<Self> {
        let decode = |hex_addresses: Vec<String>| -> Result<Vec<Vec<u8>>> {
            hex_addresses
                .iter()
                .map(|s| {
                    hex::decode(s).map_err(|e| ClusterError::Parse {
                        line,
                        message: format!("invalid hex address '{s}': {e}"),
                    })
                })
                .collect()
        };

        Ok(match record {
            EventRecord::Tx { inputs, outputs } => Self::Transaction {
                inputs: decode(inputs)?,
                outputs: decode(outputs)?,
            },
            EventRecord::Block => Self::BlockEnd,
        })
    }
}

/// Streaming reader over a JSONL event log.
pub struct EventReader<R> {
    lines: Lines<R>,
    line_num: usize,
}

impl EventReader<BufReader<File>> {
    /// Open an event log file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_num += 1;

            if line.trim().is_empty() {
                continue;
            }
            return Some(StreamEvent::parse_line(&line, self.line_num));
        }
    }
}

/// Read and decode a whole event log, parsing lines in parallel.
///
/// Decoding fans out over rayon; the returned events keep file order, so
/// the result can be replayed by a single consumer.
pub fn read_events_parallel<P: AsRef<Path>>(path: P) -> Result<Vec<StreamEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|text| (i + 1, text)))
        .collect::<std::io::Result<Vec<_>>>()?;

    lines
        .par_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(line, text)| StreamEvent::parse_line(text, *line))
        .collect()
}

/// Totals from a replayed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Transactions replayed.
    pub events: u64,
    /// Block boundaries seen.
    pub blocks: u64,
    /// Transactions with fewer than two distinct inputs.
    pub degenerate_events: u64,
}

/// Feed a decoded stream into a sink in order.
///
/// Stops at the first error, tagging it with the 1-based transaction number.
/// Everything replayed before the failing transaction stays applied; the
/// failing transaction itself is aborted, so the sink is left between events.
pub fn replay<I, S>(events: I, sink: &mut S) -> Result<ReplaySummary>
where
    I: IntoIterator<Item = Result<StreamEvent>>,
    S: EventSink + ?Sized,
{
    let mut summary = ReplaySummary::default();
    sink.on_stream_start();

    for event in events {
        match event? {
            StreamEvent::Transaction { inputs, outputs } => {
                summary.events += 1;
                let ordinal = summary.events;
                let outcome = replay_transaction(sink, &inputs, &outputs)
                    .map_err(|e| e.at_event(ordinal))?;
                if matches!(outcome, MergeOutcome::Degenerate { .. }) {
                    summary.degenerate_events += 1;
                }
            }
            StreamEvent::BlockEnd => {
                summary.blocks += 1;
                sink.on_batch_boundary(summary.blocks);
            }
        }
    }

    sink.on_stream_end();
    Ok(summary)
}

fn replay_transaction<S: EventSink + ?Sized>(
    sink: &mut S,
    inputs: &[Vec<u8>],
    outputs: &[Vec<u8>],
) -> Result<MergeOutcome> {
    sink.on_event_open()?;
    let closed = inputs
        .iter()
        .try_for_each(|input| sink.on_input_address(input))
        .and_then(|()| sink.on_event_close());
    let outcome = match closed {
        Ok(outcome) => outcome,
        Err(e) => {
            sink.on_event_abort();
            return Err(e);
        }
    };
    for output in outputs {
        sink.on_output_address(output)?;
    }
    Ok(outcome)
}
