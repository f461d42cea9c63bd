//! Export of the final partition.
//!
//! Writes one `(address, cluster)` assignment per line, ordered by cluster id
//! and then by address bytes so repeated runs produce identical files.

use crate::engine::ClusterEngine;
use cospend_core::{Address, ClusterId, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format for assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// `address,cluster` with a header row.
    Csv,
    /// One JSON object per line.
    Jsonl,
}

impl ExportFormat {
    /// Detect format from file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Assignment<'a> {
    address: &'a Address,
    cluster: ClusterId,
}

/// Counts from an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Assignment lines written.
    pub addresses: usize,
    /// Distinct clusters written.
    pub clusters: usize,
}

/// Write every assignment of the engine's partition to `writer`.
pub fn write_partition<W: Write>(
    engine: &mut ClusterEngine,
    mut writer: W,
    format: ExportFormat,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    if format == ExportFormat::Csv {
        writeln!(writer, "address,cluster")?;
    }

    for (cluster, mut members) in engine.clusters() {
        members.sort_unstable();
        summary.clusters += 1;
        summary.addresses += members.len();

        for address in &members {
            match format {
                ExportFormat::Csv => writeln!(writer, "{address},{cluster}")?,
                ExportFormat::Jsonl => {
                    serde_json::to_writer(&mut writer, &Assignment { address, cluster })?;
                    writeln!(writer)?;
                }
            }
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Write the partition to a file.
pub fn export_to_path<P: AsRef<Path>>(
    engine: &mut ClusterEngine,
    path: P,
    format: ExportFormat,
) -> Result<ExportSummary> {
    let file = File::create(path)?;
    write_partition(engine, BufWriter::new(file), format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_engine() -> ClusterEngine {
        let mut engine = ClusterEngine::default();
        for a in [[0x02], [0x01], [0x03]] {
            engine.output_address(&a);
        }
        engine.open_event().unwrap();
        engine.input_address(&[0x02]).unwrap();
        engine.input_address(&[0x01]).unwrap();
        engine.close_event().unwrap();
        engine
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path("out.csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path("out.JSONL"), Some(ExportFormat::Jsonl));
        assert_eq!(ExportFormat::from_path("out.parquet"), None);
        assert_eq!(ExportFormat::from_path("out"), None);
    }

    #[test]
    fn test_write_csv_sorted() {
        let mut engine = sample_engine();
        let mut buf = Vec::new();
        let summary = write_partition(&mut engine, &mut buf, ExportFormat::Csv).unwrap();

        assert_eq!(summary, ExportSummary { addresses: 3, clusters: 2 });
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "address,cluster\n01,0\n02,0\n03,2\n");
    }

    #[test]
    fn test_write_jsonl() {
        let mut engine = sample_engine();
        let mut buf = Vec::new();
        write_partition(&mut engine, &mut buf, ExportFormat::Jsonl).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["address"], "01");
        assert_eq!(lines[0]["cluster"], 0);
        assert_eq!(lines[2]["address"], "03");
        assert_eq!(lines[2]["cluster"], 2);
    }

    #[test]
    fn test_export_to_path() {
        let mut engine = sample_engine();
        let file = NamedTempFile::new().unwrap();
        let summary = export_to_path(&mut engine, file.path(), ExportFormat::Csv).unwrap();
        assert_eq!(summary.addresses, 3);

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }
}
