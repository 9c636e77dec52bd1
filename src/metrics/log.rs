//! CSV metrics log
//!
//! `Time,Jitter,PacketLoss` header followed by one row per received packet.
//! Rows go through a [`LineWriter`] so every row reaches the file as a whole
//! line; a reader never sees a truncated final row after an interrupt.

use std::fs::File;
use std::io::{BufRead, BufReader, LineWriter, Write};
use std::path::Path;

use crate::constants::LOG_HEADER;
use crate::error::MetricsError;

/// One log row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsRow {
    pub elapsed_seconds: f64,
    pub jitter_ms: f64,
    pub lost_packets: i64,
}

impl MetricsRow {
    pub fn new(elapsed_seconds: f64, jitter_ms: f64, lost_packets: i64) -> Self {
        Self {
            elapsed_seconds,
            jitter_ms,
            lost_packets,
        }
    }

    /// Render without the trailing newline
    pub fn to_csv(&self) -> String {
        format!(
            "{:.2},{:.2},{}",
            self.elapsed_seconds, self.jitter_ms, self.lost_packets
        )
    }

    /// Parse a row the way the plotting consumer reads it: float, float, int
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut cols = line.trim_end_matches(['\r', '\n']).split(',');
        let mut next = |name: &str| {
            cols.next()
                .map(str::trim)
                .ok_or_else(|| format!("missing {} column", name))
        };
        let elapsed = next("Time")?;
        let jitter = next("Jitter")?;
        let lost = next("PacketLoss")?;
        if cols.next().is_some() {
            return Err("more than three columns".into());
        }
        Ok(Self {
            elapsed_seconds: elapsed
                .parse()
                .map_err(|e| format!("Time {:?}: {}", elapsed, e))?,
            jitter_ms: jitter
                .parse()
                .map_err(|e| format!("Jitter {:?}: {}", jitter, e))?,
            lost_packets: lost
                .parse()
                .map_err(|e| format!("PacketLoss {:?}: {}", lost, e))?,
        })
    }
}

/// Append-only metrics sink
pub struct MetricsLog<W: Write> {
    writer: LineWriter<W>,
    rows_written: u64,
}

impl MetricsLog<File> {
    /// Create (or truncate) the log file and write the header
    pub fn create(path: &Path) -> Result<Self, MetricsError> {
        let file = File::create(path)?;
        tracing::debug!("Opened metrics log {}", path.display());
        Self::new(file)
    }
}

impl<W: Write> MetricsLog<W> {
    pub fn new(inner: W) -> Result<Self, MetricsError> {
        let mut writer = LineWriter::new(inner);
        writeln!(writer, "{}", LOG_HEADER)?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    pub fn append(&mut self, row: &MetricsRow) -> Result<(), MetricsError> {
        let mut line = row.to_csv();
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W, MetricsError> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| MetricsError::Write(e.into_error()))
    }
}

/// Read a metrics log back into rows
pub fn read_log(path: &Path) -> Result<Vec<MetricsRow>, MetricsError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines.next().transpose()?.unwrap_or_default();
    if header.trim_end() != LOG_HEADER {
        return Err(MetricsError::BadHeader(header));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let row = MetricsRow::parse(&line).map_err(|reason| MetricsError::BadRow {
            line: idx + 2,
            reason,
        })?;
        rows.push(row);
    }
    Ok(rows)
}
