//! Signal-queue records: one per analysed ticker per scan.
//!
//! Records are written as JSON Lines, one object per line, so downstream
//! consumers can stream or append them.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use mrha_core::domain::SignalAction;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub ticker: String,
    pub rank: usize,
    pub trading_value: f64,
    pub signal: SignalAction,
}

#[derive(Debug, Error)]
pub enum SignalSinkError {
    #[error("signal sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("signal record serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for signal records.
pub trait SignalSink {
    fn publish(&mut self, record: &SignalRecord) -> Result<(), SignalSinkError>;

    fn flush(&mut self) -> Result<(), SignalSinkError> {
        Ok(())
    }

    fn publish_all(&mut self, records: &[SignalRecord]) -> Result<(), SignalSinkError> {
        for record in records {
            self.publish(record)?;
        }
        self.flush()
    }
}

/// Writes each record as one JSON line.
pub struct JsonlSignalSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSignalSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSignalSink<BufWriter<File>> {
    /// Create (or truncate) a JSONL file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, SignalSinkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> SignalSink for JsonlSignalSink<W> {
    fn publish(&mut self, record: &SignalRecord) -> Result<(), SignalSinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SignalSinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read records back from a JSONL file. Blank lines are skipped.
pub fn read_signal_records(path: &Path) -> Result<Vec<SignalRecord>, SignalSinkError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
