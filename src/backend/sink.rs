//! Row sinks mirroring accepted records to a log
//!
//! Every accepted record is written as one comma-joined line: elapsed
//! milliseconds followed by each column value. [`CsvFileSink`] opens its file
//! once in append mode and flushes after every row, so the log survives an
//! abrupt exit.

use crate::error::{Result, ResultExt};
use crate::types::Record;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Destination for accepted rows
pub trait LogSink: Send {
    /// Write one record as a terminated row
    fn append_row(&mut self, record: &Record) -> Result<()>;

    /// Push buffered rows to the underlying storage
    fn flush(&mut self) -> Result<()>;
}

/// Append-mode CSV log file
pub struct CsvFileSink {
    writer: BufWriter<File>,
    path: PathBuf,
    rows_written: u64,
}

impl CsvFileSink {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Opening log file {}", path.display()))?;

        tracing::info!("Logging rows to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl LogSink for CsvFileSink {
    fn append_row(&mut self, record: &Record) -> Result<()> {
        writeln!(self.writer, "{}", record.to_csv_row())?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards every row (logging disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn append_row(&mut self, _record: &Record) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects rows in memory; the handle can be cloned to inspect them
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<String>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows written so far
    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of explicit flushes
    pub fn flush_count(&self) -> usize {
        self.flushes.lock().map(|f| *f).unwrap_or(0)
    }
}

impl LogSink for MemorySink {
    fn append_row(&mut self, record: &Record) -> Result<()> {
        if let Ok(mut rows) = self.rows.lock() {
            rows.push(record.to_csv_row());
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Ok(mut flushes) = self.flushes.lock() {
            *flushes += 1;
        }
        Ok(())
    }
}
