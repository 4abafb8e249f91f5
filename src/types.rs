//! Core data types for serialgraph
//!
//! This module contains the fundamental values passed between the acquisition
//! backend and the rendering frontend.
//!
//! # Main Types
//!
//! - [`ColumnCount`] - Detected number of delimited fields per input line
//! - [`Record`] - One accepted row: elapsed milliseconds followed by one value per column
//! - [`RangeLimits`] - Inclusive validity range used for out-of-range substitution
//! - [`ColumnMode`] - Which sequence is used as the shared x axis when plotting
//! - [`AcquisitionStats`] - Diagnostic counters published by the backend
//! - [`Series`] - One drawable `(x, y, label)` triple handed to a renderer

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Canonical number of delimited fields per record.
///
/// Always at least one; constant for a session once detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnCount(NonZeroUsize);

impl ColumnCount {
    /// Create a column count, returning `None` for zero
    pub fn new(count: usize) -> Option<Self> {
        NonZeroUsize::new(count).map(Self)
    }

    /// Number of data columns (excluding the elapsed-time column)
    #[inline]
    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Number of sequences in a record or store (data columns + elapsed time)
    #[inline]
    pub fn record_width(self) -> usize {
        self.0.get() + 1
    }
}

impl std::fmt::Display for ColumnCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted row of samples.
///
/// Index 0 holds the elapsed milliseconds since streaming started, indices
/// `1..=columns` hold the validated column values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<f64>,
}

impl Record {
    /// Build a record from the elapsed time and the column values
    pub fn new(elapsed_ms: f64, fields: impl IntoIterator<Item = f64>) -> Self {
        let mut values = vec![elapsed_ms];
        values.extend(fields);
        Self { values }
    }

    /// Elapsed milliseconds since streaming started
    pub fn elapsed_ms(&self) -> f64 {
        self.values[0]
    }

    /// Column values, without the elapsed-time field
    pub fn fields(&self) -> &[f64] {
        &self.values[1..]
    }

    /// All values including the elapsed-time field
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values including the elapsed-time field
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Render as a comma-joined log row (no line terminator)
    pub fn to_csv_row(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Inclusive range of plausible readings.
///
/// Values outside the range (and NaN) are replaced with the column's last
/// in-range value instead of being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeLimits {
    pub min: f64,
    pub max: f64,
}

impl RangeLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether a reading is inside the range (bounds inclusive)
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for RangeLimits {
    fn default() -> Self {
        Self {
            min: -30_000_000_000.0,
            max: 30_000_000_000.0,
        }
    }
}

/// Selection of the shared x axis for plotting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    /// Mode 0: every detected column is plotted against elapsed time
    ElapsedTime,
    /// Mode 1: the first detected column is the x axis for the remaining columns
    #[default]
    FirstColumn,
}

impl ColumnMode {
    /// Map the numeric command line selector to a mode
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ColumnMode::ElapsedTime),
            1 => Some(ColumnMode::FirstColumn),
            _ => None,
        }
    }

    /// Numeric selector as accepted on the command line
    pub fn index(&self) -> u8 {
        match self {
            ColumnMode::ElapsedTime => 0,
            ColumnMode::FirstColumn => 1,
        }
    }

    /// Store sequence index used as the x axis
    pub fn x_sequence(&self) -> usize {
        match self {
            ColumnMode::ElapsedTime => 0,
            ColumnMode::FirstColumn => 1,
        }
    }

    /// Store sequence indices plotted as y series for a given column count
    pub fn y_sequences(&self, columns: ColumnCount) -> std::ops::RangeInclusive<usize> {
        match self {
            ColumnMode::ElapsedTime => 1..=columns.get(),
            ColumnMode::FirstColumn => 2..=columns.get(),
        }
    }

    /// Axis label for the x axis
    pub fn x_label(&self) -> &'static str {
        match self {
            ColumnMode::ElapsedTime => "Time (ms)",
            ColumnMode::FirstColumn => "First column",
        }
    }
}

impl std::fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnMode::ElapsedTime => write!(f, "elapsed time (0)"),
            ColumnMode::FirstColumn => write!(f, "first column (1)"),
        }
    }
}

/// Statistics about the acquisition session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionStats {
    /// Total bytes read from the transport
    pub bytes_read: u64,
    /// Complete lines produced by the framer while streaming
    pub lines_framed: u64,
    /// Rows accepted into the sample store
    pub records_accepted: u64,
    /// Rows dropped because the field count did not match
    pub rejected_field_count: u64,
    /// Rows dropped because a field was not a number
    pub rejected_invalid_number: u64,
    /// Rows dropped because they were not valid UTF-8
    pub rejected_encoding: u64,
    /// Individual fields replaced by their last in-range value
    pub substitutions: u64,
    /// Rows that could not be written to the log sink
    pub log_failures: u64,
    /// Current effective row rate in Hz
    pub effective_row_rate: f64,
}

impl AcquisitionStats {
    /// Total number of dropped rows
    pub fn rejected(&self) -> u64 {
        self.rejected_field_count + self.rejected_invalid_number + self.rejected_encoding
    }

    /// Percentage of framed lines that became records
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.records_accepted + self.rejected();
        if total == 0 {
            100.0
        } else {
            (self.records_accepted as f64 / total as f64) * 100.0
        }
    }
}

/// A single drawable series handed to a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Store sequence index of the y values
    pub sequence: usize,
    /// Legend label
    pub label: String,
    /// Interleaved `[x, y]` points
    pub points: Vec<[f64; 2]>,
}

impl Series {
    /// Pair x and y values into plot points; both slices must have equal length
    pub fn new(sequence: usize, label: impl Into<String>, x: &[f64], y: &[f64]) -> Self {
        let points = x.iter().zip(y).map(|(&x, &y)| [x, y]).collect();
        Self {
            sequence,
            label: label.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Legend label for the n-th plotted series (1-based)
pub fn column_label(ordinal: usize) -> String {
    format!("C {}", ordinal)
}

/// Generate a distinct color based on an index
/// Uses the golden ratio to spread hues evenly across the color wheel
pub fn series_color(index: usize) -> [u8; 4] {
    const GOLDEN_RATIO: f32 = 0.618_034;

    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    [r, g, b, 255]
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
