//! In-memory transports for testing and demos
//!
//! This module provides two transports that need no hardware:
//!
//! - [`ScriptedTransport`] replays a fixed sequence of byte chunks, exactly as
//!   a serial driver would hand them out, then either stays idle or simulates
//!   the device being unplugged.
//! - [`SyntheticTransport`] generates delimited rows from waveform patterns in
//!   real time, with optional spikes to exercise range substitution.
//!
//! # Example
//!
//! ```ignore
//! use serialgraph::backend::mock_transport::{ScriptedTransport, AfterScript};
//!
//! let transport = ScriptedTransport::new(["1,2\n3,", "4\n"])
//!     .after_script(AfterScript::Unplug);
//! ```

use super::transport::Transport;
use crate::error::{Result, SerialGraphError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Behaviour once every scripted chunk has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterScript {
    /// Stay open, report no data forever
    #[default]
    Idle,
    /// Report the device as gone: closed and failing every probe
    Unplug,
}

/// Replays pre-recorded chunks
#[derive(Debug)]
pub struct ScriptedTransport {
    chunks: VecDeque<Vec<u8>>,
    open: bool,
    unplugged: bool,
    open_error: Option<String>,
    after_script: AfterScript,
    close_count: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Create a transport that returns each chunk from one `read_available` call
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            open: false,
            unplugged: false,
            open_error: None,
            after_script: AfterScript::Idle,
            close_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Choose what happens after the last chunk
    pub fn after_script(mut self, after: AfterScript) -> Self {
        self.after_script = after;
        self
    }

    /// Make `open` fail with the given message
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Shared counter of how many times the transport was actually closed
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.close_count.clone()
    }

    fn check_unplug(&mut self) {
        if self.chunks.is_empty() && self.after_script == AfterScript::Unplug {
            self.unplugged = true;
        }
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self) -> Result<()> {
        if let Some(message) = &self.open_error {
            return Err(SerialGraphError::Connection {
                port: self.description(),
                message: message.clone(),
            });
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open && !self.unplugged
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.is_open() {
            return Err(SerialGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted device unplugged",
            )));
        }
        let available = self.chunks.front().map(Vec::len).unwrap_or(0);
        if available == 0 {
            self.check_unplug();
        }
        Ok(available)
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        if !self.is_open() {
            return Err(SerialGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted device unplugged",
            )));
        }
        Ok(self.chunks.pop_front().unwrap_or_default())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn description(&self) -> String {
        "scripted".to_string()
    }
}

/// Pattern for generating synthetic column data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WavePattern {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Counter that increments and wraps
    Counter { step: f64, min: f64, max: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
    /// Triangle wave
    Triangle { period: f64, amplitude: f64 },
}

/// One generated column
#[derive(Debug, Clone)]
pub struct SyntheticColumn {
    pub pattern: WavePattern,
    counter_value: f64,
    /// Noise amplitude to add (0.0 = no noise)
    pub noise_amplitude: f64,
}

impl SyntheticColumn {
    pub fn new(pattern: WavePattern) -> Self {
        Self {
            pattern,
            counter_value: 0.0,
            noise_amplitude: 0.0,
        }
    }

    /// Add noise to the generated values
    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// Generate a value based on the pattern and elapsed time
    pub fn generate_value(&mut self, elapsed_secs: f64, rng: &mut XorShift) -> f64 {
        let base_value = match self.pattern {
            WavePattern::Constant(v) => v,
            WavePattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            WavePattern::Counter { step, min, max } => {
                self.counter_value += step;
                if self.counter_value > max {
                    self.counter_value = min;
                } else if self.counter_value < min {
                    self.counter_value = max;
                }
                self.counter_value
            }
            WavePattern::Square { period, amplitude } => {
                let t = elapsed_secs % period;
                if t < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            WavePattern::Triangle { period, amplitude } => {
                let t = elapsed_secs % period;
                let half = period / 2.0;
                if t < half {
                    amplitude * (2.0 * t / half - 1.0)
                } else {
                    amplitude * (1.0 - 2.0 * (t - half) / half)
                }
            }
        };

        if self.noise_amplitude > 0.0 {
            base_value + (rng.next_f64() - 0.5) * 2.0 * self.noise_amplitude
        } else {
            base_value
        }
    }
}

/// Small deterministic PRNG so demo output is reproducible
#[derive(Debug, Clone)]
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_f64(&mut self) -> f64 {
        let mut s = self.0;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.0 = s;
        (s as f64) / (u64::MAX as f64)
    }
}

/// Generates delimited rows at a fixed rate
#[derive(Debug)]
pub struct SyntheticTransport {
    columns: Vec<SyntheticColumn>,
    delimiter: String,
    row_interval: Duration,
    /// Emit a wildly out-of-range value every N rows (0 = never)
    spike_every: u64,
    rng: XorShift,
    start: Option<Instant>,
    rows_emitted: u64,
    pending: Vec<u8>,
}

impl SyntheticTransport {
    pub fn new(columns: Vec<SyntheticColumn>, delimiter: impl Into<String>, rate_hz: u32) -> Self {
        Self {
            columns,
            delimiter: delimiter.into(),
            row_interval: Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64),
            spike_every: 0,
            rng: XorShift::new(12345),
            start: None,
            rows_emitted: 0,
            pending: Vec::new(),
        }
    }

    /// PID-loop style demo: setpoint, measurement, controller output
    pub fn demo(delimiter: impl Into<String>) -> Self {
        let columns = vec![
            SyntheticColumn::new(WavePattern::Counter {
                step: 1.0,
                min: 0.0,
                max: 1000.0,
            }),
            SyntheticColumn::new(WavePattern::Square {
                period: 4.0,
                amplitude: 50.0,
            }),
            SyntheticColumn::new(WavePattern::Sine {
                frequency: 0.25,
                amplitude: 45.0,
                offset: 0.0,
            })
            .with_noise(2.0),
            SyntheticColumn::new(WavePattern::Triangle {
                period: 2.0,
                amplitude: 20.0,
            }),
        ];
        Self::new(columns, delimiter, 200).with_spikes(97)
    }

    /// Emit an out-of-range reading in the last column every `every` rows
    pub fn with_spikes(mut self, every: u64) -> Self {
        self.spike_every = every;
        self
    }

    fn generate_due_rows(&mut self) {
        let Some(start) = self.start else {
            return;
        };
        let elapsed = start.elapsed();
        let due = (elapsed.as_secs_f64() / self.row_interval.as_secs_f64()) as u64;

        while self.rows_emitted < due {
            self.rows_emitted += 1;
            let t = self.rows_emitted as f64 * self.row_interval.as_secs_f64();
            let spike = self.spike_every > 0 && self.rows_emitted % self.spike_every == 0;
            let last = self.columns.len().saturating_sub(1);

            let mut row = String::new();
            for (i, column) in self.columns.iter_mut().enumerate() {
                if i > 0 {
                    row.push_str(&self.delimiter);
                }
                let value = column.generate_value(t, &mut self.rng);
                if spike && i == last {
                    row.push_str("9.9e99");
                } else {
                    row.push_str(&format!("{:.3}", value));
                }
            }
            row.push('\n');
            self.pending.extend_from_slice(row.as_bytes());
        }
    }
}

impl Transport for SyntheticTransport {
    fn open(&mut self) -> Result<()> {
        self.start = Some(Instant::now());
        self.rows_emitted = 0;
        tracing::info!(
            "Synthetic transport generating {} columns",
            self.columns.len()
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.start.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.generate_due_rows();
        Ok(self.pending.len())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        self.generate_due_rows();
        Ok(std::mem::take(&mut self.pending))
    }

    fn close(&mut self) {
        self.start = None;
        self.pending.clear();
    }

    fn description(&self) -> String {
        "demo".to_string()
    }
}
