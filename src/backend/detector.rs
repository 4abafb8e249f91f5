//! Column-count auto-detection
//!
//! Before streaming starts the worker samples a bounded window of lines and
//! counts delimiters in each. The most common `delimiters + 1` value becomes
//! the session's [`ColumnCount`]. Ties are resolved in favour of the value seen
//! first, so a device that prints a banner line or two before its data rows
//! does not change the outcome.
//!
//! Detection fails outright when no complete line arrives within the time
//! budget; the caller must abort instead of guessing a width.

use super::framer::{Line, LineFramer};
use super::transport::Transport;
use crate::error::{Result, SerialGraphError};
use crate::types::ColumnCount;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Default number of lines sampled before electing a width
pub const DEFAULT_DETECTION_LINES: usize = 50;

/// Default time budget for detection
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Count non-overlapping occurrences of `delimiter` in `haystack`
pub fn count_delimiters(haystack: &[u8], delimiter: &[u8]) -> usize {
    if delimiter.is_empty() || haystack.len() < delimiter.len() {
        return 0;
    }

    let mut count = 0;
    let mut i = 0;
    while i + delimiter.len() <= haystack.len() {
        if &haystack[i..i + delimiter.len()] == delimiter {
            count += 1;
            i += delimiter.len();
        } else {
            i += 1;
        }
    }
    count
}

/// Frequency table of observed field counts, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ColumnTally {
    counts: Vec<(usize, usize)>,
    observed: usize,
}

impl ColumnTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed field count
    pub fn observe_count(&mut self, fields: usize) {
        self.observed += 1;
        match self.counts.iter_mut().find(|(value, _)| *value == fields) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((fields, 1)),
        }
    }

    /// Record the field count of a framed line
    pub fn observe_line(&mut self, line: &Line, delimiter: &str) {
        let fields = count_delimiters(line.as_bytes(), delimiter.as_bytes()) + 1;
        self.observe_count(fields);
    }

    /// Number of lines observed so far
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Most common field count; ties go to the value seen first
    pub fn mode(&self) -> Option<ColumnCount> {
        let mut best: Option<(usize, usize)> = None;
        for &(value, n) in &self.counts {
            match best {
                Some((_, best_n)) if best_n >= n => {}
                _ => best = Some((value, n)),
            }
        }
        best.and_then(|(value, _)| ColumnCount::new(value))
    }
}

/// Limits on how long detection may sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionBudget {
    pub max_lines: usize,
    pub max_duration: Duration,
}

impl Default for DetectionBudget {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_DETECTION_LINES,
            max_duration: DEFAULT_DETECTION_TIMEOUT,
        }
    }
}

/// Source of complete lines with a deadline
pub trait LineSource {
    /// Return the next complete line, or `None` once `deadline` has passed
    fn next_line(&mut self, deadline: Instant) -> Result<Option<Line>>;
}

/// Observe lines from `source` and elect the record width
pub fn detect(
    source: &mut dyn LineSource,
    delimiter: &str,
    budget: DetectionBudget,
) -> Result<ColumnCount> {
    let started = Instant::now();
    let deadline = started + budget.max_duration;
    let mut tally = ColumnTally::new();

    while tally.observed() < budget.max_lines {
        match source.next_line(deadline)? {
            Some(line) => {
                tally.observe_line(&line, delimiter);
                tracing::trace!(
                    "Detection line {}: {:?}",
                    tally.observed(),
                    String::from_utf8_lossy(line.as_bytes())
                );
            }
            None => {
                tracing::debug!(
                    "Detection budget elapsed after {} lines",
                    tally.observed()
                );
                break;
            }
        }
    }

    tally.mode().ok_or(SerialGraphError::DetectionFailure {
        lines: tally.observed(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

/// [`LineSource`] reading from a transport through a framer
///
/// Complete lines that were framed but not consumed stay queued and can be
/// recovered with [`TransportLines::into_leftover`]; the framer keeps any
/// partial line.
pub struct TransportLines<'a> {
    transport: &'a mut dyn Transport,
    framer: &'a mut LineFramer,
    ready: VecDeque<Line>,
    poll_interval: Duration,
    stop: Option<&'a AtomicBool>,
    bytes_read: u64,
}

impl<'a> TransportLines<'a> {
    pub fn new(
        transport: &'a mut dyn Transport,
        framer: &'a mut LineFramer,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            framer,
            ready: VecDeque::new(),
            poll_interval,
            stop: None,
            bytes_read: 0,
        }
    }

    /// Stop waiting for lines once `flag` is set
    pub fn with_stop_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Bytes read from the transport so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Lines framed but not handed out
    pub fn into_leftover(self) -> Vec<Line> {
        self.ready.into_iter().collect()
    }

    fn stopped(&self) -> bool {
        self.stop.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

impl LineSource for TransportLines<'_> {
    fn next_line(&mut self, deadline: Instant) -> Result<Option<Line>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline || self.stopped() {
                return Ok(None);
            }

            if self.transport.bytes_available()? > 0 {
                let chunk = self.transport.read_available()?;
                self.bytes_read += chunk.len() as u64;
                self.ready.extend(self.framer.push(&chunk));
            } else {
                std::thread::sleep(self.poll_interval.min(deadline - now));
            }
        }
    }
}
