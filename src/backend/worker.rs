//! Acquisition Worker Thread Implementation
//!
//! This module contains the loop that owns the transport for the whole
//! session. It runs on its own thread and talks to the frontend through the
//! shared [`SessionHandle`] and a crossbeam event channel.
//!
//! # Lifecycle
//!
//! - **Connecting**: open the transport. Failure is fatal, no retry.
//! - **DetectingColumns**: sample lines to elect the record width, or take the
//!   configured width. Failure is fatal.
//! - **Streaming**: poll for bytes, frame, parse and publish records to the
//!   [`SampleStore`] and the [`LogSink`]. Rejected lines are counted and
//!   dropped.
//! - **Disconnected / Exited**: release the transport, flush the sink and
//!   publish a single `Ended` event.
//!
//! # Liveness
//!
//! Between reads the worker probes the transport: `bytes_available` must
//! succeed and the transport must still report itself open. A probe that keeps
//! failing for the configured grace period ends the session as
//! `Disconnected`. An idle but healthy device never times out.

use crate::backend::detector::{detect, DetectionBudget, TransportLines};
use crate::backend::framer::{Line, LineFramer};
use crate::backend::parser::{ParseRejected, RecordParser};
use crate::backend::sink::LogSink;
use crate::backend::store::SampleStore;
use crate::backend::transport::Transport;
use crate::backend::AcquisitionEvent;
use crate::config::AppConfig;
use crate::error::{Result, SerialGraphError};
use crate::session::{SessionHandle, SessionState};
use crate::types::{AcquisitionStats, ColumnCount, Record};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a blocking event send may wait for a full channel
const EVENT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Why the streaming loop returned without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Stopped,
}

/// Final result of a session, returned by the worker thread
#[derive(Debug)]
pub struct SessionOutcome {
    /// Terminal state reached
    pub state: SessionState,
    /// Error that ended the session, if any
    pub error: Option<SerialGraphError>,
    /// Counters at the end of the session
    pub stats: AcquisitionStats,
    /// Record width, if detection completed
    pub columns: Option<ColumnCount>,
}

impl SessionOutcome {
    /// Process exit status for this outcome.
    ///
    /// A disconnect after streaming is a normal end of session; failures to
    /// start and unexpected errors are not.
    pub fn exit_code(&self) -> u8 {
        match &self.error {
            None => 0,
            Some(e) if matches!(e, SerialGraphError::Disconnected { .. }) => 0,
            Some(_) => 1,
        }
    }
}

/// The worker that drives one acquisition session
pub struct AcquisitionWorker {
    config: AppConfig,
    transport: Box<dyn Transport>,
    sink: Box<dyn LogSink>,
    session: Arc<SessionHandle>,
    events: Sender<AcquisitionEvent>,
    stats: AcquisitionStats,
    last_stats_time: Instant,
    last_stats_records: u64,
    finished: bool,
}

impl AcquisitionWorker {
    /// Create a new worker; nothing is opened until [`run`](Self::run)
    pub fn new(
        config: AppConfig,
        transport: Box<dyn Transport>,
        sink: Box<dyn LogSink>,
        session: Arc<SessionHandle>,
        events: Sender<AcquisitionEvent>,
    ) -> Self {
        Self {
            config,
            transport,
            sink,
            session,
            events,
            stats: AcquisitionStats::default(),
            last_stats_time: Instant::now(),
            last_stats_records: 0,
            finished: false,
        }
    }

    /// Run the session to completion
    pub fn run(mut self) -> SessionOutcome {
        tracing::info!("Acquisition worker started ({})", self.transport.description());

        let result = self.run_session();

        let (state, error) = match result {
            Ok(EndReason::Stopped) => {
                tracing::info!("Acquisition stopped on request");
                (SessionState::Exited, None)
            }
            Err(e @ SerialGraphError::Disconnected { .. }) => {
                tracing::warn!("{}", e);
                self.session.set_failure(e.to_string());
                (SessionState::Disconnected, Some(e))
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.session.set_failure(e.to_string());
                (SessionState::Exited, Some(e))
            }
        };

        self.shutdown(state);
        tracing::info!("Acquisition worker stopped");

        SessionOutcome {
            state,
            error,
            stats: self.stats.clone(),
            columns: self.session.columns(),
        }
    }

    /// Release the transport, flush the sink and publish the terminal state.
    ///
    /// Only the first call has any effect.
    pub fn shutdown(&mut self, terminal: SessionState) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.transport.close();
        if let Err(e) = self.sink.flush() {
            tracing::warn!("Failed to flush log sink: {}", e);
        }

        self.session.transition(terminal);
        let state = self.session.state();
        self.publish(AcquisitionEvent::Stats(self.stats.clone()));
        self.publish(AcquisitionEvent::StateChanged(state));
        self.publish(AcquisitionEvent::Ended {
            state,
            error: self.session.failure(),
        });
    }

    /// Current counters
    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    fn run_session(&mut self) -> Result<EndReason> {
        self.enter(SessionState::Connecting);
        self.transport.open()?;
        if self.session.stop_requested() {
            return Ok(EndReason::Stopped);
        }

        self.enter(SessionState::DetectingColumns);
        let mut framer = LineFramer::new();
        let (columns, leftover) = match self.detect_columns(&mut framer) {
            Ok(detected) => detected,
            Err(_) if self.session.stop_requested() => return Ok(EndReason::Stopped),
            Err(e) => return Err(e),
        };
        if self.session.stop_requested() {
            return Ok(EndReason::Stopped);
        }
        tracing::info!("Using {} columns", columns);

        let store = Arc::new(SampleStore::new(columns));
        self.session.publish_store(store.clone());
        self.publish(AcquisitionEvent::ColumnsDetected(columns));

        // Elapsed time is measured from here
        let mut parser = RecordParser::new(
            self.config.parsing.delimiter.clone(),
            columns,
            self.config.parsing.range(),
        );
        self.enter(SessionState::Streaming);
        self.last_stats_time = Instant::now();

        if !leftover.is_empty() {
            tracing::debug!("Streaming {} lines left over from detection", leftover.len());
            self.process_lines(leftover, &mut parser, &store)?;
        }

        self.stream(&mut framer, &mut parser, &store)
    }

    fn detect_columns(&mut self, framer: &mut LineFramer) -> Result<(ColumnCount, Vec<Line>)> {
        if let Some(fixed) = self.config.detection.columns {
            let columns = ColumnCount::new(fixed).ok_or_else(|| {
                SerialGraphError::Config("fixed column count must be positive".to_string())
            })?;
            tracing::debug!("Column detection skipped, configured width {}", columns);
            return Ok((columns, Vec::new()));
        }

        let budget = DetectionBudget {
            max_lines: self.config.detection.max_lines,
            max_duration: self.config.detection.timeout(),
        };
        let session = self.session.clone();
        let mut source = TransportLines::new(
            self.transport.as_mut(),
            framer,
            self.config.acquisition.poll_interval(),
        )
        .with_stop_flag(session.stop_flag());

        let result = detect(&mut source, &self.config.parsing.delimiter, budget);
        self.stats.bytes_read += source.bytes_read();
        let leftover = source.into_leftover();
        Ok((result?, leftover))
    }

    fn stream(
        &mut self,
        framer: &mut LineFramer,
        parser: &mut RecordParser,
        store: &SampleStore,
    ) -> Result<EndReason> {
        let poll_interval = self.config.acquisition.poll_interval();
        let grace = self.config.acquisition.grace_period();
        let mut failing_since: Option<Instant> = None;

        loop {
            if self.session.stop_requested() {
                return Ok(EndReason::Stopped);
            }

            let healthy = match self.poll_once(framer, parser, store) {
                Ok(true) => true,
                Ok(false) => {
                    let open = self.transport.is_open();
                    if open {
                        std::thread::sleep(poll_interval);
                    }
                    open
                }
                Err(e @ SerialGraphError::RecordWidth { .. }) => return Err(e),
                Err(e) => {
                    if failing_since.is_none() {
                        tracing::debug!("Liveness probe failed: {}", e);
                    }
                    false
                }
            };

            if healthy {
                failing_since = None;
            } else {
                let since = *failing_since.get_or_insert_with(Instant::now);
                let silent = since.elapsed();
                if silent >= grace {
                    return Err(SerialGraphError::Disconnected {
                        silent_ms: silent.as_millis() as u64,
                    });
                }
                std::thread::sleep(poll_interval);
            }

            if self.last_stats_time.elapsed() >= self.config.acquisition.stats_interval() {
                self.send_stats();
            }
        }
    }

    /// Read and process whatever is available; `Ok(false)` when nothing was
    fn poll_once(
        &mut self,
        framer: &mut LineFramer,
        parser: &mut RecordParser,
        store: &SampleStore,
    ) -> Result<bool> {
        if self.transport.bytes_available()? == 0 {
            return Ok(false);
        }
        let chunk = self.transport.read_available()?;
        if chunk.is_empty() {
            return Ok(false);
        }
        self.stats.bytes_read += chunk.len() as u64;

        let lines = framer.push(&chunk);
        self.process_lines(lines, parser, store)?;
        Ok(true)
    }

    fn process_lines(
        &mut self,
        lines: Vec<Line>,
        parser: &mut RecordParser,
        store: &SampleStore,
    ) -> Result<()> {
        let mut batch: Vec<Record> = Vec::with_capacity(lines.len());

        for line in lines {
            self.stats.lines_framed += 1;
            match parser.parse_line(&line) {
                Ok(parsed) => {
                    for sub in &parsed.substitutions {
                        tracing::trace!(
                            "Column {} reading {} out of range, using {}",
                            sub.column + 1,
                            sub.reading,
                            sub.replacement
                        );
                    }
                    self.stats.substitutions += parsed.substitutions.len() as u64;
                    batch.push(parsed.record);
                }
                Err(rejected) => {
                    match rejected {
                        ParseRejected::InvalidUtf8 => self.stats.rejected_encoding += 1,
                        ParseRejected::FieldCount { .. } => self.stats.rejected_field_count += 1,
                        ParseRejected::InvalidNumber { .. } => {
                            self.stats.rejected_invalid_number += 1
                        }
                    }
                    tracing::trace!(
                        "Dropped line {:?}: {}",
                        String::from_utf8_lossy(line.as_bytes()).trim_end(),
                        rejected
                    );
                }
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        store.append_batch(&batch)?;
        self.stats.records_accepted += batch.len() as u64;

        for record in &batch {
            if let Err(e) = self.sink.append_row(record) {
                if self.stats.log_failures == 0 {
                    tracing::warn!("Failed to write log row: {}", e);
                }
                self.stats.log_failures += 1;
            }
        }

        // Coalesced: a full channel already holds a pending notification
        let _ = self.events.try_send(AcquisitionEvent::DataReady {
            generation: store.generation(),
        });
        Ok(())
    }

    fn send_stats(&mut self) {
        let elapsed = self.last_stats_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let new_records = self.stats.records_accepted - self.last_stats_records;
            self.stats.effective_row_rate = new_records as f64 / elapsed;
        }
        self.last_stats_records = self.stats.records_accepted;
        self.last_stats_time = Instant::now();
        let _ = self.events.try_send(AcquisitionEvent::Stats(self.stats.clone()));
    }

    fn enter(&self, state: SessionState) {
        if self.session.transition(state) || self.session.state() == state {
            self.publish(AcquisitionEvent::StateChanged(state));
        }
    }

    fn publish(&self, event: AcquisitionEvent) {
        if let Err(e) = self.events.send_timeout(event, EVENT_SEND_TIMEOUT) {
            tracing::debug!("Frontend not receiving events: {}", e);
        }
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        self.shutdown(SessionState::Exited);
    }
}
