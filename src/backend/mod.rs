//! Backend module for serial acquisition
//!
//! This module reads the byte stream on a dedicated thread so the UI stays
//! responsive. It shares the [`SessionHandle`] (state, stop request, sample
//! store) with the frontend and reports progress over a crossbeam channel.
//!
//! # Architecture
//!
//! - [`AcquisitionEvent`] - Messages sent from the worker to the frontend
//! - [`FrontendReceiver`] - Frontend-side handle for events, the store and stop requests
//! - [`AcquisitionBackend`] - Entry point that owns the worker until it is run or spawned
//!
//! # Components
//!
//! - [`Transport`] - Byte source trait; [`SerialTransport`] for real ports
//! - [`ScriptedTransport`] / [`SyntheticTransport`] - Hardware-free transports
//! - [`LineFramer`] - Incremental line framing
//! - [`detect`] - Column-count election over a sample of lines
//! - [`RecordParser`] - Field parsing with range substitution
//! - [`SampleStore`] - Shared append-only sample sequences
//! - [`LogSink`] - Row log; [`CsvFileSink`] writes `Log.csv`
//! - [`AcquisitionWorker`] - The session state machine
//!
//! # Example
//!
//! ```ignore
//! use serialgraph::backend::{AcquisitionBackend, AcquisitionEvent, SerialTransport, NullSink};
//! use serialgraph::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let transport = SerialTransport::from_config(&config.serial);
//! let (backend, frontend) =
//!     AcquisitionBackend::new(config, Box::new(transport), Box::new(NullSink));
//!
//! let worker = backend.spawn()?;
//!
//! for event in frontend.drain() {
//!     if let AcquisitionEvent::DataReady { generation } = event {
//!         // redraw
//!     }
//! }
//!
//! frontend.shutdown();
//! let outcome = worker.join();
//! ```

pub mod detector;
pub mod framer;
pub mod mock_transport;
pub mod parser;
pub mod serial;
pub mod sink;
pub mod store;
pub mod transport;
pub mod worker;

pub use detector::{
    count_delimiters, detect, ColumnTally, DetectionBudget, LineSource, TransportLines,
};
pub use framer::{frame, Line, LineFramer};
pub use mock_transport::{AfterScript, ScriptedTransport, SyntheticTransport, WavePattern};
pub use parser::{
    parse_record, LastKnownValues, ParseRejected, ParsedRecord, RecordParser, Substitution,
};
pub use serial::{list_ports, PortInfo, SerialTransport};
pub use sink::{CsvFileSink, LogSink, MemorySink, NullSink};
pub use store::{SampleStore, StoreSnapshot};
pub use transport::Transport;
pub use worker::{AcquisitionWorker, SessionOutcome};

use crate::config::AppConfig;
use crate::error::{Result, ResultExt, SerialGraphError};
use crate::session::{SessionHandle, SessionState};
use crate::types::{AcquisitionStats, ColumnCount};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Message sent from the worker to the frontend
#[derive(Debug, Clone)]
pub enum AcquisitionEvent {
    /// Session state changed
    StateChanged(SessionState),
    /// Record width is known and the store is published
    ColumnsDetected(ColumnCount),
    /// New records were appended; may be coalesced when the channel is full
    DataReady { generation: u64 },
    /// Statistics update
    Stats(AcquisitionStats),
    /// Worker finished; sent exactly once
    Ended {
        state: SessionState,
        error: Option<String>,
    },
}

/// Frontend receiver for worker events
#[derive(Clone)]
pub struct FrontendReceiver {
    /// Receiver for worker events
    pub receiver: Receiver<AcquisitionEvent>,
    session: Arc<SessionHandle>,
}

impl FrontendReceiver {
    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<AcquisitionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain(&self) -> Vec<AcquisitionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout and once the worker has gone away.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AcquisitionEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Shared session handle
    pub fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Sample store, once columns are known
    pub fn store(&self) -> Option<Arc<SampleStore>> {
        self.session.store()
    }

    /// Block until the session streams or ends
    pub fn wait_for_streaming(&self, timeout: Duration) -> SessionState {
        self.session.wait_for_streaming(timeout)
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.session.request_stop();
    }

    /// Callback that requests shutdown, for use from a signal handler
    pub fn stop_callback(&self) -> impl Fn() + Send + 'static {
        let session = self.session.clone();
        move || session.request_stop()
    }

    /// Request shutdown on Ctrl-C; may only be installed once per process
    pub fn stop_on_interrupt(&self) -> Result<()> {
        ctrlc::set_handler(self.stop_callback())
            .map_err(|e| SerialGraphError::Io(std::io::Error::other(e)))
            .context("Installing Ctrl-C handler")
    }
}

/// The acquisition backend, run on its own thread
pub struct AcquisitionBackend {
    worker: AcquisitionWorker,
    session: Arc<SessionHandle>,
}

impl AcquisitionBackend {
    /// Create a backend and the matching frontend receiver
    pub fn new(
        config: AppConfig,
        transport: Box<dyn Transport>,
        sink: Box<dyn LogSink>,
    ) -> (Self, FrontendReceiver) {
        // Bounded for backpressure; DataReady is dropped rather than blocking when full
        let (event_tx, event_rx) = bounded(config.acquisition.event_capacity.max(1));
        let session = Arc::new(SessionHandle::new());

        let worker = AcquisitionWorker::new(config, transport, sink, session.clone(), event_tx);

        let backend = Self {
            worker,
            session: session.clone(),
        };
        let frontend = FrontendReceiver {
            receiver: event_rx,
            session,
        };

        (backend, frontend)
    }

    /// Run the session on the current thread
    pub fn run(self) -> SessionOutcome {
        self.worker.run()
    }

    /// Run the session on a named thread
    pub fn spawn(self) -> Result<JoinHandle<SessionOutcome>> {
        let handle = std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Get a handle to the session
    pub fn session(&self) -> Arc<SessionHandle> {
        self.session.clone()
    }
}
