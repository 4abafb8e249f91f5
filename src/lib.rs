//! # serialgraph: live plotter and logger for serial data
//!
//! Reads newline-terminated, delimiter-separated numeric rows from a serial
//! port, infers the number of columns from the first lines, plots the most
//! recent window of samples and appends every accepted row to a CSV log.
//!
//! ## Architecture
//!
//! - **Backend**: a worker thread owns the transport, frames lines, detects
//!   the column count, parses rows and appends them to the shared store
//! - **Session**: shared state machine, stop flag and sample store handle
//! - **Frontend**: a render loop that windows the store into series for an
//!   egui_plot panel or a headless tracing renderer
//! - **Communication**: crossbeam channel events from worker to frontend
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `serialgraph` (or `--config FILE`) and overridden by the command
//! line.
//!
//! ## Example
//!
//! ```ignore
//! use serialgraph::{
//!     backend::{AcquisitionBackend, CsvFileSink, SerialTransport},
//!     config::AppConfig,
//! };
//! use std::time::Duration;
//!
//! let config = AppConfig::default();
//! let transport = SerialTransport::from_config(&config.serial);
//! let sink = CsvFileSink::open(&config.log.path)?;
//! let (backend, frontend) = AcquisitionBackend::new(config, Box::new(transport), Box::new(sink));
//!
//! let worker = backend.spawn()?;
//! frontend.wait_for_streaming(Duration::from_secs(10));
//! // ... render ...
//! frontend.shutdown();
//! let outcome = worker.join();
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod frontend;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use backend::{AcquisitionBackend, AcquisitionEvent, FrontendReceiver, SessionOutcome};
pub use config::AppConfig;
pub use error::{Result, SerialGraphError};
pub use frontend::SerialGraphApp;
pub use session::{SessionHandle, SessionState};
pub use types::{ColumnCount, ColumnMode, Record};
