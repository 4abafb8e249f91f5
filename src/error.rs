//! Error handling for serialgraph
//!
//! This module defines the fatal/session-level error type and a Result alias
//! for use throughout the crate. Per-line and per-frame outcomes that are not
//! errors in the session sense (rejected rows, render skew) are plain values
//! defined next to the code that produces them.

use thiserror::Error;

/// Main error type for serialgraph operations
#[derive(Error, Debug)]
pub enum SerialGraphError {
    /// The transport could not be opened
    #[error("Connection error on {port}: {message}")]
    Connection { port: String, message: String },

    /// No usable line was observed while detecting the record width
    #[error("Column detection failed: no complete line within {lines} lines / {elapsed_ms} ms")]
    DetectionFailure { lines: usize, elapsed_ms: u64 },

    /// The transport stopped answering for longer than the grace period
    #[error("Device disconnected (no response for {silent_ms} ms)")]
    Disconnected { silent_ms: u64 },

    /// Errors raised by the serial port driver
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// A record did not match the store width
    #[error("Record width mismatch: expected {expected} values, got {actual}")]
    RecordWidth { expected: usize, actual: usize },

    /// Errors related to configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SerialGraphError>,
    },
}

impl SerialGraphError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SerialGraphError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error ends the session before any data was streamed
    pub fn is_startup_failure(&self) -> bool {
        match self {
            SerialGraphError::Connection { .. } | SerialGraphError::DetectionFailure { .. } => true,
            SerialGraphError::WithContext { source, .. } => source.is_startup_failure(),
            _ => false,
        }
    }
}

/// Result type alias for serialgraph operations
pub type Result<T> = std::result::Result<T, SerialGraphError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SerialGraphError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SerialGraphError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SerialGraphError::Config("delimiter must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: delimiter must not be empty"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = SerialGraphError::Channel("closed".to_string());
        let with_ctx = err.with_context("Failed to publish state");
        assert!(with_ctx.to_string().contains("Failed to publish state"));
        assert!(with_ctx.to_string().contains("closed"));
    }

    #[test]
    fn test_connection_error_names_port() {
        let err = SerialGraphError::Connection {
            port: "/dev/ttyACM0".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("/dev/ttyACM0"));
        assert!(err.is_startup_failure());
    }

    #[test]
    fn test_startup_failure_through_context() {
        let err = SerialGraphError::DetectionFailure {
            lines: 0,
            elapsed_ms: 5000,
        }
        .with_context("Session aborted");
        assert!(err.is_startup_failure());
        assert!(!SerialGraphError::Disconnected { silent_ms: 2000 }.is_startup_failure());
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("Opening log file").unwrap_err();
        assert!(err.to_string().starts_with("Opening log file"));
    }
}
