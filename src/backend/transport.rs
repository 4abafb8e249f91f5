//! Transport trait for byte sources
//!
//! This module provides a common trait for everything the acquisition worker
//! can read lines from: a real serial port, a scripted in-memory stream used in
//! tests, or a synthetic waveform generator for demos.

use crate::error::Result;

/// Unified interface for byte-stream transports
///
/// Implementations are created unopened and must be `Send` so that the
/// acquisition worker can own them on its own thread. The worker is the only
/// user of a transport for its whole lifetime.
///
/// # Example
///
/// ```ignore
/// fn drain(transport: &mut dyn Transport) -> Result<Vec<u8>> {
///     if transport.bytes_available()? > 0 {
///         transport.read_available()
///     } else {
///         Ok(Vec::new())
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Open the underlying device
    fn open(&mut self) -> Result<()>;

    /// Check if the device is open
    fn is_open(&self) -> bool;

    /// Number of bytes that can be read without blocking
    ///
    /// An error here is treated as a failed liveness probe.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read every byte currently available (may be empty)
    fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Close the device; calling this on a closed transport is a no-op
    fn close(&mut self);

    /// Human-readable identifier for diagnostics (port name, "demo", ...)
    fn description(&self) -> String;
}
