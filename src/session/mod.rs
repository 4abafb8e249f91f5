//! Acquisition session state shared between threads
//!
//! A session moves through a fixed lifecycle:
//!
//! ```text
//! Connecting -> DetectingColumns -> Streaming -> { Disconnected, Exited }
//! ```
//!
//! Any non-terminal state may also jump straight to `Exited` (connection or
//! detection failure, external stop). Terminal states are absorbing.
//!
//! The [`SessionHandle`] is shared by `Arc` between the acquisition worker and
//! the render loop. It carries the state, the external stop request and, once
//! the record width is known, the [`SampleStore`](crate::backend::SampleStore).

pub mod handle;
pub mod types;

pub use handle::SessionHandle;
pub use types::SessionState;
