//! Shared session handle

use super::types::SessionState;
use crate::backend::store::SampleStore;
use crate::types::ColumnCount;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

/// State, stop request and sample store of one session
#[derive(Debug, Default)]
pub struct SessionHandle {
    state: Mutex<SessionState>,
    changed: Condvar,
    stop: AtomicBool,
    store: OnceLock<Arc<SampleStore>>,
    failure: Mutex<Option<String>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    /// Move to `next`, waking waiters.
    ///
    /// Returns `false` (and changes nothing) when the session is already in a
    /// terminal state or already in `next`.
    pub fn transition(&self, next: SessionState) -> bool {
        let mut state = self.lock_state();
        if state.is_terminal() || *state == next {
            return false;
        }
        tracing::info!("Session state: {} -> {}", *state, next);
        *state = next;
        drop(state);
        self.changed.notify_all();
        true
    }

    /// Block until `done(state)` holds or `timeout` passes; returns the last state seen
    pub fn wait_until<F>(&self, timeout: Duration, mut done: F) -> SessionState
    where
        F: FnMut(SessionState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state();
        while !done(*state) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = match self.changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        *state
    }

    /// Wait until the session streams or ends
    pub fn wait_for_streaming(&self, timeout: Duration) -> SessionState {
        self.wait_until(timeout, |s| s.is_streaming() || s.is_terminal())
    }

    /// Wait until the session reaches a terminal state
    pub fn wait_for_end(&self, timeout: Duration) -> SessionState {
        self.wait_until(timeout, |s| s.is_terminal())
    }

    /// Ask the acquisition worker to stop at its next poll
    pub fn request_stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stop requested");
        }
        // wake anyone waiting on the state so they re-check
        self.changed.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// The raw stop flag, for loops that poll it directly
    pub fn stop_flag(&self) -> &AtomicBool {
        &self.stop
    }

    /// Publish the store once the record width is known; later calls are ignored
    pub fn publish_store(&self, store: Arc<SampleStore>) -> bool {
        self.store.set(store).is_ok()
    }

    pub fn store(&self) -> Option<Arc<SampleStore>> {
        self.store.get().cloned()
    }

    /// Detected (or configured) record width
    pub fn columns(&self) -> Option<ColumnCount> {
        self.store.get().map(|s| s.columns())
    }

    /// Record the operator-facing reason the session ended
    pub fn set_failure(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            failure.get_or_insert_with(|| message.into());
        }
    }

    pub fn failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|f| f.clone())
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
