//! Session data types

/// Lifecycle state of an acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Opening the transport
    #[default]
    Connecting,
    /// Sampling lines to elect the record width
    DetectingColumns,
    /// Parsing and storing records
    Streaming,
    /// The device stopped answering; terminal
    Disconnected,
    /// Session ended by failure or stop request; terminal
    Exited,
}

impl SessionState {
    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Exited)
    }

    /// Check if records are being produced
    pub fn is_streaming(&self) -> bool {
        matches!(self, SessionState::Streaming)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Connecting => "Connecting",
            SessionState::DetectingColumns => "Detecting columns",
            SessionState::Streaming => "Streaming",
            SessionState::Disconnected => "Disconnected",
            SessionState::Exited => "Exited",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state() {
        let state = SessionState::default();
        assert_eq!(state, SessionState::Connecting);
        assert!(!state.is_terminal());
        assert!(!state.is_streaming());

        assert!(SessionState::Streaming.is_streaming());
        assert!(SessionState::Disconnected.is_terminal());
        assert!(SessionState::Exited.is_terminal());
        assert_eq!(SessionState::DetectingColumns.to_string(), "Detecting columns");
    }
}
