//! Camera session states

use serde::Serialize;
use std::fmt::{self, Display};

/// State of an image acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SessionState {
    /// No stream open; initial and terminal state
    #[default]
    Closed,
    /// Discovering available cameras
    Enumerating,
    /// Waiting for the platform to open a stream
    Opening,
    /// Stream open, no still captured
    Live,
    /// A frame is being extracted and encoded; input disabled
    Capturing,
    /// A captured still is waiting for confirm or retake
    Reviewing,
    /// Device access failed; see the session's error
    Error,
}

impl SessionState {
    /// Whether the session is waiting on the platform or the encoder
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Enumerating | SessionState::Opening | SessionState::Capturing
        )
    }

    /// Whether the session may hold an open stream in this state
    pub fn holds_stream(&self) -> bool {
        matches!(self, SessionState::Live | SessionState::Capturing)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Closed => "closed",
            SessionState::Enumerating => "enumerating devices",
            SessionState::Opening => "opening",
            SessionState::Live => "live",
            SessionState::Capturing => "capturing",
            SessionState::Reviewing => "reviewing",
            SessionState::Error => "in error",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(SessionState::Enumerating.is_busy());
        assert!(SessionState::Opening.is_busy());
        assert!(SessionState::Capturing.is_busy());
        assert!(!SessionState::Live.is_busy());
        assert!(!SessionState::Reviewing.is_busy());
        assert!(!SessionState::Closed.is_busy());
    }

    #[test]
    fn test_stream_holding_states() {
        assert!(SessionState::Live.holds_stream());
        assert!(SessionState::Capturing.holds_stream());
        assert!(!SessionState::Reviewing.holds_stream());
        assert!(!SessionState::Error.holds_stream());
        assert!(!SessionState::Closed.holds_stream());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::default(), SessionState::Closed);
        assert_eq!(format!("{}", SessionState::Error), "in error");
        assert_eq!(format!("{}", SessionState::Live), "live");
    }
}
