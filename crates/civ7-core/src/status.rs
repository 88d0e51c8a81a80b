//! Observable session status.

use std::{fmt, time::Duration};

use crate::error::ConnectionError;

/// Transport state of a session.
///
/// ```text
/// Disconnected ──> Connecting ──> Connected
///                      ^              │ transport lost
///                      └─ Reconnecting <┘
///
/// any ── close() ──> Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet started
    Disconnected,
    /// Connect attempt in progress
    Connecting,
    /// Socket established
    Connected,
    /// Waiting out a backoff delay before the next attempt
    Reconnecting,
    /// Closed explicitly; never leaves this state
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Closed => "Closed",
        };
        f.write_str(label)
    }
}

/// Command state of a session.
///
/// `Idle` and `Awaiting` only occur while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Connected, ready for a command
    Idle,
    /// One command is outstanding
    Awaiting,
    /// Not connected
    Offline,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Awaiting => "Awaiting",
            Self::Offline => "Offline",
        };
        f.write_str(label)
    }
}

/// Snapshot published whenever anything observable changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Command state
    pub session_state: SessionState,
    /// Transport state
    pub connection_state: ConnectionState,
    /// Why the last connect attempt failed or the last connection ended
    pub last_error: Option<ConnectionError>,
    /// Reconnect attempts since the last successful connect
    pub attempt: u32,
    /// Backoff delay currently being waited out
    pub retry_in: Option<Duration>,
}

impl SessionStatus {
    /// Status of a session that has not started yet.
    pub fn initial() -> Self {
        Self {
            session_state: SessionState::Offline,
            connection_state: ConnectionState::Disconnected,
            last_error: None,
            attempt: 0,
            retry_in: None,
        }
    }

    /// Whether commands can be sent right now.
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// One-line summary for status bars: `Connected`, `Reconnecting in 4s
    /// (connection refused)` and so on.
    pub fn summary(&self) -> String {
        match (self.connection_state, self.retry_in, &self.last_error) {
            (ConnectionState::Connected, ..) => match self.session_state {
                SessionState::Awaiting => "Connected (awaiting result)".to_string(),
                _ => "Connected".to_string(),
            },
            (ConnectionState::Reconnecting, Some(delay), Some(err)) => {
                format!("Reconnecting in {}s ({err})", delay.as_secs().max(1))
            },
            (ConnectionState::Reconnecting, Some(delay), None) => {
                format!("Reconnecting in {}s", delay.as_secs().max(1))
            },
            (ConnectionState::Connecting, _, Some(err)) => format!("Connecting ({err})"),
            (state, ..) => state.to_string(),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_offline() {
        let status = SessionStatus::initial();
        assert_eq!(status.session_state, SessionState::Offline);
        assert_eq!(status.connection_state, ConnectionState::Disconnected);
        assert!(!status.is_connected());
    }

    #[test]
    fn summary_distinguishes_refused_from_reset() {
        let mut status = SessionStatus {
            connection_state: ConnectionState::Reconnecting,
            last_error: Some(ConnectionError::Refused),
            attempt: 2,
            retry_in: Some(Duration::from_secs(4)),
            ..SessionStatus::initial()
        };
        assert_eq!(status.summary(), "Reconnecting in 4s (connection refused)");

        status.last_error = Some(ConnectionError::Reset);
        assert_eq!(status.summary(), "Reconnecting in 4s (connection reset)");
    }

    #[test]
    fn summary_when_connected() {
        let status = SessionStatus {
            session_state: SessionState::Awaiting,
            connection_state: ConnectionState::Connected,
            ..SessionStatus::initial()
        };
        assert_eq!(status.summary(), "Connected (awaiting result)");
    }
}
