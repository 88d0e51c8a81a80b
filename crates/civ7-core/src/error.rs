//! Error types for the session engine.
//!
//! Two layers:
//!
//! - [`ConnectionError`]: why the transport is down. Drives reconnection and
//!   is surfaced as status so a UI can tell "refused" from "reset".
//! - [`SessionError`]: why a single command did not produce a result.
//!
//! Exceptions thrown by the remote script are not errors here; they come back
//! as ordinary result text.

use std::{io, time::Duration};

use civ7_proto::ProtocolError;
use thiserror::Error;

/// Why a connection attempt failed or an established connection ended.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Nothing is listening on the port (game not running or port disabled)
    #[error("connection refused")]
    Refused,

    /// Established connection was reset or aborted
    #[error("connection reset")]
    Reset,

    /// Peer closed the stream cleanly
    #[error("connection closed by peer")]
    ClosedByPeer,

    /// Connect did not complete in time
    #[error("connection attempt timed out")]
    TimedOut,

    /// Host or network unreachable, or the address could not be resolved
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// Byte stream could not be decoded; the stream is no longer aligned
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Any other I/O failure
    #[error("i/o error ({kind:?}): {message}")]
    Io {
        /// Kind reported by the OS
        kind: io::ErrorKind,
        /// Rendered error message
        message: String,
    },
}

impl ConnectionError {
    /// Classify an I/O error from connect, read or write.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Reset,
            io::ErrorKind::UnexpectedEof => Self::ClosedByPeer,
            io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => Self::Unreachable(err.to_string()),
            kind => Self::Io { kind, message: err.to_string() },
        }
    }

    /// Returns true if the same endpoint is likely to accept a retry soon.
    ///
    /// Drops mid-conversation (reset, peer close, timeouts) are transient. A
    /// refusal or an unreachable host means nothing is there yet; the session
    /// keeps retrying, but observers should report it differently. Protocol
    /// errors point at a misbehaving peer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Reset | Self::ClosedByPeer | Self::TimedOut | Self::Io { .. })
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}

/// Why a command did not produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Command text was empty or whitespace only; nothing was sent
    #[error("command is empty")]
    EmptyCommand,

    /// Another command is still awaiting its result
    #[error("session busy: a command is already awaiting its result")]
    Busy,

    /// Not connected; the session is reconnecting
    #[error("session offline: not connected to the debug port")]
    Offline,

    /// No result arrived within the command timeout
    #[error("command timed out after {elapsed:?}")]
    Timeout {
        /// Time between submission and the timeout firing
        elapsed: Duration,
    },

    /// Caller gave up on the command; the remote script keeps running
    #[error("command cancelled")]
    Cancelled,

    /// Transport dropped while the command was in flight
    #[error("connection lost: {0}")]
    ConnectionLost(ConnectionError),

    /// Session was closed explicitly
    #[error("session closed")]
    Closed,

    /// Command could not be framed
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Returns true if the command never reached the wire.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::EmptyCommand | Self::Busy | Self::Offline | Self::Protocol(_))
    }
}
