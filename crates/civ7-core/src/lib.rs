//! Sans-IO core of the Civ7 debug session engine.
//!
//! Everything here is pure: no sockets, no clocks, no tasks. Drivers feed
//! events and the current time in and execute the actions that come back.
//!
//! - [`config`]: timeouts and backoff settings
//! - [`input`]: decides whether typed script text is ready to send
//! - [`reconnect`]: backoff schedule between connection attempts
//! - [`session`]: one-outstanding-command state machine
//! - [`status`]: connection/session state published to observers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod input;
pub mod reconnect;
pub mod session;
pub mod status;

pub use config::SessionConfig;
pub use error::{ConnectionError, SessionError};
pub use input::{Analysis, Classification, InputAnalyzer, StringKind, analyze, classify};
pub use reconnect::{ReconnectAttempt, ReconnectConfig, ReconnectPolicy};
pub use session::{Command, SessionAction, SessionCore};
pub use status::{ConnectionState, SessionState, SessionStatus};
