//! Tokio driver for Civ7 debug port sessions.
//!
//! Wraps the Sans-IO [`civ7_core::SessionCore`] with real sockets and timers:
//!
//! - [`connection`]: TCP connect, read loop, writes
//! - [`Session`]: actor task with reconnect and history, behind a cloneable
//!   handle
//! - [`SessionManager`]: hands out sessions per endpoint
//!
//! ```no_run
//! # async fn demo() -> Result<(), civ7_core::SessionError> {
//! let manager = civ7_client::SessionManager::default();
//! let session = manager.open("127.0.0.1", 4318);
//! let result = session.send("1 + 1").await?;
//! assert_eq!(result, "2");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
mod manager;
mod session;

pub use civ7_core::{
    ConnectionError, ConnectionState, ReconnectConfig, SessionConfig, SessionError, SessionState,
    SessionStatus,
};
pub use connection::{Connection, ConnectionEvent};
pub use manager::{ManagerConfig, SessionManager};
pub use session::{Endpoint, HistoryEntry, Session, SessionId};

/// Port the game listens on by default.
pub const DEFAULT_PORT: u16 = 4318;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";
