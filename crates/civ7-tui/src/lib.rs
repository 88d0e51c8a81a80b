//! Terminal UI for the Civ7 debug port
//!
//! A multi-tab REPL over [`civ7_client::Session`]. Keystrokes go through the
//! pure [`App`] state machine; the [`Runtime`] executes the resulting
//! actions (sending scripts, writing session logs, clipboard) and feeds
//! results back in.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod app;
pub mod runtime;
pub mod session_log;
pub mod ui;

pub use app::{App, AppAction, AppEvent, TabId};
pub use runtime::{Runtime, TuiConfig, TuiError};
pub use session_log::{LogEntry, SessionLog, SessionLogError};
