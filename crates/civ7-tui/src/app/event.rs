//! UI events
//!
//! Events fed into the App state machine from the terminal and the runtime.

use civ7_core::{SessionError, SessionStatus};
use crossterm::event::KeyEvent;

use super::TabId;

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyEvent),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Session status changed.
    Status(SessionStatus),

    /// A command sent from `tab` resolved.
    CommandFinished {
        /// Tab that sent the command
        tab: TabId,
        /// Result text or failure
        result: Result<String, SessionError>,
    },

    /// The session log for `tab` is open.
    LogOpened {
        /// Tab owning the log
        tab: TabId,
        /// Log file path, for display
        path: String,
    },

    /// Notice for the active tab.
    Info {
        /// Human-readable message
        message: String,
    },

    /// Error for the active tab.
    Error {
        /// Human-readable message
        message: String,
    },
}
