//! UI actions
//!
//! Actions produced by the App state machine for the runtime to execute.

use super::TabId;
use crate::session_log::LogEntry;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// A tab was created: open its session and log.
    OpenTab {
        /// New tab
        tab: TabId,
        /// Log file name suffix, e.g. `_tab2`
        log_suffix: String,
    },

    /// A tab was closed: release its session handle and close its log.
    CloseTab {
        /// Closed tab
        tab: TabId,
    },

    /// Send a script from a tab.
    Send {
        /// Tab the result belongs to
        tab: TabId,
        /// Script text, comment lines removed
        script: String,
    },

    /// Abandon the outstanding command.
    Cancel {
        /// Tab whose session to cancel
        tab: TabId,
    },

    /// Append to a tab's session log.
    Log {
        /// Tab owning the log
        tab: TabId,
        /// Entry to write
        entry: LogEntry,
    },

    /// Put text on the clipboard.
    Copy {
        /// Text to copy
        text: String,
        /// Notice to show once copied
        notice: String,
    },
}
