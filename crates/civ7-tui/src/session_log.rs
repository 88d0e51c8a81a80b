//! Per-tab session transcript.
//!
//! Each tab writes `session_YYYY-MM-DD_HH-MM-SS{suffix}.log` under the
//! session directory. The log is a pure sink: it never reads back, and a
//! failed write is logged and skipped so a full disk cannot take the
//! terminal down.
//!
//! ```text
//! Session started: 2026-10-19T14:03:11.204512
//! --------------------------------------------------
//! [14:03:15] > Game.turn
//! [14:03:15] 42
//! [14:03:20] > for (const p of Players.getAlive()) {
//! [14:03:20]   console.log(p.name);
//! [14:03:20]   }
//! [14:03:21] ERROR: connection lost: connection reset by peer
//! [14:03:22] INFO: Disconnected
//! ```

use std::{
    fs::{self, File},
    io::{self, LineWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use thiserror::Error;

/// Width of the header and footer rule.
const SEPARATOR_WIDTH: usize = 50;

/// Failed to create a session log.
#[derive(Debug, Error)]
#[error("failed to create session log in {dir}: {source}")]
pub struct SessionLogError {
    /// Directory the log was meant to go in
    pub dir: PathBuf,
    /// Underlying I/O error
    #[source]
    pub source: io::Error,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Script as typed, comments included
    Command(String),
    /// Result text from the game
    Response(String),
    /// Failed command or local error
    Error(String),
    /// Connection notices
    Info(String),
}

/// Open transcript file.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: Option<LineWriter<File>>,
}

impl SessionLog {
    /// Create the directory if needed and open a fresh log file.
    pub fn start(dir: &Path, suffix: &str) -> Result<Self, SessionLogError> {
        Self::start_at(dir, suffix, Local::now())
    }

    fn start_at(dir: &Path, suffix: &str, now: DateTime<Local>) -> Result<Self, SessionLogError> {
        let wrap = |source| SessionLogError { dir: dir.to_path_buf(), source };

        fs::create_dir_all(dir).map_err(wrap)?;
        let path = dir.join(file_name(&now, suffix));
        let file = File::create(&path).map_err(wrap)?;

        let mut log = Self { path, file: Some(LineWriter::new(file)) };
        log.write_line(&format!("Session started: {}", iso_timestamp(&now)));
        log.write_line(&"-".repeat(SEPARATOR_WIDTH));

        tracing::debug!(path = %log.path.display(), "session log started");
        Ok(log)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry stamped with the current local time.
    pub fn write(&mut self, entry: &LogEntry) {
        for line in format_entry(entry, &Local::now()) {
            self.write_line(&line);
        }
    }

    /// Write the footer and close the file. Idempotent.
    pub fn stop(&mut self) {
        if self.file.is_none() {
            return;
        }

        self.write_line(&"-".repeat(SEPARATOR_WIDTH));
        self.write_line(&format!("Session ended: {}", iso_timestamp(&Local::now())));

        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "session log flush failed");
            }
        }
    }

    fn write_line(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "session log write failed");
        }
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `session_YYYY-MM-DD_HH-MM-SS{suffix}.log`
pub fn file_name(now: &DateTime<Local>, suffix: &str) -> String {
    format!("session_{}{suffix}.log", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Render an entry as transcript lines.
///
/// Multi-line commands put `>` on the first line only; multi-line responses
/// repeat the timestamp on every line.
pub fn format_entry(entry: &LogEntry, now: &DateTime<Local>) -> Vec<String> {
    let stamp = now.format("%H:%M:%S");

    match entry {
        LogEntry::Command(text) => text
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                if i == 0 { format!("[{stamp}] > {line}") } else { format!("[{stamp}]   {line}") }
            })
            .collect(),
        LogEntry::Response(text) => {
            text.split('\n').map(|line| format!("[{stamp}] {line}")).collect()
        },
        LogEntry::Error(text) => vec![format!("[{stamp}] ERROR: {text}")],
        LogEntry::Info(text) => vec![format!("[{stamp}] INFO: {text}")],
    }
}

fn iso_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
