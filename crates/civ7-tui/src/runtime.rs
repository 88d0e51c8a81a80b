//! Async runtime
//!
//! Event loop that drives terminal I/O and coordinates between the App
//! state machine and the debug port session. Uses `tokio::select!` over
//! terminal events, session status changes, finished commands and a tick.
//!
//! Every tab asks the [`SessionManager`] for a session on the same
//! endpoint. With endpoint sharing on (the default) they all hold the same
//! session, so one connection serves the whole terminal and a command in
//! one tab makes the others see `Busy`.

use std::{
    collections::HashMap,
    io::{self, Stdout, stdout},
    path::PathBuf,
    time::Duration,
};

use civ7_client::{ManagerConfig, Session, SessionConfig, SessionManager, SessionStatus};
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::{
    app::{App, AppAction, AppEvent, TabId},
    session_log::SessionLog,
    ui,
};

/// Tick period for the event loop.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Runtime errors.
#[derive(Debug, Error)]
pub enum TuiError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal settings, usually from the command line.
#[derive(Debug, Clone)]
pub struct TuiConfig {
    /// Debug port host
    pub host: String,
    /// Debug port TCP port
    pub port: u16,
    /// Where session logs go
    pub session_dir: PathBuf,
    /// Timeouts and backoff
    pub session: SessionConfig,
}

/// Async runtime for the TUI.
///
/// Owns the terminal, the App, the session manager and the per-tab session
/// handles and logs.
pub struct Runtime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    app: App,
    config: TuiConfig,
    manager: SessionManager,
    sessions: HashMap<TabId, Session>,
    logs: HashMap<TabId, SessionLog>,
    /// Status of the shared session
    status: watch::Receiver<SessionStatus>,
    /// Events from spawned command tasks
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl Runtime {
    /// Set up the terminal and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: TuiConfig) -> Result<Self, TuiError> {
        let manager = SessionManager::new(ManagerConfig {
            share_endpoints: true,
            session: config.session.clone(),
        });
        let primary = manager.open(&config.host, config.port);
        let status = primary.watch();

        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let app = App::new(format!("{}:{}", config.host, config.port));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            app,
            config,
            manager,
            sessions: HashMap::new(),
            logs: HashMap::new(),
            status,
            events_tx,
            events_rx,
        })
    }

    /// Run the main event loop until the user quits.
    pub async fn run(mut self) -> Result<(), TuiError> {
        let actions = self.app.start();
        let mut quit = self.process_actions(actions)?;

        let mut event_stream = EventStream::new();
        let mut tick_interval = tokio::time::interval(TICK_INTERVAL);
        let mut status_open = true;

        while !quit {
            quit = tokio::select! {
                // Terminal events
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_terminal_event(event)?,
                        Some(Err(e)) => return Err(TuiError::Io(e)),
                        None => true,
                    }
                }

                // Session status
                changed = self.status.changed(), if status_open => {
                    if changed.is_ok() {
                        let status = self.status.borrow_and_update().clone();
                        let actions = self.app.handle(AppEvent::Status(status));
                        self.process_actions(actions)?
                    } else {
                        status_open = false;
                        false
                    }
                }

                // Finished commands and copy results
                Some(event) = self.events_rx.recv() => {
                    let actions = self.app.handle(event);
                    self.process_actions(actions)?
                }

                // Periodic tick
                _ = tick_interval.tick() => {
                    let actions = self.app.handle(AppEvent::Tick);
                    self.process_actions(actions)?
                }
            };
        }

        self.manager.shutdown().await;
        for log in self.logs.values_mut() {
            log.stop();
        }
        Ok(())
    }

    /// Handle a terminal event and return whether to quit.
    fn handle_terminal_event(&mut self, event: Event) -> Result<bool, TuiError> {
        let app_event = match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
            Event::Resize(cols, rows) => AppEvent::Resize(cols, rows),
            _ => return Ok(false),
        };

        let actions = self.app.handle(app_event);
        self.process_actions(actions)
    }

    /// Process actions returned by the app. Returns true if should quit.
    ///
    /// Actions whose outcome feeds back into the app queue more actions
    /// here rather than recursing.
    fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, TuiError> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.render()?,
                    AppAction::Quit => return Ok(true),
                    AppAction::OpenTab { tab, log_suffix } => {
                        let events = self.open_tab(tab, &log_suffix);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                    AppAction::CloseTab { tab } => {
                        // The session is shared with other tabs; only the
                        // handle goes.
                        self.sessions.remove(&tab);
                        if let Some(mut log) = self.logs.remove(&tab) {
                            log.stop();
                        }
                    },
                    AppAction::Send { tab, script } => self.send(tab, script),
                    AppAction::Cancel { tab } => {
                        if let Some(session) = self.sessions.get(&tab).cloned() {
                            tokio::spawn(async move { session.cancel().await });
                        }
                    },
                    AppAction::Log { tab, entry } => {
                        if let Some(log) = self.logs.get_mut(&tab) {
                            log.write(&entry);
                        }
                    },
                    AppAction::Copy { text, notice } => {
                        let event = match copy_to_clipboard(text) {
                            Ok(()) => AppEvent::Info { message: notice },
                            Err(e) => AppEvent::Error { message: format!("Failed to copy: {e}") },
                        };
                        pending_actions.extend(self.app.handle(event));
                    },
                }
            }
        }
        Ok(false)
    }

    fn open_tab(&mut self, tab: TabId, log_suffix: &str) -> Vec<AppEvent> {
        let session = self.manager.open(&self.config.host, self.config.port);
        tracing::debug!(%tab, session = %session.id(), "tab opened");
        self.sessions.insert(tab, session);

        match SessionLog::start(&self.config.session_dir, log_suffix) {
            Ok(log) => {
                let path = log.path().display().to_string();
                self.logs.insert(tab, log);
                vec![AppEvent::LogOpened { tab, path }]
            },
            Err(e) => {
                tracing::warn!(%tab, error = %e, "session log unavailable");
                vec![AppEvent::Error { message: format!("Failed to start session log: {e}") }]
            },
        }
    }

    /// Send on a task so the UI keeps running while the command is out.
    fn send(&mut self, tab: TabId, script: String) {
        let Some(session) = self.sessions.get(&tab).cloned() else {
            tracing::warn!(%tab, "send from tab without a session");
            return;
        };

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = session.send(&script).await;
            let _ = events.send(AppEvent::CommandFinished { tab, result });
        });
    }

    /// Render the UI.
    fn render(&mut self) -> Result<(), TuiError> {
        self.terminal.draw(|frame| {
            ui::render(frame, &self.app);
        })?;
        Ok(())
    }
}

fn copy_to_clipboard(text: String) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
