//! UI state machine
//!
//! Pure state machine that processes terminal and session events, producing
//! actions for the runtime to execute. Completely decoupled from I/O.
//!
//! # Architecture
//!
//! The App owns the tabs, the input editor and the last known session
//! status. It never talks to the session itself: sending, cancelling,
//! logging and clipboard access are all [`AppAction`]s, and their outcomes
//! come back as [`AppEvent`]s.

mod action;
mod event;
mod input;
mod state;

pub use action::AppAction;
use civ7_core::{Classification, ConnectionState, SessionState, SessionStatus};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
pub use event::AppEvent;
pub use input::{InputState, MAX_INPUT_LINES};
pub use state::{LineKind, OutputLine, Tab, TabId, format_response};

use crate::session_log::LogEntry;

/// Lines moved per `PageUp`/`PageDown`.
const SCROLL_PAGE: usize = 10;

const HELP_HINT: &str = "Type /help for available commands";

const HELP_TEXT: &[&str] = &[
    "Available commands:",
    "  /copy    - Copy last response to clipboard",
    "  /copyall - Copy all terminal output to clipboard",
    "  /clear   - Clear the screen",
    "  /raw     - Toggle JSON pretty-printing for this tab",
    "  /quit    - Exit the terminal",
    "  /help    - Show this help",
    "",
    "Keyboard shortcuts:",
    "  Enter         - Execute (continues on a new line if syntax is incomplete)",
    "  Ctrl+J        - Force new line (max 5 lines)",
    "  Up/Down       - Navigate history / move cursor",
    "  Ctrl+C        - Clear input / cancel running command / copy last response",
    "  Ctrl+Y        - Copy last response",
    "  Ctrl+D        - Exit terminal",
    "  Ctrl+L        - Clear screen",
    "  PageUp/Down   - Scroll output",
    "",
    "Tab shortcuts:",
    "  Ctrl+T        - New tab",
    "  Ctrl+W        - Close tab",
    "  Tab           - Next tab",
    "  Shift+Tab     - Previous tab",
    "",
    "Comments: Lines starting with // or # are echoed but not sent",
];

/// UI state machine.
#[derive(Debug, Clone)]
pub struct App {
    /// `host:port` shown in the status bar
    endpoint: String,
    tabs: Vec<Tab>,
    /// Index into `tabs`
    active: usize,
    /// Last assigned tab number
    tab_counter: u32,
    input: InputState,
    status: SessionStatus,
    /// Tab waiting for a command result
    pending: Option<TabId>,
    /// Whether the session has ever reached `Connected`
    ever_connected: bool,
    /// Suppresses repeated connecting/disconnected notices during retries
    announced: bool,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
}

impl App {
    /// Create an App with no tabs. Call [`App::start`] to open the first.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            tabs: Vec::new(),
            active: 0,
            tab_counter: 0,
            input: InputState::new(),
            status: SessionStatus::initial(),
            pending: None,
            ever_connected: false,
            announced: false,
            terminal_size: (80, 24),
        }
    }

    /// Open the first tab.
    pub fn start(&mut self) -> Vec<AppAction> {
        let mut actions = self.open_tab();
        if let Some(tab) = self.active_tab_mut() {
            tab.add_info(HELP_HINT);
        }
        actions.push(AppAction::Render);
        actions
    }

    /// Process an event and return actions for the runtime.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::Status(status) => self.handle_status(status),
            AppEvent::CommandFinished { tab, result } => self.handle_result(tab, result),
            AppEvent::LogOpened { tab, path } => {
                if let Some(tab) = self.tab_mut(tab) {
                    tab.add_info(&format!("Session log: {path}"));
                }
                vec![AppAction::Render]
            },
            AppEvent::Info { message } => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.add_info(&message);
                }
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                let mut actions = Vec::new();
                if let Some(tab) = self.active_tab_mut() {
                    tab.add_error(&message);
                    actions.push(AppAction::Log { tab: tab.id, entry: LogEntry::Error(message) });
                }
                actions.push(AppAction::Render);
                actions
            },
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<AppAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('d') if ctrl => vec![AppAction::Quit],
            KeyCode::Char('c') if ctrl => self.cancel_input(),
            KeyCode::Char('l') if ctrl => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.clear();
                }
                vec![AppAction::Render]
            },
            KeyCode::Char('t') if ctrl => self.new_tab(),
            KeyCode::Char('w') if ctrl => self.close_tab(),
            KeyCode::Char('y') if ctrl => self.copy_last_response(),
            KeyCode::Char('j') if ctrl => {
                self.input.insert_newline();
                vec![AppAction::Render]
            },
            KeyCode::Enter if ctrl || alt || key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.input.insert_newline();
                vec![AppAction::Render]
            },
            KeyCode::Char(_) if ctrl || alt => vec![],
            KeyCode::Char(c) => {
                self.input.insert_char(c);
                vec![AppAction::Render]
            },
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.backspace();
                vec![AppAction::Render]
            },
            KeyCode::Delete => {
                self.input.delete();
                vec![AppAction::Render]
            },
            KeyCode::Left => {
                self.input.left();
                vec![AppAction::Render]
            },
            KeyCode::Right => {
                self.input.right();
                vec![AppAction::Render]
            },
            KeyCode::Home => {
                self.input.home();
                vec![AppAction::Render]
            },
            KeyCode::End => {
                self.input.end();
                vec![AppAction::Render]
            },
            KeyCode::Up => {
                self.input.up();
                vec![AppAction::Render]
            },
            KeyCode::Down => {
                self.input.down();
                vec![AppAction::Render]
            },
            KeyCode::PageUp => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.scroll_up(SCROLL_PAGE);
                }
                vec![AppAction::Render]
            },
            KeyCode::PageDown => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.scroll_down(SCROLL_PAGE);
                }
                vec![AppAction::Render]
            },
            KeyCode::Tab => self.cycle_tab(true),
            KeyCode::BackTab => self.cycle_tab(false),
            KeyCode::Esc => {
                self.input.clear();
                vec![AppAction::Render]
            },
            _ => vec![],
        }
    }

    /// Enter: send if the script is complete, otherwise continue on a new
    /// line.
    fn submit(&mut self) -> Vec<AppAction> {
        if self.input.is_blank() {
            return vec![];
        }

        if self.input.classify() == Classification::Incomplete {
            self.input.insert_newline();
            return vec![AppAction::Render];
        }

        let text = self.input.take();
        let command = text.trim();
        self.input.push_history(command);

        let first_line = command.split('\n').next().unwrap_or_default().trim();
        if first_line.starts_with('/') && !first_line.starts_with("//") {
            return self.builtin(first_line);
        }

        self.send_command(command)
    }

    /// Echo the command, drop comment lines and hand the rest to the
    /// runtime.
    fn send_command(&mut self, command: &str) -> Vec<AppAction> {
        let Some(tab) = self.tabs.get_mut(self.active) else {
            return vec![];
        };

        let mut code = Vec::new();
        for line in command.split('\n') {
            let stripped = line.trim();
            if stripped.starts_with("//") || stripped.starts_with('#') {
                tab.add_command(line);
            } else {
                code.push(line);
            }
        }

        let script = code.join("\n").trim().to_string();
        let id = tab.id;
        let mut actions = vec![AppAction::Log { tab: id, entry: LogEntry::Command(command.to_string()) }];

        if script.is_empty() {
            actions.push(AppAction::Render);
            return actions;
        }

        tab.add_command(&script);
        if self.pending.is_none() {
            self.pending = Some(id);
        }
        actions.push(AppAction::Send { tab: id, script });
        actions.push(AppAction::Render);
        actions
    }

    fn builtin(&mut self, line: &str) -> Vec<AppAction> {
        let command = line.split_whitespace().next().unwrap_or_default().to_lowercase();

        match command.as_str() {
            "/help" => {
                if let Some(tab) = self.active_tab_mut() {
                    for line in HELP_TEXT {
                        tab.add_info(line);
                    }
                }
                vec![AppAction::Render]
            },
            "/copy" => self.copy_last_response(),
            "/copyall" => self.copy_all(),
            "/clear" => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.clear();
                }
                vec![AppAction::Render]
            },
            "/raw" => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.raw = !tab.raw;
                    let mode = if tab.raw { "on" } else { "off" };
                    tab.add_info(&format!("Raw output {mode}"));
                }
                vec![AppAction::Render]
            },
            "/quit" => vec![AppAction::Quit],
            other => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.add_error(&format!("Unknown command: {other}"));
                }
                vec![AppAction::Render]
            },
        }
    }

    /// Ctrl+C: clear typed input, else cancel a running command, else copy
    /// the last response.
    fn cancel_input(&mut self) -> Vec<AppAction> {
        if !self.input.is_blank() {
            let text = self.input.take();
            if let Some(tab) = self.active_tab_mut() {
                tab.add_command(&format!("{text}^C"));
            }
            return vec![AppAction::Render];
        }

        if let Some(tab) = self.pending {
            return vec![AppAction::Cancel { tab }, AppAction::Render];
        }

        let has_response = self.active_tab().is_some_and(|tab| tab.last_response.is_some());
        if has_response {
            return self.copy_last_response();
        }

        if let Some(tab) = self.active_tab_mut() {
            tab.add_info("^C");
        }
        vec![AppAction::Render]
    }

    fn copy_last_response(&mut self) -> Vec<AppAction> {
        let Some(tab) = self.active_tab_mut() else {
            return vec![];
        };

        match tab.last_response.clone() {
            Some(text) => vec![AppAction::Copy {
                text,
                notice: "Copied last response to clipboard".to_string(),
            }],
            None => {
                tab.add_info("No response to copy");
                vec![AppAction::Render]
            },
        }
    }

    fn copy_all(&mut self) -> Vec<AppAction> {
        let Some(tab) = self.active_tab_mut() else {
            return vec![];
        };

        if tab.lines.is_empty() {
            tab.add_info("No output to copy");
            return vec![AppAction::Render];
        }

        vec![AppAction::Copy {
            text: tab.transcript(),
            notice: "Copied all output to clipboard".to_string(),
        }]
    }

    fn handle_status(&mut self, status: SessionStatus) -> Vec<AppAction> {
        let previous = self.status.connection_state;
        let current = status.connection_state;
        self.status = status;

        if previous == current {
            return vec![AppAction::Render];
        }

        let Some(tab) = self.tabs.get_mut(self.active) else {
            return vec![AppAction::Render];
        };
        let id = tab.id;

        let notice = match current {
            ConnectionState::Connected => {
                self.ever_connected = true;
                self.announced = false;
                let message = format!("Connected to {}", self.endpoint);
                tab.add_info(&message);
                Some(message)
            },
            ConnectionState::Connecting => {
                let message = format!("Connecting to {}...", self.endpoint);
                if !self.announced {
                    self.announced = true;
                    tab.add_info(&message);
                }
                Some(message)
            },
            ConnectionState::Reconnecting if previous == ConnectionState::Connected => {
                if self.ever_connected && !self.announced {
                    self.announced = true;
                    tab.add_info("Disconnected. Reconnecting...");
                }
                Some("Disconnected".to_string())
            },
            ConnectionState::Disconnected
            | ConnectionState::Reconnecting
            | ConnectionState::Closed => None,
        };

        let mut actions = Vec::new();
        if let Some(message) = notice {
            actions.push(AppAction::Log { tab: id, entry: LogEntry::Info(message) });
        }
        actions.push(AppAction::Render);
        actions
    }

    fn handle_result(
        &mut self,
        tab: TabId,
        result: Result<String, civ7_core::SessionError>,
    ) -> Vec<AppAction> {
        // `Busy` answers a send that never reached the wire while another
        // command held the slot; that command is still running.
        let rejected_as_busy = matches!(result, Err(civ7_core::SessionError::Busy));
        if self.pending == Some(tab) && !rejected_as_busy {
            self.pending = None;
        }

        // Results for a closed tab land in the active one.
        let index = self.tab_index(tab).unwrap_or(self.active);
        let Some(target) = self.tabs.get_mut(index) else {
            return vec![];
        };

        let entry = match result {
            Ok(text) => {
                target.add_response(&text);
                LogEntry::Response(text)
            },
            Err(error) => {
                let message = error.to_string();
                target.add_error(&message);
                LogEntry::Error(message)
            },
        };

        vec![AppAction::Log { tab: target.id, entry }, AppAction::Render]
    }

    fn open_tab(&mut self) -> Vec<AppAction> {
        self.tab_counter += 1;
        let id = TabId(self.tab_counter);
        self.tabs.push(Tab::new(id, format!("Session {}", self.tab_counter)));
        self.active = self.tabs.len() - 1;

        vec![AppAction::OpenTab { tab: id, log_suffix: format!("_tab{}", self.tab_counter) }]
    }

    fn new_tab(&mut self) -> Vec<AppAction> {
        let mut actions = self.open_tab();
        if let Some(tab) = self.active_tab_mut() {
            let name = tab.name.clone();
            tab.add_info(&format!("New session created: {name}"));
            tab.add_info(HELP_HINT);
        }
        actions.push(AppAction::Render);
        actions
    }

    fn close_tab(&mut self) -> Vec<AppAction> {
        if self.tabs.len() <= 1 {
            if let Some(tab) = self.active_tab_mut() {
                tab.add_info("Cannot close last tab");
            }
            return vec![AppAction::Render];
        }

        let closed = self.tabs.remove(self.active);
        if self.active >= self.tabs.len() {
            self.active = self.tabs.len() - 1;
        }

        vec![AppAction::CloseTab { tab: closed.id }, AppAction::Render]
    }

    fn cycle_tab(&mut self, forward: bool) -> Vec<AppAction> {
        let len = self.tabs.len();
        if len <= 1 {
            return vec![];
        }

        self.active = if forward { (self.active + 1) % len } else { (self.active + len - 1) % len };
        vec![AppAction::Render]
    }

    fn tab_index(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    fn tab_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|tab| tab.id == id)
    }

    fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        self.tabs.get_mut(self.active)
    }

    /// Active tab. `None` only before [`App::start`].
    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active)
    }

    /// All tabs in display order.
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    /// Index of the active tab in [`App::tabs`].
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Input editor.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Last known session status.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Whether a command is in flight.
    pub fn is_awaiting(&self) -> bool {
        self.status.session_state == SessionState::Awaiting
    }

    /// `host:port` being talked to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }
}

#[cfg(test)]
mod tests {
    use civ7_core::{ConnectionError, SessionError};

    use super::*;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            let _ = app.handle(key(KeyCode::Char(c)));
        }
    }

    fn started_app() -> App {
        let mut app = App::new("127.0.0.1:4318".to_string());
        let _ = app.start();
        app
    }

    fn connected_app() -> App {
        let mut app = started_app();
        let _ = app.handle(AppEvent::Status(SessionStatus {
            connection_state: ConnectionState::Connected,
            session_state: SessionState::Idle,
            ..SessionStatus::initial()
        }));
        app
    }

    fn status(connection_state: ConnectionState) -> AppEvent {
        AppEvent::Status(SessionStatus { connection_state, ..SessionStatus::initial() })
    }

    fn active_lines(app: &App) -> Vec<String> {
        app.active_tab().unwrap().lines.iter().map(OutputLine::display).collect()
    }

    #[test]
    fn start_opens_first_tab_with_hint() {
        let mut app = App::new("127.0.0.1:4318".to_string());
        let actions = app.start();

        assert_eq!(actions, vec![
            AppAction::OpenTab { tab: TabId(1), log_suffix: "_tab1".to_string() },
            AppAction::Render,
        ]);
        assert_eq!(active_lines(&app), vec![format!("INFO: {HELP_HINT}")]);
    }

    #[test]
    fn enter_sends_complete_script() {
        let mut app = connected_app();
        type_text(&mut app, "Game.turn");

        let actions = app.handle(key(KeyCode::Enter));

        assert_eq!(actions, vec![
            AppAction::Log { tab: TabId(1), entry: LogEntry::Command("Game.turn".into()) },
            AppAction::Send { tab: TabId(1), script: "Game.turn".into() },
            AppAction::Render,
        ]);
        assert!(app.input().is_blank());
        assert_eq!(active_lines(&app).last().unwrap(), "> Game.turn");
    }

    #[test]
    fn enter_on_incomplete_script_continues() {
        let mut app = connected_app();
        type_text(&mut app, "foo(");

        let actions = app.handle(key(KeyCode::Enter));
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.input().lines(), ["foo(", ""]);

        type_text(&mut app, "1)");
        let actions = app.handle(key(KeyCode::Enter));
        assert!(actions.contains(&AppAction::Send { tab: TabId(1), script: "foo(\n1)".into() }));
    }

    #[test]
    fn enter_on_blank_input_does_nothing() {
        let mut app = connected_app();
        type_text(&mut app, "   ");
        assert!(app.handle(key(KeyCode::Enter)).is_empty());
    }

    #[test]
    fn comment_lines_are_echoed_not_sent() {
        let mut app = connected_app();
        type_text(&mut app, "// turn");
        let _ = app.handle(ctrl('j'));
        type_text(&mut app, "Game.turn");

        let actions = app.handle(key(KeyCode::Enter));

        assert!(actions.contains(&AppAction::Send { tab: TabId(1), script: "Game.turn".into() }));
        assert!(actions.contains(&AppAction::Log {
            tab: TabId(1),
            entry: LogEntry::Command("// turn\nGame.turn".into())
        }));
        let lines = active_lines(&app);
        assert_eq!(lines[lines.len() - 2..], ["> // turn", "> Game.turn"]);
    }

    #[test]
    fn comment_only_input_sends_nothing() {
        let mut app = connected_app();
        type_text(&mut app, "# note");

        let actions = app.handle(key(KeyCode::Enter));
        assert!(!actions.iter().any(|a| matches!(a, AppAction::Send { .. })));
        assert_eq!(active_lines(&app).last().unwrap(), "> # note");
    }

    #[test]
    fn result_is_shown_logged_and_copyable() {
        let mut app = connected_app();
        type_text(&mut app, "1+1");
        let _ = app.handle(key(KeyCode::Enter));

        let actions = app.handle(AppEvent::CommandFinished { tab: TabId(1), result: Ok("2".into()) });
        assert_eq!(actions, vec![
            AppAction::Log { tab: TabId(1), entry: LogEntry::Response("2".into()) },
            AppAction::Render,
        ]);

        let actions = app.handle(ctrl('y'));
        assert!(matches!(actions.as_slice(), [AppAction::Copy { text, .. }] if text == "2"));
    }

    #[test]
    fn errors_are_shown_and_logged() {
        let mut app = connected_app();
        let error = SessionError::ConnectionLost(ConnectionError::Reset);
        let message = error.to_string();

        let actions = app.handle(AppEvent::CommandFinished { tab: TabId(1), result: Err(error) });

        assert_eq!(actions[0], AppAction::Log { tab: TabId(1), entry: LogEntry::Error(message.clone()) });
        assert_eq!(active_lines(&app).last().unwrap(), &format!("ERROR: {message}"));
    }

    #[test]
    fn result_routes_to_sending_tab() {
        let mut app = connected_app();
        type_text(&mut app, "sleepy()");
        let _ = app.handle(key(KeyCode::Enter));

        let _ = app.handle(ctrl('t'));
        assert_eq!(app.active_tab().unwrap().id, TabId(2));

        let _ = app.handle(AppEvent::CommandFinished { tab: TabId(1), result: Ok("done".into()) });

        assert_eq!(app.tabs()[0].lines.last().unwrap().text, "done");
        assert!(app.tabs()[1].lines.iter().all(|l| l.text != "done"));
    }

    #[test]
    fn slash_commands() {
        let mut app = connected_app();

        type_text(&mut app, "/help");
        let _ = app.handle(key(KeyCode::Enter));
        assert!(active_lines(&app).contains(&"INFO: Available commands:".to_string()));

        type_text(&mut app, "/clear");
        let _ = app.handle(key(KeyCode::Enter));
        assert!(active_lines(&app).is_empty());

        type_text(&mut app, "/bogus");
        let _ = app.handle(key(KeyCode::Enter));
        assert_eq!(active_lines(&app), vec!["ERROR: Unknown command: /bogus"]);

        type_text(&mut app, "/quit");
        assert_eq!(app.handle(key(KeyCode::Enter)), vec![AppAction::Quit]);
    }

    #[test]
    fn copy_without_response_says_so() {
        let mut app = connected_app();
        type_text(&mut app, "/copy");
        let _ = app.handle(key(KeyCode::Enter));
        assert_eq!(active_lines(&app).last().unwrap(), "INFO: No response to copy");
    }

    #[test]
    fn copyall_copies_transcript() {
        let mut app = connected_app();
        type_text(&mut app, "/copyall");
        let actions = app.handle(key(KeyCode::Enter));
        assert!(matches!(
            actions.as_slice(),
            [AppAction::Copy { text, .. }] if text.starts_with("INFO: ")
        ));
    }

    #[test]
    fn ctrl_c_clears_input_first() {
        let mut app = connected_app();
        type_text(&mut app, "oops");

        let _ = app.handle(ctrl('c'));

        assert!(app.input().is_blank());
        assert_eq!(active_lines(&app).last().unwrap(), "> oops^C");
    }

    #[test]
    fn ctrl_c_cancels_pending_command() {
        let mut app = connected_app();
        type_text(&mut app, "slow()");
        let _ = app.handle(key(KeyCode::Enter));

        let actions = app.handle(ctrl('c'));
        assert_eq!(actions, vec![AppAction::Cancel { tab: TabId(1) }, AppAction::Render]);

        let _ = app.handle(AppEvent::CommandFinished {
            tab: TabId(1),
            result: Err(SessionError::Cancelled),
        });
        assert_eq!(app.handle(ctrl('c')), vec![AppAction::Render]);
    }

    #[test]
    fn busy_rejection_keeps_running_command_cancellable() {
        let mut app = connected_app();
        type_text(&mut app, "slow()");
        let _ = app.handle(key(KeyCode::Enter));
        type_text(&mut app, "other()");
        let _ = app.handle(key(KeyCode::Enter));

        let _ = app.handle(AppEvent::CommandFinished {
            tab: TabId(1),
            result: Err(SessionError::Busy),
        });

        let actions = app.handle(ctrl('c'));
        assert_eq!(actions, vec![AppAction::Cancel { tab: TabId(1) }, AppAction::Render]);

        let _ = app.handle(AppEvent::CommandFinished {
            tab: TabId(1),
            result: Err(SessionError::Cancelled),
        });
        assert_eq!(app.handle(ctrl('c')), vec![AppAction::Render]);
    }

    #[test]
    fn offline_rejection_clears_pending() {
        let mut app = connected_app();
        type_text(&mut app, "1+1");
        let _ = app.handle(key(KeyCode::Enter));

        let _ = app.handle(AppEvent::CommandFinished {
            tab: TabId(1),
            result: Err(SessionError::Offline),
        });
        assert_eq!(app.handle(ctrl('c')), vec![AppAction::Render]);
    }

    #[test]
    fn history_recall() {
        let mut app = connected_app();
        type_text(&mut app, "a()");
        let _ = app.handle(key(KeyCode::Enter));
        type_text(&mut app, "b()");
        let _ = app.handle(key(KeyCode::Enter));

        let _ = app.handle(key(KeyCode::Up));
        assert_eq!(app.input().text(), "b()");
        let _ = app.handle(key(KeyCode::Up));
        assert_eq!(app.input().text(), "a()");
        let _ = app.handle(key(KeyCode::Down));
        let _ = app.handle(key(KeyCode::Down));
        assert_eq!(app.input().text(), "");
    }

    #[test]
    fn tabs_open_cycle_and_close() {
        let mut app = connected_app();

        let actions = app.handle(ctrl('t'));
        assert_eq!(actions[0], AppAction::OpenTab { tab: TabId(2), log_suffix: "_tab2".into() });
        let _ = app.handle(ctrl('t'));
        assert_eq!(app.active_index(), 2);

        let _ = app.handle(key(KeyCode::Tab));
        assert_eq!(app.active_index(), 0);
        let _ = app.handle(key(KeyCode::BackTab));
        assert_eq!(app.active_index(), 2);

        let actions = app.handle(ctrl('w'));
        assert_eq!(actions, vec![AppAction::CloseTab { tab: TabId(3) }, AppAction::Render]);
        assert_eq!(app.active_index(), 1);

        let _ = app.handle(ctrl('w'));
        let actions = app.handle(ctrl('w'));
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.tabs().len(), 1);
        assert_eq!(active_lines(&app).last().unwrap(), "INFO: Cannot close last tab");

        // Numbers are never reused.
        let _ = app.handle(ctrl('t'));
        assert_eq!(app.active_tab().unwrap().id, TabId(4));
    }

    #[test]
    fn connection_notices_are_not_repeated() {
        let mut app = started_app();

        let _ = app.handle(status(ConnectionState::Connecting));
        let _ = app.handle(status(ConnectionState::Reconnecting));
        let _ = app.handle(status(ConnectionState::Connecting));

        let connecting: Vec<_> =
            active_lines(&app).into_iter().filter(|l| l.starts_with("INFO: Connecting")).collect();
        assert_eq!(connecting.len(), 1);

        let actions = app.handle(status(ConnectionState::Connected));
        assert_eq!(actions[0], AppAction::Log {
            tab: TabId(1),
            entry: LogEntry::Info("Connected to 127.0.0.1:4318".into())
        });

        let _ = app.handle(status(ConnectionState::Reconnecting));
        assert_eq!(active_lines(&app).last().unwrap(), "INFO: Disconnected. Reconnecting...");
    }

    #[test]
    fn ctrl_d_quits() {
        let mut app = started_app();
        assert_eq!(app.handle(ctrl('d')), vec![AppAction::Quit]);
    }
}
