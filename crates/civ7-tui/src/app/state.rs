//! Tab state
//!
//! Output buffers and per-tab bookkeeping used by the App state machine.

use std::fmt;

/// Tab identifier. Stable for the life of the tab; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab{}", self.0)
    }
}

/// What an output line shows. Decides prefix and colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// First line of a submitted command (`> `)
    Command,
    /// Further lines of a command (`  `)
    Continuation,
    /// Result text
    Response,
    /// Failure (`ERROR: `)
    Error,
    /// Notice (`INFO: `)
    Info,
}

/// One rendered output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Kind of line
    pub kind: LineKind,
    /// Text without prefix
    pub text: String,
}

impl OutputLine {
    /// Line as displayed, prefix included.
    pub fn display(&self) -> String {
        match self.kind {
            LineKind::Command => format!("> {}", self.text),
            LineKind::Continuation => format!("  {}", self.text),
            LineKind::Response => self.text.clone(),
            LineKind::Error => format!("ERROR: {}", self.text),
            LineKind::Info => format!("INFO: {}", self.text),
        }
    }
}

/// Per-tab state.
#[derive(Debug, Clone)]
pub struct Tab {
    /// Tab ID
    pub id: TabId,
    /// Title shown in the tab bar
    pub name: String,
    /// Output, oldest first
    pub lines: Vec<OutputLine>,
    /// Most recent successful result, for `/copy`
    pub last_response: Option<String>,
    /// Lines scrolled up from the bottom
    pub scroll: usize,
    /// Show results without JSON pretty-printing
    pub raw: bool,
}

impl Tab {
    /// Create an empty tab.
    pub fn new(id: TabId, name: String) -> Self {
        Self { id, name, lines: Vec::new(), last_response: None, scroll: 0, raw: false }
    }

    /// Echo a command, one line per source line.
    pub fn add_command(&mut self, command: &str) {
        for (i, line) in command.split('\n').enumerate() {
            let kind = if i == 0 { LineKind::Command } else { LineKind::Continuation };
            self.push(kind, line);
        }
    }

    /// Show a result and remember it for `/copy`.
    pub fn add_response(&mut self, response: &str) {
        let shown = if self.raw { response.to_string() } else { format_response(response) };
        for line in shown.split('\n') {
            self.push(LineKind::Response, line);
        }
        self.last_response = Some(response.to_string());
    }

    /// Show an error.
    pub fn add_error(&mut self, error: &str) {
        self.push(LineKind::Error, error);
    }

    /// Show a notice.
    pub fn add_info(&mut self, info: &str) {
        self.push(LineKind::Info, info);
    }

    /// Drop all output.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll = 0;
    }

    /// All output as text, for `/copyall`.
    pub fn transcript(&self) -> String {
        self.lines.iter().map(OutputLine::display).collect::<Vec<_>>().join("\n")
    }

    /// Scroll up, clamped to the oldest line.
    pub fn scroll_up(&mut self, by: usize) {
        self.scroll = self.scroll.saturating_add(by).min(self.lines.len().saturating_sub(1));
    }

    /// Scroll down towards the newest line.
    pub fn scroll_down(&mut self, by: usize) {
        self.scroll = self.scroll.saturating_sub(by);
    }

    fn push(&mut self, kind: LineKind, text: &str) {
        self.lines.push(OutputLine { kind, text: text.to_string() });
        self.scroll = 0;
    }
}

/// Pretty-print JSON results; anything else passes through.
pub fn format_response(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.starts_with(['{', '[']) {
        return response.to_string();
    }

    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| response.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lines_get_prefixes() {
        let mut tab = Tab::new(TabId(1), "Session 1".into());
        tab.add_command("if (a) {\n  b();\n}");
        assert_eq!(tab.transcript(), "> if (a) {\n    b();\n  }");
    }

    #[test]
    fn json_responses_are_pretty_printed() {
        assert_eq!(format_response(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(format_response("[1,2]"), "[\n  1,\n  2\n]");
        assert_eq!(format_response("{not json"), "{not json");
        assert_eq!(format_response("42"), "42");
    }

    #[test]
    fn raw_mode_keeps_text() {
        let mut tab = Tab::new(TabId(1), "Session 1".into());
        tab.raw = true;
        tab.add_response(r#"{"a":1}"#);
        assert_eq!(tab.lines.len(), 1);
        assert_eq!(tab.last_response.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn new_output_resets_scroll() {
        let mut tab = Tab::new(TabId(1), "Session 1".into());
        for i in 0..10 {
            tab.add_info(&i.to_string());
        }
        tab.scroll_up(100);
        assert_eq!(tab.scroll, 9);
        tab.scroll_down(3);
        assert_eq!(tab.scroll, 6);
        tab.add_error("x");
        assert_eq!(tab.scroll, 0);
    }
}
