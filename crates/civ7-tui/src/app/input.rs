//! Multi-line input editor.
//!
//! Owns the text being typed, the cursor and the command history. Text is
//! stored in an [`InputAnalyzer`] so Enter can ask whether the script is
//! complete before sending it.

use civ7_core::{Classification, InputAnalyzer};

/// Lines the editor grows to before refusing more newlines.
pub const MAX_INPUT_LINES: usize = 5;

/// Input editor state.
///
/// The buffer always holds at least one line. The cursor column counts
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct InputState {
    buffer: InputAnalyzer,
    row: usize,
    col: usize,
    /// Submitted commands, oldest first
    history: Vec<String>,
    /// Position while browsing history. `None` when editing fresh input.
    history_index: Option<usize>,
    /// Fresh input saved when history browsing started
    draft: String,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    /// Empty editor.
    pub fn new() -> Self {
        let mut buffer = InputAnalyzer::new();
        buffer.push_line("");
        Self {
            buffer,
            row: 0,
            col: 0,
            history: Vec::new(),
            history_index: None,
            draft: String::new(),
        }
    }

    /// Full text, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    /// Lines being edited.
    pub fn lines(&self) -> &[String] {
        self.buffer.lines()
    }

    /// Cursor as (row, column in chars).
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Whether the editor holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.lines().iter().all(|line| line.trim().is_empty())
    }

    /// Whether Enter should send rather than continue.
    pub fn classify(&self) -> Classification {
        self.buffer.classify()
    }

    /// Submitted commands, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let col = self.col;
        let line = self.current_line_mut();
        let at = byte_offset(line, col);
        line.insert(at, c);
        self.col += 1;
    }

    /// Split the current line at the cursor. `false` at the line limit.
    pub fn insert_newline(&mut self) -> bool {
        if self.buffer.line_count() >= MAX_INPUT_LINES {
            return false;
        }

        let col = self.col;
        let line = self.current_line_mut();
        let at = byte_offset(line, col);
        let tail = line.split_off(at);

        self.row += 1;
        self.col = 0;
        self.buffer.lines_mut().insert(self.row, tail);
        true
    }

    /// Delete the character before the cursor, joining lines at column 0.
    pub fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let col = self.col;
            let line = self.current_line_mut();
            let at = byte_offset(line, col);
            line.remove(at);
        } else if self.row > 0 {
            let line = self.buffer.lines_mut().remove(self.row);
            self.row -= 1;
            self.col = char_len(&self.lines()[self.row]);
            self.current_line_mut().push_str(&line);
        }
    }

    /// Delete the character under the cursor, joining lines at line end.
    pub fn delete(&mut self) {
        let col = self.col;
        let row = self.row;
        let line_len = char_len(self.current_line());

        if col < line_len {
            let line = self.current_line_mut();
            let at = byte_offset(line, col);
            line.remove(at);
        } else if row + 1 < self.buffer.line_count() {
            let next = self.buffer.lines_mut().remove(row + 1);
            self.current_line_mut().push_str(&next);
        }
    }

    /// Move left, wrapping to the end of the previous line.
    pub fn left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(self.current_line());
        }
    }

    /// Move right, wrapping to the start of the next line.
    pub fn right(&mut self) {
        if self.col < char_len(self.current_line()) {
            self.col += 1;
        } else if self.row + 1 < self.buffer.line_count() {
            self.row += 1;
            self.col = 0;
        }
    }

    /// Start of the current line.
    pub fn home(&mut self) {
        self.col = 0;
    }

    /// End of the current line.
    pub fn end(&mut self) {
        self.col = char_len(self.current_line());
    }

    /// Up arrow: move the cursor up, or step back through history from the
    /// first line.
    pub fn up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(char_len(self.current_line()));
            return;
        }

        if self.history.is_empty() {
            return;
        }

        let index = match self.history_index {
            None => {
                self.draft = self.text();
                self.history.len() - 1
            },
            Some(i) => i.saturating_sub(1),
        };
        self.history_index = Some(index);
        let entry = self.history[index].clone();
        self.load(&entry);
    }

    /// Down arrow: move the cursor down, or step forward through history
    /// from the last line. Stepping past the newest entry restores the
    /// draft.
    pub fn down(&mut self) {
        if self.row + 1 < self.buffer.line_count() {
            self.row += 1;
            self.col = self.col.min(char_len(self.current_line()));
            return;
        }

        let Some(index) = self.history_index else {
            return;
        };

        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            let entry = self.history[index + 1].clone();
            self.load(&entry);
        } else {
            self.history_index = None;
            let draft = std::mem::take(&mut self.draft);
            self.load(&draft);
        }
    }

    /// Record a submitted command. Blank text and repeats of the newest
    /// entry are skipped. Resets history browsing.
    pub fn push_history(&mut self, command: &str) {
        if !command.trim().is_empty() && self.history.last().is_none_or(|last| last != command) {
            self.history.push(command.to_string());
        }
        self.history_index = None;
        self.draft.clear();
    }

    /// Take the text and reset the editor. History is kept.
    pub fn take(&mut self) -> String {
        let text = self.buffer.take();
        self.clear();
        text
    }

    /// Empty the editor. History is kept; browsing is reset.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer.push_line("");
        self.row = 0;
        self.col = 0;
        self.history_index = None;
        self.draft.clear();
    }

    /// Replace the text, cursor at the end.
    fn load(&mut self, text: &str) {
        self.buffer.set_text(text);
        self.row = self.buffer.line_count().saturating_sub(1);
        self.col = char_len(self.current_line());
    }

    fn current_line(&self) -> &str {
        self.lines().get(self.row).map_or("", String::as_str)
    }

    fn current_line_mut(&mut self) -> &mut String {
        let lines = self.buffer.lines_mut();
        if lines.is_empty() {
            lines.push(String::new());
        }
        let last = lines.len() - 1;
        let row = self.row.min(last);
        &mut lines[row]
    }
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Byte index of the `col`-th character, clamped to the end.
fn byte_offset(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map_or(line.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputState {
        let mut input = InputState::new();
        for c in text.chars() {
            if c == '\n' {
                assert!(input.insert_newline());
            } else {
                input.insert_char(c);
            }
        }
        input
    }

    #[test]
    fn typing_and_cursor() {
        let input = typed("héllo");
        assert_eq!(input.text(), "héllo");
        assert_eq!(input.cursor(), (0, 5));
    }

    #[test]
    fn insert_in_middle_of_multibyte_line() {
        let mut input = typed("añb");
        input.left();
        input.insert_char('x');
        assert_eq!(input.text(), "añxb");
    }

    #[test]
    fn newline_splits_at_cursor() {
        let mut input = typed("foo(bar)");
        input.left();
        input.left();
        input.left();
        input.left();
        assert!(input.insert_newline());
        assert_eq!(input.lines(), ["foo(", "bar)"]);
        assert_eq!(input.cursor(), (1, 0));
    }

    #[test]
    fn newline_limit() {
        let mut input = typed("1\n2\n3\n4\n5");
        assert_eq!(input.lines().len(), MAX_INPUT_LINES);
        assert!(!input.insert_newline());
        assert_eq!(input.lines().len(), MAX_INPUT_LINES);
    }

    #[test]
    fn backspace_joins_lines() {
        let mut input = typed("ab\ncd");
        input.home();
        input.backspace();
        assert_eq!(input.lines(), ["abcd"]);
        assert_eq!(input.cursor(), (0, 2));
    }

    #[test]
    fn delete_joins_next_line() {
        let mut input = typed("ab\ncd");
        input.up();
        input.end();
        input.delete();
        assert_eq!(input.lines(), ["abcd"]);
    }

    #[test]
    fn backspace_at_origin_is_noop() {
        let mut input = InputState::new();
        input.backspace();
        input.delete();
        assert_eq!(input.text(), "");
        assert_eq!(input.cursor(), (0, 0));
    }

    #[test]
    fn classify_follows_buffer() {
        let mut input = typed("foo(");
        assert_eq!(input.classify(), Classification::Incomplete);
        input.insert_char(')');
        assert_eq!(input.classify(), Classification::Complete);
    }

    #[test]
    fn history_browsing_restores_draft() {
        let mut input = InputState::new();
        input.push_history("first");
        input.push_history("second");

        input.insert_char('d');
        input.up();
        assert_eq!(input.text(), "second");
        input.up();
        assert_eq!(input.text(), "first");
        input.up();
        assert_eq!(input.text(), "first");

        input.down();
        assert_eq!(input.text(), "second");
        input.down();
        assert_eq!(input.text(), "d");
    }

    #[test]
    fn history_skips_blank_and_repeats() {
        let mut input = InputState::new();
        input.push_history("a");
        input.push_history("a");
        input.push_history("  ");
        input.push_history("b");
        assert_eq!(input.history(), ["a", "b"]);
    }

    #[test]
    fn up_moves_cursor_before_history() {
        let mut input = typed("ab\nc");
        input.push_history("old");

        input.up();
        assert_eq!(input.cursor(), (0, 1));
        assert_eq!(input.text(), "ab\nc");

        input.up();
        assert_eq!(input.text(), "old");
    }

    #[test]
    fn take_resets_but_keeps_history() {
        let mut input = typed("x = 1");
        input.push_history("x = 1");
        assert_eq!(input.take(), "x = 1");
        assert!(input.is_blank());
        assert_eq!(input.lines(), [""]);
        assert_eq!(input.history(), ["x = 1"]);
    }
}
