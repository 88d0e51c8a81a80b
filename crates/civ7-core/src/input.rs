//! Input completeness analysis.
//!
//! Decides whether typed script text is ready to send or whether Enter
//! should start a continuation line. This is a lexical scan, not a parser:
//! it tracks brackets, string and template state, escapes and comments, and
//! looks at the last significant character. Regex literals are not
//! recognised; a `/` outside a comment counts as an operator.
//!
//! Every classification re-scans the whole buffer, so edits anywhere in the
//! text (including backspace across a line break) are reflected immediately.

use std::{iter::Peekable, str::Chars};

/// Verdict for a piece of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Ready to send
    Complete,
    /// Needs more input
    Incomplete,
}

/// Kind of string literal left open at the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `` `...` ``, possibly inside an open `${ }`
    Template,
}

impl StringKind {
    fn delimiter(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
            Self::Template => '`',
        }
    }
}

/// Lexical state at the end of the input.
///
/// Depths are signed: an unmatched closer drives them negative, which is
/// treated as complete (the remote reports the syntax error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Analysis {
    /// Unmatched `(`
    pub paren_depth: i64,
    /// Unmatched `[`
    pub bracket_depth: i64,
    /// Unmatched `{`, excluding `${ }` delimiters
    pub brace_depth: i64,
    /// String literal still open, if any
    pub open_string: Option<StringKind>,
    /// Open `${ }` substitutions
    pub substitution_depth: usize,
    /// Inside an unterminated `/* */`
    pub in_block_comment: bool,
    /// Last significant character is a binary operator or comma
    pub trailing_operator: bool,
}

impl Analysis {
    /// Collapse the state into a verdict.
    pub fn classification(&self) -> Classification {
        let open = self.paren_depth > 0
            || self.bracket_depth > 0
            || self.brace_depth > 0
            || self.open_string.is_some()
            || self.substitution_depth > 0
            || self.in_block_comment
            || self.trailing_operator;

        if open { Classification::Incomplete } else { Classification::Complete }
    }
}

/// Scan `text` from scratch and report its lexical state.
pub fn analyze(text: &str) -> Analysis {
    let mut scanner = Scanner::default();
    scanner.run(text);
    scanner.finish()
}

/// Classify `text` as ready to send or not.
///
/// Empty and whitespace-only input is `Complete`; the caller decides what to
/// do with it.
pub fn classify(text: &str) -> Classification {
    analyze(text).classification()
}

/// Multi-line input buffer with completeness checks.
///
/// Holds the lines typed so far. No lexical state survives between calls;
/// [`InputAnalyzer::classify`] always re-scans the joined text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputAnalyzer {
    lines: Vec<String>,
}

impl InputAnalyzer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Remove and return the last line.
    pub fn pop_line(&mut self) -> Option<String> {
        self.lines.pop()
    }

    /// Replace the whole buffer, splitting on `\n`.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
    }

    /// Lines in the buffer.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines for in-place editing.
    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    /// Number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the buffer holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Lexical state of the whole buffer.
    pub fn analyze(&self) -> Analysis {
        analyze(&self.text())
    }

    /// Verdict for the whole buffer.
    pub fn classify(&self) -> Classification {
        self.analyze().classification()
    }

    /// Take the buffered text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.lines.clear();
        text
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comment {
    Line,
    Block,
}

/// Template nesting. The top of the stack decides how characters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Literal text of a template
    Template,
    /// Code inside `${ }`; counts `{` opened within it
    Substitution(usize),
}

#[derive(Debug, Default)]
struct Scanner {
    paren: i64,
    bracket: i64,
    brace: i64,
    contexts: Vec<Context>,
    quote: Option<StringKind>,
    comment: Option<Comment>,
    escape: bool,
    last: Option<char>,
    /// Character immediately before `last`, or `None` if whitespace separated
    /// them
    before_last: Option<char>,
    /// Previous code character, reset by whitespace
    adjacent: Option<char>,
}

impl Scanner {
    fn run(&mut self, text: &str) {
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(comment) = self.comment {
                self.comment_char(comment, c, &mut chars);
            } else if let Some(quote) = self.quote {
                self.quoted_char(quote, c);
            } else if self.contexts.last() == Some(&Context::Template) {
                self.template_char(c, &mut chars);
            } else {
                self.code_char(c, &mut chars);
            }
        }
    }

    fn comment_char(&mut self, comment: Comment, c: char, chars: &mut Peekable<Chars<'_>>) {
        match comment {
            Comment::Line if c == '\n' => self.comment = None,
            Comment::Block if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                self.comment = None;
            },
            _ => {},
        }
        self.adjacent = None;
    }

    fn quoted_char(&mut self, quote: StringKind, c: char) {
        if self.escape {
            self.escape = false;
        } else if c == '\\' {
            self.escape = true;
        } else if c == quote.delimiter() {
            self.quote = None;
            self.mark(c);
        }
    }

    fn template_char(&mut self, c: char, chars: &mut Peekable<Chars<'_>>) {
        if self.escape {
            self.escape = false;
        } else if c == '\\' {
            self.escape = true;
        } else if c == '`' {
            self.contexts.pop();
            self.mark(c);
        } else if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            self.contexts.push(Context::Substitution(0));
            self.adjacent = None;
        }
    }

    fn code_char(&mut self, c: char, chars: &mut Peekable<Chars<'_>>) {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                chars.next();
                self.comment = Some(Comment::Line);
                return;
            },
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                self.comment = Some(Comment::Block);
                return;
            },
            '\'' => self.quote = Some(StringKind::Single),
            '"' => self.quote = Some(StringKind::Double),
            '`' => self.contexts.push(Context::Template),
            '(' => self.paren += 1,
            ')' => self.paren -= 1,
            '[' => self.bracket += 1,
            ']' => self.bracket -= 1,
            '{' => {
                self.brace += 1;
                if let Some(Context::Substitution(open)) = self.contexts.last_mut() {
                    *open += 1;
                }
            },
            '}' => match self.contexts.last_mut() {
                Some(Context::Substitution(0)) => {
                    // Closes `${`; back to template text.
                    self.contexts.pop();
                    self.adjacent = None;
                    return;
                },
                Some(Context::Substitution(open)) => {
                    *open -= 1;
                    self.brace -= 1;
                },
                _ => self.brace -= 1,
            },
            c if c.is_whitespace() => {
                self.adjacent = None;
                return;
            },
            _ => {},
        }

        self.mark(c);
    }

    fn mark(&mut self, c: char) {
        self.before_last = self.adjacent;
        self.last = Some(c);
        self.adjacent = Some(c);
    }

    fn trailing_operator(&self) -> bool {
        let Some(last) = self.last else {
            return false;
        };

        match last {
            // `i++` and `i--` end a statement.
            '+' | '-' => self.before_last != Some(last),
            '*' | '/' | '%' | '=' | '<' | '>' | '&' | '|' | '^' | '!' | '~' | '?' | ':' | ','
            | '.' => true,
            _ => false,
        }
    }

    fn finish(self) -> Analysis {
        let open_string = self.quote.or_else(|| {
            self.contexts.iter().any(|ctx| *ctx == Context::Template).then_some(StringKind::Template)
        });
        let substitution_depth =
            self.contexts.iter().filter(|ctx| matches!(ctx, Context::Substitution(_))).count();

        Analysis {
            paren_depth: self.paren,
            bracket_depth: self.bracket,
            brace_depth: self.brace,
            open_string,
            substitution_depth,
            in_block_comment: self.comment == Some(Comment::Block),
            trailing_operator: self.trailing_operator(),
        }
    }
}
