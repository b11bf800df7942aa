//! Statement splitting for MySQL-flavored scripts.
//!
//! Scripts are scanned line by line. The scanner understands:
//! - `#` and `--` line comments (at column 0 only)
//! - `/* ... */` block comments, inline or spanning lines
//! - `DELIMITER <token>` directives
//! - single-quoted literals, tracked by a plain quote toggle
//!
//! Known limitation: the quote toggle ignores escapes, so `\'` and `''`
//! inside a literal flip the parity like any other quote.

mod lines;


pub use lines::{extract_delimiter, is_delimiter_directive, is_ignorable_line, strip_inline_comments};

use tracing::{debug, warn};

use lines::{BLOCK_CLOSE, BLOCK_OPEN};

/// Delimiter in effect at the start of every script.
pub const DEFAULT_DELIMITER: &str = ";";

/// Whether the scanner is inside a multi-line block comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    #[default]
    Normal,
    InBlockComment,
}

/// Parity of single quotes seen in the pending statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteParity {
    #[default]
    Even,
    Odd,
}

impl QuoteParity {
    fn toggle(self) -> Self {
        match self {
            QuoteParity::Even => QuoteParity::Odd,
            QuoteParity::Odd => QuoteParity::Even,
        }
    }
}

/// One executable statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text, with any custom delimiter removed.
    pub sql: String,
    /// 1-based line where the statement starts.
    pub line: usize,
}

/// Stateful scanner for one script.
#[derive(Debug, Clone)]
pub struct StatementSplitter {
    delimiter: String,
    mode: ScanMode,
    quotes: QuoteParity,
    pending: String,
    pending_line: usize,
    line_no: usize,
}

impl Default for StatementSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementSplitter {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            mode: ScanMode::Normal,
            quotes: QuoteParity::Even,
            pending: String::new(),
            pending_line: 0,
            line_no: 0,
        }
    }

    /// The delimiter currently in effect.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn quotes(&self) -> QuoteParity {
        self.quotes
    }

    /// Feed the next line (without its terminator). Returns a statement when
    /// this line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<Statement> {
        self.line_no += 1;

        let stripped = strip_inline_comments(line);

        if is_ignorable_line(line) {
            return None;
        }

        if stripped.contains(BLOCK_OPEN) {
            self.mode = ScanMode::InBlockComment;
            return None;
        }

        if self.mode == ScanMode::InBlockComment {
            if stripped.contains(BLOCK_CLOSE) {
                self.mode = ScanMode::Normal;
            }
            return None;
        }

        if is_delimiter_directive(&stripped) {
            match extract_delimiter(&stripped) {
                Some(token) => {
                    debug!(line = self.line_no, delimiter = token, "delimiter changed");
                    self.delimiter = token.to_string();
                }
                None => warn!(line = self.line_no, "DELIMITER directive without a token ignored"),
            }
            return None;
        }

        if self.pending.trim().is_empty() {
            self.pending_line = self.line_no;
        }
        self.pending.push_str(&stripped);
        self.pending.push('\n');

        for c in stripped.chars() {
            if c == '\'' {
                self.quotes = self.quotes.toggle();
            }
        }

        if self.quotes == QuoteParity::Even && stripped.trim_end().ends_with(self.delimiter.as_str()) {
            return self.take_statement();
        }

        None
    }

    /// Close the current statement. Bodies that are empty or only a
    /// delimiter are dropped.
    fn take_statement(&mut self) -> Option<Statement> {
        let mut sql = std::mem::take(&mut self.pending);
        self.quotes = QuoteParity::Even;

        if self.delimiter != DEFAULT_DELIMITER {
            sql = sql.replace(self.delimiter.as_str(), "");
        }

        let sql = sql.trim();
        if sql.trim_end_matches(DEFAULT_DELIMITER).trim().is_empty() {
            return None;
        }

        Some(Statement {
            sql: sql.to_string(),
            line: self.pending_line,
        })
    }

    /// End of script. Returns text that never reached a delimiter; callers
    /// must not execute it.
    pub fn finish(self) -> Option<Statement> {
        let sql = self.pending.trim();
        if sql.is_empty() {
            return None;
        }
        Some(Statement {
            sql: sql.to_string(),
            line: self.pending_line,
        })
    }
}

/// Lazy statement stream over a whole script.
pub struct Statements<'a> {
    lines: std::str::Lines<'a>,
    splitter: StatementSplitter,
}

impl Statements<'_> {
    /// Unterminated trailing text, once the stream is exhausted.
    pub fn into_remainder(self) -> Option<Statement> {
        self.splitter.finish()
    }
}

impl Iterator for Statements<'_> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        loop {
            let line = self.lines.next()?;
            if let Some(statement) = self.splitter.push_line(line) {
                return Some(statement);
            }
        }
    }
}

/// Split a script into statements, in order.
pub fn split(script: &str) -> Statements<'_> {
    let script = script.strip_prefix('\u{feff}').unwrap_or(script);
    Statements {
        lines: script.lines(),
        splitter: StatementSplitter::new(),
    }
}
