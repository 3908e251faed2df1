//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! The scanner, parser and resolver accumulate [`Diagnostic`]s; the
//! interpreter fails fast with a single [`RuntimeError`]. Both are folded into
//! [`LoxError`] at the pipeline boundary so callers get one `Result<T>` alias.
//!
//! The module **does not** print diagnostics itself; it only renders them to
//! strings via `Display`.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;
use unicode_width::UnicodeWidthChar;

use crate::token::{display_width, Position, Range};

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// A message attached to a range of source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub range: Range,
}

impl Diagnostic {
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    pub fn start(&self) -> &Position {
        &self.range.start
    }
}

/// Underline `line[start..end]` with tildes, padding by the display width of
/// the prefix. Tabs in the prefix are kept so the underline lines up.
fn highlight(out: &mut String, line: &str, start: usize, end: usize) {
    let start: usize = start.min(line.len());
    let end: usize = end.clamp(start, line.len());

    match line.get(..start) {
        Some(prefix) => {
            for c in prefix.chars() {
                if c == '\t' {
                    out.push('\t');
                } else {
                    out.push_str(&" ".repeat(c.width().unwrap_or(1)));
                }
            }
        }
        None => out.push_str(&" ".repeat(start)),
    }

    let width: usize = line.get(start..end).map_or(end - start, display_width);

    out.push_str(&"~".repeat(width));
    out.push('\n');
}

impl fmt::Display for Diagnostic {
    /// ```text
    /// test.lox:2:7: error: unterminated string literal
    /// print "bar;
    ///       ~~~~~
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Range { start, end } = &self.range;
        let file = &start.file;

        let mut out: String = format!("{}: error: {}\n", start, self.message);

        out.push_str(file.line(start.line));
        out.push('\n');

        if start != end {
            if start.line == end.line {
                highlight(&mut out, file.line(start.line), start.column, end.column);
            } else {
                let first: &str = file.line(start.line);
                highlight(&mut out, first, start.column, first.len());

                for n in start.line + 1..end.line {
                    let line: &str = file.line(n);
                    out.push_str(line);
                    out.push('\n');
                    highlight(&mut out, line, 0, line.len());
                }

                let last: &str = file.line(end.line);
                if !last.is_empty() {
                    out.push_str(last);
                    out.push('\n');
                    highlight(&mut out, last, 0, end.column);
                }
            }
        }

        f.write_str(out.trim_end_matches('\n'))
    }
}

/// An ordered batch of diagnostics from one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add(&mut self, range: Range, message: impl Into<String>) {
        self.push(Diagnostic::new(range, message));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.0.last()
    }

    /// Stable sort by start position.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.start().cmp(b.start()));
    }

    /// Messages in order, handy for assertions.
    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.message.as_str()).collect()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    /// Diagnostics are always shown sorted by position.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&Diagnostic> = self.0.iter().collect();
        sorted.sort_by(|a, b| a.start().cmp(b.start()));

        for (i, diagnostic) in sorted.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────────

/// One line of a stack trace: where execution was and which function it was
/// in (empty at top level).
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub function: String,
    pub location: Position,
}

/// A runtime failure with the call stack captured when it was raised.
/// `trace` is ordered most recent call first.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub diagnostic: Diagnostic,
    pub trace: Vec<StackFrame>,
}

impl RuntimeError {
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::new(range, message),
            trace: Vec::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.diagnostic.message
    }

    pub fn range(&self) -> &Range {
        &self.diagnostic.range
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostic)?;

        if self.trace.is_empty() {
            return Ok(());
        }

        write!(f, "\nStack Trace (most recent call first):")?;

        let locations: Vec<String> = self.trace.iter().map(|fr| fr.location.to_string()).collect();
        let functions: Vec<String> = self
            .trace
            .iter()
            .map(|fr| {
                if fr.function.is_empty() {
                    String::new()
                } else {
                    format!("in {}", fr.function)
                }
            })
            .collect();

        let loc_width: usize = locations.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let fn_width: usize = functions.iter().map(|l| l.chars().count()).max().unwrap_or(0);

        for ((frame, location), function) in self.trace.iter().zip(&locations).zip(&functions) {
            let source: &str = frame.location.file.line(frame.location.line).trim_start();
            write!(
                f,
                "\n  {:<lw$} {:<fw$} {}",
                location,
                function,
                source,
                lw = loc_width,
                fw = fn_width
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline errors
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical or syntactic errors; the program was never run.
    #[error("{0}")]
    Syntax(Diagnostics),

    /// Resolution and semantic check failures; the program was never run.
    #[error("{0}")]
    Semantic(Diagnostics),

    /// Runtime evaluation error.
    #[error("{0}")]
    Runtime(RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner** and **parser**.
    pub fn syntax(diagnostics: Diagnostics) -> Self {
        info!("Creating Syntax error: {} diagnostic(s)", diagnostics.len());

        LoxError::Syntax(diagnostics)
    }

    /// Helper constructor for the **resolver**.
    pub fn semantic(diagnostics: Diagnostics) -> Self {
        info!("Creating Semantic error: {} diagnostic(s)", diagnostics.len());

        LoxError::Semantic(diagnostics)
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime(error: RuntimeError) -> Self {
        info!("Creating Runtime error: {}", error.message());

        LoxError::Runtime(error)
    }

    /// Process exit code conventionally used for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Syntax(_) | LoxError::Semantic(_) => 65,
            LoxError::Runtime(_) => 70,
            LoxError::Io(_) | LoxError::Utf8(_) => 74,
        }
    }
}

impl From<RuntimeError> for LoxError {
    fn from(error: RuntimeError) -> Self {
        LoxError::runtime(error)
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
