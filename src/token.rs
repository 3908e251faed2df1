//! Tokens and source positions.
//!
//! A [`Token`] owns its lexeme and carries a start and end [`Position`]. Every
//! position points back into a shared [`SourceFile`] so diagnostics can print
//! the offending line without the caller keeping the source around.

use bytes::Bytes;
use log::{debug, info};
use memchr::memchr_iter;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::rc::Rc;
use unicode_width::UnicodeWidthChar;

/// The different kinds of tokens recognized by the Lox scanner.
///
/// Variants without data represent single‑character or keyword tokens.
/// `STRING(String)` and `NUMBER(f64)` carry their literal values.
/// `ILLEGAL` stands in for input the scanner could not make sense of.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '%'
    PERCENT,

    /// '?'
    QUESTION,

    /// ':'
    COLON,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes)
    STRING(String),

    /// A numeric literal
    #[serde(rename = "NUMBER")]
    NUMBER(f64),

    /// 'and'
    AND,

    /// 'break'
    BREAK,

    /// 'class'
    CLASS,

    /// 'continue'
    CONTINUE,

    /// 'else'
    ELSE,

    /// 'false'
    FALSE,

    /// 'fun'
    FUN,

    /// 'for'
    FOR,

    /// 'get'
    GET,

    /// 'if'
    IF,

    /// 'nil'
    NIL,

    /// 'or'
    OR,

    /// 'print'
    PRINT,

    /// 'return'
    RETURN,

    /// 'set'
    SET,

    /// 'static'
    STATIC,

    /// 'super'
    SUPER,

    /// 'this'
    THIS,

    /// 'true'
    TRUE,

    /// 'var'
    VAR,

    /// 'while'
    WHILE,

    /// Unlexable input; the scanner has already reported it.
    ILLEGAL,

    /// End‑of‑file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenType {
    /// The source spelling of fixed tokens, used in diagnostics such as
    /// `expected ';'`.
    pub fn symbol(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "(",
            TokenType::RIGHT_PAREN => ")",
            TokenType::LEFT_BRACE => "{",
            TokenType::RIGHT_BRACE => "}",
            TokenType::LEFT_BRACKET => "[",
            TokenType::RIGHT_BRACKET => "]",
            TokenType::COMMA => ",",
            TokenType::DOT => ".",
            TokenType::MINUS => "-",
            TokenType::PLUS => "+",
            TokenType::SEMICOLON => ";",
            TokenType::SLASH => "/",
            TokenType::STAR => "*",
            TokenType::PERCENT => "%",
            TokenType::QUESTION => "?",
            TokenType::COLON => ":",
            TokenType::BANG => "!",
            TokenType::BANG_EQUAL => "!=",
            TokenType::EQUAL => "=",
            TokenType::EQUAL_EQUAL => "==",
            TokenType::GREATER => ">",
            TokenType::GREATER_EQUAL => ">=",
            TokenType::LESS => "<",
            TokenType::LESS_EQUAL => "<=",
            TokenType::IDENTIFIER => "identifier",
            TokenType::STRING(_) => "string",
            TokenType::NUMBER(_) => "number",
            TokenType::AND => "and",
            TokenType::BREAK => "break",
            TokenType::CLASS => "class",
            TokenType::CONTINUE => "continue",
            TokenType::ELSE => "else",
            TokenType::FALSE => "false",
            TokenType::FUN => "fun",
            TokenType::FOR => "for",
            TokenType::GET => "get",
            TokenType::IF => "if",
            TokenType::NIL => "nil",
            TokenType::OR => "or",
            TokenType::PRINT => "print",
            TokenType::RETURN => "return",
            TokenType::SET => "set",
            TokenType::STATIC => "static",
            TokenType::SUPER => "super",
            TokenType::THIS => "this",
            TokenType::TRUE => "true",
            TokenType::VAR => "var",
            TokenType::WHILE => "while",
            TokenType::ILLEGAL => "illegal",
            TokenType::EOF => "EOF",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Source files and positions
// ─────────────────────────────────────────────────────────────────────────────

/// A named, immutable chunk of Lox source.
#[derive(Debug)]
pub struct SourceFile {
    /// Display name; empty for REPL lines and `-c` snippets.
    pub name: String,

    /// Raw UTF‑8 contents.
    pub contents: Bytes,

    /// Byte offset of the first character of every line.
    line_offsets: Vec<usize>,
}

impl SourceFile {
    /// Wrap `contents` and index its line starts.
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Rc<Self> {
        let name: String = name.into();
        let contents: Bytes = contents.into();

        let mut line_offsets: Vec<usize> = vec![0];
        line_offsets.extend(memchr_iter(b'\n', &contents).map(|i| i + 1));

        info!(
            "Source file '{}' loaded: {} bytes, {} lines",
            name,
            contents.len(),
            line_offsets.len()
        );

        Rc::new(Self {
            name,
            contents,
            line_offsets,
        })
    }

    /// The `n`th (1‑based) line without its trailing newline.
    pub fn line(&self, n: usize) -> &str {
        let Some(&start) = self.line_offsets.get(n.wrapping_sub(1)) else {
            return "";
        };

        let end: usize = self
            .line_offsets
            .get(n)
            .map(|next| next - 1)
            .unwrap_or(self.contents.len());

        let line: &str = std::str::from_utf8(&self.contents[start..end]).unwrap_or("");

        line.strip_suffix('\r').unwrap_or(line)
    }

    /// The whole file as text. Invalid UTF‑8 yields an empty string.
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.contents).unwrap_or("")
    }
}

/// A location in a [`SourceFile`].
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    #[serde(skip)]
    pub file: Rc<SourceFile>,

    /// 1‑based line number.
    pub line: usize,

    /// 0‑based byte offset into the line.
    pub column: usize,
}

impl Position {
    pub fn new(file: Rc<SourceFile>, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }

    /// 1‑based column in terminal cells, as shown to users.
    pub fn display_column(&self) -> usize {
        let line: &str = self.file.line(self.line);
        let upto: usize = self.column.min(line.len());

        match line.get(..upto) {
            Some(prefix) => display_width(prefix) + 1,
            None => upto + 1,
        }
    }
}

/// Terminal cells taken by `text`. Wide characters take two cells, control
/// characters such as tabs one.
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(1)).sum()
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Position {}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .name
            .cmp(&other.file.name)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file.name.is_empty() {
            write!(f, "{}:", self.file.name)?;
        }

        write!(f, "{}:{}", self.line, self.display_column())
    }
}

/// A half‑open span of source: `end` is the position just past the last
/// character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The smallest range covering both `self` and `other`.
    pub fn to(&self, other: &Range) -> Range {
        Range::new(self.start.clone(), other.end.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

/// A scanned token, including its type, the original lexeme,
/// and where it starts and ends in the source.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    pub start: Position,

    pub end: Position,
}

impl Token {
    /// Create a new Token with the given type, lexeme, and span.
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, start: Position, end: Position) -> Self {
        let lexeme: String = lexeme.into();

        debug!(
            "Creating new token: type={:?}, lexeme={}, at {}",
            token_type, lexeme, start
        );

        Self {
            token_type,
            lexeme,
            start,
            end,
        }
    }

    /// The span of the token.
    pub fn range(&self) -> Range {
        Range::new(self.start.clone(), self.end.clone())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant: String = format!("{:?}", self.token_type);
        let variant: &str = variant.split('(').next().unwrap_or_default();

        match &self.token_type {
            TokenType::STRING(s) => write!(f, "{}: {} {} {}", self.start, variant, self.lexeme, s),
            TokenType::NUMBER(n) => write!(f, "{}: {} {} {}", self.start, variant, self.lexeme, n),
            TokenType::EOF => write!(f, "{}: {}", self.start, variant),
            _ => write!(f, "{}: {} {}", self.start, variant, self.lexeme),
        }
    }
}
