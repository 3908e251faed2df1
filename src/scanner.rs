//! Module `scanner` implements a one‑pass, streaming UTF‑8 lexer for the Lox language.
//!
//! It transforms a [`SourceFile`] into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end when used as an
//! iterator. Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(file: &Rc<SourceFile>) -> Scanner`
//!   Create a new lexer over the file contents.
//!
//! - `Scanner::next_token() -> Token`
//!   Scan the next token. Once input is exhausted every call returns `EOF`.
//!
//! - `impl Iterator for Scanner`
//!   Yields tokens up to and including the single `EOF`.
//!
//! - `lex(file) -> (Vec<Token>, Diagnostics)`
//!   Convenience wrapper that drains the scanner.
//!
//! # Error handling
//!
//! Lexing never aborts. Unterminated strings and unknown characters produce an
//! `ILLEGAL` token and a diagnostic; the diagnostics are collected on the
//! scanner and drained by the owner with [`Scanner::take_errors`].
//!
//! # Performance
//!
//! - Bulk comment skipping via `memchr` for rapid new‑line search.
//! - `#[inline(always)]` on hot path helpers.
//! - Keyword lookup through a compile‑time perfect hash.

use crate::error::Diagnostics;
use crate::token::{Position, Range, SourceFile, Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr2};
use phf::phf_map;
use std::iter::FusedIterator;
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"get"      => TokenType::GET,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"set"      => TokenType::SET,
    b"static"   => TokenType::STATIC,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// Scan the whole file, returning every token (ending with `EOF`) and the
/// lexical errors found along the way.
pub fn lex(file: &Rc<SourceFile>) -> (Vec<Token>, Diagnostics) {
    let mut scanner: Scanner = Scanner::new(file);
    let tokens: Vec<Token> = scanner.by_ref().collect();

    info!("Lexed {} tokens from '{}'", tokens.len(), file.name);

    (tokens, scanner.take_errors())
}

/// A single pass **scanner / lexer** that converts raw UTF‑8 bytes into a
/// sequence of [`Token`]s.
pub struct Scanner {
    file: Rc<SourceFile>,      // the file being scanned; tokens point back into it
    start: usize,              // index of the *first* byte of the current lexeme
    curr: usize,               // index *one past* the last byte examined
    line: usize,               // 1‑based line counter (\n increments)
    line_start: usize,         // byte index where `line` begins
    start_pos: (usize, usize), // (line, column) of `start`
    errors: Diagnostics,       // lexical errors not yet drained
    emitted_eof: bool,         // iterator has yielded its EOF
}

impl Scanner {
    /// Create a new lexer over `file`.
    #[inline]
    pub fn new(file: &Rc<SourceFile>) -> Self {
        info!("Scanner created over {} bytes", file.contents.len());

        Self {
            file: Rc::clone(file),
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            start_pos: (1, 0),
            errors: Diagnostics::new(),
            emitted_eof: false,
        }
    }

    /// Hand over the errors collected so far.
    pub fn take_errors(&mut self) -> Diagnostics {
        std::mem::take(&mut self.errors)
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input.
    #[inline(always)]
    fn len(&self) -> usize {
        self.file.contents.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b: u8 = self.file.contents[self.curr];
        self.curr += 1;

        if b == b'\n' {
            self.line += 1;
            self.line_start = self.curr;
        }

        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past EOF
    /// to avoid branching at call‑site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.file.contents[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.file.contents[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn position(&self, line: usize, column: usize) -> Position {
        Position::new(Rc::clone(&self.file), line, column)
    }

    #[inline(always)]
    fn here(&self) -> Position {
        self.position(self.line, self.curr - self.line_start)
    }

    fn lexeme_range(&self) -> Range {
        let (line, column) = self.start_pos;
        Range::new(self.position(line, column), self.here())
    }

    fn lexeme(&self) -> &str {
        std::str::from_utf8(&self.file.contents[self.start..self.curr]).unwrap_or("")
    }

    fn error(&mut self, range: Range, message: String) {
        debug!("Lex error at {}: {}", range.start, message);

        self.errors.add(range, message);
    }

    // ───────────────────────────── trivia ──────────────────────────────────

    /// Skip whitespace and comments up to the start of the next token.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' | b'\n' => {
                    self.advance();
                }

                // ── comments (// … until newline) ────────────────────────
                b'/' if self.peek_next() == b'/' => {
                    // Fast‑forward to next newline using `memchr`.  If none
                    // found, skip to EOF.
                    match memchr(b'\n', &self.file.contents[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }
                }

                b'/' if self.peek_next() == b'*' => self.skip_block_comment(),

                _ => return,
            }
        }
    }

    /// Skip a `/* … */` comment. Comments nest, so `/* a /* b */ c */` is one
    /// comment.
    fn skip_block_comment(&mut self) {
        let open: Position = self.here();
        self.advance();
        self.advance();

        let mut depth: usize = 1;

        while depth > 0 {
            // Jump to the next byte that could open or close a comment.
            let Some(pos) = memchr2(b'*', b'/', &self.file.contents[self.curr..]) else {
                while !self.is_at_end() {
                    self.advance();
                }

                let range: Range = Range::new(open, self.here());
                self.error(range, "unterminated multi-line comment".to_string());

                return;
            };

            for _ in 0..pos {
                self.advance();
            }

            if self.peek() == b'/' && self.peek_next() == b'*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan the next token, returning `EOF` forever once input runs out.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        self.start = self.curr;
        self.start_pos = (self.line, self.curr - self.line_start);

        if self.is_at_end() {
            let here: Position = self.here();
            return Token::new(TokenType::EOF, "", here.clone(), here);
        }

        let token_type: TokenType = self.scan_token();
        let Range { start, end } = self.lexeme_range();

        debug!("Scanned token ({:?}) at {}", token_type, start);

        Token::new(token_type, self.lexeme(), start, end)
    }

    /// Scan a *single* token starting at `self.curr`.
    fn scan_token(&mut self) -> TokenType {
        let b: u8 = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_BRACKET,
            b']' => TokenType::RIGHT_BRACKET,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,
            b'%' => TokenType::PERCENT,
            b'?' => TokenType::QUESTION,
            b':' => TokenType::COLON,

            // ── two‑character operators (!=, ==, <=, >=) ─────────────────
            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => self.parse_string(),

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => self.parse_number(),

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── anything else ────────────────────────────────────────────
            _ => self.illegal_character(),
        }
    }

    /// Parse a double‑quoted string literal.  A newline or EOF before the
    /// closing quote yields `ILLEGAL` for the partial lexeme.
    fn parse_string(&mut self) -> TokenType {
        while !self.is_at_end() && self.peek() != b'"' && self.peek() != b'\n' {
            self.advance();
        }

        if self.peek() != b'"' {
            let range: Range = self.lexeme_range();
            self.error(range, "unterminated string literal".to_string());

            return TokenType::ILLEGAL;
        }

        self.advance(); // consume closing quote

        let lexeme: &str = self.lexeme();
        let contents: String = lexeme[1..lexeme.len() - 1].to_owned();

        TokenType::STRING(contents)
    }

    /// Parse a numeric literal (`123`, `3.14`).  A `.` is only consumed when a
    /// digit follows it.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // digits and at most one '.', so this always parses
        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.file.contents[self.start..self.curr];

        KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }

    /// Consume one whole character (which may be multi‑byte) and report it.
    fn illegal_character(&mut self) -> TokenType {
        let ch: char = self
            .file
            .text()
            .get(self.start..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);

        // the first byte is already consumed
        for _ in 1..ch.len_utf8() {
            if !self.is_at_end() {
                self.advance();
            }
        }

        let range: Range = self.lexeme_range();
        self.error(
            range,
            format!("illegal character U+{:04X} '{}'", ch as u32, ch),
        );

        TokenType::ILLEGAL
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl Iterator for Scanner {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.emitted_eof {
            return None;
        }

        let token: Token = self.next_token();

        if token.token_type == TokenType::EOF {
            self.emitted_eof = true;
        }

        Some(token)
    }
}

impl FusedIterator for Scanner {}
