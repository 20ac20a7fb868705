//! Tokenizer over a sliding input window.
//!
//! The window always holds a `0` byte right after the buffered content, so the
//! scan loops stop at the end of content without separate bounds checks. Before
//! each token, if fewer than [`MAX_TOKEN_SIZE`] bytes remain buffered, unread
//! bytes are shifted to the start of the window and more input is read. A token
//! of [`MAX_TOKEN_SIZE`] bytes or more is rejected wherever it falls in the
//! window, so every shorter token is always buffered in one piece.

use crate::token::{Keyword, Token, TokenKind};
use std::io::{self, ErrorKind, Read};
use tracing::trace;

/// Capacity of the input window, including the terminator byte.
pub const BUFFER_SIZE: usize = 4096;
/// Tokens must be shorter than this many bytes.
pub const MAX_TOKEN_SIZE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("invalid integer literal")]
    InvalidInteger,
    #[error("token too long")]
    TokenTooLong,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Tokenizer<R> {
    reader: R,
    buffer: Box<[u8]>,
    /// Number of buffered bytes; `buffer[filled]` is always `0`.
    filled: usize,
    /// Start of the next unread byte.
    pos: usize,
    /// Start of the current token.
    start: usize,
    line: usize,
    /// Added to a buffer position to get its 1-based column.
    line_offset: isize,
    eof: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Tokenizer {
            reader,
            buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            filled: 0,
            pos: 0,
            start: 0,
            line: 1,
            line_offset: 1,
            eof: false,
        }
    }

    /// Line number of the current token.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Columns of the current token: its first character and just past the
    /// consumed text.
    pub fn columns(&self) -> (usize, usize) {
        (self.column_of(self.start), self.column_of(self.pos))
    }

    /// Source text of the current token.
    pub fn lexeme(&self) -> String {
        String::from_utf8_lossy(&self.buffer[self.start..self.pos]).into_owned()
    }

    fn column_of(&self, pos: usize) -> usize {
        (pos as isize + self.line_offset).max(0) as usize
    }

    fn peek(&self) -> u8 {
        self.buffer[self.pos]
    }

    /// Ensure at least `MAX_TOKEN_SIZE` bytes are buffered unless input is exhausted.
    fn fill_buffer(&mut self) -> Result<(), LexError> {
        if self.eof || self.filled - self.pos >= MAX_TOKEN_SIZE {
            return Ok(());
        }
        let shift = self.pos;
        self.buffer.copy_within(shift..self.filled, 0);
        self.filled -= shift;
        self.pos = 0;
        self.start = self.start.saturating_sub(shift);
        self.line_offset += shift as isize;

        let capacity = BUFFER_SIZE - 1;
        while self.filled < capacity {
            match self.reader.read(&mut self.buffer[self.filled..capacity]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer[self.filled] = 0;
                    return Err(e.into());
                }
            }
        }
        self.buffer[self.filled] = 0;
        trace!(shift, buffered = self.filled, eof = self.eof, "refilled input window");
        Ok(())
    }

    fn scan_while(&mut self, pred: impl Fn(u8) -> bool) -> Result<(), LexError> {
        while pred(self.peek()) {
            self.pos += 1;
        }
        if self.pos - self.start >= MAX_TOKEN_SIZE {
            return Err(LexError::TokenTooLong);
        }
        Ok(())
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            line: self.line,
            column: self.column_of(self.start),
        }
    }

    /// Read the next token, skipping whitespace and `#` comments.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.fill_buffer()?;
            self.start = self.pos;
            let ch = self.peek();

            if ch == 0 {
                return Ok(self.token(TokenKind::Eof));
            }
            if ch == b'#' {
                while !matches!(self.peek(), b'\n' | 0) {
                    self.pos += 1;
                    self.fill_buffer()?;
                }
                continue;
            }
            if is_space(ch) {
                while is_space(self.peek()) {
                    if self.peek() == b'\n' {
                        self.line += 1;
                        self.line_offset = -(self.pos as isize);
                    }
                    self.pos += 1;
                    self.fill_buffer()?;
                }
                continue;
            }

            let kind = if ch.is_ascii_alphabetic() {
                self.scan_while(|c| c.is_ascii_alphanumeric() || c == b'_')?;
                let text = self.lexeme();
                match Keyword::from_ident(&text) {
                    Some(k) => TokenKind::Keyword(k),
                    None => TokenKind::Identifier(text),
                }
            } else if ch.is_ascii_digit() {
                self.scan_while(|c| c.is_ascii_digit())?;
                let value = self
                    .lexeme()
                    .parse::<i64>()
                    .map_err(|_| LexError::InvalidInteger)?;
                TokenKind::Integer(value)
            } else if ch == b'<' {
                self.pos += 1;
                if self.peek() == b'-' {
                    self.pos += 1;
                    TokenKind::LeftArrow
                } else {
                    TokenKind::Symbol('<')
                }
            } else {
                self.pos += 1;
                TokenKind::Symbol(ch as char)
            };
            return Ok(self.token(kind));
        }
    }
}

/// The C `isspace` set, including vertical tab and form feed.
fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}
