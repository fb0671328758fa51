//! Lexical primitives of the IMAP grammar.
//!
//! IMAP mixes several token kinds on one line: whitespace-separated tokens,
//! atoms with their own terminator set, quoted strings with two escapes,
//! length-prefixed binary literals, and bracketed status codes. Each
//! primitive lives here exactly once; the response reader composes them and
//! never touches bytes directly.

use tokio::io::AsyncRead;

use crate::parser::source::ByteSource;
use crate::{Error, Result};

/// Tokenizer over a byte source.
pub struct Lexer<R> {
    src: ByteSource<R>,
}

impl<R: AsyncRead + Unpin> Lexer<R> {
    /// Creates a new lexer over `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            src: ByteSource::new(inner),
        }
    }

    /// Byte offset of the next unconsumed byte, for error reporting.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.src.position()
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            position: self.src.position(),
            message: message.into(),
        }
    }

    /// Reads one raw byte.
    pub async fn read_byte(&mut self) -> Result<u8> {
        self.src.read_byte().await
    }

    /// Pushes one byte back.
    pub fn unread_byte(&mut self, b: u8) {
        self.src.unread_byte(b);
    }

    /// Peeks at the next byte without consuming it.
    pub async fn peek_byte(&mut self) -> Result<u8> {
        self.src.peek_byte().await
    }

    /// Reads raw bytes up to and including `delim`.
    pub async fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        self.src.read_until(delim).await
    }

    /// Reads the rest of the line, consuming but not returning the CRLF.
    pub async fn read_line(&mut self) -> Result<String> {
        self.src.read_line().await
    }

    /// Reads `text.len()` bytes and fails unless they match `text`.
    pub async fn expect(&mut self, text: &str) -> Result<()> {
        self.src.expect(text).await
    }

    /// Consumes the CRLF that terminates a response line.
    pub async fn expect_crlf(&mut self) -> Result<()> {
        self.src.expect("\r\n").await
    }

    /// Reads a whitespace-delimited token.
    ///
    /// The terminating space is consumed; `]` and CR are pushed back. An
    /// empty token is legal and means "no more items".
    pub async fn read_token(&mut self) -> Result<String> {
        let mut buf = Vec::with_capacity(16);
        loop {
            let c = self.src.read_byte().await?;
            match c {
                b' ' => break,
                b']' | b'\r' => {
                    self.src.unread_byte(c);
                    break;
                }
                _ => buf.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Reads a decimal number.
    ///
    /// At least one digit is required; the first non-digit byte is pushed
    /// back.
    pub async fn read_number(&mut self) -> Result<u32> {
        let mut num: u32 = 0;
        let mut digits = 0;
        loop {
            let c = self.src.read_byte().await?;
            if c.is_ascii_digit() {
                num = num
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u32::from(c - b'0')))
                    .ok_or_else(|| self.error("number overflows u32"))?;
                digits += 1;
            } else {
                self.src.unread_byte(c);
                break;
            }
        }
        if digits == 0 {
            return Err(self.error("expected digit"));
        }
        Ok(num)
    }

    /// Reads an atom, stopping before any atom-special byte.
    ///
    /// The terminator set here drops `\` from the RFC's quoted-specials so
    /// that flags like `\Seen` lex as single atoms.
    pub async fn read_atom(&mut self) -> Result<String> {
        let mut buf = Vec::with_capacity(16);
        loop {
            let c = self.src.read_byte().await?;
            match c {
                b'(' | b')' | b'{' | b' ' | b'%' | b'*' | b'"' => {
                    self.src.unread_byte(c);
                    break;
                }
                _ => buf.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Reads a quoted string, handling `\"` and `\\` escapes.
    ///
    /// Any other backslash sequence is a parse error. The closing quote is
    /// consumed.
    pub async fn read_quoted(&mut self) -> Result<String> {
        self.src.expect("\"").await?;
        let mut buf = Vec::with_capacity(16);
        loop {
            let mut c = self.src.read_byte().await?;
            match c {
                b'\\' => {
                    c = self.src.read_byte().await?;
                    if c != b'"' && c != b'\\' {
                        return Err(
                            self.error(format!("backslash-escaped {:?}", char::from(c)))
                        );
                    }
                }
                b'"' => return Ok(String::from_utf8_lossy(&buf).into_owned()),
                _ => {}
            }
            buf.push(c);
        }
    }

    /// Reads a length-prefixed literal: `{N}\r\n` followed by exactly N
    /// bytes of raw binary. NUL, CR, and LF pass through untouched.
    pub async fn read_literal(&mut self) -> Result<Vec<u8>> {
        self.src.expect("{").await?;
        let mut length_bytes = self.src.read_until(b'}').await?;
        length_bytes.pop();
        let length: usize = std::str::from_utf8(&length_bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                self.error(format!(
                    "bad literal length {:?}",
                    String::from_utf8_lossy(&length_bytes)
                ))
            })?;
        self.src.expect("\r\n").await?;
        self.src.read_exact(length).await
    }

    /// Reads `[...]` and returns the content between the brackets.
    pub async fn read_bracketed(&mut self) -> Result<String> {
        self.src.expect("[").await?;
        let mut text = self.src.read_until(b']').await?;
        text.pop();
        Ok(String::from_utf8_lossy(&text).into_owned())
    }
}
