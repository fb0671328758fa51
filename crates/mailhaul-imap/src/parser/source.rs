//! Buffered byte source over a transport.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Buffered byte pipe over the transport with one byte of pushback.
///
/// The source adds no interpretation of its own: I/O errors surface to the
/// caller unchanged, and the only state beyond buffering is the pushback
/// slot and a running byte offset used in parse-error messages.
pub struct ByteSource<R> {
    inner: BufReader<R>,
    unread: Option<u8>,
    pos: u64,
}

impl<R: AsyncRead + Unpin> ByteSource<R> {
    /// Creates a new source over `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, inner),
            unread: None,
            pos: 0,
        }
    }

    /// Byte offset of the next unconsumed byte.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Reads one byte.
    pub async fn read_byte(&mut self) -> Result<u8> {
        let b = match self.unread.take() {
            Some(b) => b,
            None => self.inner.read_u8().await?,
        };
        self.pos += 1;
        Ok(b)
    }

    /// Pushes one byte back; the next read returns it again.
    ///
    /// The grammar never needs more than one byte of lookahead, so pushing
    /// back twice without an intervening read is a parser bug.
    pub fn unread_byte(&mut self, b: u8) {
        debug_assert!(self.unread.is_none(), "double unread");
        self.unread = Some(b);
        self.pos -= 1;
    }

    /// Peeks at the next byte without consuming it.
    pub async fn peek_byte(&mut self) -> Result<u8> {
        let b = self.read_byte().await?;
        self.unread_byte(b);
        Ok(b)
    }

    /// Reads exactly `n` bytes of raw binary.
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut start = 0;
        if n > 0 {
            if let Some(b) = self.unread.take() {
                buf[0] = b;
                start = 1;
            }
        }
        self.inner.read_exact(&mut buf[start..]).await?;
        self.pos += n as u64;
        Ok(buf)
    }

    /// Reads bytes up to and including `delim`.
    pub async fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let b = self.read_byte().await?;
            out.push(b);
            if b == delim {
                return Ok(out);
            }
        }
    }

    /// Reads to the next CRLF and returns the line without it.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut out = self.read_until(b'\n').await?;
        if !out.ends_with(b"\r\n") {
            return Err(Error::Parse {
                position: self.pos,
                message: "line not terminated by CRLF".to_string(),
            });
        }
        out.truncate(out.len() - 2);
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Reads `text.len()` bytes and fails unless they match `text`.
    pub async fn expect(&mut self, text: &str) -> Result<()> {
        let got = self.read_exact(text.len()).await?;
        if got != text.as_bytes() {
            return Err(Error::Parse {
                position: self.pos,
                message: format!("expected {:?}, got {:?}", text, String::from_utf8_lossy(&got)),
            });
        }
        Ok(())
    }
}
