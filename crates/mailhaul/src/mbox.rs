//! Append messages to an mbox file.

use std::io::{self, Write};

/// Writes messages with mbox framing: a `From ` separator line, the body
/// with From-line quoting applied, and a trailing blank line.
pub struct MboxWriter<W: Write> {
    inner: W,
}

impl<W: Write> MboxWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consumes the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Appends one message.
    pub fn write_message(
        &mut self,
        envelope_from: &str,
        envelope_date: &str,
        rfc822: &[u8],
    ) -> io::Result<()> {
        write!(self.inner, "From {envelope_from} {envelope_date}\r\n")?;
        write_from_quoted(&mut self.inner, rfc822)?;
        self.inner.write_all(b"\r\n")
    }
}

/// Writes `buf`, prefixing `>` to every line of the form `>`* `From `.
///
/// This keeps message bodies from being mistaken for mbox separators when
/// the file is read back.
fn write_from_quoted<W: Write>(w: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let mut ofs = 0;
        while ofs < buf.len() && buf[ofs] == b'>' {
            ofs += 1;
        }
        if buf[ofs..].starts_with(b"From ") {
            w.write_all(b">")?;
        }

        let end = match buf.iter().position(|&b| b == b'\n') {
            Some(i) => i + 1,
            None => buf.len(),
        };
        w.write_all(&buf[..end])?;
        buf = &buf[end..];
    }
    Ok(())
}
