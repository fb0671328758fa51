//! Wire dump for `--dump-protocol`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;

/// Longest chunk worth echoing; anything past this is elided.
const DUMP_MAX: usize = 300;

/// Read wrapper that logs every chunk coming off the transport.
pub struct DumpReader<R> {
    inner: R,
}

impl<R> DumpReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for DumpReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let chunk = &buf.filled()[before..];
                if !chunk.is_empty() {
                    let shown = &chunk[..chunk.len().min(DUMP_MAX)];
                    let elided = if chunk.len() > DUMP_MAX { "..." } else { "" };
                    debug!(target: "mailhaul::wire", "<- {:?}{}", String::from_utf8_lossy(shown), elided);
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
