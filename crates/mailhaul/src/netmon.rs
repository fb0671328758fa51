//! Rolling bandwidth estimate over the session's read half.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Smoothing factor: the newest bucket dominates the estimate.
const ALPHA: f32 = 0.9;

/// Bandwidth gauge fed by a [`NetmonReader`].
///
/// Reads accumulate into a bucket; [`tick`](Self::tick) folds the bucket
/// into an exponential moving average once per interval.
#[derive(Debug, Default)]
pub struct BandwidthGauge {
    state: Mutex<GaugeState>,
}

#[derive(Debug, Default)]
struct GaugeState {
    bucket: usize,
    estimate: f32,
}

impl BandwidthGauge {
    /// Folds the current bucket into the estimate and resets it.
    /// Returns the bytes observed since the previous tick.
    pub fn tick(&self) -> usize {
        let mut state = self.state.lock().expect("gauge lock poisoned");
        let bucket = state.bucket;
        state.estimate = ALPHA * bucket as f32 + (1.0 - ALPHA) * state.estimate;
        state.bucket = 0;
        bucket
    }

    /// Current estimate, in bytes per tick interval.
    pub fn bandwidth(&self) -> f32 {
        self.state.lock().expect("gauge lock poisoned").estimate
    }

    fn add(&self, n: usize) {
        self.state.lock().expect("gauge lock poisoned").bucket += n;
    }
}

/// Read wrapper that feeds byte counts into a shared [`BandwidthGauge`].
pub struct NetmonReader<R> {
    inner: R,
    gauge: Arc<BandwidthGauge>,
}

impl<R> NetmonReader<R> {
    pub fn new(inner: R, gauge: Arc<BandwidthGauge>) -> Self {
        Self { inner, gauge }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for NetmonReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                this.gauge.add(buf.filled().len() - before);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn tick_folds_bucket_into_estimate() {
        let gauge = BandwidthGauge::default();
        gauge.add(1000);
        assert_eq!(gauge.tick(), 1000);
        assert!((gauge.bandwidth() - 900.0).abs() < 0.001);

        // An idle tick decays the estimate.
        assert_eq!(gauge.tick(), 0);
        assert!((gauge.bandwidth() - 90.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn reader_counts_bytes() {
        let gauge = Arc::new(BandwidthGauge::default());
        let mut reader = NetmonReader::new(&b"hello world"[..], Arc::clone(&gauge));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
        assert_eq!(gauge.tick(), 11);
    }
}
