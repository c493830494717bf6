//! Transfer progress reporting.
//!
//! [`ProgressReader`] decorates any [`AsyncRead`] and tells a
//! [`ProgressObserver`] how many bytes each read produced. Downloads report
//! to the same observer trait chunk by chunk.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Receives transfer progress. Implementations must be cheap; `advance`
/// runs on every chunk.
pub trait ProgressObserver: Send + Sync {
    /// A transfer begins. `total` is the declared length when known.
    fn start(&self, _label: &str, _total: Option<u64>) {}

    /// `bytes` more bytes were transferred.
    fn advance(&self, bytes: u64);

    /// The transfer ended, successfully or not.
    fn finish(&self) {}
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn advance(&self, _bytes: u64) {}
}

/// An [`AsyncRead`] that reports every successful read to an observer.
pub struct ProgressReader<R> {
    inner: R,
    observer: Arc<dyn ProgressObserver>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, observer: Arc<dyn ProgressObserver>) -> Self {
        Self { inner, observer }
    }
}

impl<R> std::fmt::Debug for ProgressReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReader").finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = polled {
            let read = buf.filled().len() - before;
            if read > 0 {
                this.observer.advance(read as u64);
            }
        }
        polled
    }
}
