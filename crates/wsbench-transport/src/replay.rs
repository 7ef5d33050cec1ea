use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::trace;

use crate::cyclic::CyclicBuffer;
use crate::error::Result;

/// A byte stream that replays a captured byte sequence forever.
///
/// Reads copy `min(buf.remaining(), bytes left in this cycle)` from the
/// template and wrap to the start once the end is reached. Reads never block
/// and never report end of stream, which makes receive benchmarks independent
/// of any peer's send timing. Never use it where correctness depends on a
/// bounded source.
///
/// Writes record into the same fixed-capacity buffer; they are meant as a
/// one-shot "capture a template" step before replay starts.
#[derive(Debug)]
pub struct ReplayStream {
    buffer: CyclicBuffer,
}

impl ReplayStream {
    /// Replay a copy of `template`.
    pub fn new(template: impl AsRef<[u8]>) -> Result<Self> {
        let buffer = CyclicBuffer::from_template(template.as_ref())?;
        trace!(len = buffer.len(), "replay stream created from template");
        Ok(Self { buffer })
    }

    /// Create an empty stream that captures up to `capacity` written bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            buffer: CyclicBuffer::with_capacity(capacity)?,
        })
    }

    /// The captured template.
    pub fn template(&self) -> &[u8] {
        self.buffer.captured()
    }

    /// Restart replay from the first captured byte.
    pub fn rewind(&mut self) {
        self.buffer.rewind();
    }

    /// Borrow the underlying cyclic buffer.
    pub fn buffer(&self) -> &CyclicBuffer {
        &self.buffer
    }
}

impl AsyncRead for ReplayStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let chunk = this.buffer.next_chunk(buf.remaining());
        buf.put_slice(chunk);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ReplayStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(self.get_mut().buffer.write(buf)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
