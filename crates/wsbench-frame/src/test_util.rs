//! Stream and channel doubles shared by this crate's tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::CancellationToken;

use crate::channel::{ByteChannel, ChannelState, CloseStatus, FrameKind, ReadResult};
use crate::error::{FrameError, Result};

/// Serves a fixed byte sequence in chunks of at most `chunk` bytes, then EOF.
/// Writes are collected in `written`.
pub struct ChunkedStream {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    pub written: Vec<u8>,
}

impl ChunkedStream {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk,
            written: Vec::new(),
        }
    }
}

impl AsyncRead for ChunkedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let n = buf
            .remaining()
            .min(this.chunk)
            .min(this.data.len() - this.pos);
        buf.put_slice(&this.data[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ChunkedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.get_mut().written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// One scripted answer to a [`ScriptedChannel::read`] call.
pub struct Step {
    pub bytes: Vec<u8>,
    pub end_of_message: bool,
    pub kind: FrameKind,
}

impl Step {
    pub fn data(bytes: &[u8], end_of_message: bool, kind: FrameKind) -> Self {
        Self {
            bytes: bytes.to_vec(),
            end_of_message,
            kind,
        }
    }

    /// Zero bytes, no terminal flag.
    pub fn nothing(kind: FrameKind) -> Self {
        Self::data(&[], false, kind)
    }

    pub fn close() -> Self {
        Self::data(&[], true, FrameKind::Close)
    }
}

/// A channel that replays scripted read results and records writes.
///
/// Scripted bytes longer than the caller's buffer are split across reads.
/// Writes accept at most `write_limit` bytes per call.
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    pub reads: usize,
    pub writes: Vec<(Vec<u8>, FrameKind, bool)>,
    pub write_limit: usize,
    pub zero_writes: usize,
    state: ChannelState,
}

impl ScriptedChannel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            reads: 0,
            writes: Vec::new(),
            write_limit: usize::MAX,
            zero_writes: 0,
            state: ChannelState::Open,
        }
    }
}

impl ByteChannel for ScriptedChannel {
    async fn read(&mut self, buf: &mut [u8], _cancel: &CancellationToken) -> Result<ReadResult> {
        self.reads += 1;
        let Some(step) = self.steps.front_mut() else {
            return Err(FrameError::UnexpectedEndOfChannel);
        };

        if step.kind == FrameKind::Close {
            self.steps.pop_front();
            self.state = self.state.on_close_received();
            return Ok(ReadResult::close());
        }

        let n = buf.len().min(step.bytes.len());
        buf[..n].copy_from_slice(&step.bytes[..n]);
        step.bytes.drain(..n);
        let kind = step.kind;
        let done = step.bytes.is_empty();
        let end_of_message = done && step.end_of_message;
        if done {
            self.steps.pop_front();
        }

        Ok(ReadResult {
            bytes_read: n,
            end_of_message,
            kind,
        })
    }

    async fn write(
        &mut self,
        buf: &[u8],
        kind: FrameKind,
        end_of_message: bool,
        _cancel: &CancellationToken,
    ) -> Result<usize> {
        if self.zero_writes > 0 && !buf.is_empty() {
            self.zero_writes -= 1;
            return Ok(0);
        }
        let n = buf.len().min(self.write_limit);
        let eom = end_of_message && n == buf.len();
        self.writes.push((buf[..n].to_vec(), kind, eom));
        Ok(n)
    }

    async fn close(
        &mut self,
        _status: CloseStatus,
        _reason: &str,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.state = self.state.on_close_sent();
        Ok(())
    }

    fn state(&self) -> ChannelState {
        self.state
    }
}
