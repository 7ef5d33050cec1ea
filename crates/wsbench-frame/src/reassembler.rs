use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::channel::{ByteChannel, FrameKind};
use crate::error::{FrameError, Result};

/// Bytes delivered by a single channel read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    bytes: &'a [u8],
    end_of_message: bool,
    kind: FrameKind,
}

impl<'a> Fragment<'a> {
    /// The bytes transferred, a view into the caller's buffer.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_end_of_message(&self) -> bool {
        self.end_of_message
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }
}

/// A complete message. Only observable once every fragment has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    payload: &'a [u8],
    kind: FrameKind,
}

impl<'a> Message<'a> {
    fn close() -> Self {
        Self {
            payload: &[],
            kind: FrameKind::Close,
        }
    }

    /// The reassembled payload, a view into the caller's buffer.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn is_close(&self) -> bool {
        self.kind == FrameKind::Close
    }
}

/// Progress of the message currently being reassembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyCursor {
    pub bytes_accumulated: usize,
    pub target_buffer_remaining: usize,
}

impl ReassemblyCursor {
    fn start(capacity: usize) -> Self {
        Self {
            bytes_accumulated: 0,
            target_buffer_remaining: capacity,
        }
    }

    fn advance(&mut self, n: usize) {
        self.bytes_accumulated += n;
        self.target_buffer_remaining -= n;
    }
}

/// Turns partial channel reads into complete messages.
///
/// Owns the channel, so at most one message can be in flight per receive side.
pub struct FragmentReassembler<C> {
    channel: C,
    cursor: ReassemblyCursor,
}

impl<C: ByteChannel> FragmentReassembler<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            cursor: ReassemblyCursor::default(),
        }
    }

    /// Read a single fragment into `buf`.
    ///
    /// Close frames come back as a zero-length fragment of kind `Close`.
    pub async fn receive_fragment<'b>(
        &mut self,
        buf: &'b mut [u8],
        cancel: &CancellationToken,
    ) -> Result<Fragment<'b>> {
        let result = self.channel.read(buf, cancel).await?;
        if result.bytes_read > buf.len() {
            return Err(FrameError::Protocol(format!(
                "channel reported {} bytes read into a {}-byte buffer",
                result.bytes_read,
                buf.len()
            )));
        }

        let buf: &'b [u8] = buf;
        Ok(Fragment {
            bytes: &buf[..result.bytes_read],
            end_of_message: result.end_of_message,
            kind: result.kind,
        })
    }

    /// Read fragments into consecutive slices of `buf` until a message completes.
    ///
    /// A close frame ends the call immediately with a `Close` message, whatever
    /// was accumulated. Fails with [`FrameError::MessageTooLarge`] when the
    /// message needs more room than `buf` has.
    pub async fn receive_message<'b>(
        &mut self,
        buf: &'b mut [u8],
        cancel: &CancellationToken,
    ) -> Result<Message<'b>> {
        if buf.is_empty() {
            return self.receive_empty(cancel).await;
        }

        self.cursor = ReassemblyCursor::start(buf.len());
        let mut kind = None;

        loop {
            let offset = self.cursor.bytes_accumulated;
            let fragment = self.receive_fragment(&mut buf[offset..], cancel).await?;

            if fragment.kind == FrameKind::Close {
                self.cursor = ReassemblyCursor::default();
                return Ok(Message::close());
            }

            match kind {
                None => kind = Some(fragment.kind),
                Some(expected) if expected != fragment.kind => {
                    self.cursor = ReassemblyCursor::default();
                    return Err(FrameError::KindChanged {
                        expected,
                        found: fragment.kind,
                    });
                }
                Some(_) => {}
            }

            let n = fragment.byte_count();
            let end_of_message = fragment.end_of_message;
            self.cursor.advance(n);

            if end_of_message {
                break;
            }
            if n == 0 {
                if self.cursor.target_buffer_remaining == 0 {
                    let capacity = buf.len();
                    self.cursor = ReassemblyCursor::default();
                    return Err(FrameError::MessageTooLarge { capacity });
                }
                // Nothing available yet; try again.
                tokio::task::yield_now().await;
            }
        }

        let len = self.cursor.bytes_accumulated;
        self.cursor = ReassemblyCursor::default();
        trace!(len, "message reassembled");

        let buf: &'b [u8] = buf;
        Ok(Message {
            payload: &buf[..len],
            kind: kind.unwrap_or(FrameKind::Binary),
        })
    }

    /// Zero-capacity receive: a single read, no accumulation loop.
    ///
    /// Any non-final answer means payload is pending that cannot fit.
    async fn receive_empty(&mut self, cancel: &CancellationToken) -> Result<Message<'static>> {
        self.cursor = ReassemblyCursor::default();
        let result = self.channel.read(&mut [], cancel).await?;

        if result.kind == FrameKind::Close {
            return Ok(Message::close());
        }
        if !result.end_of_message {
            return Err(FrameError::MessageTooLarge { capacity: 0 });
        }
        Ok(Message {
            payload: &[],
            kind: result.kind,
        })
    }

    /// Progress of the message currently being reassembled.
    pub fn cursor(&self) -> ReassemblyCursor {
        self.cursor
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the reassembler and return the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}
