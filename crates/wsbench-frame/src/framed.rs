use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::{
    ByteChannel, ChannelState, CloseFrame, CloseStatus, FrameKind, ReadResult, Role,
};
use crate::codec::{
    apply_mask, decode_close_payload, decode_header, encode_close_payload, encode_header,
    header_len, FrameConfig, FrameHeader, Opcode, MAX_CONTROL_PAYLOAD, MAX_HEADER_SIZE,
};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = MAX_HEADER_SIZE;

/// A data frame whose payload has not been fully handed to the caller yet.
#[derive(Debug, Clone, Copy)]
struct IncomingFrame {
    remaining: u64,
    fin: bool,
    kind: FrameKind,
    mask: Option<[u8; 4]>,
    /// Payload bytes already consumed; keeps the masking key aligned.
    offset: usize,
}

/// A [`ByteChannel`] over any async byte stream, using RFC 6455 framing.
///
/// Each `write` emits one frame of at most `max_frame_payload` bytes, so large
/// writes are partial and the caller loops. Each `read` returns at most the
/// bytes left in the current frame, and fewer when the stream delivers fewer.
/// Ping frames are answered with a pong; pong frames are skipped.
pub struct FramedChannel<S> {
    inner: S,
    role: Role,
    config: FrameConfig,
    state: ChannelState,
    incoming: Option<IncomingFrame>,
    /// Kind of the message being received, if one is in progress.
    receiving: Option<FrameKind>,
    /// Kind of the message being sent, if one is in progress.
    sending: Option<FrameKind>,
    write_buf: BytesMut,
    peer_close: Option<CloseFrame>,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a framed channel with default configuration.
    pub fn new(inner: S, role: Role) -> Self {
        Self::with_config(inner, role, FrameConfig::default())
    }

    /// Create a framed channel with explicit configuration.
    pub fn with_config(inner: S, role: Role, mut config: FrameConfig) -> Self {
        config.max_frame_payload = config.max_frame_payload.max(1);
        Self {
            inner,
            role,
            config,
            state: ChannelState::Open,
            incoming: None,
            receiving: None,
            sending: None,
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            peer_close: None,
        }
    }

    /// The role this side plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current channel configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// The close frame received from the peer, once one has arrived.
    pub fn peer_close(&self) -> Option<&CloseFrame> {
        self.peer_close.as_ref()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn read_fragment(&mut self, buf: &mut [u8]) -> Result<ReadResult> {
        let mut frame = match self.incoming {
            Some(frame) => frame,
            None => loop {
                match self.next_data_frame().await? {
                    // An empty non-final frame carries nothing to report.
                    Some(frame) if frame.remaining == 0 && !frame.fin => {
                        trace!(kind = %frame.kind, "skipping empty fragment");
                    }
                    Some(frame) => break frame,
                    None => return Ok(ReadResult::close()),
                }
            },
        };

        let want = (buf.len() as u64).min(frame.remaining) as usize;
        if want == 0 && frame.remaining > 0 {
            // No room in the caller's buffer; the frame stays pending.
            self.incoming = Some(frame);
            return Ok(ReadResult {
                bytes_read: 0,
                end_of_message: false,
                kind: frame.kind,
            });
        }

        let read = if want > 0 {
            let n = self.inner.read(&mut buf[..want]).await?;
            if n == 0 {
                return Err(FrameError::UnexpectedEndOfChannel);
            }
            if let Some(key) = frame.mask {
                apply_mask(key, frame.offset, &mut buf[..n]);
            }
            n
        } else {
            0
        };

        frame.offset += read;
        frame.remaining -= read as u64;

        let end_of_message = frame.remaining == 0 && frame.fin;
        if frame.remaining > 0 {
            self.incoming = Some(frame);
        } else {
            self.incoming = None;
            if frame.fin {
                self.receiving = None;
            }
        }

        trace!(bytes = read, end_of_message, kind = %frame.kind, "read fragment");
        Ok(ReadResult {
            bytes_read: read,
            end_of_message,
            kind: frame.kind,
        })
    }

    /// Read headers until a data frame starts, handling control frames on the way.
    ///
    /// Returns `None` when a close frame arrives.
    async fn next_data_frame(&mut self) -> Result<Option<IncomingFrame>> {
        loop {
            let header = self.read_header().await?;

            if header.payload_len > self.config.max_incoming_frame {
                return Err(FrameError::PayloadTooLarge {
                    size: header.payload_len,
                    max: self.config.max_incoming_frame,
                });
            }

            let kind = match header.opcode {
                Opcode::Ping => {
                    let mut payload = [0u8; MAX_CONTROL_PAYLOAD];
                    let len = self.read_control_payload(&header, &mut payload).await?;
                    if self.state == ChannelState::Open {
                        trace!(len, "answering ping");
                        self.send_control(Opcode::Pong, &payload[..len]).await?;
                    }
                    continue;
                }
                Opcode::Pong => {
                    let mut payload = [0u8; MAX_CONTROL_PAYLOAD];
                    self.read_control_payload(&header, &mut payload).await?;
                    continue;
                }
                Opcode::Close => {
                    let mut payload = [0u8; MAX_CONTROL_PAYLOAD];
                    let len = self.read_control_payload(&header, &mut payload).await?;
                    let close = decode_close_payload(&payload[..len])?;
                    self.state = self.state.on_close_received();
                    self.receiving = None;
                    debug!(
                        status = ?close.status,
                        reason = %close.reason,
                        state = %self.state,
                        "close frame received"
                    );
                    self.peer_close = Some(close);
                    return Ok(None);
                }
                Opcode::Continuation => self.receiving.ok_or_else(|| {
                    FrameError::Protocol(
                        "continuation frame without a message in progress".to_string(),
                    )
                })?,
                Opcode::Text | Opcode::Binary => {
                    let kind = if header.opcode == Opcode::Text {
                        FrameKind::Text
                    } else {
                        FrameKind::Binary
                    };
                    if let Some(expected) = self.receiving {
                        return Err(FrameError::KindChanged {
                            expected,
                            found: kind,
                        });
                    }
                    self.receiving = Some(kind);
                    kind
                }
            };

            return Ok(Some(IncomingFrame {
                remaining: header.payload_len,
                fin: header.fin,
                kind,
                mask: header.mask,
                offset: 0,
            }));
        }
    }

    async fn read_header(&mut self) -> Result<FrameHeader> {
        let mut head = [0u8; MAX_HEADER_SIZE];
        self.inner.read_exact(&mut head[..2]).await?;
        let len = header_len(head[1]);
        if len > 2 {
            self.inner.read_exact(&mut head[2..len]).await?;
        }

        match decode_header(&head[..len])? {
            Some((header, _)) => Ok(header),
            None => Err(FrameError::Protocol("truncated frame header".to_string())),
        }
    }

    async fn read_control_payload(
        &mut self,
        header: &FrameHeader,
        dst: &mut [u8; MAX_CONTROL_PAYLOAD],
    ) -> Result<usize> {
        let len = header.payload_len as usize;
        self.inner.read_exact(&mut dst[..len]).await?;
        if let Some(key) = header.mask {
            apply_mask(key, 0, &mut dst[..len]);
        }
        Ok(len)
    }

    async fn send_control(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        self.write_buf.clear();
        encode_header(
            &FrameHeader::new(true, opcode, payload.len() as u64),
            &mut self.write_buf,
        );
        self.write_buf.extend_from_slice(payload);
        self.inner.write_all(&self.write_buf).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn write_fragment(
        &mut self,
        buf: &[u8],
        kind: FrameKind,
        end_of_message: bool,
    ) -> Result<usize> {
        if kind == FrameKind::Close {
            return Err(FrameError::Protocol(
                "close frames are sent with close()".to_string(),
            ));
        }
        if let Some(expected) = self.sending {
            if expected != kind {
                return Err(FrameError::KindChanged {
                    expected,
                    found: kind,
                });
            }
        }

        let n = buf.len().min(self.config.max_frame_payload);
        let fin = end_of_message && n == buf.len();
        let opcode = if self.sending.is_some() {
            Opcode::Continuation
        } else {
            Opcode::for_kind(kind)
        };

        self.write_buf.clear();
        encode_header(&FrameHeader::new(fin, opcode, n as u64), &mut self.write_buf);
        self.inner.write_all(&self.write_buf).await?;
        if n > 0 {
            self.inner.write_all(&buf[..n]).await?;
        }
        self.inner.flush().await?;

        self.sending = if fin { None } else { Some(kind) };
        trace!(bytes = n, fin, ?opcode, "wrote frame");
        Ok(n)
    }

    async fn write_close(&mut self, status: CloseStatus, reason: &str) -> Result<()> {
        let mut payload = BytesMut::with_capacity(MAX_CONTROL_PAYLOAD);
        encode_close_payload(status, reason, &mut payload);
        self.send_control(Opcode::Close, &payload).await
    }
}

impl<S> ByteChannel for FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<ReadResult> {
        if !self.state.can_read() {
            return Err(FrameError::ChannelClosed { state: self.state });
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FrameError::Cancelled),
            result = self.read_fragment(buf) => result,
        }
    }

    async fn write(
        &mut self,
        buf: &[u8],
        kind: FrameKind,
        end_of_message: bool,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if !self.state.can_write() {
            return Err(FrameError::ChannelClosed { state: self.state });
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FrameError::Cancelled),
            result = self.write_fragment(buf, kind, end_of_message) => result,
        }
    }

    async fn close(
        &mut self,
        status: CloseStatus,
        reason: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !self.state.can_write() {
            return Err(FrameError::ChannelClosed { state: self.state });
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FrameError::Cancelled),
            result = self.write_close(status, reason) => result?,
        }
        self.state = self.state.on_close_sent();
        debug!(%status, role = %self.role, state = %self.state, "close frame sent");
        Ok(())
    }

    fn state(&self) -> ChannelState {
        self.state
    }
}

impl<S> std::fmt::Debug for FramedChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedChannel")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("receiving", &self.receiving)
            .field("sending", &self.sending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_frame;
    use crate::test_util::ChunkedStream;

    fn wire(frames: &[(bool, Opcode, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (fin, opcode, payload) in frames {
            encode_frame(*fin, *opcode, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn close_frame() -> (bool, Opcode, &'static [u8]) {
        (true, Opcode::Close, &[0x03, 0xE8])
    }

    #[tokio::test]
    async fn read_single_frame() {
        let bytes = wire(&[(true, Opcode::Binary, b"hello")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 16];
        let result = channel.read(&mut buf, &cancel).await.unwrap();
        assert_eq!(result.bytes_read, 5);
        assert!(result.end_of_message);
        assert_eq!(result.kind, FrameKind::Binary);
        assert_eq!(&buf[..5], b"hello");
    }

    #[tokio::test]
    async fn partial_reads_follow_stream_chunks() {
        let bytes = wire(&[(true, Opcode::Text, b"abcdefgh")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 3), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 16];
        let first = channel.read(&mut buf, &cancel).await.unwrap();
        assert_eq!(first.bytes_read, 3);
        assert!(!first.end_of_message);
        let second = channel.read(&mut buf[3..], &cancel).await.unwrap();
        assert_eq!(second.bytes_read, 3);
        let third = channel.read(&mut buf[6..], &cancel).await.unwrap();
        assert_eq!(third.bytes_read, 2);
        assert!(third.end_of_message);
        assert_eq!(&buf[..8], b"abcdefgh");
    }

    #[tokio::test]
    async fn read_capped_by_buffer() {
        let bytes = wire(&[(true, Opcode::Binary, b"0123456789")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 4];
        let result = channel.read(&mut buf, &cancel).await.unwrap();
        assert_eq!(result.bytes_read, 4);
        assert!(!result.end_of_message);

        let empty = channel.read(&mut [], &cancel).await.unwrap();
        assert_eq!(empty.bytes_read, 0);
        assert!(!empty.end_of_message);
    }

    #[tokio::test]
    async fn continuation_frames_share_kind() {
        let bytes = wire(&[
            (false, Opcode::Text, b"ab"),
            (false, Opcode::Continuation, b"cd"),
            (true, Opcode::Continuation, b"e"),
        ]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Client);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 8];
        let a = channel.read(&mut buf, &cancel).await.unwrap();
        let b = channel.read(&mut buf[2..], &cancel).await.unwrap();
        let c = channel.read(&mut buf[4..], &cancel).await.unwrap();

        assert_eq!([a.kind, b.kind, c.kind], [FrameKind::Text; 3]);
        assert_eq!(
            [a.end_of_message, b.end_of_message, c.end_of_message],
            [false, false, true]
        );
        assert_eq!(&buf[..5], b"abcde");
    }

    #[tokio::test]
    async fn empty_final_frame() {
        let bytes = wire(&[(true, Opcode::Binary, b"")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let result = channel
            .read(&mut [], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.bytes_read, 0);
        assert!(result.end_of_message);
        assert_eq!(result.kind, FrameKind::Binary);
    }

    #[tokio::test]
    async fn empty_continuations_are_skipped() {
        let bytes = wire(&[
            (false, Opcode::Binary, b""),
            (false, Opcode::Continuation, b""),
            (true, Opcode::Continuation, b""),
        ]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let result = channel
            .read(&mut [], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.bytes_read, 0);
        assert!(result.end_of_message);
        assert_eq!(result.kind, FrameKind::Binary);
    }

    #[tokio::test]
    async fn close_frame_moves_state() {
        let bytes = wire(&[close_frame()]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 8];
        let result = channel.read(&mut buf, &cancel).await.unwrap();
        assert_eq!(result, ReadResult::close());
        assert_eq!(channel.state(), ChannelState::ClosingReceived);
        assert_eq!(
            channel.peer_close().and_then(|c| c.status),
            Some(CloseStatus::NORMAL_CLOSURE)
        );

        let err = channel.read(&mut buf, &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChannelClosed {
                state: ChannelState::ClosingReceived
            }
        ));

        channel
            .close(CloseStatus::NORMAL_CLOSURE, "", &cancel)
            .await
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn closed_channel_rejects_everything() {
        let bytes = wire(&[close_frame()]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Client);
        let cancel = CancellationToken::new();

        channel
            .close(CloseStatus::NORMAL_CLOSURE, "done", &cancel)
            .await
            .unwrap();
        assert_eq!(channel.state(), ChannelState::ClosingSent);
        let err = channel
            .write(b"late", FrameKind::Binary, true, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::ChannelClosed { .. }));

        channel.read(&mut [0u8; 4], &cancel).await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);

        assert!(matches!(
            channel.read(&mut [0u8; 4], &cancel).await,
            Err(FrameError::ChannelClosed {
                state: ChannelState::Closed
            })
        ));
        assert!(matches!(
            channel.close(CloseStatus::NORMAL_CLOSURE, "", &cancel).await,
            Err(FrameError::ChannelClosed { .. })
        ));
    }

    #[tokio::test]
    async fn ping_is_answered_mid_message() {
        let bytes = wire(&[
            (false, Opcode::Binary, b"he"),
            (true, Opcode::Ping, b"!"),
            (true, Opcode::Continuation, b"llo"),
        ]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 8];
        let first = channel.read(&mut buf, &cancel).await.unwrap();
        let second = channel.read(&mut buf[2..], &cancel).await.unwrap();
        assert_eq!(first.bytes_read + second.bytes_read, 5);
        assert!(second.end_of_message);
        assert_eq!(&buf[..5], b"hello");

        let pong = wire(&[(true, Opcode::Pong, b"!")]);
        assert_eq!(channel.get_ref().written, pong);
    }

    #[tokio::test]
    async fn masked_frames_are_unmasked() {
        let key = [1, 2, 3, 4];
        let mut payload = *b"masked";
        apply_mask(key, 0, &mut payload);
        let mut bytes = vec![0x82, 0x80 | 6];
        bytes.extend_from_slice(&key);
        bytes.extend_from_slice(&payload);

        // Two-byte chunks force the mask offset to carry across reads.
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 2), Role::Server);
        let cancel = CancellationToken::new();
        let mut buf = [0u8; 6];
        let mut filled = 0;
        loop {
            let result = channel.read(&mut buf[filled..], &cancel).await.unwrap();
            filled += result.bytes_read;
            if result.end_of_message {
                break;
            }
        }
        assert_eq!(&buf, b"masked");
    }

    #[tokio::test]
    async fn eof_without_close_is_unexpected() {
        let mut channel = FramedChannel::new(ChunkedStream::new(Vec::new(), 64), Role::Server);
        let err = channel
            .read(&mut [0u8; 4], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEndOfChannel));
    }

    #[tokio::test]
    async fn eof_mid_payload_is_unexpected() {
        let mut bytes = wire(&[(true, Opcode::Binary, b"truncated")]);
        bytes.truncate(5);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        let mut buf = [0u8; 16];
        let first = channel.read(&mut buf, &cancel).await.unwrap();
        assert_eq!(first.bytes_read, 3);
        let err = channel.read(&mut buf[3..], &cancel).await.unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEndOfChannel));
    }

    #[tokio::test]
    async fn unexpected_continuation_rejected() {
        let bytes = wire(&[(true, Opcode::Continuation, b"x")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let err = channel
            .read(&mut [0u8; 4], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::Protocol(_)));
    }

    #[tokio::test]
    async fn new_message_mid_message_rejected() {
        let bytes = wire(&[(false, Opcode::Text, b"a"), (true, Opcode::Binary, b"b")]);
        let mut channel = FramedChannel::new(ChunkedStream::new(bytes, 64), Role::Server);
        let cancel = CancellationToken::new();

        channel.read(&mut [0u8; 4], &cancel).await.unwrap();
        let err = channel.read(&mut [0u8; 4], &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::KindChanged {
                expected: FrameKind::Text,
                found: FrameKind::Binary
            }
        ));
    }

    #[tokio::test]
    async fn oversized_incoming_frame_rejected() {
        let bytes = wire(&[(true, Opcode::Binary, &[0u8; 64])]);
        let config = FrameConfig {
            max_incoming_frame: 16,
            ..FrameConfig::default()
        };
        let mut channel =
            FramedChannel::with_config(ChunkedStream::new(bytes, 64), Role::Server, config);
        let err = channel
            .read(&mut [0u8; 128], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 64, max: 16 }));
    }

    #[tokio::test]
    async fn write_is_partial_above_frame_limit() {
        let config = FrameConfig {
            max_frame_payload: 4,
            ..FrameConfig::default()
        };
        let mut channel =
            FramedChannel::with_config(Cursor::new(Vec::<u8>::new()), Role::Client, config);
        let cancel = CancellationToken::new();

        let first = channel
            .write(b"abcdef", FrameKind::Binary, true, &cancel)
            .await
            .unwrap();
        assert_eq!(first, 4);
        let second = channel
            .write(b"ef", FrameKind::Binary, true, &cancel)
            .await
            .unwrap();
        assert_eq!(second, 2);

        let expected = wire(&[
            (false, Opcode::Binary, b"abcd"),
            (true, Opcode::Continuation, b"ef"),
        ]);
        assert_eq!(channel.into_inner().into_inner(), expected);
    }

    #[tokio::test]
    async fn write_rejects_kind_change_and_close_kind() {
        let mut channel = FramedChannel::new(Cursor::new(Vec::<u8>::new()), Role::Client);
        let cancel = CancellationToken::new();

        channel
            .write(b"a", FrameKind::Text, false, &cancel)
            .await
            .unwrap();
        let err = channel
            .write(b"b", FrameKind::Binary, true, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::KindChanged { .. }));

        let err = channel
            .write(b"", FrameKind::Close, true, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::Protocol(_)));
    }

    #[tokio::test]
    async fn cancelled_read_leaves_state_unchanged() {
        let (client, _server) = tokio::io::duplex(64);
        let mut channel = FramedChannel::new(client, Role::Client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = channel.read(&mut [0u8; 4], &cancel).await.unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
        assert_eq!(channel.state(), ChannelState::Open);

        let err = channel
            .close(CloseStatus::NORMAL_CLOSURE, "", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn cancel_while_waiting_for_data() {
        let (client, _server) = tokio::io::duplex(64);
        let mut channel = FramedChannel::new(client, Role::Client);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = channel.read(&mut [0u8; 4], &cancel).await.unwrap_err();
        assert!(matches!(err, FrameError::Cancelled));
        assert_eq!(channel.state(), ChannelState::Open);
    }
}
