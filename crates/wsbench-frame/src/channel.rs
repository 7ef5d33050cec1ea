//! The duplex fragment channel abstraction and its vocabulary types.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// The kind of message a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    Binary,
    /// Connection close. Close fragments never carry payload to the caller.
    Close,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Text => f.write_str("text"),
            FrameKind::Binary => f.write_str("binary"),
            FrameKind::Close => f.write_str("close"),
        }
    }
}

/// Close-handshake progress of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Open,
    /// We sent a close frame; the peer's close has not arrived yet.
    ClosingSent,
    /// The peer sent a close frame; ours has not been sent yet.
    ClosingReceived,
    /// Both close frames have been exchanged.
    Closed,
}

impl ChannelState {
    /// Whether fragments may still be read.
    pub fn can_read(self) -> bool {
        matches!(self, ChannelState::Open | ChannelState::ClosingSent)
    }

    /// Whether data fragments or a close frame may still be written.
    pub fn can_write(self) -> bool {
        matches!(self, ChannelState::Open | ChannelState::ClosingReceived)
    }

    /// State after sending a close frame.
    pub fn on_close_sent(self) -> Self {
        match self {
            ChannelState::Open => ChannelState::ClosingSent,
            _ => ChannelState::Closed,
        }
    }

    /// State after receiving a close frame.
    pub fn on_close_received(self) -> Self {
        match self {
            ChannelState::Open => ChannelState::ClosingReceived,
            _ => ChannelState::Closed,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Open => f.write_str("open"),
            ChannelState::ClosingSent => f.write_str("closing (close sent)"),
            ChannelState::ClosingReceived => f.write_str("closing (close received)"),
            ChannelState::Closed => f.write_str("closed"),
        }
    }
}

/// Close status code carried in a close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseStatus(pub u16);

impl CloseStatus {
    pub const NORMAL_CLOSURE: CloseStatus = CloseStatus(1000);
    pub const GOING_AWAY: CloseStatus = CloseStatus(1001);
    pub const PROTOCOL_ERROR: CloseStatus = CloseStatus(1002);
    pub const MESSAGE_TOO_BIG: CloseStatus = CloseStatus(1009);

    pub fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A close frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// `None` when the peer sent an empty close payload.
    pub status: Option<CloseStatus>,
    pub reason: String,
}

/// Which side of the connection a channel plays.
///
/// Only decides who starts the close sequence; framing is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    /// The role on the other end of the connection.
    pub fn peer(self) -> Self {
        match self {
            Role::Server => Role::Client,
            Role::Client => Role::Server,
        }
    }

    pub fn is_server(self) -> bool {
        self == Role::Server
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => f.write_str("server"),
            Role::Client => f.write_str("client"),
        }
    }
}

/// Outcome of a single [`ByteChannel::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Bytes copied into the caller's buffer.
    pub bytes_read: usize,
    /// Whether this read completed the current message.
    pub end_of_message: bool,
    pub kind: FrameKind,
}

impl ReadResult {
    /// A close frame was received.
    pub fn close() -> Self {
        Self {
            bytes_read: 0,
            end_of_message: true,
            kind: FrameKind::Close,
        }
    }
}

/// A duplex channel that moves message fragments with partial-transfer semantics.
///
/// `read` and `write` may transfer fewer bytes than requested; callers loop.
/// A read that returns zero bytes without `end_of_message` means "try again",
/// never end of stream: a channel reports a vanished peer as
/// [`FrameError::UnexpectedEndOfChannel`](crate::FrameError::UnexpectedEndOfChannel).
///
/// Every operation takes a cancellation token. A cancelled operation returns
/// [`FrameError::Cancelled`](crate::FrameError::Cancelled) and leaves
/// [`ChannelState`] unchanged.
pub trait ByteChannel: Send {
    /// Read the next fragment bytes of the current message into `buf`.
    fn read(
        &mut self,
        buf: &mut [u8],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ReadResult>> + Send;

    /// Write a prefix of `buf` as part of a `kind` message.
    ///
    /// Returns how many bytes were accepted. The message ends only when
    /// `end_of_message` is set and the whole of `buf` was accepted.
    fn write(
        &mut self,
        buf: &[u8],
        kind: FrameKind,
        end_of_message: bool,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Send a close frame.
    fn close(
        &mut self,
        status: CloseStatus,
        reason: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current close-handshake state.
    fn state(&self) -> ChannelState;
}
