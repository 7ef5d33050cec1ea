use crate::channel::{ChannelState, CloseStatus, FrameKind};

/// Errors that can occur while framing, sending or reassembling messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The incoming message does not fit in the caller's buffer.
    #[error("message does not fit in a {capacity}-byte buffer")]
    MessageTooLarge { capacity: usize },

    /// A frame header declares more payload than the configured maximum.
    #[error("frame payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    /// The byte stream ended without a close frame.
    #[error("channel ended without a close frame")]
    UnexpectedEndOfChannel,

    /// The operation is not permitted in the channel's close-handshake state.
    #[error("channel is {state}")]
    ChannelClosed { state: ChannelState },

    /// The caller's cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A fragment's kind differs from the message it continues.
    #[error("message kind changed mid-message (started as {expected}, got {found})")]
    KindChanged { expected: FrameKind, found: FrameKind },

    /// The peer violated the framing rules.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// An I/O error occurred on the underlying byte stream.
    #[error("frame I/O error: {0}")]
    Io(std::io::Error),

    /// The in-memory transport could not be constructed.
    #[error("transport error: {0}")]
    Transport(#[from] wsbench_transport::TransportError),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::UnexpectedEndOfChannel
        } else {
            FrameError::Io(err)
        }
    }
}

impl FrameError {
    /// Status to close with when receiving fails with this error.
    ///
    /// `None` for errors that leave nothing to tell the peer.
    pub fn close_status(&self) -> Option<CloseStatus> {
        match self {
            FrameError::MessageTooLarge { .. } | FrameError::PayloadTooLarge { .. } => {
                Some(CloseStatus::MESSAGE_TOO_BIG)
            }
            FrameError::KindChanged { .. } | FrameError::Protocol(_) => {
                Some(CloseStatus::PROTOCOL_ERROR)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
