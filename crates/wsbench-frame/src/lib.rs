//! Fragment framing and message reassembly for WebSocket-style channels.
//!
//! This is the core of wsbench. Messages travel as RFC 6455 frames:
//! - A FIN bit and a 4-bit opcode (continuation, text, binary, close, ping, pong)
//! - A 7, 16 or 64-bit payload length
//! - An optional 4-byte masking key, honoured on receive
//!
//! [`ByteChannel`] moves fragments with partial-transfer semantics.
//! [`FragmentReassembler`] turns those partial reads into complete messages
//! inside the caller's buffer, and [`send_message`] loops over partial writes.

pub mod channel;
pub mod codec;
pub mod error;
pub mod framed;
pub mod reassembler;
pub mod replay;
pub mod writer;

#[cfg(test)]
mod test_util;

pub use channel::{
    ByteChannel, ChannelState, CloseFrame, CloseStatus, FrameKind, ReadResult, Role,
};
pub use codec::{
    encode_frame, encoded_frame_len, FrameConfig, Opcode, DEFAULT_MAX_FRAME_PAYLOAD,
    DEFAULT_MAX_INCOMING_FRAME, MAX_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use framed::FramedChannel;
pub use reassembler::{Fragment, FragmentReassembler, Message, ReassemblyCursor};
pub use replay::CyclicReplayChannel;
pub use writer::{send_fragmented, send_message};
