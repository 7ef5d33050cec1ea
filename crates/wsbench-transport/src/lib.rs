//! In-memory byte streams for driving WebSocket-style benchmarks.
//!
//! This is the lowest layer of wsbench. It provides byte streams that stand in
//! for a real socket:
//! - [`ReplayStream`] serves a captured byte sequence forever, wrapping at its end
//! - [`DiscardStream`] swallows every write and reports end of stream on read
//!
//! Both implement tokio's `AsyncRead` + `AsyncWrite`, so the framing layer can
//! wrap them exactly like a socket.

pub mod cyclic;
pub mod discard;
pub mod error;
pub mod replay;

pub use cyclic::CyclicBuffer;
pub use discard::DiscardStream;
pub use error::{Result, TransportError};
pub use replay::ReplayStream;
