//! WebSocket-style message framing and echo/broadcast benchmarks.
//!
//! wsbench measures the cost of moving fragmented messages through a
//! WebSocket-style channel: reassembling partial reads into whole messages,
//! looping over partial writes, and running echo and broadcast workloads
//! with a close handshake.
//!
//! # Crate Structure
//!
//! - [`transport`]: in-memory byte streams (cyclic replay, discard)
//! - [`frame`]: the channel abstraction, RFC 6455 framing and message reassembly
//! - [`endpoint`]: echo and broadcast endpoints with deadlines

/// Re-export transport types.
pub mod transport {
    pub use wsbench_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wsbench_frame::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use wsbench_endpoint::*;
}
