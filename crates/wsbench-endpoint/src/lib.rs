//! Message endpoints for echo and broadcast workloads.
//!
//! This is the workload layer. A [`MessageEndpoint`] owns one channel and
//! drives it through a fixed pattern, checking every message's size and
//! count, and finishes with a close handshake under a deadline.

pub mod broadcast;
pub mod config;
pub mod deadline;
pub mod echo;
pub mod endpoint;
pub mod error;
pub mod payload;

pub use broadcast::BroadcastStats;
pub use config::{EndpointConfig, DEFAULT_CLOSE_TIMEOUT};
pub use deadline::{deadline_token, Deadline};
pub use echo::EchoStats;
pub use endpoint::MessageEndpoint;
pub use error::{EndpointError, Result};
pub use payload::random_payload;
