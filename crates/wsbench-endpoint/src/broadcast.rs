use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wsbench_frame::{ByteChannel, Role};

use crate::deadline::Deadline;
use crate::endpoint::MessageEndpoint;
use crate::error::{EndpointError, Result};

/// Totals for one side of a broadcast run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub messages: u64,
    /// Payload bytes sent (producer) or received (consumer).
    pub bytes: u64,
}

impl<C: ByteChannel> MessageEndpoint<C> {
    /// Run the broadcast workload for this endpoint's role.
    ///
    /// The server produces and the client consumes.
    pub async fn run_broadcast(
        &mut self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<BroadcastStats> {
        match self.config.role {
            Role::Server => self.produce(payload, cancel).await,
            Role::Client => self.consume(cancel).await,
        }
    }

    /// Send `payload` back to back `message_count` times, then close.
    pub async fn produce(
        &mut self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<BroadcastStats> {
        self.check_size(payload.len())?;

        let mut stats = BroadcastStats::default();
        for _ in 0..self.config.message_count {
            self.send(payload, cancel).await?;
            stats.messages += 1;
            stats.bytes += payload.len() as u64;
        }

        self.close(cancel).await?;
        info!(
            messages = stats.messages,
            bytes = stats.bytes,
            "broadcast producer finished"
        );
        Ok(stats)
    }

    /// Count complete messages until the producer closes, then acknowledge.
    ///
    /// The receive phase runs under `receive_timeout` when one is configured.
    pub async fn consume(&mut self, cancel: &CancellationToken) -> Result<BroadcastStats> {
        let deadline = self
            .config
            .receive_timeout
            .map(|timeout| Deadline::start(cancel, timeout));
        let token = deadline.as_ref().map_or(cancel, |d| d.token());

        let mut stats = BroadcastStats::default();
        loop {
            let message = match self.reassembler.receive_message(&mut self.buffer, token).await {
                Ok(message) => message,
                Err(err) => {
                    return Err(match &deadline {
                        Some(deadline) => deadline.map_err(err),
                        None => err.into(),
                    })
                }
            };
            if message.is_close() {
                break;
            }
            let len = message.len();
            self.check_size(len)?;
            stats.messages += 1;
            stats.bytes += len as u64;
        }
        drop(deadline);

        let expected = self.config.message_count;
        if stats.messages != expected as u64 {
            return Err(EndpointError::violation(
                "message count",
                expected,
                stats.messages as usize,
            ));
        }

        self.acknowledge_close(cancel).await?;
        info!(
            messages = stats.messages,
            bytes = stats.bytes,
            "broadcast consumer finished"
        );
        Ok(stats)
    }
}
