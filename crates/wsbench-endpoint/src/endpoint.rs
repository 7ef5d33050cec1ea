use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wsbench_frame::{
    send_message, ByteChannel, ChannelState, CloseStatus, FragmentReassembler, FrameKind,
    Message,
};

use crate::config::EndpointConfig;
use crate::deadline::Deadline;
use crate::error::{EndpointError, Result};

/// One side of a benchmark workload, driving a channel it owns.
///
/// Received messages land in a buffer sized to exactly one message, so a
/// larger message fails with `MessageTooLarge` instead of being truncated.
pub struct MessageEndpoint<C> {
    pub(crate) reassembler: FragmentReassembler<C>,
    pub(crate) buffer: Vec<u8>,
    pub(crate) config: EndpointConfig,
}

impl<C: ByteChannel> MessageEndpoint<C> {
    pub fn new(channel: C, config: EndpointConfig) -> Self {
        Self {
            reassembler: FragmentReassembler::new(channel),
            buffer: vec![0u8; config.message_size],
            config,
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Close-handshake state of the underlying channel.
    pub fn state(&self) -> ChannelState {
        self.reassembler.channel().state()
    }

    pub fn channel(&self) -> &C {
        self.reassembler.channel()
    }

    pub fn into_channel(self) -> C {
        self.reassembler.into_inner()
    }

    /// Receive the next complete message into the endpoint's buffer.
    ///
    /// An oversized or malformed message closes the channel with
    /// `MESSAGE_TOO_BIG` or `PROTOCOL_ERROR` before the error is returned.
    pub async fn receive(&mut self, cancel: &CancellationToken) -> Result<Message<'_>> {
        match self
            .reassembler
            .receive_message(&mut self.buffer, cancel)
            .await
        {
            Ok(message) => Ok(message),
            Err(err) => {
                let channel = self.reassembler.channel_mut();
                if let Some(status) = err.close_status() {
                    if channel.state().can_write() {
                        if let Err(close_err) = channel.close(status, "", cancel).await {
                            debug!(%status, error = %close_err, "failed to send close");
                        }
                    }
                }
                Err(err.into())
            }
        }
    }

    /// Send one binary message.
    pub async fn send(&mut self, payload: &[u8], cancel: &CancellationToken) -> Result<()> {
        send_message(
            self.reassembler.channel_mut(),
            payload,
            FrameKind::Binary,
            cancel,
        )
        .await?;
        Ok(())
    }

    /// Fail unless `len` is the configured message size.
    pub fn check_size(&self, len: usize) -> Result<()> {
        if len != self.config.message_size {
            return Err(EndpointError::violation(
                "message size",
                self.config.message_size,
                len,
            ));
        }
        Ok(())
    }

    /// Start the close handshake and wait for the peer's acknowledgment.
    ///
    /// Data messages that arrive before the peer's close are dropped. Fails
    /// with [`EndpointError::Timeout`] when no acknowledgment arrives within
    /// the configured close timeout.
    pub async fn close(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.reassembler
            .channel_mut()
            .close(CloseStatus::NORMAL_CLOSURE, "", cancel)
            .await?;
        if self.state() == ChannelState::Closed {
            // The peer's close arrived first; ours was the acknowledgment.
            debug!(role = %self.config.role, "close handshake complete");
            return Ok(());
        }

        let deadline = Deadline::start(cancel, self.config.close_timeout);
        let mut dropped = 0usize;
        loop {
            let message = match self
                .reassembler
                .receive_message(&mut self.buffer, deadline.token())
                .await
            {
                Ok(message) => message,
                Err(err) => {
                    let err = deadline.map_err(err);
                    if matches!(err, EndpointError::Timeout(_)) {
                        warn!(
                            timeout = ?self.config.close_timeout,
                            role = %self.config.role,
                            "peer did not acknowledge close"
                        );
                    }
                    return Err(err);
                }
            };
            if message.is_close() {
                break;
            }
            dropped += 1;
        }

        debug!(
            role = %self.config.role,
            dropped,
            state = %self.state(),
            "close handshake complete"
        );
        Ok(())
    }

    /// Answer a close received from the peer with our own.
    pub async fn acknowledge_close(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state() != ChannelState::ClosingReceived {
            return Ok(());
        }
        self.reassembler
            .channel_mut()
            .close(CloseStatus::NORMAL_CLOSURE, "", cancel)
            .await?;
        debug!(role = %self.config.role, state = %self.state(), "close acknowledged");
        Ok(())
    }
}

impl<C: ByteChannel> std::fmt::Debug for MessageEndpoint<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageEndpoint")
            .field("config", &self.config)
            .field("cursor", &self.reassembler.cursor())
            .finish()
    }
}
