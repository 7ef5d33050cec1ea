use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};
use wsbench_frame::{send_message, ByteChannel, Role};

use crate::endpoint::MessageEndpoint;
use crate::error::{EndpointError, Result};

/// Totals for one side of an echo run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EchoStats {
    pub round_trips: u64,
    /// Payload bytes received.
    pub bytes: u64,
}

impl<C: ByteChannel> MessageEndpoint<C> {
    /// Run the echo workload for this endpoint's role.
    ///
    /// The client sends `payload` and waits for it to come back, once per
    /// configured message, then closes. The server echoes until it sees the
    /// client's close.
    pub async fn run_echo(
        &mut self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<EchoStats> {
        match self.config.role {
            Role::Client => self.echo_client(payload, cancel).await,
            Role::Server => self.echo_server(cancel).await,
        }
    }

    /// Echo every message back until the peer closes.
    pub async fn echo_server(&mut self, cancel: &CancellationToken) -> Result<EchoStats> {
        let mut stats = EchoStats::default();
        loop {
            let message = self
                .reassembler
                .receive_message(&mut self.buffer, cancel)
                .await?;
            if message.is_close() {
                break;
            }
            let len = message.len();
            let kind = message.kind();
            self.check_size(len)?;

            send_message(
                self.reassembler.channel_mut(),
                &self.buffer[..len],
                kind,
                cancel,
            )
            .await?;
            stats.round_trips += 1;
            stats.bytes += len as u64;
            trace!(round_trip = stats.round_trips, "echoed message");
        }

        self.acknowledge_close(cancel).await?;
        info!(
            round_trips = stats.round_trips,
            bytes = stats.bytes,
            "echo server finished"
        );
        Ok(stats)
    }

    /// Send `payload` and wait for the echo, `message_count` times, then close.
    pub async fn echo_client(
        &mut self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<EchoStats> {
        self.check_size(payload.len())?;

        let count = self.config.message_count;
        let mut stats = EchoStats::default();
        for _ in 0..count {
            self.send(payload, cancel).await?;
            let message = self
                .reassembler
                .receive_message(&mut self.buffer, cancel)
                .await?;
            if message.is_close() {
                return Err(EndpointError::violation(
                    "round trips before close",
                    count,
                    stats.round_trips as usize,
                ));
            }
            let len = message.len();
            self.check_size(len)?;
            stats.round_trips += 1;
            stats.bytes += len as u64;
        }

        self.close(cancel).await?;
        info!(
            round_trips = stats.round_trips,
            bytes = stats.bytes,
            "echo client finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wsbench_frame::{ChannelState, FrameKind, FramedChannel};

    use super::*;
    use crate::config::EndpointConfig;
    use crate::payload::random_payload;

    type DuplexEndpoint = MessageEndpoint<FramedChannel<tokio::io::DuplexStream>>;

    fn pair(config: &EndpointConfig) -> (DuplexEndpoint, DuplexEndpoint) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let client = config.clone().with_role(Role::Client);
        let server = config.clone().with_role(Role::Server);
        (
            MessageEndpoint::new(FramedChannel::new(a, Role::Client), client),
            MessageEndpoint::new(FramedChannel::new(b, Role::Server), server),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ten_thousand_round_trips() {
        let config = EndpointConfig {
            message_size: 100,
            message_count: 10_000,
            ..EndpointConfig::default()
        };
        let (mut client, mut server) = pair(&config);
        let payload = random_payload(config.message_size);

        let server_task = tokio::spawn(async move {
            let stats = server.run_echo(&[], &CancellationToken::new()).await?;
            Ok::<_, EndpointError>((stats, server.state()))
        });

        let stats = client
            .run_echo(&payload, &CancellationToken::new())
            .await
            .unwrap();
        let (server_stats, server_state) = server_task.await.unwrap().unwrap();

        assert_eq!(stats.round_trips, 10_000);
        assert_eq!(stats.bytes, 1_000_000);
        assert_eq!(server_stats, stats);
        assert_eq!(client.state(), ChannelState::Closed);
        assert_eq!(server_state, ChannelState::Closed);
    }

    #[tokio::test]
    async fn empty_messages_echo() {
        let config = EndpointConfig {
            message_size: 0,
            message_count: 50,
            ..EndpointConfig::default()
        };
        let (mut client, mut server) = pair(&config);
        let server_task =
            tokio::spawn(async move { server.echo_server(&CancellationToken::new()).await });

        let stats = client
            .echo_client(&[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.round_trips, 50);
        assert_eq!(stats.bytes, 0);
        assert_eq!(server_task.await.unwrap().unwrap().round_trips, 50);
    }

    #[tokio::test]
    async fn wrong_size_response_is_fatal() {
        let config = EndpointConfig {
            message_size: 8,
            message_count: 1,
            ..EndpointConfig::default()
        };
        let (mut client, server) = pair(&config);
        let cancel = CancellationToken::new();

        // A misbehaving server that answers with a shorter message.
        let mut rogue = server.into_channel();
        let server_task = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let mut buf = [0u8; 8];
            let mut filled = 0;
            loop {
                let result = rogue.read(&mut buf[filled..], &cancel).await.unwrap();
                filled += result.bytes_read;
                if result.end_of_message {
                    break;
                }
            }
            send_message(&mut rogue, &buf[..4], FrameKind::Binary, &cancel)
                .await
                .unwrap();
            rogue
        });

        let err = client
            .echo_client(&random_payload(8), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            EndpointError::ProtocolInvariantViolation {
                what: "message size",
                expected: 8,
                observed: 4
            }
        ));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn early_close_is_fatal() {
        let config = EndpointConfig {
            message_size: 4,
            message_count: 3,
            close_timeout: Duration::from_millis(200),
            ..EndpointConfig::default()
        };
        let (mut client, mut server) = pair(&config);

        let server_task = tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let message = server.receive(&cancel).await.unwrap();
            let payload = message.payload().to_vec();
            server.send(&payload, &cancel).await.unwrap();
            server.close(&cancel).await
        });

        let err = client
            .echo_client(b"data", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EndpointError::ProtocolInvariantViolation {
                what: "round trips before close",
                expected: 3,
                observed: 1
            }
        ));

        client
            .acknowledge_close(&CancellationToken::new())
            .await
            .unwrap();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn client_payload_must_match_size() {
        let config = EndpointConfig {
            message_size: 4,
            ..EndpointConfig::default()
        };
        let (mut client, _server) = pair(&config);
        let err = client
            .echo_client(b"abc", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
