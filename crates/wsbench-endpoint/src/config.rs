use std::time::Duration;

use serde::{Serialize, Serializer};
use wsbench_frame::Role;

/// Default time to wait for the peer's close acknowledgment.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters shared by every endpoint workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointConfig {
    /// Exact payload size of every message, in bytes.
    pub message_size: usize,
    /// Round trips (echo) or messages (broadcast) per run.
    pub message_count: usize,
    /// Which side of the workload this endpoint plays.
    #[serde(serialize_with = "serialize_display")]
    pub role: Role,
    /// How long to wait for the peer's close after sending ours.
    #[serde(serialize_with = "serialize_millis")]
    pub close_timeout: Duration,
    /// Deadline for a consumer's whole receive phase.
    #[serde(serialize_with = "serialize_optional_millis")]
    pub receive_timeout: Option<Duration>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            message_size: 100,
            message_count: 10_000,
            role: Role::Client,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            receive_timeout: None,
        }
    }
}

impl EndpointConfig {
    /// The same workload seen from the other side of the connection.
    pub fn for_peer(&self) -> Self {
        Self {
            role: self.role.peer(),
            ..self.clone()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

fn serialize_display<T: std::fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_millis<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

fn serialize_optional_millis<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EndpointConfig::default();
        assert_eq!(config.close_timeout, Duration::from_secs(5));
        assert_eq!(config.receive_timeout, None);
        assert_eq!(config.role, Role::Client);
    }

    #[test]
    fn peer_config_flips_role_only() {
        let config = EndpointConfig {
            message_size: 50,
            ..EndpointConfig::default()
        };
        let peer = config.for_peer();
        assert_eq!(peer.role, Role::Server);
        assert_eq!(peer.message_size, 50);
        assert_eq!(peer.for_peer(), config);
    }

    #[test]
    fn serializes_for_reports() {
        let config = EndpointConfig {
            receive_timeout: Some(Duration::from_millis(1500)),
            ..EndpointConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["role"], "client");
        assert_eq!(value["close_timeout"], 5000);
        assert_eq!(value["receive_timeout"], 1500);
        assert_eq!(value["message_count"], 10_000);
    }
}
