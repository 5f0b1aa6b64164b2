//! Unified error type for broker operations.
//!
//! The variants fall into the agent's failure taxonomy:
//!
//! **Startup** (fail fast): `Setup`, `Config`, `Io` — bad TLS material or
//! invalid settings, caught before any network traffic.
//!
//! **Connection** (recovered through the backoff loop, then surfaced):
//! `Handshake`, `ConnectionTimeout`, `Connection`, `RetriesExhausted`.
//!
//! **Publish** (reported per message, never retried by this layer):
//! `NotConnected`, `Rejected`, `Serialization`.

use thiserror::Error;

use super::backoff::BackoffError;

/// Errors produced by the publisher and its connection driver.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Client construction failed: unreadable certificate files, incomplete
    /// client-auth pair, or similar pre-network problems.
    #[error("Client setup error: {0}")]
    Setup(String),

    /// The broker answered the handshake with something other than a
    /// successful CONNACK (bad credentials, rejected client id, ...).
    #[error("Broker refused the connection: {0}")]
    Handshake(String),

    /// No CONNACK arrived within the configured connection timeout.
    #[error("Timed out waiting for the broker handshake")]
    ConnectionTimeout,

    /// Network-level connection failure from the transport. Boxed because
    /// `rumqttc::ConnectionError` is large.
    #[error("Broker connection error: {0}")]
    Connection(#[from] Box<rumqttc::ConnectionError>),

    /// The retry cap was exhausted without a successful connection.
    #[error("Gave up connecting: {0}")]
    RetriesExhausted(#[from] BackoffError),

    /// A publish was requested while the connection state is not `Connected`.
    /// No network operation was attempted.
    #[error("Cannot publish: not connected to the broker")]
    NotConnected,

    /// The transport did not accept the publish although the state was
    /// nominally connected (request queue closed or full).
    #[error("Publish not accepted by the transport: {0}")]
    Rejected(#[from] rumqttc::ClientError),

    /// The payload could not be serialized to its wire representation.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A QoS level outside 0..=2 was requested for a publish.
    #[error("Invalid QoS value: {0}")]
    InvalidQos(u8),

    /// Configuration validation failure.
    #[error("Configuration error: {0}")]
    Config(#[from] validator::ValidationErrors),

    /// File I/O failure, typically while loading certificate material.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rumqttc::ConnectionError> for MqttError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        MqttError::Connection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_message() {
        assert_eq!(
            MqttError::NotConnected.to_string(),
            "Cannot publish: not connected to the broker"
        );
    }

    #[test]
    fn exhaustion_carries_the_cap() {
        let err = MqttError::from(BackoffError::AttemptsExhausted(10));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "ca.pem missing");
        let err: MqttError = io.into();
        assert!(err.to_string().contains("ca.pem missing"));
    }
}
