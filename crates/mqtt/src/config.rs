//! Broker connection configuration.
//!
//! All types deserialize with serde (the agent loads them from the `[mqtt]`
//! section of its TOML configuration) and carry `validator` constraints so a
//! bad configuration fails at load time with a field-specific message, not at
//! connect time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::backoff::Backoff;

/// Broker connection settings consumed by [`MqttPublisher`](crate::MqttPublisher).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Broker hostname or IP address. DNS resolution happens at connect time.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Broker host must be between 1 and 255 characters"
    ))]
    pub broker: String,

    /// Broker port. 1883 for plain TCP, 8883 for TLS by convention.
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Client identifier presented to the broker. An empty value is replaced
    /// with a generated UUID at connect time.
    #[validate(length(max = 64, message = "Client id must not exceed 64 characters"))]
    pub client_id: String,

    /// Optional username for broker authentication. Credentials are only
    /// applied when both username and password are present.
    pub username: Option<String>,

    /// Optional password for broker authentication.
    pub password: Option<String>,

    /// Default Quality of Service for publishes: 0 at-most-once,
    /// 1 at-least-once, 2 exactly-once. The delivery contract of this agent
    /// is at-least-once, so 1 is the default.
    #[validate(range(min = 0, max = 2, message = "QoS must be 0, 1, or 2"))]
    pub qos: u8,

    /// Topic namespace. Telemetry goes to `{topic_prefix}/telemetry`;
    /// [`publish_json`](crate::MqttPublisher::publish_json) appends its own
    /// suffix.
    #[validate(length(min = 1, message = "Topic prefix must not be empty"))]
    pub topic_prefix: String,

    /// Keep-alive interval in seconds. The client pings the broker at this
    /// cadence when the link is otherwise idle.
    #[validate(range(
        min = 10,
        max = 3600,
        message = "Keepalive must be between 10 and 3600 seconds"
    ))]
    pub keepalive: u64,

    /// How long a single connection attempt may wait for the broker's CONNACK
    /// before it counts as failed.
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connection timeout must be between 1 and 300 seconds"
    ))]
    pub connection_timeout: u64,

    /// Retry policy shared by the initial connect and the reconnection loop.
    #[validate(nested)]
    pub reconnect: ReconnectConfig,

    /// Transport security settings.
    pub tls: TlsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            broker: "localhost".to_string(),
            port: 1883,
            client_id: format!("hivelink-{}", Uuid::new_v4()),
            username: None,
            password: None,
            qos: 1,
            topic_prefix: "hivelink".to_string(),
            keepalive: 60,
            connection_timeout: 10,
            reconnect: ReconnectConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

impl Config {
    /// True when both credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Backoff/retry policy for broker connections.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Attempts before giving up. Applies independently to the initial
    /// connect and to each reconnection episode.
    #[validate(range(min = 1, message = "At least one attempt is required"))]
    pub max_retries: u32,

    /// Delay in seconds before the first retry.
    #[validate(range(min = 1, message = "Initial delay must be at least 1 second"))]
    pub initial_delay: u64,

    /// Cap on the backoff delay in seconds.
    #[validate(range(min = 1, message = "Max delay must be at least 1 second"))]
    pub max_delay: u64,

    /// Multiplicative growth factor applied to the delay after each attempt.
    #[validate(range(min = 1.0, message = "Backoff multiplier must be at least 1.0"))]
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_retries: 10,
            initial_delay: 1,
            max_delay: 300,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Builds a fresh [`Backoff`] controller following this policy.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            std::time::Duration::from_secs(self.initial_delay),
            std::time::Duration::from_secs(self.max_delay),
            self.backoff_multiplier,
            self.max_retries,
        )
    }
}

/// Certificate-based transport security.
///
/// Paths are checked for existence when the client is built, not when the
/// configuration is parsed, so a deployment can render the config before the
/// certificates land on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Master switch. When false the remaining fields are ignored.
    pub enabled: bool,

    /// CA certificate bundle (PEM). Required when TLS is enabled.
    pub ca_certs: Option<String>,

    /// Client certificate (PEM) for mutual TLS. Must be paired with
    /// `keyfile`.
    pub certfile: Option<String>,

    /// Client private key (PEM, unencrypted). Must be paired with
    /// `certfile`.
    pub keyfile: Option<String>,
}

impl TlsConfig {
    /// True when both halves of the client-auth pair are present.
    pub fn has_client_auth(&self) -> bool {
        self.certfile.is_some() && self.keyfile.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = Config::default();
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos, 1);
        assert_eq!(config.keepalive, 60);
        assert_eq!(config.connection_timeout, 10);
        assert_eq!(config.reconnect.max_retries, 10);
        assert_eq!(config.reconnect.initial_delay, 1);
        assert_eq!(config.reconnect.max_delay, 300);
        assert_eq!(config.reconnect.backoff_multiplier, 2.0);
        assert!(!config.tls.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn generated_client_ids_are_unique() {
        assert_ne!(Config::default().client_id, Config::default().client_id);
    }

    #[test]
    fn out_of_range_qos_fails_validation() {
        let config = Config {
            qos: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_topic_prefix_fails_validation() {
        let config = Config {
            topic_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut config = Config::default();
        assert!(!config.has_credentials());

        config.username = Some("edge".into());
        assert!(!config.has_credentials());

        config.password = Some("secret".into());
        assert!(config.has_credentials());
    }

    #[test]
    fn reconnect_policy_builds_matching_backoff() {
        let policy = ReconnectConfig {
            max_retries: 3,
            initial_delay: 2,
            max_delay: 8,
            backoff_multiplier: 2.0,
        };
        let mut backoff = policy.backoff();
        assert_eq!(backoff.max_attempts(), 3);
        assert_eq!(
            backoff.next_sleep().unwrap(),
            std::time::Duration::from_secs(2)
        );
        assert_eq!(
            backoff.next_sleep().unwrap(),
            std::time::Duration::from_secs(4)
        );
    }
}
