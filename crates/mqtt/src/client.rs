//! Construction of the underlying MQTT client from configuration.
//!
//! [`ClientBuilder`] translates a [`Config`] into rumqttc's `MqttOptions`:
//! keep-alive, credentials, and — when enabled — a TLS transport built from
//! PEM files on disk. Certificate files are read here, at build time, so a
//! missing or unreadable file fails the connection attempt with a setup error
//! instead of a cryptic handshake failure.

use std::{fs, time::Duration};

use rumqttc::{AsyncClient, EventLoop, MqttOptions, TlsConfiguration, Transport};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    config::{Config, TlsConfig},
    error::MqttError,
};

/// Capacity of the client's internal request channel. Publishes beyond this
/// many in flight apply backpressure to the caller.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Builds the rumqttc client and event loop for one connection attempt.
pub struct ClientBuilder {
    opts: MqttOptions,
    tls: Option<TlsConfig>,
}

impl ClientBuilder {
    /// Creates a builder from the broker configuration.
    ///
    /// An empty `client_id` is replaced with a generated UUID; brokers treat
    /// duplicate ids as a takeover, so a stable unique id matters.
    pub fn from_config(config: &Config) -> Result<Self, MqttError> {
        let client_id = if config.client_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            config.client_id.clone()
        };

        let mut opts = MqttOptions::new(client_id, config.broker.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(config.keepalive));
        opts.set_clean_session(true);

        if config.has_credentials() {
            // has_credentials guarantees both halves are present
            opts.set_credentials(
                config.username.clone().unwrap_or_default(),
                config.password.clone().unwrap_or_default(),
            );
            debug!("Broker credentials configured");
        }

        let tls = config.tls.enabled.then(|| config.tls.clone());

        Ok(Self { opts, tls })
    }

    /// Assembles the TLS transport from the configured certificate files.
    fn build_tls_transport(tls: &TlsConfig) -> Result<Transport, MqttError> {
        let ca_path = tls
            .ca_certs
            .as_deref()
            .ok_or_else(|| MqttError::Setup("TLS enabled but ca_certs is not set".into()))?;
        let ca = fs::read(ca_path)?;

        let client_auth = match (&tls.certfile, &tls.keyfile) {
            (Some(cert), Some(key)) => Some((fs::read(cert)?, fs::read(key)?)),
            (None, None) => None,
            _ => {
                return Err(MqttError::Setup(
                    "certfile and keyfile must be provided together".into(),
                ));
            }
        };

        info!("Transport security configured for broker connection");
        Ok(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth,
        }))
    }

    /// Constructs the client/event-loop pair, consuming the builder.
    ///
    /// The client sends commands and may be cloned across tasks; the event
    /// loop receives broker traffic and must be polled by a single task.
    pub fn build(self) -> Result<(AsyncClient, EventLoop), MqttError> {
        let mut opts = self.opts;

        if let Some(tls) = &self.tls {
            opts.set_transport(Self::build_tls_transport(tls)?);
        }

        Ok(AsyncClient::new(opts, REQUEST_CHANNEL_CAPACITY))
    }
}
