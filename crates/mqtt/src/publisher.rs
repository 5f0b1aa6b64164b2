//! The broker publisher and its connection lifecycle.
//!
//! [`MqttPublisher`] owns the connection state machine described in
//! [`super::state`]:
//!
//! - [`connect`](MqttPublisher::connect) performs the bounded initial
//!   handshake (tries with exponential backoff between them, each try waiting
//!   for CONNACK under the connection timeout) and hands the event loop to a
//!   background [`ConnectionDriver`](super::connection::ConnectionDriver).
//! - [`publish`](MqttPublisher::publish) serializes a message to JSON and
//!   sends it to `{topic_prefix}/telemetry` with at-least-once delivery by
//!   default. Success means the transport accepted the send, not that the
//!   broker confirmed receipt.
//! - [`publish_json`](MqttPublisher::publish_json) does the same for an
//!   arbitrary JSON value on a caller-chosen topic suffix.
//! - [`disconnect`](MqttPublisher::disconnect) closes the session without
//!   triggering the reconnection loop.
//!
//! Publishing in any state other than `Connected` fails immediately with
//! [`MqttError::NotConnected`]; no network operation is attempted and the
//! message is not queued or retried by this layer.

use std::{sync::Arc, time::Duration};

use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    client::ClientBuilder,
    config::Config,
    connection::{poll_until_connack, ConnectionDriver, Observer, ObserverRegistry},
    error::MqttError,
    state::{transition, ConnectionState},
};

/// Topic suffix for the agent's telemetry stream.
const TELEMETRY_SUFFIX: &str = "telemetry";

/// MQTT publisher with automatic reconnection and observable state.
pub struct MqttPublisher {
    config: Config,
    client: Option<AsyncClient>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    observers: Arc<ObserverRegistry>,
    cancel: CancellationToken,
}

impl MqttPublisher {
    /// Creates a publisher in the `Disconnected` state.
    ///
    /// The configuration is validated here so a bad reconnect policy or topic
    /// prefix surfaces before any connection attempt.
    pub fn new(config: Config) -> Result<Self, MqttError> {
        use validator::Validate;
        config.validate()?;

        let (state_tx, state_rx) =
            watch::channel(ConnectionState::Disconnected("never connected".into()));

        Ok(Self {
            config,
            client: None,
            state_tx,
            state_rx,
            observers: Arc::new(ObserverRegistry::default()),
            cancel: CancellationToken::new(),
        })
    }

    /// Current connection state (a consistent snapshot).
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Watch receiver for reacting to state changes from other tasks.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// True when publishes would currently be accepted.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Registers an observer invoked after every successful connection
    /// (initial and reconnections).
    pub fn add_connection_callback(&self, observer: Observer) {
        self.observers.add_connected(observer);
    }

    /// Registers an observer invoked when an established connection is lost
    /// unexpectedly. Caller-initiated [`disconnect`](Self::disconnect) does
    /// not notify.
    pub fn add_disconnection_callback(&self, observer: Observer) {
        self.observers.add_disconnected(observer);
    }

    /// Connects to the broker with bounded retries.
    ///
    /// Runs up to `reconnect.max_retries` attempts with exponential backoff
    /// between them. Each attempt builds a fresh transport session and waits
    /// for the broker's CONNACK under `connection_timeout`. Returns `true`
    /// once connected; `false` after exhausting the cap, leaving the state
    /// `Disconnected`. The failure is reported, not fatal — the caller
    /// decides whether to proceed degraded.
    pub async fn connect(&mut self) -> bool {
        match self.state() {
            ConnectionState::Connected => {
                debug!("Already connected to the broker");
                return true;
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting(_) => {
                warn!("Connection attempt already in progress");
                return false;
            }
            ConnectionState::Disconnected(_) => {}
        }

        transition(&self.state_tx, ConnectionState::Connecting);
        let mut backoff = self.config.reconnect.backoff();

        loop {
            info!(
                "Attempting to connect to MQTT broker {}:{}",
                self.config.broker, self.config.port
            );

            match self.try_connect().await {
                Ok(()) => {
                    info!("Connected to MQTT broker {}", self.config.broker);
                    return true;
                }
                Err(e) => warn!("Broker connection attempt failed: {}", e),
            }

            // Sleep before the next try; the failed try above already
            // consumed one of the permitted attempts.
            match backoff.next_sleep() {
                Ok(delay) if backoff.attempt() < backoff.max_attempts() => {
                    debug!(
                        "Retrying broker connection in {:.1}s (attempt {}/{})",
                        delay.as_secs_f64(),
                        backoff.attempt() + 1,
                        backoff.max_attempts()
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    error!(
                        "Failed to connect to MQTT broker after {} attempts",
                        backoff.max_attempts()
                    );
                    transition(
                        &self.state_tx,
                        ConnectionState::Disconnected("connection attempts exhausted".into()),
                    );
                    return false;
                }
            }
        }
    }

    /// One connection attempt: session, handshake, driver hand-off.
    async fn try_connect(&mut self) -> Result<(), MqttError> {
        let (client, mut event_loop) = ClientBuilder::from_config(&self.config)?.build()?;

        let timeout = Duration::from_secs(self.config.connection_timeout);
        match tokio::time::timeout(timeout, poll_until_connack(&mut event_loop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(MqttError::ConnectionTimeout),
        }

        transition(&self.state_tx, ConnectionState::Connected);
        self.observers.notify_connected();

        // Fresh token per session so a previous disconnect cannot stop the
        // new driver.
        self.cancel = CancellationToken::new();
        let driver = ConnectionDriver::new(
            event_loop,
            self.state_tx.clone(),
            self.observers.clone(),
            self.config.reconnect.clone(),
            timeout,
            self.cancel.clone(),
        );
        tokio::spawn(driver.run());

        self.client = Some(client);
        Ok(())
    }

    /// Caller-initiated shutdown of the broker session.
    ///
    /// Stops the connection driver (so no reconnection loop starts), sends a
    /// best-effort DISCONNECT packet, and leaves the state `Disconnected`.
    /// Idempotent.
    pub async fn disconnect(&self) {
        self.cancel.cancel();

        if self.is_connected() {
            if let Some(client) = &self.client {
                if let Err(e) = client.disconnect().await {
                    debug!("Disconnect packet not sent: {}", e);
                }
            }
            info!("Disconnected from MQTT broker");
        }

        transition(
            &self.state_tx,
            ConnectionState::Disconnected("closed by caller".into()),
        );
    }

    /// Publishes a telemetry message to `{topic_prefix}/telemetry`.
    pub async fn publish<T: Serialize>(&self, message: &T) -> Result<(), MqttError> {
        self.publish_with_suffix(TELEMETRY_SUFFIX, message, None).await
    }

    /// Publishes an arbitrary JSON value to `{topic_prefix}/{topic_suffix}`.
    ///
    /// `qos` overrides the configured default when given.
    pub async fn publish_json(
        &self,
        topic_suffix: &str,
        payload: &serde_json::Value,
        qos: Option<u8>,
    ) -> Result<(), MqttError> {
        self.publish_with_suffix(topic_suffix, payload, qos).await
    }

    async fn publish_with_suffix<T: Serialize + ?Sized>(
        &self,
        suffix: &str,
        payload: &T,
        qos: Option<u8>,
    ) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        let client = self.client.as_ref().ok_or(MqttError::NotConnected)?;

        let bytes =
            serde_json::to_vec(payload).map_err(|e| MqttError::Serialization(e.to_string()))?;
        let topic = self.topic(suffix);
        let qos = to_qos(qos.unwrap_or(self.config.qos))?;

        client.publish(topic.clone(), qos, false, bytes).await?;
        debug!("Published message to {}", topic);
        Ok(())
    }

    /// Joins the configured prefix and a suffix with exactly one slash.
    fn topic(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.config.topic_prefix.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }
}

/// Maps a numeric QoS level to the transport's enum.
fn to_qos(level: u8) -> Result<QoS, MqttError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(MqttError::InvalidQos(other)),
    }
}
