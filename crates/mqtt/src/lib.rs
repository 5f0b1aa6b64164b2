//! # hivelink-mqtt: reliable broker publishing for the hivelink agent
//!
//! An async MQTT publisher built on `rumqttc` with a focus on surviving the
//! flaky network links edge devices live on:
//!
//! - **Bounded connection attempts** with exponential backoff
//!   (1s → 2s → 4s → ... capped, default 10 tries)
//! - **Automatic reconnection** after unexpected disconnects, driven by a
//!   background task that owns the event loop
//! - **Observable connection state** through a watch channel
//!   (`Disconnected → Connecting → Connected`, `Connected → Reconnecting`)
//! - **At-least-once delivery** by default; QoS configurable per publisher
//!   and per JSON publish
//! - **TLS** with optional client certificates, credentials from config
//! - **Observer registries** for connection-established and disconnection
//!   events
//!
//! # Quick start
//!
//! ```ignore
//! use hivelink_mqtt::{Config, MqttPublisher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config {
//!         broker: "mqtt.example.com".into(),
//!         topic_prefix: "plant-3/edge-01".into(),
//!         ..Default::default()
//!     };
//!
//!     let mut publisher = MqttPublisher::new(config).expect("valid config");
//!     if !publisher.connect().await {
//!         eprintln!("broker unreachable, running degraded");
//!     }
//!
//!     // Publishes to "plant-3/edge-01/telemetry"
//!     let _ = publisher.publish(&serde_json::json!({"hello": "broker"})).await;
//!
//!     publisher.disconnect().await;
//! }
//! ```
//!
//! # Delivery contract
//!
//! `publish` returns `Ok` when the transport accepted the send for
//! at-least-once delivery; it does not wait for the broker's acknowledgment.
//! While the publisher is anything other than `Connected` a publish fails
//! immediately with [`MqttError::NotConnected`] — messages are never queued
//! or retried by this crate. Reconnection runs on the background driver task
//! and blocks that task for the whole backoff sequence; once the retry cap is
//! exhausted the state stays `Disconnected` until the caller connects again.

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod publisher;
pub mod state;

pub use backoff::{Backoff, BackoffError};
pub use client::ClientBuilder;
pub use config::{Config, ReconnectConfig, TlsConfig};
pub use connection::{Observer, ObserverRegistry};
pub use error::MqttError;
pub use publisher::MqttPublisher;
pub use state::ConnectionState;

/// Result alias for broker operations.
pub type Result<T> = std::result::Result<T, MqttError>;
