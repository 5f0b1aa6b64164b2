//! Connection state tracking for the broker link.
//!
//! The publisher exposes its lifecycle through a single authoritative
//! [`ConnectionState`] value held in a `tokio::sync::watch` channel. The poll
//! thread reads it before every publish while the connection driver writes it
//! from the transport side; the watch channel guarantees readers never observe
//! a partially updated state.
//!
//! Lifecycle:
//! - `Disconnected -> Connecting -> Connected` (initial handshake)
//! - `Connected -> Reconnecting -> Connected` (unexpected disconnect, recovered)
//! - `Reconnecting -> Disconnected` (retry cap exhausted; terminal until the
//!   caller connects again)

use std::fmt;

use tokio::sync::watch;
use tracing::{info, warn};

/// Current state of the broker connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// No broker session exists. The `String` carries the reason: the initial
    /// "never connected", a caller-initiated close, or the terminal failure
    /// after retry exhaustion.
    Disconnected(String),

    /// A connection attempt is in progress: the transport session is being
    /// established and the client is waiting for the broker's CONNACK.
    /// Publishes fail immediately in this state.
    Connecting,

    /// Handshake completed; publishes are accepted by the transport.
    Connected,

    /// The broker link was lost after having been established and the
    /// reconnection loop is running. The `f64` is the backoff delay in
    /// seconds before the next attempt.
    Reconnecting(f64),
}

impl ConnectionState {
    /// Short static identifier, useful for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
        }
    }

    /// Contextual detail: the disconnect reason or the pending retry delay.
    pub fn details(&self) -> String {
        match self {
            ConnectionState::Disconnected(reason) => reason.clone(),
            ConnectionState::Connecting | ConnectionState::Connected => String::new(),
            ConnectionState::Reconnecting(seconds) => format!("next attempt in {seconds:.1}s"),
        }
    }

    /// True only in `Connected`; the sole state in which a publish may reach
    /// the transport.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())?;
        let details = self.details();
        if !details.is_empty() {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// Publishes a state transition on the watch channel, skipping no-op updates.
///
/// Transitions are logged at info level; a send failure means every receiver
/// (including the publisher's own) is gone, which only happens during
/// teardown.
pub(crate) fn transition(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let changed = *tx.borrow() != next;
    if changed {
        info!("Broker connection state: {}", next);
        if tx.send(next).is_err() {
            warn!("Connection state has no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_as_str() {
        assert_eq!(
            ConnectionState::Disconnected("never connected".into()).as_str(),
            "Disconnected"
        );
        assert_eq!(ConnectionState::Connecting.as_str(), "Connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(ConnectionState::Reconnecting(2.0).as_str(), "Reconnecting");
    }

    #[test]
    fn state_details() {
        assert_eq!(ConnectionState::Connecting.details(), "");
        assert_eq!(ConnectionState::Connected.details(), "");
        assert_eq!(
            ConnectionState::Disconnected("broker closed".into()).details(),
            "broker closed"
        );
        assert_eq!(
            ConnectionState::Reconnecting(4.0).details(),
            "next attempt in 4.0s"
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Reconnecting(1.5).to_string(),
            "Reconnecting (next attempt in 1.5s)"
        );
        assert_eq!(
            ConnectionState::Disconnected("timeout".into()).to_string(),
            "Disconnected (timeout)"
        );
    }

    #[test]
    fn only_connected_allows_publishing() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Reconnecting(1.0).is_connected());
        assert!(!ConnectionState::Disconnected("x".into()).is_connected());
    }

    #[test]
    fn transition_skips_no_op_updates() {
        let (tx, mut rx) = watch::channel(ConnectionState::Connecting);

        transition(&tx, ConnectionState::Connecting);
        assert!(!rx.has_changed().unwrap());

        transition(&tx, ConnectionState::Connected);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
    }
}
