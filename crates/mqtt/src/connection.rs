//! Background connection driver and observer registries.
//!
//! After a successful handshake the publisher hands its event loop to a
//! [`ConnectionDriver`] task. The driver pumps broker traffic, detects
//! asynchronous disconnects (a broker DISCONNECT packet or an event-loop
//! error), and runs the reconnection loop: sleep, re-dial, wait for CONNACK,
//! widen the delay on failure. The loop occupies the driver task for the full
//! backoff sequence; nothing short of the shutdown token interrupts it. When
//! the retry cap is exhausted the driver leaves the state `Disconnected`,
//! logs the terminal failure, and exits — no further automatic retries.
//!
//! State transitions go through the shared watch channel (see
//! [`super::state`]), so the poll thread always reads a consistent value.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rumqttc::{ConnectReturnCode, Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{
    config::ReconnectConfig,
    error::MqttError,
    state::{transition, ConnectionState},
};

/// Callback invoked on connection establishment or loss. An observer's error
/// is logged and never prevents later observers from running.
pub type Observer = Box<dyn Fn() -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Registries for connection-established and disconnection observers.
///
/// Observers may be registered any number of times; they run on the
/// connection driver task, so they should be quick.
#[derive(Default)]
pub struct ObserverRegistry {
    on_connected: Mutex<Vec<Observer>>,
    on_disconnected: Mutex<Vec<Observer>>,
}

impl ObserverRegistry {
    pub fn add_connected(&self, observer: Observer) {
        self.on_connected.lock().expect("observer lock").push(observer);
    }

    pub fn add_disconnected(&self, observer: Observer) {
        self.on_disconnected.lock().expect("observer lock").push(observer);
    }

    pub fn notify_connected(&self) {
        Self::notify(&self.on_connected, "connection");
    }

    pub fn notify_disconnected(&self) {
        Self::notify(&self.on_disconnected, "disconnection");
    }

    fn notify(observers: &Mutex<Vec<Observer>>, kind: &str) {
        let observers = observers.lock().expect("observer lock");
        for (index, observer) in observers.iter().enumerate() {
            if let Err(e) = observer() {
                error!("Error in {} observer #{}: {}", kind, index, e);
            }
        }
    }
}

/// Polls the event loop until the broker's CONNACK arrives.
///
/// Returns `Ok(())` on a successful handshake, [`MqttError::Handshake`] when
/// the broker refuses the session, and the underlying connection error when
/// the transport fails first. Callers bound this with the configured
/// connection timeout.
pub(crate) async fn poll_until_connack(event_loop: &mut EventLoop) -> Result<(), MqttError> {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(MqttError::Handshake(format!("{:?}", ack.code)));
            }
            Ok(event) => trace!("Event before CONNACK: {:?}", event),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Owns the event loop of an established connection.
pub(crate) struct ConnectionDriver {
    event_loop: EventLoop,
    state_tx: watch::Sender<ConnectionState>,
    observers: Arc<ObserverRegistry>,
    reconnect: ReconnectConfig,
    connect_timeout: Duration,
    cancel: CancellationToken,
}

impl ConnectionDriver {
    pub(crate) fn new(
        event_loop: EventLoop,
        state_tx: watch::Sender<ConnectionState>,
        observers: Arc<ObserverRegistry>,
        reconnect: ReconnectConfig,
        connect_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            event_loop,
            state_tx,
            observers,
            reconnect,
            connect_timeout,
            cancel,
        }
    }

    /// Pumps broker traffic until shutdown or terminal reconnection failure.
    pub(crate) async fn run(mut self) {
        debug!("Connection driver started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Connection driver stopping on shutdown request");
                    transition(
                        &self.state_tx,
                        ConnectionState::Disconnected("closed by caller".into()),
                    );
                    return;
                }

                event = self.event_loop.poll() => match event {
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        warn!("Disconnected by broker");
                        if !self.recover().await {
                            return;
                        }
                    }
                    Ok(Event::Incoming(packet)) => trace!("Incoming packet: {:?}", packet),
                    Ok(Event::Outgoing(outgoing)) => trace!("Outgoing packet: {:?}", outgoing),
                    Err(e) => {
                        warn!("Broker connection lost: {}", e);
                        if !self.recover().await {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// The reconnection loop. Returns `true` once the link is restored and
    /// `false` on shutdown or retry exhaustion (state already updated).
    async fn recover(&mut self) -> bool {
        // Publishes must already fail while the observers run.
        transition(
            &self.state_tx,
            ConnectionState::Reconnecting(self.reconnect.initial_delay as f64),
        );
        self.observers.notify_disconnected();

        let mut backoff = self.reconnect.backoff();
        loop {
            let delay = match backoff.next_sleep() {
                Ok(delay) => delay,
                Err(e) => {
                    error!(
                        "Failed to reconnect after {} attempts; giving up",
                        backoff.max_attempts()
                    );
                    transition(
                        &self.state_tx,
                        ConnectionState::Disconnected(MqttError::RetriesExhausted(e).to_string()),
                    );
                    return false;
                }
            };

            transition(
                &self.state_tx,
                ConnectionState::Reconnecting(delay.as_secs_f64()),
            );
            info!(
                "Reconnection attempt {}/{} after {:.1}s delay",
                backoff.attempt(),
                backoff.max_attempts(),
                delay.as_secs_f64()
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    transition(
                        &self.state_tx,
                        ConnectionState::Disconnected("closed by caller".into()),
                    );
                    return false;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            // The next poll re-dials the broker; bound the handshake wait.
            match tokio::time::timeout(
                self.connect_timeout,
                poll_until_connack(&mut self.event_loop),
            )
            .await
            {
                Ok(Ok(())) => {
                    info!("Reconnection successful");
                    transition(&self.state_tx, ConnectionState::Connected);
                    self.observers.notify_connected();
                    return true;
                }
                Ok(Err(e)) => warn!("Reconnection attempt failed: {}", e),
                Err(_) => warn!(
                    "Reconnection attempt timed out after {:?}",
                    self.connect_timeout
                ),
            }
        }
    }
}
