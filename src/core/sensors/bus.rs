//! Transport seams for sensor buses.
//!
//! The agent never talks to a serial port or an I2C device file directly;
//! it consumes these traits. Hardware drivers live outside the core and plug
//! in behind them, the built-in simulated buses (see [`super::sim`]) serve
//! development and tests, and the readers in [`super::modbus`] /
//! [`super::i2c`] own the shared handle and its lifecycle.

use std::time::Duration;

use thiserror::Error;

/// A communication failure on a sensor bus.
///
/// These are per-read, transient-by-assumption failures: the affected sensor
/// yields no reading for the cycle and the loop continues.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus handle is not open; reads are refused without touching the
    /// transport.
    #[error("bus is not open")]
    NotOpen,

    /// The addressed device did not answer (wrong address, device powered
    /// off, wiring fault).
    #[error("device {device} did not respond: {reason}")]
    NoResponse { device: String, reason: String },

    /// The transfer itself failed mid-flight (framing error, CRC mismatch,
    /// kernel I/O error).
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The device answered too slowly.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A register-oriented field bus (Modbus RTU over RS-485 in practice).
///
/// One handle serves every sensor on the same serial line; the owning reader
/// opens it once and shares it.
#[async_trait::async_trait]
pub trait RegisterBus: Send + Sync {
    /// Opens the underlying transport. Idempotent.
    async fn open(&self) -> Result<(), BusError>;

    /// Closes the underlying transport. Idempotent.
    async fn close(&self);

    /// Whether the transport is currently usable.
    fn is_open(&self) -> bool;

    /// Reads `count` holding registers starting at `address` from the device
    /// with the given slave id.
    async fn read_holding_registers(
        &self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, BusError>;
}

/// A byte-oriented peripheral bus (I2C in practice).
#[async_trait::async_trait]
pub trait ByteBus: Send + Sync {
    /// Opens the underlying transport. Idempotent.
    async fn open(&self) -> Result<(), BusError>;

    /// Closes the underlying transport. Idempotent.
    async fn close(&self);

    /// Whether the transport is currently usable.
    fn is_open(&self) -> bool;

    /// Reads `length` bytes from `register` of the device at `address`.
    async fn read_block(
        &self,
        address: u8,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError>;
}
