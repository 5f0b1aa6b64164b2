//! The sensor capability every transport family implements.

use super::reading::SensorReading;

/// A flat capability set for a single configured sensor.
///
/// One implementation exists per transport family (register-bus sensors in
/// [`super::modbus`], byte-bus sensors in [`super::i2c`]); there is no
/// deeper hierarchy. Implementations share their bus handle with the other
/// sensors on the same line — the owning reader manages the transport
/// lifecycle.
#[async_trait::async_trait]
pub trait Sensor: Send + Sync {
    /// The configured, human-readable sensor name. Doubles as the input to
    /// validation-category inference downstream.
    fn name(&self) -> &str;

    /// Reflects the readiness of the underlying transport. Idempotent; does
    /// not itself open the bus.
    async fn connect(&mut self) -> bool;

    /// Marks the sensor disconnected. Idempotent; the shared bus stays under
    /// the reader's control.
    fn disconnect(&mut self);

    /// Reads one value.
    ///
    /// Returns `None` — never an error — when the bus is closed, the
    /// transfer fails, or the payload cannot be decoded. Such failures are
    /// logged with the sensor's name and address context and are not fatal
    /// to the polling cycle.
    async fn read(&self) -> Option<SensorReading>;
}
