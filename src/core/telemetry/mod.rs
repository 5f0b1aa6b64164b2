//! Validation and normalization of sensor readings.
//!
//! Raw readings flow through [`DataValidator`] (range tagging) and
//! [`TelemetryNormalizer`] (batching into delivery-ready messages);
//! [`TelemetryProcessor`] wires the two together for the executor.

pub mod normalizer;
pub mod validator;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::sensors::SensorReading;

pub use normalizer::{TelemetryNormalizer, TelemetryProcessor};
pub use validator::DataValidator;

/// Outcome of validating a reading. Out-of-range readings still flow
/// downstream, tagged; nothing is dropped by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    OutOfRange,
    Invalid,
}

/// A validated and normalized sensor reading.
///
/// Created by the validator; the normalizer attaches `device_id` once at
/// insertion time. After batching, the containing message owns it.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedReading {
    pub sensor_name: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub device_id: Option<String>,
    pub validation_status: ValidationStatus,
    pub metadata: Map<String, Value>,
}

impl ValidatedReading {
    /// Tags a raw reading with its validation status; all other fields are
    /// carried over unchanged.
    pub fn from_raw(reading: SensorReading, status: ValidationStatus) -> Self {
        Self {
            sensor_name: reading.sensor_name,
            value: reading.value,
            unit: reading.unit,
            timestamp: reading.timestamp,
            device_id: None,
            validation_status: status,
            metadata: reading.metadata,
        }
    }
}

/// A delivery-ready telemetry message.
///
/// Immutable once created: a closed batch receives no further readings and
/// `readings` is never empty.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryMessage {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub readings: Vec<ValidatedReading>,
}
