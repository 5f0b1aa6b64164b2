//! The raw reading produced by a sensor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A single raw sensor reading.
///
/// Created by a sensor's `read`, consumed by the validator, and discarded
/// after validation. The metadata map identifies the reading's source
/// (slave id, register, bus address) for downstream traceability.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub sensor_name: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl SensorReading {
    /// Creates a reading stamped with the current UTC time.
    pub fn new(sensor_name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            value,
            unit: unit.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Attaches a metadata entry, builder-style.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
