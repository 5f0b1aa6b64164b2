//! Batching of validated readings into delivery-ready messages.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::{DataValidator, TelemetryMessage, ValidatedReading};
use crate::config::telemetry::{TelemetryConfig, ValidationRules};
use crate::core::sensors::SensorReading;

/// Accumulates validated readings into [`TelemetryMessage`]s.
///
/// Two modes, selected by configuration: immediate (every reading becomes
/// its own single-reading message) and batched (readings accumulate until
/// `batch_size`, then the batch closes into one message). The pending buffer
/// is private to this instance and driven by a single caller.
pub struct TelemetryNormalizer {
    config: TelemetryConfig,
    batch: Vec<ValidatedReading>,
}

impl TelemetryNormalizer {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            batch: Vec::new(),
        }
    }

    /// Adds a validated reading; returns a message when one is ready.
    ///
    /// The device id is stamped onto the reading here, at insertion time,
    /// when the configuration enables it. In batched mode the return value
    /// is `None` until the batch reaches its configured size.
    pub fn add_reading(&mut self, mut reading: ValidatedReading) -> Option<TelemetryMessage> {
        if self.config.include_device_id {
            reading.device_id = Some(self.config.device_id.clone());
        }

        if self.config.batch_enabled {
            self.batch.push(reading);
            if self.batch.len() >= self.config.batch_size {
                return Some(self.close_batch());
            }
            None
        } else {
            Some(self.build_message(vec![reading]))
        }
    }

    /// Closes and returns any partial batch.
    ///
    /// Called at the end of each processing cycle so no reading is silently
    /// retained past it. Returns `None` when nothing is pending.
    pub fn flush(&mut self) -> Option<TelemetryMessage> {
        if self.batch.is_empty() {
            return None;
        }
        Some(self.close_batch())
    }

    /// Number of readings waiting in the open batch.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    fn close_batch(&mut self) -> TelemetryMessage {
        let readings = std::mem::take(&mut self.batch);
        self.build_message(readings)
    }

    /// Builds a message from a non-empty set of readings. Message ids are
    /// fresh UUIDs, never reused; the timestamp is "now" when configured,
    /// otherwise the first reading's capture time.
    fn build_message(&self, readings: Vec<ValidatedReading>) -> TelemetryMessage {
        debug_assert!(!readings.is_empty(), "a telemetry message needs readings");

        let timestamp = if self.config.include_timestamp {
            Utc::now()
        } else {
            readings[0].timestamp
        };

        let message = TelemetryMessage {
            device_id: self.config.device_id.clone(),
            timestamp,
            message_id: Uuid::new_v4().to_string(),
            readings,
        };

        debug!(
            "Created telemetry message with {} readings",
            message.readings.len()
        );
        message
    }
}

/// Validation and normalization combined, as the executor consumes them.
pub struct TelemetryProcessor {
    validator: DataValidator,
    normalizer: TelemetryNormalizer,
}

impl TelemetryProcessor {
    pub fn new(rules: ValidationRules, config: TelemetryConfig) -> Self {
        Self {
            validator: DataValidator::new(rules),
            normalizer: TelemetryNormalizer::new(config),
        }
    }

    /// Validates and batches one reading.
    pub fn process_reading(&mut self, reading: SensorReading) -> Option<TelemetryMessage> {
        let validated = self.validator.validate(reading);
        self.normalizer.add_reading(validated)
    }

    /// Processes one polling cycle's readings and flushes the remainder, so
    /// a cycle never leaves readings behind in the batch buffer.
    pub fn process_readings(&mut self, readings: Vec<SensorReading>) -> Vec<TelemetryMessage> {
        let mut messages = Vec::new();

        for reading in readings {
            if let Some(message) = self.process_reading(reading) {
                messages.push(message);
            }
        }

        if let Some(message) = self.normalizer.flush() {
            messages.push(message);
        }

        messages
    }
}
