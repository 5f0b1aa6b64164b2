//! Range validation of raw readings.

use tracing::warn;

use super::{ValidatedReading, ValidationStatus};
use crate::config::telemetry::{RangeRule, ValidationRules};
use crate::core::sensors::SensorReading;

/// Validates raw readings against the configured range rules.
///
/// The rule to apply is chosen by category, inferred from the sensor's name
/// (see [`infer_category`]). Validation is a pure mapping aside from the
/// warning logs: every reading flows downstream, out-of-range ones tagged.
pub struct DataValidator {
    rules: ValidationRules,
}

impl DataValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Tags a reading with its validation status.
    ///
    /// A rule constrains only the bounds it provides: a value strictly below
    /// `min` or strictly above `max` is out of range. Categories without a
    /// rule — including unmatched sensor names — default to valid.
    pub fn validate(&self, reading: SensorReading) -> ValidatedReading {
        let category = infer_category(&reading.sensor_name);

        let mut status = ValidationStatus::Valid;
        if let Some(rule) = self.rule_for(category) {
            if rule.min.is_some_and(|min| reading.value < min) {
                status = ValidationStatus::OutOfRange;
                warn!(
                    "{} value {} below minimum {}",
                    reading.sensor_name,
                    reading.value,
                    rule.min.unwrap_or_default()
                );
            } else if rule.max.is_some_and(|max| reading.value > max) {
                status = ValidationStatus::OutOfRange;
                warn!(
                    "{} value {} above maximum {}",
                    reading.sensor_name,
                    reading.value,
                    rule.max.unwrap_or_default()
                );
            }
        }

        ValidatedReading::from_raw(reading, status)
    }

    fn rule_for(&self, category: &str) -> Option<&RangeRule> {
        match category {
            "temperature" => self.rules.temperature.as_ref(),
            "humidity" => self.rules.humidity.as_ref(),
            "pressure" => self.rules.pressure.as_ref(),
            "light" => self.rules.light.as_ref(),
            // Unmatched names are their own pseudo-category; no rule exists.
            _ => None,
        }
    }
}

/// Infers the validation category from a sensor name.
///
/// Case-insensitive substring matching in fixed order; names matching no
/// keyword are returned verbatim and act as a never-matching pseudo-category.
pub fn infer_category(sensor_name: &str) -> &str {
    let lower = sensor_name.to_lowercase();

    if lower.contains("temp") {
        "temperature"
    } else if lower.contains("humid") {
        "humidity"
    } else if lower.contains("press") {
        "pressure"
    } else if lower.contains("light") {
        "light"
    } else {
        sensor_name
    }
}
