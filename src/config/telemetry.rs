//! Validation rules and telemetry batching configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Range bounds for one sensor category. Either bound may be absent; only
/// the provided bounds constrain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRule {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Per-category validation rules.
///
/// Categories are inferred from sensor names (see
/// [`crate::core::telemetry::validator::infer_category`]); a category
/// without a rule leaves its readings valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub temperature: Option<RangeRule>,
    pub humidity: Option<RangeRule>,
    pub pressure: Option<RangeRule>,
    pub light: Option<RangeRule>,
}

/// Batching and message-shaping settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Batched mode when true, immediate mode (one message per reading)
    /// when false.
    pub batch_enabled: bool,

    /// Readings per message in batched mode.
    #[validate(range(min = 1, message = "Batch size must be at least 1"))]
    pub batch_size: usize,

    /// Stamp messages with "now"; otherwise the first reading's capture time
    /// is used.
    pub include_timestamp: bool,

    /// Stamp each reading with the device id at insertion time.
    pub include_device_id: bool,

    /// Identity of this edge device, carried in every message.
    #[validate(length(min = 1, message = "Device id must not be empty"))]
    pub device_id: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            batch_enabled: false,
            batch_size: 10,
            include_timestamp: true,
            include_device_id: true,
            device_id: "hivelink-edge".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(TelemetryConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = TelemetryConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rules_parse_with_partial_bounds() {
        let toml = r#"
            [temperature]
            min = -40.0
            max = 85.0

            [light]
            min = 0.0
        "#;

        let rules: ValidationRules = toml::from_str(toml).unwrap();
        assert_eq!(rules.temperature.unwrap().max, Some(85.0));
        let light = rules.light.unwrap();
        assert_eq!(light.min, Some(0.0));
        assert_eq!(light.max, None);
        assert!(rules.pressure.is_none());
    }
}
