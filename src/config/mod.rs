//! Application configuration: loading, validation, defaults.
//!
//! The top-level [`Config`] aggregates every section of the TOML
//! configuration file. It is loaded once at startup — before the tracing
//! subscriber exists, hence the `print_*` macros — validated as a whole, and
//! immutable thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod logger;
pub mod sensors;
pub mod telemetry;

use logger::LoggerConfig;
use sensors::{I2cConfig, ModbusConfig};
use telemetry::{TelemetryConfig, ValidationRules};

/// Timestamped stdout line for the window before the tracing subscriber is
/// installed. Used through the `print_*` macros below.
pub fn early_log(level: console::StyledObject<&'static str>, message: std::fmt::Arguments<'_>) {
    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    println!("{}  {} {}", console::style(now).dim(), level, message);
}

#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        $crate::config::early_log(::console::style("INFO").green(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        $crate::config::early_log(::console::style("WARN").yellow(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::config::early_log(::console::style("ERROR").red(), format_args!($($arg)*))
    };
}

/// Errors during configuration loading, parsing or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file could be located.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO failure while reading the file.
    #[error("IO error while reading configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("Parse error while reading configuration: {0}")]
    Parse(String),

    /// The file parsed but a constraint failed.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Pacing of the polling loop.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Seconds between polling cycles.
    #[validate(range(min = 1, message = "Poll interval must be at least 1 second"))]
    pub poll_interval: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig { poll_interval: 5 }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub application: ApplicationConfig,

    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Broker connection settings, owned by the `hivelink-mqtt` crate.
    #[validate(nested)]
    pub mqtt: hivelink_mqtt::Config,

    #[validate(nested)]
    pub modbus: ModbusConfig,

    #[validate(nested)]
    pub i2c: I2cConfig,

    pub validation: ValidationRules,

    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Locates, loads and validates the configuration file.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load(&config_path)
    }

    /// Configuration file path, by priority:
    /// 1. `HIVELINK_CONFIG` environment variable
    /// 2. `/etc/hivelink/config.toml`
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(config_path) = std::env::var("HIVELINK_CONFIG") {
            let path = PathBuf::from(config_path);
            print_info!("Using config from HIVELINK_CONFIG: {}", path.display());
            return Ok(path);
        }

        let fallback = Path::new("/etc/hivelink/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::Config(
            "No configuration file found.".to_string(),
        ))
    }

    /// Loads and validates configuration from a specific path.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config_str = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
        [application]
        poll_interval = 10

        [mqtt]
        broker = "broker.plant.local"
        port = 8883
        client_id = "edge-07"
        topic_prefix = "plant-3/edge-07"

        [mqtt.reconnect]
        max_retries = 5
        initial_delay = 2
        max_delay = 120
        backoff_multiplier = 1.5

        [modbus]
        device = "/dev/ttyUSB0"

        [[modbus.sensors]]
        name = "temperature_boiler"
        slave_id = 3
        register_address = 16
        register_count = 2
        data_type = "float32"
        scaling_factor = 0.1
        unit = "celsius"

        [i2c]
        bus = 1

        [[i2c.sensors]]
        name = "light_ambient"
        address = 0x23
        sensor_type = "BH1750"
        register = 0x10
        read_length = 2
        unit = "lux"

        [validation.temperature]
        min = -40.0
        max = 85.0

        [telemetry]
        batch_enabled = true
        batch_size = 3
        device_id = "edge-07"
    "#;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn sample_file_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.application.poll_interval, 10);
        assert_eq!(config.mqtt.broker, "broker.plant.local");
        assert_eq!(config.mqtt.reconnect.max_retries, 5);
        assert_eq!(config.modbus.sensors.len(), 1);
        assert_eq!(config.i2c.sensors[0].address, 0x23);
        assert_eq!(config.validation.temperature.unwrap().min, Some(-40.0));
        assert!(config.telemetry.batch_enabled);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = Config::load(Path::new("/nonexistent/hivelink.toml"));
        assert!(matches!(result, Err(ConfigError::Config(_))));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[mqtt\nbroker = ").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn constraint_violation_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[application]\npoll_interval = 0\n")
            .unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
