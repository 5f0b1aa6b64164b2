//! Configuration for the sensor buses and the sensors on them.
//!
//! Mirrors the two transport families: a register bus (Modbus RTU over a
//! serial line) and a byte bus (I2C). Constraints follow the protocols:
//! Modbus slave ids stop at 247, 7-bit I2C addresses at 0x7F.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Which bus implementation backs a reader.
///
/// `simulated` is built in and serves development and tests; hardware
/// drivers plug in behind the `RegisterBus`/`ByteBus` traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusDriver {
    #[default]
    Simulated,
}

/// A single sensor on the register bus.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ModbusSensorConfig {
    /// Sensor name; also feeds validation-category inference.
    #[validate(length(min = 1, message = "Sensor name must not be empty"))]
    pub name: String,

    /// Modbus slave id of the device holding the registers.
    #[validate(range(min = 1, max = 247, message = "Slave id must be between 1 and 247"))]
    pub slave_id: u8,

    /// First holding register to read.
    pub register_address: u16,

    /// Number of registers to read.
    #[validate(range(min = 1, message = "At least one register must be read"))]
    pub register_count: u16,

    /// Numeric kind of the register data: int16, uint16, int32, uint32 or
    /// float32.
    pub data_type: String,

    /// Multiplier applied to the decoded value.
    pub scaling_factor: f64,

    /// Unit of the scaled value, carried into the telemetry message.
    pub unit: String,
}

impl Default for ModbusSensorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            slave_id: 1,
            register_address: 0,
            register_count: 1,
            data_type: "float32".to_string(),
            scaling_factor: 1.0,
            unit: String::new(),
        }
    }
}

/// Register-bus (Modbus RTU) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ModbusConfig {
    /// Whether this reader is wired up at all.
    pub enabled: bool,

    /// Bus implementation to use.
    pub driver: BusDriver,

    /// Serial device of the RS-485 adapter.
    #[validate(length(min = 1, message = "Serial device must not be empty"))]
    pub device: String,

    pub baudrate: u32,

    /// Parity: "N", "E" or "O".
    #[validate(custom(function = "validate_parity"))]
    pub parity: String,

    #[validate(range(min = 1, max = 2, message = "Stop bits must be 1 or 2"))]
    pub stop_bits: u8,

    #[validate(range(min = 5, max = 8, message = "Data bits must be between 5 and 8"))]
    pub data_bits: u8,

    /// Per-read timeout in seconds, enforced by the bus driver.
    #[validate(range(min = 1, message = "Timeout must be at least 1 second"))]
    pub timeout: u64,

    #[validate(nested)]
    pub sensors: Vec<ModbusSensorConfig>,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            driver: BusDriver::Simulated,
            device: "/dev/ttyUSB0".to_string(),
            baudrate: 9600,
            parity: "N".to_string(),
            stop_bits: 1,
            data_bits: 8,
            timeout: 3,
            sensors: Vec::new(),
        }
    }
}

fn validate_parity(parity: &str) -> Result<(), ValidationError> {
    match parity {
        "N" | "E" | "O" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_parity");
            err.message = Some(format!("Invalid parity: {parity} (expected N, E or O)").into());
            Err(err)
        }
    }
}

/// A single sensor on the byte bus.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct I2cSensorConfig {
    /// Sensor name; also feeds validation-category inference.
    #[validate(length(min = 1, message = "Sensor name must not be empty"))]
    pub name: String,

    /// 7-bit device address.
    #[validate(range(max = 0x7F, message = "I2C address must be at most 0x7F"))]
    pub address: u8,

    /// Sensor family, selects the block decoder (BMP280, BH1750, ...).
    #[validate(length(min = 1, message = "Sensor type must not be empty"))]
    pub sensor_type: String,

    /// Register to start the block read at.
    pub register: u8,

    /// Number of bytes to read.
    #[validate(range(min = 1, message = "Read length must be at least 1 byte"))]
    pub read_length: usize,

    /// Unit of the decoded value, carried into the telemetry message.
    pub unit: String,
}

impl Default for I2cSensorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: 0,
            sensor_type: String::new(),
            register: 0,
            read_length: 1,
            unit: String::new(),
        }
    }
}

/// Byte-bus (I2C) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct I2cConfig {
    /// Whether this reader is wired up at all.
    pub enabled: bool,

    /// Bus implementation to use.
    pub driver: BusDriver,

    /// Kernel bus number (`/dev/i2c-{bus}` on Linux hosts).
    pub bus: u8,

    #[validate(nested)]
    pub sensors: Vec<I2cSensorConfig>,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            driver: BusDriver::Simulated,
            bus: 1,
            sensors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ModbusConfig::default().validate().is_ok());
        assert!(I2cConfig::default().validate().is_ok());
    }

    #[test]
    fn slave_id_beyond_modbus_range_is_rejected() {
        let config = ModbusConfig {
            sensors: vec![ModbusSensorConfig {
                name: "temperature_intake".into(),
                slave_id: 248,
                unit: "celsius".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_parity_is_rejected() {
        let config = ModbusConfig {
            parity: "X".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn i2c_address_is_seven_bit() {
        let config = I2cConfig {
            sensors: vec![I2cSensorConfig {
                name: "light_ambient".into(),
                address: 0x80,
                sensor_type: "BH1750".into(),
                read_length: 2,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sensor_sections_parse_from_toml() {
        let toml = r#"
            enabled = true
            device = "/dev/ttyUSB1"
            baudrate = 19200

            [[sensors]]
            name = "temperature_boiler"
            slave_id = 3
            register_address = 16
            register_count = 2
            data_type = "float32"
            scaling_factor = 0.1
            unit = "celsius"
        "#;

        let config: ModbusConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.driver, BusDriver::Simulated);
        assert_eq!(config.baudrate, 19200);
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.sensors[0].slave_id, 3);
        assert!(config.validate().is_ok());
    }
}
