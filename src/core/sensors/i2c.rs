//! Byte-bus (I2C) sensor family.
//!
//! Mirrors the register-bus family in [`super::modbus`]: an [`I2cReader`]
//! owns one bus handle, enumerates its sensors after a successful open, and
//! swallows per-read failures so the polling cycle keeps going. Values are
//! decoded per sensor family (see [`super::decode::decode_block`]).

use std::sync::Arc;

use tracing::{debug, error, info};

use super::{bus::ByteBus, decode::decode_block, reading::SensorReading, traits::Sensor};
use crate::config::sensors::{I2cConfig, I2cSensorConfig};

/// A single sensor on the byte bus.
pub struct I2cSensor {
    config: I2cSensorConfig,
    bus: Arc<dyn ByteBus>,
    connected: bool,
}

impl I2cSensor {
    pub fn new(config: I2cSensorConfig, bus: Arc<dyn ByteBus>) -> Self {
        Self {
            config,
            bus,
            connected: false,
        }
    }
}

#[async_trait::async_trait]
impl Sensor for I2cSensor {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn connect(&mut self) -> bool {
        self.connected = self.bus.is_open();
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn read(&self) -> Option<SensorReading> {
        if !self.bus.is_open() {
            error!("Byte bus not open for sensor {}", self.config.name);
            return None;
        }

        let data = match self
            .bus
            .read_block(
                self.config.address,
                self.config.register,
                self.config.read_length,
            )
            .await
        {
            Ok(data) => data,
            Err(e) => {
                error!(
                    "Bus read failed for {} (address {:#04x}, register {:#04x}): {}",
                    self.config.name, self.config.address, self.config.register, e
                );
                return None;
            }
        };

        let value = match decode_block(&data, &self.config.sensor_type) {
            Ok(value) => value,
            Err(e) => {
                error!(
                    "Decode failed for {} (family {}): {}",
                    self.config.name, self.config.sensor_type, e
                );
                return None;
            }
        };

        debug!("Read {}: value={}", self.config.name, value);

        Some(
            SensorReading::new(&self.config.name, value, &self.config.unit)
                .with_metadata("address", format!("{:#04x}", self.config.address))
                .with_metadata("register", format!("{:#04x}", self.config.register))
                .with_metadata("sensor_type", self.config.sensor_type.clone()),
        )
    }
}

/// Manages every configured sensor on one byte bus.
pub struct I2cReader {
    config: I2cConfig,
    bus: Arc<dyn ByteBus>,
    sensors: Vec<I2cSensor>,
}

impl I2cReader {
    /// Creates a reader over the given bus handle. No sensors exist until
    /// [`connect`](Self::connect) succeeds.
    pub fn new(config: I2cConfig, bus: Arc<dyn ByteBus>) -> Self {
        Self {
            config,
            bus,
            sensors: Vec::new(),
        }
    }

    /// Opens the bus and enumerates the configured sensors.
    pub async fn connect(&mut self) -> bool {
        if let Err(e) = self.bus.open().await {
            error!("Failed to open byte bus {}: {}", self.config.bus, e);
            return false;
        }
        info!("Connected to byte bus {}", self.config.bus);

        self.sensors = self
            .config
            .sensors
            .iter()
            .cloned()
            .map(|sensor_config| {
                info!(
                    "Initialized byte-bus sensor: {} at address {:#04x}",
                    sensor_config.name, sensor_config.address
                );
                I2cSensor::new(sensor_config, self.bus.clone())
            })
            .collect();

        for sensor in &mut self.sensors {
            sensor.connect().await;
        }
        true
    }

    /// Closes the bus and drops the sensor set.
    pub async fn disconnect(&mut self) {
        self.bus.close().await;
        self.sensors.clear();
        info!("Disconnected from byte bus {}", self.config.bus);
    }

    /// Reads every sensor sequentially; failed reads are skipped.
    pub async fn read_all(&self) -> Vec<SensorReading> {
        let mut readings = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            if let Some(reading) = sensor.read().await {
                readings.push(reading);
            }
        }
        readings
    }

    /// Number of enumerated sensors (zero before a successful connect).
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sensors::sim::SimulatedByteBus;

    fn sensor_config(name: &str, family: &str, read_length: usize) -> I2cSensorConfig {
        I2cSensorConfig {
            name: name.to_string(),
            address: 0x23,
            sensor_type: family.to_string(),
            register: 0x00,
            read_length,
            unit: "lux".to_string(),
        }
    }

    fn reader_config(sensors: Vec<I2cSensorConfig>) -> I2cConfig {
        I2cConfig {
            sensors,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn light_sensor_reads_lux() {
        let bus = Arc::new(SimulatedByteBus::new());
        bus.set_block(0x23, 0x00, vec![0x01, 0x68]);

        let mut reader = I2cReader::new(
            reader_config(vec![sensor_config("light_ambient", "BH1750", 2)]),
            bus,
        );
        reader.connect().await;

        let readings = reader.read_all().await;
        assert_eq!(readings.len(), 1);
        assert!((readings[0].value - 300.0).abs() < 0.1);
        assert_eq!(readings[0].metadata["address"], "0x23");
        assert_eq!(readings[0].metadata["sensor_type"], "BH1750");
    }

    #[tokio::test]
    async fn pressure_sensor_reads_approximate_hpa() {
        let bus = Arc::new(SimulatedByteBus::new());
        bus.set_block(0x76, 0xF7, vec![0x65, 0x5A, 0xC0, 0x80, 0x00, 0x00]);

        let mut config = sensor_config("pressure_chamber", "BMP280", 6);
        config.address = 0x76;
        config.register = 0xF7;
        config.unit = "hPa".to_string();

        let mut reader = I2cReader::new(reader_config(vec![config]), bus);
        reader.connect().await;

        let readings = reader.read_all().await;
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 0x655ACu32 as f64 / 256.0);
    }

    #[tokio::test]
    async fn short_block_yields_no_reading() {
        let bus = Arc::new(SimulatedByteBus::new());
        bus.set_block(0x23, 0x00, vec![0x01]);

        let mut reader = I2cReader::new(
            reader_config(vec![sensor_config("light_ambient", "BH1750", 2)]),
            bus,
        );
        reader.connect().await;

        assert!(reader.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn absent_device_yields_no_reading() {
        let bus = Arc::new(SimulatedByteBus::new());

        let mut reader = I2cReader::new(
            reader_config(vec![sensor_config("light_ambient", "BH1750", 2)]),
            bus,
        );
        reader.connect().await;

        assert!(reader.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn sensors_exist_only_after_connect() {
        let bus = Arc::new(SimulatedByteBus::new());
        let mut reader = I2cReader::new(
            reader_config(vec![sensor_config("light_ambient", "BH1750", 2)]),
            bus,
        );

        assert_eq!(reader.sensor_count(), 0);
        reader.connect().await;
        assert_eq!(reader.sensor_count(), 1);
        reader.disconnect().await;
        assert_eq!(reader.sensor_count(), 0);
    }
}
