//! Register-bus (Modbus RTU) sensor family.
//!
//! A [`ModbusReader`] owns one serial line and every sensor configured on
//! it. Sensors share the bus handle; the reader opens it once, instantiates
//! its sensors only after the open succeeds, and closes it on disconnect.
//! Individual read failures are logged and swallowed — one unreachable slave
//! must not take down the polling cycle.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::{
    bus::RegisterBus,
    decode::decode_registers,
    reading::SensorReading,
    traits::Sensor,
};
use crate::config::sensors::{ModbusConfig, ModbusSensorConfig};

/// A single sensor on the register bus.
pub struct ModbusSensor {
    config: ModbusSensorConfig,
    bus: Arc<dyn RegisterBus>,
    connected: bool,
}

impl ModbusSensor {
    pub fn new(config: ModbusSensorConfig, bus: Arc<dyn RegisterBus>) -> Self {
        Self {
            config,
            bus,
            connected: false,
        }
    }
}

#[async_trait::async_trait]
impl Sensor for ModbusSensor {
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
            error!("Register bus not open for sensor {}", self.config.name);
            return None;
        }

        let registers = match self
            .bus
            .read_holding_registers(
                self.config.slave_id,
                self.config.register_address,
                self.config.register_count,
            )
            .await
        {
            Ok(registers) => registers,
            Err(e) => {
                error!(
                    "Register read failed for {} (slave {}, register {:#06x}): {}",
                    self.config.name, self.config.slave_id, self.config.register_address, e
                );
                return None;
            }
        };

        let raw = match decode_registers(&registers, &self.config.data_type) {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    "Decode failed for {} (kind {}): {}",
                    self.config.name, self.config.data_type, e
                );
                return None;
            }
        };

        // Scaling applies to the decoded value, never the raw words.
        let value = raw * self.config.scaling_factor;

        debug!(
            "Read {}: raw={}, scaled={}",
            self.config.name, raw, value
        );

        Some(
            SensorReading::new(&self.config.name, value, &self.config.unit)
                .with_metadata("slave_id", self.config.slave_id)
                .with_metadata("register_address", self.config.register_address)
                .with_metadata("data_type", self.config.data_type.clone()),
        )
    }
}

/// Manages every configured sensor on one register bus.
pub struct ModbusReader {
    config: ModbusConfig,
    bus: Arc<dyn RegisterBus>,
    sensors: Vec<ModbusSensor>,
}

impl ModbusReader {
    /// Creates a reader over the given bus handle. No sensors exist until
    /// [`connect`](Self::connect) succeeds.
    pub fn new(config: ModbusConfig, bus: Arc<dyn RegisterBus>) -> Self {
        Self {
            config,
            bus,
            sensors: Vec::new(),
        }
    }

    /// Opens the bus and enumerates the configured sensors.
    pub async fn connect(&mut self) -> bool {
        if let Err(e) = self.bus.open().await {
            error!("Failed to open register bus {}: {}", self.config.device, e);
            return false;
        }
        info!("Connected to register bus {}", self.config.device);

        self.sensors = self
            .config
            .sensors
            .iter()
            .cloned()
            .map(|sensor_config| {
                info!("Initialized register sensor: {}", sensor_config.name);
                ModbusSensor::new(sensor_config, self.bus.clone())
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
        info!("Disconnected from register bus {}", self.config.device);
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
