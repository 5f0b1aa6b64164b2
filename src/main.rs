use std::{
    process,
    sync::{Arc, OnceLock},
    time::Duration,
};

use hivelink::{
    config::{
        sensors::{BusDriver, I2cConfig, I2cSensorConfig, ModbusConfig},
        Config,
    },
    core::{
        executor::{Executor, SensorReader, TelemetrySink},
        sensors::{
            decode::encode_registers, I2cReader, ModbusReader, SimulatedByteBus,
            SimulatedRegisterBus,
        },
        telemetry::{validator::infer_category, TelemetryProcessor},
    },
    logger::LoggerManager,
    print_error,
};
use hivelink_mqtt::MqttPublisher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        })
    })
}

/// A plausible mid-range value for the sensor's category, used to seed the
/// simulated buses.
fn demo_value(sensor_name: &str) -> f64 {
    match infer_category(sensor_name) {
        "temperature" => 22.5,
        "humidity" => 47.0,
        "pressure" => 1008.0,
        "light" => 300.0,
        _ => 42.0,
    }
}

/// Seeds a simulated register bus with plausible device images so the agent
/// produces real telemetry on a machine without hardware.
fn simulated_register_bus(config: &ModbusConfig) -> Arc<SimulatedRegisterBus> {
    let bus = SimulatedRegisterBus::new();
    for sensor in &config.sensors {
        let value = demo_value(&sensor.name);
        let raw = if sensor.scaling_factor != 0.0 {
            value / sensor.scaling_factor
        } else {
            value
        };
        match encode_registers(raw, &sensor.data_type) {
            Ok(words) => bus.set_registers(sensor.slave_id, sensor.register_address, words),
            Err(e) => warn!("Cannot seed simulated image for {}: {}", sensor.name, e),
        }
    }
    Arc::new(bus)
}

/// Seeds a simulated byte bus per sensor family.
fn simulated_byte_bus(config: &I2cConfig) -> Arc<SimulatedByteBus> {
    let bus = SimulatedByteBus::new();
    for sensor in &config.sensors {
        bus.set_block(sensor.address, sensor.register, demo_block(sensor));
    }
    Arc::new(bus)
}

/// Builds the byte image that decodes back to the demo value for the
/// sensor's family.
fn demo_block(sensor: &I2cSensorConfig) -> Vec<u8> {
    let value = demo_value(&sensor.name);
    match sensor.sensor_type.to_ascii_uppercase().as_str() {
        "BMP280" | "BME280" => {
            let adc = (value * 256.0) as u32;
            vec![
                (adc >> 12) as u8,
                ((adc >> 4) & 0xFF) as u8,
                ((adc & 0xF) << 4) as u8,
                0x00,
                0x00,
                0x00,
            ]
        }
        "BH1750" => ((value * 1.2) as u16).to_be_bytes().to_vec(),
        _ => (value as u16).to_be_bytes().to_vec(),
    }
}

/// Wires up the configured readers. A bus that fails to open is logged and
/// skipped; the agent keeps running with whatever remains.
async fn build_readers(cfg: &'static Config) -> Vec<Box<dyn SensorReader>> {
    let mut readers: Vec<Box<dyn SensorReader>> = Vec::new();

    if cfg.modbus.enabled {
        let bus = match cfg.modbus.driver {
            BusDriver::Simulated => simulated_register_bus(&cfg.modbus),
        };
        let mut reader = ModbusReader::new(cfg.modbus.clone(), bus);
        if SensorReader::connect(&mut reader).await {
            readers.push(Box::new(reader));
        } else {
            warn!("Failed to connect to register bus, continuing without it");
        }
    }

    if cfg.i2c.enabled {
        let bus = match cfg.i2c.driver {
            BusDriver::Simulated => simulated_byte_bus(&cfg.i2c),
        };
        let mut reader = I2cReader::new(cfg.i2c.clone(), bus);
        if SensorReader::connect(&mut reader).await {
            readers.push(Box::new(reader));
        } else {
            warn!("Failed to connect to byte bus, continuing without it");
        }
    }

    readers
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config();

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to set up logging: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to initialize logging: {}", e);
        process::exit(1);
    });

    info!("Starting hivelink version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);

    let mut publisher = MqttPublisher::new(cfg.mqtt.clone()).unwrap_or_else(|e| {
        error!("Invalid broker configuration: {}", e);
        process::exit(1);
    });
    publisher.add_connection_callback(Box::new(|| {
        info!("Broker link established");
        Ok(())
    }));
    publisher.add_disconnection_callback(Box::new(|| {
        warn!("Broker link lost, reconnection in progress");
        Ok(())
    }));

    if !publisher.connect().await {
        error!("Failed to connect to MQTT broker");
        process::exit(1);
    }

    let status = serde_json::json!({
        "online": true,
        "device_id": cfg.telemetry.device_id,
        "version": env!("CARGO_PKG_VERSION"),
    });
    if let Err(e) = publisher.publish_json("status", &status, None).await {
        warn!("Failed to publish status message: {}", e);
    }

    let publisher = Arc::new(publisher);

    let readers = build_readers(cfg).await;
    if readers.is_empty() {
        warn!("No sensor buses available; telemetry cycles will be empty");
    }

    let processor = TelemetryProcessor::new(cfg.validation.clone(), cfg.telemetry.clone());
    let cancel = CancellationToken::new();
    let executor = Executor::new(
        readers,
        processor,
        publisher.clone() as Arc<dyn TelemetrySink>,
        Duration::from_secs(cfg.application.poll_interval),
        cancel.clone(),
    );

    let executor_handle = tokio::spawn(executor.run());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C — initiating graceful shutdown...");

    cancel.cancel();
    let _ = executor_handle.await;

    publisher.disconnect().await;
    info!("Shutdown complete");
    Ok(())
}
