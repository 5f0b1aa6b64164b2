//! Sensor acquisition: decoding, bus seams, and transport families.

pub mod bus;
pub mod decode;
pub mod i2c;
pub mod modbus;
pub mod reading;
pub mod sim;
pub mod traits;

pub use bus::{BusError, ByteBus, RegisterBus};
pub use decode::{decode_block, decode_registers, encode_registers, DecodeError};
pub use i2c::{I2cReader, I2cSensor};
pub use modbus::{ModbusReader, ModbusSensor};
pub use reading::SensorReading;
pub use sim::{SimulatedByteBus, SimulatedRegisterBus};
pub use traits::Sensor;
