//! In-memory bus implementations.
//!
//! These stand behind the same trait seams as hardware drivers and serve two
//! purposes: they are the mock transports for the sensor-layer tests, and
//! they are the built-in `driver = "simulated"` option in the bus
//! configuration, which keeps the whole agent runnable on a development
//! machine with no RS-485 line or I2C peripheral attached.
//!
//! Each bus holds a device image: register words keyed by
//! `(slave_id, address)` for the register bus, byte blocks keyed by
//! `(address, register)` for the byte bus. Reads return slices of the image;
//! addresses with no image behave like absent hardware.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use super::bus::{BusError, ByteBus, RegisterBus};

/// Simulated register bus (Modbus stand-in).
#[derive(Default)]
pub struct SimulatedRegisterBus {
    open: AtomicBool,
    registers: Mutex<HashMap<(u8, u16), Vec<u16>>>,
}

impl SimulatedRegisterBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the device image at `(slave_id, address)`.
    pub fn set_registers(&self, slave_id: u8, address: u16, words: Vec<u16>) {
        self.registers
            .lock()
            .expect("register image lock")
            .insert((slave_id, address), words);
    }
}

#[async_trait::async_trait]
impl RegisterBus for SimulatedRegisterBus {
    async fn open(&self) -> Result<(), BusError> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn read_holding_registers(
        &self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, BusError> {
        if !self.is_open() {
            return Err(BusError::NotOpen);
        }

        let registers = self.registers.lock().expect("register image lock");
        let words = registers
            .get(&(slave_id, address))
            .ok_or_else(|| BusError::NoResponse {
                device: format!("slave {slave_id} register {address:#06x}"),
                reason: "no device image".into(),
            })?;

        Ok(words.iter().copied().take(count as usize).collect())
    }
}

/// Simulated byte bus (I2C stand-in).
#[derive(Default)]
pub struct SimulatedByteBus {
    open: AtomicBool,
    blocks: Mutex<HashMap<(u8, u8), Vec<u8>>>,
}

impl SimulatedByteBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the device image at `(address, register)`.
    pub fn set_block(&self, address: u8, register: u8, data: Vec<u8>) {
        self.blocks
            .lock()
            .expect("block image lock")
            .insert((address, register), data);
    }
}

#[async_trait::async_trait]
impl ByteBus for SimulatedByteBus {
    async fn open(&self) -> Result<(), BusError> {
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn read_block(
        &self,
        address: u8,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, BusError> {
        if !self.is_open() {
            return Err(BusError::NotOpen);
        }

        let blocks = self.blocks.lock().expect("block image lock");
        let data = blocks
            .get(&(address, register))
            .ok_or_else(|| BusError::NoResponse {
                device: format!("address {address:#04x} register {register:#04x}"),
                reason: "no device image".into(),
            })?;

        Ok(data.iter().copied().take(length).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_bus_refuses_reads_while_closed() {
        let bus = SimulatedRegisterBus::new();
        bus.set_registers(1, 0, vec![1, 2]);

        let result = bus.read_holding_registers(1, 0, 2).await;
        assert!(matches!(result, Err(BusError::NotOpen)));

        bus.open().await.unwrap();
        assert_eq!(bus.read_holding_registers(1, 0, 2).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn register_bus_truncates_to_requested_count() {
        let bus = SimulatedRegisterBus::new();
        bus.open().await.unwrap();
        bus.set_registers(2, 0x20, vec![10, 20, 30, 40]);

        let words = bus.read_holding_registers(2, 0x20, 2).await.unwrap();
        assert_eq!(words, vec![10, 20]);
    }

    #[tokio::test]
    async fn unseeded_address_acts_like_absent_hardware() {
        let bus = SimulatedRegisterBus::new();
        bus.open().await.unwrap();

        let result = bus.read_holding_registers(5, 0, 1).await;
        assert!(matches!(result, Err(BusError::NoResponse { .. })));
    }

    #[tokio::test]
    async fn byte_bus_round_trips_blocks() {
        let bus = SimulatedByteBus::new();
        bus.open().await.unwrap();
        bus.set_block(0x23, 0x00, vec![0x01, 0x68, 0xFF]);

        assert_eq!(bus.read_block(0x23, 0x00, 2).await.unwrap(), vec![0x01, 0x68]);
        assert!(matches!(
            bus.read_block(0x24, 0x00, 2).await,
            Err(BusError::NoResponse { .. })
        ));
    }

    #[tokio::test]
    async fn open_and_close_are_idempotent() {
        let bus = SimulatedByteBus::new();
        bus.open().await.unwrap();
        bus.open().await.unwrap();
        assert!(bus.is_open());

        bus.close().await;
        bus.close().await;
        assert!(!bus.is_open());
    }
}
