//! VL53L0X time-of-flight ranging transport
//!
//! Single-shot mode: kick off a measurement, poll the interrupt status with
//! a bounded wait, then read the 16-bit range result. The sensor reports
//! 8190/8191 mm when nothing is in view; that is mapped to a timeout so the
//! core treats it like any other failed measurement.

use crate::i2c::I2cBus;
use crate::{HalError, RangingTransport, RawReading};
use std::time::{Duration, Instant};

const REG_SYSRANGE_START: u8 = 0x00;
const REG_RESULT_INTERRUPT_STATUS: u8 = 0x13;
const REG_SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const REG_RESULT_RANGE: u8 = 0x1E;

/// Out-of-range sentinel reported by the sensor.
const OUT_OF_RANGE_MM: u16 = 8190;

/// Single-shot measurement budget per the datasheet timing budget.
const MEASUREMENT_BUDGET: Duration = Duration::from_millis(50);

/// VL53L0X time-of-flight ranger on an I2C bus
pub struct Vl53l0x {
    bus_path: String,
    address: u8,
    max_range_mm: u32,
    bus: Option<I2cBus>,
}

impl Vl53l0x {
    pub const DEFAULT_ADDRESS: u8 = 0x29;

    /// Describe a sensor; the bus is not opened until `begin`
    pub fn new(bus_path: &str, address: u8, max_range_mm: u32) -> Self {
        Self {
            bus_path: bus_path.to_string(),
            address,
            max_range_mm,
            bus: None,
        }
    }

    fn bus(&self) -> Result<&I2cBus, HalError> {
        self.bus
            .as_ref()
            .ok_or_else(|| HalError::NotInitialized(self.resource_id()))
    }
}

impl RangingTransport for Vl53l0x {
    fn begin(&mut self) -> Result<(), HalError> {
        let bus = I2cBus::open(&self.bus_path)?;

        // Verify the device answers at its address before keeping the bus.
        bus.read_register(self.address, 0xC0)?;
        self.bus = Some(bus);
        tracing::debug!(bus = %self.bus_path, address = self.address, "VL53L0X initialized");
        Ok(())
    }

    fn read_raw(&mut self) -> Result<RawReading, HalError> {
        let bus = self.bus()?;

        bus.write_register(self.address, REG_SYSRANGE_START, 0x01)?;

        // Poll for measurement completion within the budget.
        let start = Instant::now();
        loop {
            let status = bus.read_register(self.address, REG_RESULT_INTERRUPT_STATUS)?;
            if status & 0x07 != 0 {
                break;
            }
            if start.elapsed() > MEASUREMENT_BUDGET {
                return Ok(RawReading::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        let mut buf = [0u8; 2];
        bus.read_registers(self.address, REG_RESULT_RANGE, &mut buf)?;
        bus.write_register(self.address, REG_SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        let mm = u16::from_be_bytes(buf);
        if mm >= OUT_OF_RANGE_MM {
            return Ok(RawReading::Timeout);
        }
        Ok(RawReading::Millimeters((mm as u32).min(self.max_range_mm)))
    }

    fn max_range_mm(&self) -> u32 {
        self.max_range_mm
    }

    fn measurement_timeout(&self) -> Duration {
        MEASUREMENT_BUDGET
    }

    fn resource_id(&self) -> String {
        format!("i2c:{}:0x{:02X}", self.bus_path, self.address)
    }
}
