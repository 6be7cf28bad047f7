//! Binary presence transports: PIR and microwave doppler modules
//!
//! Both report a single detection level on a GPIO pin. They differ in their
//! warmup period: a PIR element needs tens of seconds to settle after
//! power-on, a microwave module only a couple.

use crate::gpio::{Direction, GpioPin};
use crate::{HalError, PresenceTransport};
use std::time::Duration;

/// PIR motion sensor (HC-SR501 class) on a GPIO pin
pub struct Pir {
    pin: u32,
    gpio: Option<GpioPin>,
}

impl Pir {
    /// Settle time for the pyroelectric element.
    pub const WARMUP: Duration = Duration::from_secs(30);

    pub fn new(pin: u32) -> Self {
        Self { pin, gpio: None }
    }
}

impl PresenceTransport for Pir {
    fn begin(&mut self) -> Result<(), HalError> {
        self.gpio = Some(GpioPin::new(self.pin, Direction::Input)?);
        tracing::debug!(pin = self.pin, "PIR initialized");
        Ok(())
    }

    fn read_level(&mut self) -> Result<bool, HalError> {
        self.gpio
            .as_ref()
            .ok_or_else(|| HalError::NotInitialized(self.resource_id()))?
            .read()
    }

    fn warmup(&self) -> Duration {
        Self::WARMUP
    }

    fn resource_id(&self) -> String {
        format!("gpio:{}", self.pin)
    }
}

/// Microwave doppler presence sensor (RCWL-0516 class) on a GPIO pin
pub struct Microwave {
    pin: u32,
    gpio: Option<GpioPin>,
}

impl Microwave {
    pub const WARMUP: Duration = Duration::from_secs(2);

    pub fn new(pin: u32) -> Self {
        Self { pin, gpio: None }
    }
}

impl PresenceTransport for Microwave {
    fn begin(&mut self) -> Result<(), HalError> {
        self.gpio = Some(GpioPin::new(self.pin, Direction::Input)?);
        tracing::debug!(pin = self.pin, "Microwave sensor initialized");
        Ok(())
    }

    fn read_level(&mut self) -> Result<bool, HalError> {
        self.gpio
            .as_ref()
            .ok_or_else(|| HalError::NotInitialized(self.resource_id()))?
            .read()
    }

    fn warmup(&self) -> Duration {
        Self::WARMUP
    }

    fn resource_id(&self) -> String {
        format!("gpio:{}", self.pin)
    }
}
