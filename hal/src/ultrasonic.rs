//! HC-SR04 ultrasonic ranging transport
//!
//! Fires a 10 µs trigger pulse, then times the echo line with a bounded
//! busy-wait. The wait budget is derived from the configured maximum range,
//! so a missing echo resolves as [`RawReading::Timeout`] instead of hanging
//! the control loop.

use crate::gpio::{Direction, GpioPin};
use crate::{HalError, RangingTransport, RawReading};
use std::time::{Duration, Instant};

/// Speed of sound at room temperature, mm per microsecond (one way).
const SOUND_MM_PER_US: f64 = 0.343;

/// Extra wait on top of the max-range round trip, for trigger latency.
const TIMEOUT_MARGIN: Duration = Duration::from_millis(10);

/// HC-SR04 ultrasonic ranger on a trigger/echo GPIO pair
pub struct Hcsr04 {
    trigger_pin: u32,
    echo_pin: u32,
    max_range_mm: u32,
    pins: Option<(GpioPin, GpioPin)>,
}

impl Hcsr04 {
    /// Describe a sensor; pins are not touched until `begin`
    pub fn new(trigger_pin: u32, echo_pin: u32, max_range_mm: u32) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            max_range_mm,
            pins: None,
        }
    }

    /// Round-trip echo time for the maximum range
    fn echo_budget(&self) -> Duration {
        let us = (self.max_range_mm as f64 * 2.0 / SOUND_MM_PER_US) as u64;
        Duration::from_micros(us)
    }

    /// Busy-wait until the echo pin reaches `level` or `budget` elapses
    fn wait_for_level(echo: &GpioPin, level: bool, budget: Duration) -> Result<Option<Instant>, HalError> {
        let start = Instant::now();
        loop {
            if echo.read()? == level {
                return Ok(Some(Instant::now()));
            }
            if start.elapsed() > budget {
                return Ok(None);
            }
        }
    }
}

impl RangingTransport for Hcsr04 {
    fn begin(&mut self) -> Result<(), HalError> {
        let trigger = GpioPin::new(self.trigger_pin, Direction::Output)?;
        let echo = GpioPin::new(self.echo_pin, Direction::Input)?;
        trigger.write(false)?;
        self.pins = Some((trigger, echo));
        tracing::debug!(
            trigger = self.trigger_pin,
            echo = self.echo_pin,
            "HC-SR04 initialized"
        );
        Ok(())
    }

    fn read_raw(&mut self) -> Result<RawReading, HalError> {
        let budget = self.echo_budget();
        let (trigger, echo) = self.pins.as_ref().ok_or_else(|| {
            HalError::NotInitialized(format!("hcsr04 gpio:{}+{}", self.trigger_pin, self.echo_pin))
        })?;

        trigger.pulse(Duration::from_micros(10))?;

        // Echo goes high when the burst leaves, low when it returns.
        let Some(rising) = Self::wait_for_level(echo, true, budget)? else {
            return Ok(RawReading::Timeout);
        };
        let Some(falling) = Self::wait_for_level(echo, false, budget)? else {
            return Ok(RawReading::Timeout);
        };

        let echo_us = falling.duration_since(rising).as_micros() as f64;
        let mm = (echo_us * SOUND_MM_PER_US / 2.0) as u32;
        Ok(RawReading::Millimeters(mm.min(self.max_range_mm)))
    }

    fn max_range_mm(&self) -> u32 {
        self.max_range_mm
    }

    fn measurement_timeout(&self) -> Duration {
        // Two bounded waits per measurement
        self.echo_budget() * 2 + TIMEOUT_MARGIN
    }

    fn resource_id(&self) -> String {
        format!("gpio:{}+{}", self.trigger_pin, self.echo_pin)
    }
}
