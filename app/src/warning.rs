//! Warning consumers
//!
//! The detection core hands over a fused verdict, the nearest distance and
//! the primary direction each tick; how that becomes a user-visible
//! warning lives here, behind [`WarningSink`].

use anyhow::Result;
use wardpost_detect::{CombinedStatus, Direction};
use wardpost_hal::GpioPin;

/// Consumer of the per-tick combined verdict
pub trait WarningSink {
    fn render(&mut self, status: &CombinedStatus) -> Result<()>;
}

/// Logs warning transitions through tracing
pub struct LogWarningSink {
    was_warning: bool,
}

impl LogWarningSink {
    pub fn new() -> Self {
        Self { was_warning: false }
    }
}

impl Default for LogWarningSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningSink for LogWarningSink {
    fn render(&mut self, status: &CombinedStatus) -> Result<()> {
        if status.motion && !self.was_warning {
            let direction = match status.direction {
                Direction::Approaching => "approaching",
                Direction::Receding => "receding",
                Direction::Stationary => "stationary",
                Direction::Unknown => "direction unknown",
            };
            match status.nearest_mm {
                Some(mm) => tracing::warn!(distance_mm = mm, "motion warning: {}", direction),
                None => tracing::warn!("motion warning: {}", direction),
            }
        } else if !status.motion && self.was_warning {
            tracing::info!("motion warning cleared");
        }
        self.was_warning = status.motion;
        Ok(())
    }
}

/// Drives a GPIO output (LED, buzzer relay) from the verdict
pub struct GpioWarningSink {
    pin: GpioPin,
    active: bool,
}

impl GpioWarningSink {
    pub fn new(pin: u32) -> Result<Self> {
        let pin = GpioPin::new(pin, wardpost_hal::Direction::Output)?;
        pin.write(false)?;
        Ok(Self { pin, active: false })
    }
}

impl WarningSink for GpioWarningSink {
    fn render(&mut self, status: &CombinedStatus) -> Result<()> {
        if status.motion != self.active {
            self.pin.write(status.motion)?;
            self.active = status.motion;
        }
        Ok(())
    }
}
