//! Wardpost Hardware Transport Layer
//!
//! Provides the narrow transport contracts the detection core consumes,
//! plus concrete Linux drivers for the supported proximity sensors.
//!
//! # Modules
//!
//! - [`gpio`] - sysfs GPIO pin access for pulse timing and level reads
//! - [`i2c`] - I2C bus access for time-of-flight rangers
//! - [`ultrasonic`] - HC-SR04 style pulse/echo ranging transport
//! - [`tof`] - VL53L0X time-of-flight ranging transport
//! - [`presence`] - PIR and microwave binary presence transports
//! - [`scripted`] - in-memory transports for tests and offline simulation
//!
//! The core never sees pin numbers or bus protocols. It talks to a
//! [`RangingTransport`] or [`PresenceTransport`] and receives either a
//! millimeter reading or an explicit timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod gpio;
pub mod i2c;
pub mod presence;
pub mod scripted;
pub mod tof;
pub mod ultrasonic;

// Re-exports for convenience
pub use gpio::{Direction, GpioPin, Level};
pub use i2c::I2cBus;
pub use presence::{Microwave, Pir};
pub use scripted::{ScriptedPresence, ScriptedRanging};
pub use tof::Vl53l0x;
pub use ultrasonic::Hcsr04;

/// One raw measurement from a ranging transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawReading {
    /// Distance in millimeters, capped at the transport's maximum range.
    Millimeters(u32),
    /// The measurement did not complete within the transport's bounded wait.
    Timeout,
}

impl RawReading {
    /// Millimeter value, if the measurement completed.
    pub fn millimeters(&self) -> Option<u32> {
        match self {
            RawReading::Millimeters(mm) => Some(*mm),
            RawReading::Timeout => None,
        }
    }
}

/// HAL error types
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Transport not initialized: {0}")]
    NotInitialized(String),
}

/// Transport for a ranging sensor: produces millimeter distance samples.
///
/// `read_raw` is a bounded synchronous operation. The worst case is
/// [`measurement_timeout`](RangingTransport::measurement_timeout), which the
/// host must budget against its tick cadence. A timeout is data
/// ([`RawReading::Timeout`]), not an error; `Err` is reserved for transport
/// faults (bus gone, pin unexported).
pub trait RangingTransport: Send {
    /// Initialize the underlying hardware.
    fn begin(&mut self) -> Result<(), HalError>;

    /// Perform one measurement, waiting at most `measurement_timeout`.
    fn read_raw(&mut self) -> Result<RawReading, HalError>;

    /// Maximum distance this transport can report, in millimeters.
    fn max_range_mm(&self) -> u32;

    /// Worst-case duration of a single `read_raw` call.
    fn measurement_timeout(&self) -> Duration;

    /// Identifier of the physical resource this transport occupies,
    /// e.g. `"gpio:23+24"` or `"i2c:/dev/i2c-1:0x29"`.
    fn resource_id(&self) -> String;
}

/// Transport for a binary presence sensor: produces a high/low level.
pub trait PresenceTransport: Send {
    /// Initialize the underlying hardware.
    fn begin(&mut self) -> Result<(), HalError>;

    /// Read the current detection level.
    fn read_level(&mut self) -> Result<bool, HalError>;

    /// Warmup period after power-on during which levels are unreliable.
    fn warmup(&self) -> Duration;

    /// Identifier of the physical resource this transport occupies.
    fn resource_id(&self) -> String;
}
