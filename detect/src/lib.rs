//! Wardpost Detection Core
//!
//! Turns raw proximity readings from heterogeneous sensors into a single
//! fused "warn now, and in which direction" verdict. The engine runs one
//! discrete step per control-loop tick: each configured sensor smooths its
//! readings through a rolling window, classifies a debounced direction,
//! and the [`manager::SensorManager`] combines the per-sensor verdicts
//! under a configurable fusion policy.

pub mod config;
pub mod direction;
pub mod manager;
pub mod sensor;
pub mod window;

pub use config::{SensorConfig, SensorKind};
pub use direction::DirectionClassifier;
pub use manager::{CombinedStatus, FusionMode, SensorManager, MAX_SLOTS};
pub use sensor::{build_sensor, Capability, MotionSensor, PresenceSensor, RangingSensor, Transport};
pub use window::SampleWindow;

use serde::{Deserialize, Serialize};
use wardpost_hal::HalError;

/// Classified movement direction of the tracked object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// No classification yet (fresh sensor, or binary sensor).
    #[default]
    Unknown,
    /// Distance is shrinking: the object moves toward the sensor.
    Approaching,
    /// Distance is growing: the object moves away.
    Receding,
    /// Distance is stable within the sensitivity band.
    Stationary,
}

/// Which confirmed directions count as a warning-worthy match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionTriggerMode {
    ApproachingOnly,
    RecedingOnly,
    /// Either moving direction matches; Stationary and Unknown do not.
    #[default]
    Both,
}

impl DirectionTriggerMode {
    /// Does a confirmed direction satisfy this trigger mode?
    pub fn matches(&self, direction: Direction) -> bool {
        match self {
            DirectionTriggerMode::ApproachingOnly => direction == Direction::Approaching,
            DirectionTriggerMode::RecedingOnly => direction == Direction::Receding,
            DirectionTriggerMode::Both => {
                matches!(direction, Direction::Approaching | Direction::Receding)
            }
        }
    }
}

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    #[error("Slot index out of range: {0}")]
    InvalidSlot(usize),

    #[error("No sensor configured in slot {0}")]
    EmptySlot(usize),

    #[error("Slot {slot} and slot {other} both claim resource {resource}")]
    ResourceConflict {
        slot: usize,
        other: usize,
        resource: String,
    },

    #[error("Invalid fusion configuration: {0}")]
    InvalidFusionConfig(String),

    #[error("Sensor kind mismatch: {0}")]
    KindMismatch(String),
}

pub type Result<T> = std::result::Result<T, DetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_mode_matching() {
        assert!(DirectionTriggerMode::ApproachingOnly.matches(Direction::Approaching));
        assert!(!DirectionTriggerMode::ApproachingOnly.matches(Direction::Receding));
        assert!(!DirectionTriggerMode::ApproachingOnly.matches(Direction::Stationary));

        assert!(DirectionTriggerMode::RecedingOnly.matches(Direction::Receding));
        assert!(!DirectionTriggerMode::RecedingOnly.matches(Direction::Approaching));

        assert!(DirectionTriggerMode::Both.matches(Direction::Approaching));
        assert!(DirectionTriggerMode::Both.matches(Direction::Receding));
        assert!(!DirectionTriggerMode::Both.matches(Direction::Stationary));
        assert!(!DirectionTriggerMode::Both.matches(Direction::Unknown));
    }
}
