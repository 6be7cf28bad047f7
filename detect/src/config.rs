//! Per-slot sensor configuration
//!
//! The configuration store (app layer) validates and corrects these values
//! before they reach the core; the helpers here only resolve derived
//! quantities such as the adaptive sensitivity and the debounce length.

use serde::{Deserialize, Serialize};

use crate::window::{MAX_WINDOW, MIN_WINDOW};
use crate::DirectionTriggerMode;

/// Default detection range lower bound, millimeters.
pub const DEFAULT_MIN_RANGE_MM: u32 = 200;
/// Default detection range upper bound, millimeters.
pub const DEFAULT_MAX_RANGE_MM: u32 = 3000;
/// Default movement threshold between consecutive averages, millimeters.
pub const DEFAULT_MOVEMENT_THRESHOLD_MM: u32 = 50;
/// Default debounce stability time, milliseconds.
pub const DEFAULT_STABILITY_TIME_MS: u64 = 400;
/// Default interval between hardware measurements, milliseconds.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

/// Supported sensor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// HC-SR04 class pulse/echo ranger
    Ultrasonic,
    /// VL53L0X class time-of-flight ranger
    TimeOfFlight,
    /// PIR binary presence sensor
    Pir,
    /// Microwave doppler binary presence sensor
    Microwave,
}

impl SensorKind {
    /// Does this kind expose distance and direction?
    pub fn is_ranging(&self) -> bool {
        matches!(self, SensorKind::Ultrasonic | SensorKind::TimeOfFlight)
    }

    /// Default smoothing window size for this kind.
    ///
    /// Ultrasonic readings are noisy enough to want a short window that
    /// still tracks quickly; time-of-flight readings are cheap and frequent
    /// so a longer window pays off.
    pub fn default_window(&self) -> usize {
        match self {
            SensorKind::Ultrasonic => 3,
            SensorKind::TimeOfFlight => 10,
            SensorKind::Pir | SensorKind::Microwave => MIN_WINDOW,
        }
    }
}

/// Configuration for one sensor slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor kind; changing it forces the slot's instance to be rebuilt
    pub kind: SensorKind,

    /// Detection range lower bound, millimeters
    #[serde(default = "default_min_range")]
    pub min_range_mm: u32,

    /// Detection range upper bound, millimeters
    #[serde(default = "default_max_range")]
    pub max_range_mm: u32,

    /// Direction dead band in millimeters; 0 selects the adaptive value
    #[serde(default)]
    pub sensitivity_mm: u32,

    /// Smoothing window size; 0 selects the kind default
    #[serde(default)]
    pub window_size: usize,

    /// Interval between hardware measurements, milliseconds
    #[serde(default = "default_interval")]
    pub sample_interval_ms: u64,

    /// Gate warnings on the confirmed direction
    #[serde(default = "default_true")]
    pub direction_enabled: bool,

    /// Which confirmed directions count as a match
    #[serde(default)]
    pub trigger_mode: DirectionTriggerMode,

    /// Minimum average-to-average change that counts as movement
    #[serde(default = "default_movement")]
    pub movement_threshold_mm: u32,

    /// Debounce stability time, milliseconds
    #[serde(default = "default_stability")]
    pub stability_time_ms: u64,
}

fn default_min_range() -> u32 {
    DEFAULT_MIN_RANGE_MM
}
fn default_max_range() -> u32 {
    DEFAULT_MAX_RANGE_MM
}
fn default_interval() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}
fn default_movement() -> u32 {
    DEFAULT_MOVEMENT_THRESHOLD_MM
}
fn default_stability() -> u64 {
    DEFAULT_STABILITY_TIME_MS
}
fn default_true() -> bool {
    true
}

impl SensorConfig {
    /// Configuration with documented defaults for a kind
    pub fn for_kind(kind: SensorKind) -> Self {
        Self {
            kind,
            min_range_mm: DEFAULT_MIN_RANGE_MM,
            max_range_mm: DEFAULT_MAX_RANGE_MM,
            sensitivity_mm: 0,
            window_size: 0,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            direction_enabled: true,
            trigger_mode: DirectionTriggerMode::default(),
            movement_threshold_mm: DEFAULT_MOVEMENT_THRESHOLD_MM,
            stability_time_ms: DEFAULT_STABILITY_TIME_MS,
        }
    }

    /// Window size with the kind default and legal bounds applied
    pub fn effective_window(&self) -> usize {
        let size = if self.window_size == 0 {
            self.kind.default_window()
        } else {
            self.window_size
        };
        size.clamp(MIN_WINDOW, MAX_WINDOW)
    }

    /// Direction sensitivity, resolving 0 to the adaptive value.
    ///
    /// Faster sampling sees smaller per-sample deltas, so the adaptive dead
    /// band scales with the sample interval.
    pub fn effective_sensitivity(&self) -> u32 {
        if self.sensitivity_mm != 0 {
            return self.sensitivity_mm;
        }
        ((self.sample_interval_ms as u32).saturating_mul(2)).clamp(100, 500)
    }

    /// Consecutive stable samples needed to confirm a direction
    pub fn required_stable_samples(&self) -> u32 {
        let interval = self.sample_interval_ms.max(1);
        self.stability_time_ms.div_ceil(interval).max(1) as u32
    }

    /// Is a millimeter distance inside the configured detection range?
    pub fn in_range(&self, mm: u32) -> bool {
        mm >= self.min_range_mm && mm <= self.max_range_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_stable_samples_rounds_up() {
        let mut config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        config.stability_time_ms = 400;
        config.sample_interval_ms = 75;
        assert_eq!(config.required_stable_samples(), 6);

        config.sample_interval_ms = 100;
        assert_eq!(config.required_stable_samples(), 4);

        config.sample_interval_ms = 1000;
        assert_eq!(config.required_stable_samples(), 1);
    }

    #[test]
    fn adaptive_sensitivity_scales_with_interval() {
        let mut config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        config.sensitivity_mm = 0;

        config.sample_interval_ms = 75;
        assert_eq!(config.effective_sensitivity(), 150);
        config.sample_interval_ms = 10;
        assert_eq!(config.effective_sensitivity(), 100);
        config.sample_interval_ms = 1000;
        assert_eq!(config.effective_sensitivity(), 500);

        config.sensitivity_mm = 350;
        assert_eq!(config.effective_sensitivity(), 350);
    }

    #[test]
    fn window_defaults_per_kind() {
        let config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        assert_eq!(config.effective_window(), 3);
        let config = SensorConfig::for_kind(SensorKind::TimeOfFlight);
        assert_eq!(config.effective_window(), 10);

        let mut config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        config.window_size = 99;
        assert_eq!(config.effective_window(), 20);
    }

    #[test]
    fn range_check_is_inclusive() {
        let config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        assert!(config.in_range(200));
        assert!(config.in_range(3000));
        assert!(!config.in_range(199));
        assert!(!config.in_range(3001));
    }
}
