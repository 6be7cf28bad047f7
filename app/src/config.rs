// Application Configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use wardpost_detect::{FusionMode, SensorConfig, SensorKind, Transport, MAX_SLOTS};
use wardpost_detect::window::{MAX_WINDOW, MIN_WINDOW};
use wardpost_detect::config::{
    DEFAULT_MAX_RANGE_MM, DEFAULT_MIN_RANGE_MM, DEFAULT_SAMPLE_INTERVAL_MS,
};
use wardpost_hal::{Hcsr04, Microwave, Pir, Vl53l0x};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Control-loop tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Fusion policy across slots
    #[serde(default)]
    pub fusion_mode: FusionMode,

    /// Slot whose direction is reported as the combined direction
    #[serde(default)]
    pub primary_slot: usize,

    /// GPIO pin driving the warning output, if any
    #[serde(default)]
    pub warning_pin: Option<u32>,

    /// Configured sensor slots
    #[serde(default)]
    pub slots: Vec<SlotEntry>,

    /// Path to config file (for reference)
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// One slot: where the sensor is wired plus its detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Slot index, 0..=3
    pub slot: usize,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Physical wiring of the sensor
    pub binding: TransportBinding,

    /// Detection parameters handed to the core
    pub sensor: SensorConfig,
}

/// Physical wiring for one sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportBinding {
    Ultrasonic { trigger_pin: u32, echo_pin: u32 },
    TimeOfFlight { bus: String, #[serde(default = "default_tof_address")] address: u8 },
    Pir { pin: u32 },
    Microwave { pin: u32 },
}

impl TransportBinding {
    /// Sensor kind this wiring implies
    pub fn kind(&self) -> SensorKind {
        match self {
            TransportBinding::Ultrasonic { .. } => SensorKind::Ultrasonic,
            TransportBinding::TimeOfFlight { .. } => SensorKind::TimeOfFlight,
            TransportBinding::Pir { .. } => SensorKind::Pir,
            TransportBinding::Microwave { .. } => SensorKind::Microwave,
        }
    }

    /// Construct the transport for this wiring
    pub fn build(&self, max_range_mm: u32) -> Transport {
        match self {
            TransportBinding::Ultrasonic {
                trigger_pin,
                echo_pin,
            } => Transport::Ranging(Box::new(Hcsr04::new(*trigger_pin, *echo_pin, max_range_mm))),
            TransportBinding::TimeOfFlight { bus, address } => {
                Transport::Ranging(Box::new(Vl53l0x::new(bus, *address, max_range_mm)))
            }
            TransportBinding::Pir { pin } => Transport::Presence(Box::new(Pir::new(*pin))),
            TransportBinding::Microwave { pin } => {
                Transport::Presence(Box::new(Microwave::new(*pin)))
            }
        }
    }
}

fn default_tick_interval() -> u64 {
    50
}
fn default_tof_address() -> u8 {
    Vl53l0x::DEFAULT_ADDRESS
}
fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            fusion_mode: FusionMode::default(),
            primary_slot: 0,
            warning_pin: None,
            slots: Vec::new(),
            config_path: PathBuf::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from standard paths
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("/etc/wardpost/config.toml"),
            dirs::config_dir()
                .map(|p| p.join("wardpost/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("./config.toml"),
        ];

        for path in &config_paths {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.config_path = path.clone();
        config.normalize();
        Ok(config)
    }

    /// Correct out-of-range values to documented defaults.
    ///
    /// The detection core assumes its configs arrive validated; this is
    /// where that happens. Corrections are logged, never silent.
    pub fn normalize(&mut self) {
        if self.tick_interval_ms < 10 {
            tracing::warn!(
                tick_interval_ms = self.tick_interval_ms,
                "tick interval too small, corrected to 50 ms"
            );
            self.tick_interval_ms = 50;
        }

        if self.primary_slot >= MAX_SLOTS {
            tracing::warn!(primary_slot = self.primary_slot, "primary slot out of range, corrected to 0");
            self.primary_slot = 0;
        }

        for entry in &mut self.slots {
            let sensor = &mut entry.sensor;

            let bound_kind = entry.binding.kind();
            if sensor.kind != bound_kind {
                tracing::warn!(
                    slot = entry.slot,
                    configured = ?sensor.kind,
                    wired = ?bound_kind,
                    "sensor kind does not match wiring, corrected"
                );
                sensor.kind = bound_kind;
            }

            if sensor.window_size != 0
                && !(MIN_WINDOW..=MAX_WINDOW).contains(&sensor.window_size)
            {
                tracing::warn!(
                    slot = entry.slot,
                    window = sensor.window_size,
                    "window size out of range, corrected to kind default"
                );
                sensor.window_size = 0;
            }

            if sensor.min_range_mm >= sensor.max_range_mm {
                tracing::warn!(
                    slot = entry.slot,
                    min = sensor.min_range_mm,
                    max = sensor.max_range_mm,
                    "detection range inverted, corrected to defaults"
                );
                sensor.min_range_mm = DEFAULT_MIN_RANGE_MM;
                sensor.max_range_mm = DEFAULT_MAX_RANGE_MM;
            }

            if sensor.sample_interval_ms == 0 {
                tracing::warn!(slot = entry.slot, "sample interval missing, corrected to default");
                sensor.sample_interval_ms = DEFAULT_SAMPLE_INTERVAL_MS;
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Example configuration: a PIR trigger slot gating an ultrasonic
    /// measurement slot
    pub fn example() -> Self {
        Self {
            warning_pin: Some(18),
            fusion_mode: FusionMode::TriggerMeasure,
            slots: vec![
                SlotEntry {
                    slot: 0,
                    enabled: true,
                    binding: TransportBinding::Pir { pin: 4 },
                    sensor: SensorConfig::for_kind(SensorKind::Pir),
                },
                SlotEntry {
                    slot: 1,
                    enabled: true,
                    binding: TransportBinding::Ultrasonic {
                        trigger_pin: 23,
                        echo_pin: 24,
                    },
                    sensor: SensorConfig::for_kind(SensorKind::Ultrasonic),
                },
            ],
            ..Default::default()
        }
    }
}

/// Helper for getting config directories
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_round_trips() {
        let example = toml::to_string_pretty(&AppConfig::example()).unwrap();
        let parsed: AppConfig = toml::from_str(&example).unwrap();
        assert_eq!(parsed.slots.len(), 2);
        assert_eq!(parsed.fusion_mode, FusionMode::TriggerMeasure);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = std::env::temp_dir()
            .join(format!("wardpost-config-test-{}", std::process::id()))
            .join("config.toml");

        AppConfig::example().save(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.slots.len(), 2);
        assert_eq!(loaded.fusion_mode, FusionMode::TriggerMeasure);
        assert_eq!(loaded.config_path, path);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn normalize_corrects_bad_values() {
        let mut config = AppConfig {
            tick_interval_ms: 1,
            primary_slot: 9,
            slots: vec![SlotEntry {
                slot: 0,
                enabled: true,
                binding: TransportBinding::Ultrasonic {
                    trigger_pin: 23,
                    echo_pin: 24,
                },
                sensor: SensorConfig {
                    min_range_mm: 5000,
                    max_range_mm: 300,
                    window_size: 99,
                    sample_interval_ms: 0,
                    // Wrong on purpose: wiring says ultrasonic.
                    ..SensorConfig::for_kind(SensorKind::Pir)
                },
            }],
            ..Default::default()
        };

        config.normalize();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.primary_slot, 0);

        let sensor = &config.slots[0].sensor;
        assert_eq!(sensor.kind, SensorKind::Ultrasonic);
        assert_eq!(sensor.window_size, 0);
        assert_eq!(sensor.min_range_mm, DEFAULT_MIN_RANGE_MM);
        assert_eq!(sensor.max_range_mm, DEFAULT_MAX_RANGE_MM);
        assert_eq!(sensor.sample_interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
    }
}
