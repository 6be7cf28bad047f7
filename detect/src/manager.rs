//! Multi-sensor slot management and fusion
//!
//! Owns up to four configured sensors, drives their per-tick update in
//! slot order, applies per-slot direction filtering, and combines the
//! filtered verdicts under the active fusion policy. The combined status
//! is recomputed fresh each tick from read-only slot snapshots.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SensorConfig;
use crate::sensor::{build_sensor, Capability, MotionSensor, Transport};
use crate::{DetectError, Direction, Result};

/// Maximum number of sensor slots.
pub const MAX_SLOTS: usize = 4;

/// Policy for combining per-slot verdicts into one system verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Any direction-filtered match warns
    #[default]
    Any,
    /// Every enabled slot must match
    All,
    /// A cheap trigger sensor gates an expensive measurement sensor
    TriggerMeasure,
    /// Only the primary slot decides; others are diagnostics
    PrimaryOnly,
}

/// Read-only aggregate recomputed every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedStatus {
    /// Fused warning verdict
    pub motion: bool,
    /// Nearest smoothed distance among detecting sensors, millimeters
    pub nearest_mm: Option<u32>,
    /// Confirmed direction of the primary slot
    pub direction: Direction,
    /// Enabled slots whose sensor is ready
    pub active_sensors: u8,
    /// Enabled slots currently detecting (before direction filtering)
    pub detecting_sensors: u8,
    /// Rising edges of the fused verdict since creation
    pub event_count: u64,
    /// When this status was computed
    pub updated_at: DateTime<Utc>,
}

impl Default for CombinedStatus {
    fn default() -> Self {
        Self {
            motion: false,
            nearest_mm: None,
            direction: Direction::Unknown,
            active_sensors: 0,
            detecting_sensors: 0,
            event_count: 0,
            updated_at: Utc::now(),
        }
    }
}

/// One configured slot: exclusive owner of its sensor instance
struct SensorSlot {
    config: SensorConfig,
    sensor: Box<dyn MotionSensor>,
    enabled: bool,
    resource: String,
}

impl SensorSlot {
    /// Direction-filtered match: raw detection, optionally gated on the
    /// confirmed direction matching the configured trigger mode.
    fn matches(&self) -> bool {
        if !self.sensor.motion_detected() {
            return false;
        }
        if self.sensor.capability() == Capability::Presence || !self.config.direction_enabled {
            return true;
        }
        self.config.trigger_mode.matches(self.sensor.direction())
    }
}

/// Owns the sensor slots and produces the fused verdict
pub struct SensorManager {
    slots: [Option<SensorSlot>; MAX_SLOTS],
    fusion_mode: FusionMode,
    primary_slot: usize,
    status: CombinedStatus,
    /// Last observed trigger-slot detection, used to gate the measurement
    /// slot in TriggerMeasure mode.
    trigger_active: bool,
}

impl SensorManager {
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None],
            fusion_mode: FusionMode::default(),
            primary_slot: 0,
            status: CombinedStatus::default(),
            trigger_active: false,
        }
    }

    /// Configure a slot with a sensor built from `config` and `transport`.
    ///
    /// Rejects (never corrects) slot indices out of range, physical
    /// resource conflicts with other slots, kind/transport mismatches, and
    /// arrangements that break an active TriggerMeasure mode.
    pub fn add_sensor(
        &mut self,
        slot: usize,
        config: SensorConfig,
        transport: Transport,
    ) -> Result<()> {
        if slot >= MAX_SLOTS {
            return Err(DetectError::InvalidSlot(slot));
        }

        let resource = transport.resource_id();
        for (i, other) in self.slots.iter().enumerate() {
            if i == slot {
                continue;
            }
            if let Some(other) = other {
                if other.resource == resource {
                    return Err(DetectError::ResourceConflict {
                        slot,
                        other: i,
                        resource,
                    });
                }
            }
        }

        let mut sensor = build_sensor(&config, transport)?;
        sensor.begin()?;

        let previous = self.slots[slot].take();
        self.slots[slot] = Some(SensorSlot {
            config,
            sensor,
            enabled: true,
            resource,
        });

        if self.fusion_mode == FusionMode::TriggerMeasure {
            if let Err(e) = self.validate_fusion(FusionMode::TriggerMeasure) {
                self.slots[slot] = previous;
                return Err(e);
            }
        }

        tracing::info!(slot, "sensor added");
        Ok(())
    }

    /// Destroy the sensor instance in a slot
    pub fn remove_sensor(&mut self, slot: usize) -> Result<()> {
        if slot >= MAX_SLOTS {
            return Err(DetectError::InvalidSlot(slot));
        }
        if self.slots[slot].take().is_none() {
            return Err(DetectError::EmptySlot(slot));
        }
        tracing::info!(slot, "sensor removed");
        Ok(())
    }

    /// Apply a threshold-only config edit to an existing slot.
    ///
    /// A sensor-kind change is reported as an error; the caller must
    /// remove and re-add the slot with a matching transport instead.
    pub fn apply_config(&mut self, slot: usize, config: SensorConfig) -> Result<()> {
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(DetectError::InvalidSlot(slot))?
            .as_mut()
            .ok_or(DetectError::EmptySlot(slot))?;

        if entry.config.kind != config.kind {
            return Err(DetectError::KindMismatch(format!(
                "slot {} is {:?}; changing to {:?} requires re-adding the sensor",
                slot, entry.config.kind, config.kind
            )));
        }

        entry.sensor.apply_config(&config);
        entry.config = config;
        Ok(())
    }

    /// Enable or disable a configured slot
    pub fn set_enabled(&mut self, slot: usize, enabled: bool) -> Result<()> {
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(DetectError::InvalidSlot(slot))?
            .as_mut()
            .ok_or(DetectError::EmptySlot(slot))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Designate the primary slot for PrimaryOnly fusion and the reported
    /// combined direction
    pub fn set_primary(&mut self, slot: usize) -> Result<()> {
        if slot >= MAX_SLOTS {
            return Err(DetectError::InvalidSlot(slot));
        }
        self.primary_slot = slot;
        Ok(())
    }

    /// Select the fusion policy; rejected if the current slot arrangement
    /// cannot satisfy it
    pub fn set_fusion_mode(&mut self, mode: FusionMode) -> Result<()> {
        self.validate_fusion(mode)?;
        self.fusion_mode = mode;
        tracing::info!(?mode, "fusion mode changed");
        Ok(())
    }

    pub fn fusion_mode(&self) -> FusionMode {
        self.fusion_mode
    }

    /// TriggerMeasure needs exactly one enabled trigger-capable slot and
    /// exactly one enabled measurement-capable slot.
    fn validate_fusion(&self, mode: FusionMode) -> Result<()> {
        if mode != FusionMode::TriggerMeasure {
            return Ok(());
        }

        let mut triggers = 0;
        let mut measures = 0;
        for slot in self.slots.iter().flatten() {
            if !slot.enabled {
                continue;
            }
            match slot.sensor.capability() {
                Capability::Presence => triggers += 1,
                Capability::Ranging => measures += 1,
            }
        }

        if triggers != 1 || measures != 1 {
            return Err(DetectError::InvalidFusionConfig(format!(
                "trigger_measure needs exactly one trigger and one measurement slot enabled, \
                 found {} trigger(s) and {} measurement(s)",
                triggers, measures
            )));
        }
        Ok(())
    }

    /// Drive every enabled slot one tick and recompute the combined status
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Tick with an explicit clock, for deterministic tests
    pub fn update_at(&mut self, now: Instant) {
        let gate_measurement = self.fusion_mode == FusionMode::TriggerMeasure;

        for slot in self.slots.iter_mut().flatten() {
            if !slot.enabled {
                continue;
            }

            // Power saving in TriggerMeasure mode: the expensive ranging
            // sensor only touches hardware while the trigger slot detects.
            // If slot order places the measurement slot first, the trigger
            // state from the previous tick gates it.
            let is_measurement = slot.sensor.capability() == Capability::Ranging;
            if !(gate_measurement && is_measurement && !self.trigger_active) {
                slot.sensor.update(now);
            }

            if gate_measurement && slot.sensor.capability() == Capability::Presence {
                self.trigger_active = slot.sensor.motion_detected();
            }
        }

        self.recompute_status();
    }

    fn recompute_status(&mut self) {
        let combined = self.combined_verdict();

        let mut nearest: Option<u32> = None;
        let mut active = 0u8;
        let mut detecting = 0u8;

        for slot in self.slots.iter().flatten() {
            if !slot.enabled {
                continue;
            }
            if slot.sensor.is_ready() {
                active += 1;
            }
            if slot.sensor.motion_detected() {
                detecting += 1;
                if let Some(mm) = slot.sensor.distance_mm() {
                    nearest = Some(nearest.map_or(mm, |n| n.min(mm)));
                }
            }
        }

        if combined && !self.status.motion {
            self.status.event_count += 1;
        }

        self.status.motion = combined;
        self.status.nearest_mm = nearest;
        self.status.direction = self.slots[self.primary_slot]
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| s.sensor.direction())
            .unwrap_or(Direction::Unknown);
        self.status.active_sensors = active;
        self.status.detecting_sensors = detecting;
        self.status.updated_at = Utc::now();
    }

    fn combined_verdict(&self) -> bool {
        let enabled = || {
            self.slots
                .iter()
                .flatten()
                .filter(|s| s.enabled)
        };

        match self.fusion_mode {
            FusionMode::Any => enabled().any(|s| s.matches()),
            FusionMode::All => enabled().count() > 0 && enabled().all(|s| s.matches()),
            FusionMode::PrimaryOnly => self.slots[self.primary_slot]
                .as_ref()
                .filter(|s| s.enabled)
                .map(|s| s.matches())
                .unwrap_or(false),
            FusionMode::TriggerMeasure => {
                let trigger = enabled().find(|s| s.sensor.capability() == Capability::Presence);
                let measure = enabled().find(|s| s.sensor.capability() == Capability::Ranging);
                match (trigger, measure) {
                    (Some(t), Some(m)) => t.sensor.motion_detected() && m.matches(),
                    _ => false,
                }
            }
        }
    }

    /// Fused verdict from the most recent update
    pub fn is_motion_detected(&self) -> bool {
        self.status.motion
    }

    /// Combined status snapshot; identical between updates
    pub fn status(&self) -> CombinedStatus {
        self.status.clone()
    }

    /// Per-slot diagnostics: (enabled, ready, events, errors) for each
    /// configured slot
    pub fn slot_diagnostics(&self) -> Vec<(usize, bool, bool, u64, u64)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref()
                    .map(|s| (i, s.enabled, s.sensor.is_ready(), s.sensor.event_count(), s.sensor.error_count()))
            })
            .collect()
    }

    /// Sum of worst-case measurement timeouts is the caller's budgeting
    /// concern; expose how many slots are enabled for it.
    pub fn enabled_slots(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.enabled).count()
    }
}

impl Default for SensorManager {
    fn default() -> Self {
        Self::new()
    }
}
