//! Motion sensor variants
//!
//! Two capability sets share the [`MotionSensor`] contract: binary presence
//! sensors (PIR, microwave) expose only a detection flag, ranging sensors
//! (ultrasonic, time-of-flight) additionally smooth distances through a
//! [`SampleWindow`] and classify a debounced direction.
//!
//! A transport timeout is absorbed locally: the failed sample is discarded,
//! a diagnostic counter is incremented, and the sensor carries its prior
//! smoothed state forward until valid readings resume. Nothing a sensor
//! does can abort the control loop.

use std::time::{Duration, Instant};

use wardpost_hal::{PresenceTransport, RangingTransport, RawReading};

use crate::config::SensorConfig;
use crate::direction::DirectionClassifier;
use crate::window::SampleWindow;
use crate::{DetectError, Direction, Result};

/// Capability set of a sensor variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Binary detection flag only
    Presence,
    /// Detection flag plus distance and direction
    Ranging,
}

/// Common contract for all sensor variants.
///
/// `update` performs at most one hardware measurement per call, gated by
/// the configured sample interval; between due measurements the previously
/// classified state is reused.
pub trait MotionSensor: Send {
    /// Initialize the underlying transport
    fn begin(&mut self) -> Result<()>;

    /// One discrete step; absorbs transport failures internally
    fn update(&mut self, now: Instant);

    /// Capability set of this variant
    fn capability(&self) -> Capability;

    /// Has the sensor produced usable state yet?
    fn is_ready(&self) -> bool;

    /// Current trigger decision (before any direction filtering)
    fn motion_detected(&self) -> bool;

    /// Smoothed distance in millimeters, for ranging variants
    fn distance_mm(&self) -> Option<u32> {
        None
    }

    /// Confirmed direction, for ranging variants
    fn direction(&self) -> Direction {
        Direction::Unknown
    }

    /// Detection events since creation (rising edges of `motion_detected`)
    fn event_count(&self) -> u64;

    /// Failed measurements since creation (timeouts and transport faults)
    fn error_count(&self) -> u64;

    /// Physical resource occupied by the transport
    fn resource_id(&self) -> String;

    /// Adjust the detection range without rebuilding the sensor
    fn set_detection_range(&mut self, min_mm: u32, max_mm: u32);

    /// Enable or disable direction gating
    fn set_direction_enabled(&mut self, enabled: bool);

    /// Apply a threshold-only configuration edit
    fn apply_config(&mut self, config: &SensorConfig);
}

/// Transport handed to the factory for one slot
pub enum Transport {
    Ranging(Box<dyn RangingTransport>),
    Presence(Box<dyn PresenceTransport>),
}

impl Transport {
    pub fn resource_id(&self) -> String {
        match self {
            Transport::Ranging(t) => t.resource_id(),
            Transport::Presence(t) => t.resource_id(),
        }
    }
}

/// Build the sensor variant matching the configured kind.
///
/// The kind and the transport flavor must agree; a mismatch is a
/// configuration error, reported rather than coerced.
pub fn build_sensor(config: &SensorConfig, transport: Transport) -> Result<Box<dyn MotionSensor>> {
    match (config.kind.is_ranging(), transport) {
        (true, Transport::Ranging(t)) => Ok(Box::new(RangingSensor::new(config.clone(), t))),
        (false, Transport::Presence(t)) => Ok(Box::new(PresenceSensor::new(config.clone(), t))),
        (true, Transport::Presence(_)) => Err(DetectError::KindMismatch(format!(
            "{:?} needs a ranging transport",
            config.kind
        ))),
        (false, Transport::Ranging(_)) => Err(DetectError::KindMismatch(format!(
            "{:?} needs a presence transport",
            config.kind
        ))),
    }
}

/// Ranging sensor: window smoothing, wipe recovery, debounced direction
pub struct RangingSensor {
    config: SensorConfig,
    transport: Box<dyn RangingTransport>,
    window: SampleWindow,
    classifier: DirectionClassifier,

    /// Last valid raw sample, for the raw-to-raw gradual-approach check.
    /// Updated only after the comparison that reads it.
    previous_raw: Option<u32>,
    /// An approach was observed while the object was still beyond the
    /// detection range; cleared only on a confirmed Receding direction.
    seen_approaching_outside: bool,

    /// At least one valid sample has ever been accepted.
    primed: bool,
    movement_detected: bool,
    object_detected: bool,

    last_sample_at: Option<Instant>,
    began: bool,
    event_count: u64,
    error_count: u64,
}

impl RangingSensor {
    pub fn new(config: SensorConfig, transport: Box<dyn RangingTransport>) -> Self {
        let window = SampleWindow::new(config.effective_window());
        let classifier = DirectionClassifier::new(
            config.effective_sensitivity(),
            config.required_stable_samples(),
        );
        Self {
            config,
            transport,
            window,
            classifier,
            previous_raw: None,
            seen_approaching_outside: false,
            primed: false,
            movement_detected: false,
            object_detected: false,
            last_sample_at: None,
            began: false,
            event_count: 0,
            error_count: 0,
        }
    }

    fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.config.sample_interval_ms)
    }

    /// Feed one valid millimeter sample through the window, the wipe check
    /// and the direction classifier.
    fn accept_sample(&mut self, raw: u32) {
        let sensitivity = self.config.effective_sensitivity();

        // Raw-to-raw gradual approach, evaluated against the previous raw
        // sample before it is overwritten.
        if let Some(prev) = self.previous_raw {
            if prev > self.config.max_range_mm && raw < prev && prev - raw >= sensitivity {
                if !self.seen_approaching_outside {
                    tracing::debug!(prev, raw, "approach seen outside detection range");
                }
                self.seen_approaching_outside = true;
            }
        }

        let raw_in = self.config.in_range(raw);
        let average_in = !self.window.is_empty() && self.config.in_range(self.window.average());

        if !self.window.is_empty() && raw_in != average_in {
            // Wipe: the smoothed signal has not caught up with a sudden real
            // change. Reseed the window and derive the candidate direction
            // from the discontinuity itself.
            let pre_wipe_average = self.window.average();
            self.window.reset_with(raw);
            self.classifier
                .seed(raw as i64 - pre_wipe_average as i64);
            tracing::debug!(pre_wipe_average, raw, "wipe detected, window reseeded");
        } else {
            let had_samples = !self.window.is_empty();
            self.window.push(raw);
            if had_samples {
                let delta = self.window.average() as i64 - self.window.previous_average() as i64;
                self.classifier.classify(delta);
            }
        }

        self.movement_detected = self.primed
            && self
                .window
                .average()
                .abs_diff(self.window.previous_average())
                >= self.config.movement_threshold_mm;

        // A momentary stall mid-approach must not erase the flag, so only a
        // confirmed Receding clears it.
        if self.classifier.confirmed() == Direction::Receding {
            self.seen_approaching_outside = false;
        }

        self.object_detected = self.config.in_range(self.window.average())
            && (self.movement_detected || self.seen_approaching_outside);

        self.previous_raw = Some(raw);
        self.primed = true;
    }

    /// Movement seen between the last two averages
    pub fn movement_detected(&self) -> bool {
        self.movement_detected
    }

    /// Raw-to-raw gradual-approach flag
    pub fn gradual_approach(&self) -> bool {
        self.seen_approaching_outside
    }

    /// Direction state, for diagnostics
    pub fn classifier(&self) -> &DirectionClassifier {
        &self.classifier
    }
}

impl MotionSensor for RangingSensor {
    fn begin(&mut self) -> Result<()> {
        self.transport.begin()?;
        self.began = true;
        tracing::info!(
            resource = %self.transport.resource_id(),
            kind = ?self.config.kind,
            "ranging sensor started"
        );
        Ok(())
    }

    fn update(&mut self, now: Instant) {
        if !self.began {
            return;
        }
        if let Some(last) = self.last_sample_at {
            if now.duration_since(last) < self.sample_interval() {
                // Not due this tick: no hardware access, reuse prior state.
                return;
            }
        }
        self.last_sample_at = Some(now);

        let was_detected = self.object_detected;

        match self.transport.read_raw() {
            Ok(RawReading::Millimeters(mm)) => self.accept_sample(mm),
            Ok(RawReading::Timeout) => {
                // Failed measurement: discard, count, carry state forward.
                self.error_count += 1;
            }
            Err(e) => {
                self.error_count += 1;
                tracing::warn!(resource = %self.transport.resource_id(), error = %e, "measurement failed");
            }
        }

        if self.object_detected && !was_detected {
            self.event_count += 1;
        }
    }

    fn capability(&self) -> Capability {
        Capability::Ranging
    }

    fn is_ready(&self) -> bool {
        self.began && self.primed
    }

    fn motion_detected(&self) -> bool {
        self.object_detected
    }

    fn distance_mm(&self) -> Option<u32> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.average())
        }
    }

    fn direction(&self) -> Direction {
        self.classifier.confirmed()
    }

    fn event_count(&self) -> u64 {
        self.event_count
    }

    fn error_count(&self) -> u64 {
        self.error_count
    }

    fn resource_id(&self) -> String {
        self.transport.resource_id()
    }

    fn set_detection_range(&mut self, min_mm: u32, max_mm: u32) {
        self.config.min_range_mm = min_mm;
        self.config.max_range_mm = max_mm;
    }

    fn set_direction_enabled(&mut self, enabled: bool) {
        self.config.direction_enabled = enabled;
    }

    fn apply_config(&mut self, config: &SensorConfig) {
        self.config.min_range_mm = config.min_range_mm;
        self.config.max_range_mm = config.max_range_mm;
        self.config.sensitivity_mm = config.sensitivity_mm;
        self.config.movement_threshold_mm = config.movement_threshold_mm;
        self.config.sample_interval_ms = config.sample_interval_ms;
        self.config.stability_time_ms = config.stability_time_ms;
        self.config.direction_enabled = config.direction_enabled;
        self.config.trigger_mode = config.trigger_mode;
        // Effective sensitivity and debounce length both depend on the
        // interval, so recompute them after the copies.
        self.classifier
            .set_sensitivity(self.config.effective_sensitivity());
        self.classifier
            .set_required_stable(self.config.required_stable_samples());
    }
}

/// Binary presence sensor: detection level after a warmup period
pub struct PresenceSensor {
    config: SensorConfig,
    transport: Box<dyn PresenceTransport>,
    began_at: Option<Instant>,
    last_sample_at: Option<Instant>,
    level: bool,
    event_count: u64,
    error_count: u64,
}

impl PresenceSensor {
    pub fn new(config: SensorConfig, transport: Box<dyn PresenceTransport>) -> Self {
        Self {
            config,
            transport,
            began_at: None,
            last_sample_at: None,
            level: false,
            event_count: 0,
            error_count: 0,
        }
    }

    fn warmed_up(&self, now: Instant) -> bool {
        self.began_at
            .map(|t| now.duration_since(t) >= self.transport.warmup())
            .unwrap_or(false)
    }
}

impl MotionSensor for PresenceSensor {
    fn begin(&mut self) -> Result<()> {
        self.transport.begin()?;
        self.began_at = Some(Instant::now());
        tracing::info!(
            resource = %self.transport.resource_id(),
            kind = ?self.config.kind,
            warmup = ?self.transport.warmup(),
            "presence sensor started"
        );
        Ok(())
    }

    fn update(&mut self, now: Instant) {
        if self.began_at.is_none() || !self.warmed_up(now) {
            return;
        }
        if let Some(last) = self.last_sample_at {
            if now.duration_since(last) < Duration::from_millis(self.config.sample_interval_ms) {
                return;
            }
        }
        self.last_sample_at = Some(now);

        match self.transport.read_level() {
            Ok(level) => {
                if level && !self.level {
                    self.event_count += 1;
                }
                self.level = level;
            }
            Err(e) => {
                self.error_count += 1;
                tracing::warn!(resource = %self.transport.resource_id(), error = %e, "level read failed");
            }
        }
    }

    fn capability(&self) -> Capability {
        Capability::Presence
    }

    fn is_ready(&self) -> bool {
        self.began_at
            .map(|t| t.elapsed() >= self.transport.warmup())
            .unwrap_or(false)
    }

    fn motion_detected(&self) -> bool {
        self.level
    }

    fn event_count(&self) -> u64 {
        self.event_count
    }

    fn error_count(&self) -> u64 {
        self.error_count
    }

    fn resource_id(&self) -> String {
        self.transport.resource_id()
    }

    fn set_detection_range(&mut self, min_mm: u32, max_mm: u32) {
        self.config.min_range_mm = min_mm;
        self.config.max_range_mm = max_mm;
    }

    fn set_direction_enabled(&mut self, enabled: bool) {
        self.config.direction_enabled = enabled;
    }

    fn apply_config(&mut self, config: &SensorConfig) {
        self.config.direction_enabled = config.direction_enabled;
        self.config.trigger_mode = config.trigger_mode;
        self.config.sample_interval_ms = config.sample_interval_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorKind;
    use crate::DirectionTriggerMode;
    use wardpost_hal::{ScriptedPresence, ScriptedRanging};

    fn ranging_config() -> SensorConfig {
        SensorConfig {
            sensitivity_mm: 150,
            window_size: 3,
            sample_interval_ms: 75,
            trigger_mode: DirectionTriggerMode::ApproachingOnly,
            ..SensorConfig::for_kind(SensorKind::Ultrasonic)
        }
    }

    fn run_ticks(sensor: &mut RangingSensor, ticks: usize) -> Instant {
        let base = Instant::now();
        let interval = Duration::from_millis(75);
        for i in 0..ticks {
            sensor.update(base + interval * i as u32);
        }
        base + interval * ticks as u32
    }

    fn make_sensor(readings: Vec<u32>, config: SensorConfig) -> RangingSensor {
        let transport = Box::new(ScriptedRanging::from_millimeters(readings, 4000));
        let mut sensor = RangingSensor::new(config, transport);
        sensor.begin().unwrap();
        sensor
    }

    #[test]
    fn movement_threshold_is_exact() {
        // Two averages differing by exactly the threshold count as movement;
        // one millimeter less does not.
        let mut config = ranging_config();
        config.movement_threshold_mm = 50;

        // window 3: 1000,1000,1000 -> avg 1000; push 1150 -> avg 1050
        let mut sensor = make_sensor(vec![1000, 1000, 1000, 1150], config.clone());
        run_ticks(&mut sensor, 4);
        assert!(sensor.movement_detected());

        // push 1147 -> avg 1049, delta 49
        let mut sensor = make_sensor(vec![1000, 1000, 1000, 1147], config);
        run_ticks(&mut sensor, 4);
        assert!(!sensor.movement_detected());
    }

    #[test]
    fn apply_config_updates_cadence_and_debounce() {
        let mut sensor = make_sensor(vec![1000, 2000, 2000], ranging_config());

        let base = Instant::now();
        sensor.update(base);
        assert_eq!(sensor.distance_mm(), Some(1000));

        let mut edited = ranging_config();
        edited.sample_interval_ms = 500;
        edited.stability_time_ms = 1000; // 2 stable samples at 500 ms
        sensor.apply_config(&edited);

        // 100 ms later would have been due at the original 75 ms cadence;
        // under the edited interval the hardware must stay untouched.
        sensor.update(base + Duration::from_millis(100));
        assert_eq!(sensor.distance_mm(), Some(1000));

        // Due again at 500 ms: avg (1000+2000)/2, one receding tick.
        sensor.update(base + Duration::from_millis(500));
        assert_eq!(sensor.distance_mm(), Some(1500));
        assert_eq!(sensor.direction(), Direction::Unknown);

        // Second stable receding tick confirms under the edited debounce.
        sensor.update(base + Duration::from_millis(1000));
        assert_eq!(sensor.distance_mm(), Some(1666));
        assert_eq!(sensor.direction(), Direction::Receding);
    }

    #[test]
    fn wipe_seeds_candidate_from_discontinuity() {
        // Average parked at 1407 mm outside a 200..1200 range, then a raw
        // 256 mm sample lands inside: candidate must come out Approaching
        // with count 1, not Unknown.
        let mut config = ranging_config();
        config.min_range_mm = 200;
        config.max_range_mm = 1200;

        let mut sensor = make_sensor(vec![1407, 1407, 1407, 256], config);
        run_ticks(&mut sensor, 4);

        assert_eq!(sensor.classifier().candidate(), Direction::Approaching);
        assert_eq!(sensor.classifier().stability(), 1);
        assert_eq!(sensor.distance_mm(), Some(256));
        // The pre-wipe average survives for the movement check.
        assert!(sensor.movement_detected());
    }

    #[test]
    fn approach_scenario_confirms_direction() {
        // Walk-in: object enters from beyond max range, closing 400 mm per
        // 75 ms sample. Stability 400 ms at 75 ms sampling = 6 samples.
        let raws = vec![3493, 3093, 2693, 2293, 1893, 1493, 1093, 893];
        let mut sensor = make_sensor(raws, ranging_config());

        let base = Instant::now();
        let interval = Duration::from_millis(75);
        let mut movement = Vec::new();
        let mut detected = Vec::new();
        let mut confirmed = Vec::new();
        for i in 0..8u32 {
            sensor.update(base + interval * i);
            movement.push(sensor.movement_detected());
            detected.push(sensor.motion_detected());
            confirmed.push(sensor.direction());
        }

        // Movement from the second sample on.
        assert_eq!(movement, vec![false, true, true, true, true, true, true, true]);
        // Object detected once the smoothed distance enters the range
        // (sample 3 wipes the window down to 2693 mm).
        assert!(!detected[1]);
        assert!(detected[2..].iter().all(|&d| d));
        // Confirmed Approaching after six stable classifications.
        assert_eq!(*confirmed.last().unwrap(), Direction::Approaching);
        assert!(confirmed[..7].iter().all(|&d| d != Direction::Approaching));
        assert_eq!(sensor.event_count(), 1);
    }

    #[test]
    fn gradual_approach_flag_persists_until_confirmed_receding() {
        let mut config = ranging_config();
        config.stability_time_ms = 150; // 2 stable samples at 75 ms

        // Approach from outside sets the flag; the object then stalls in
        // range (stationary ticks) and finally recedes out.
        let raws = vec![3493, 3093, 2693, 2693, 2693, 2693, 3400, 3800, 4000];
        let mut sensor = make_sensor(raws, config);

        let base = Instant::now();
        let interval = Duration::from_millis(75);
        for i in 0..6u32 {
            sensor.update(base + interval * i);
        }
        // Flag set on the way in, still set across stationary ticks, and
        // detection holds even though movement has settled out.
        assert!(sensor.gradual_approach());
        assert!(!sensor.movement_detected());
        assert!(sensor.motion_detected());

        sensor.update(base + interval * 6); // 3400: wipe out of range, Receding(1)
        assert!(sensor.gradual_approach());
        sensor.update(base + interval * 7); // 3800: Receding(2) -> confirmed
        assert_eq!(sensor.direction(), Direction::Receding);
        assert!(!sensor.gradual_approach());
    }

    #[test]
    fn timeout_carries_prior_state_forward() {
        let transport = Box::new(ScriptedRanging::new(
            vec![
                wardpost_hal::RawReading::Millimeters(1000),
                wardpost_hal::RawReading::Millimeters(1000),
                wardpost_hal::RawReading::Timeout,
                wardpost_hal::RawReading::Timeout,
            ],
            4000,
        ));
        let mut sensor = RangingSensor::new(ranging_config(), transport);
        sensor.begin().unwrap();
        run_ticks(&mut sensor, 4);

        assert_eq!(sensor.error_count(), 2);
        assert_eq!(sensor.distance_mm(), Some(1000));
        assert!(sensor.is_ready());
    }

    #[test]
    fn interval_gating_skips_hardware_access() {
        let mut sensor = make_sensor(vec![1000, 2000, 3000], ranging_config());
        let base = Instant::now();
        sensor.update(base);
        // 30 ms later: not due, the 2000 mm reading must not be consumed.
        sensor.update(base + Duration::from_millis(30));
        assert_eq!(sensor.distance_mm(), Some(1000));
        sensor.update(base + Duration::from_millis(75));
        assert_eq!(sensor.distance_mm(), Some(1500));
    }

    #[test]
    fn presence_sensor_waits_for_warmup() {
        let transport = Box::new(
            ScriptedPresence::new(vec![true, true, true]).with_warmup(Duration::from_millis(200)),
        );
        let mut config = SensorConfig::for_kind(SensorKind::Pir);
        config.sample_interval_ms = 75;
        let mut sensor = PresenceSensor::new(config, transport);
        sensor.begin().unwrap();

        let base = Instant::now();
        sensor.update(base);
        assert!(!sensor.motion_detected());

        sensor.update(base + Duration::from_millis(250));
        assert!(sensor.motion_detected());
        assert_eq!(sensor.event_count(), 1);
    }

    #[test]
    fn factory_rejects_kind_transport_mismatch() {
        let config = SensorConfig::for_kind(SensorKind::Ultrasonic);
        let result = build_sensor(
            &config,
            Transport::Presence(Box::new(ScriptedPresence::new(vec![]))),
        );
        assert!(matches!(result, Err(DetectError::KindMismatch(_))));

        let config = SensorConfig::for_kind(SensorKind::Pir);
        let result = build_sensor(
            &config,
            Transport::Ranging(Box::new(ScriptedRanging::from_millimeters(vec![], 4000))),
        );
        assert!(matches!(result, Err(DetectError::KindMismatch(_))));
    }
}
