//! Scripted in-memory transports
//!
//! Used by the detection core's tests and by `wardpost-cli simulate` to
//! drive the engine from a canned sample sequence without hardware.

use crate::{HalError, PresenceTransport, RangingTransport, RawReading};
use std::collections::VecDeque;
use std::time::Duration;

/// Ranging transport that replays a fixed sequence of readings.
///
/// Once the script is exhausted it keeps returning the last reading, or
/// [`RawReading::Timeout`] if the script was empty.
pub struct ScriptedRanging {
    readings: VecDeque<RawReading>,
    last: RawReading,
    max_range_mm: u32,
    resource: String,
}

impl ScriptedRanging {
    pub fn new(readings: impl IntoIterator<Item = RawReading>, max_range_mm: u32) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            last: RawReading::Timeout,
            max_range_mm,
            resource: "scripted:ranging".to_string(),
        }
    }

    /// Convenience constructor from millimeter values.
    pub fn from_millimeters(values: impl IntoIterator<Item = u32>, max_range_mm: u32) -> Self {
        Self::new(
            values.into_iter().map(RawReading::Millimeters),
            max_range_mm,
        )
    }

    /// Override the resource identifier, for conflict-detection tests.
    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }
}

impl RangingTransport for ScriptedRanging {
    fn begin(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    fn read_raw(&mut self) -> Result<RawReading, HalError> {
        if let Some(reading) = self.readings.pop_front() {
            self.last = reading;
        }
        Ok(self.last)
    }

    fn max_range_mm(&self) -> u32 {
        self.max_range_mm
    }

    fn measurement_timeout(&self) -> Duration {
        Duration::ZERO
    }

    fn resource_id(&self) -> String {
        self.resource.clone()
    }
}

/// Presence transport that replays a fixed sequence of levels.
pub struct ScriptedPresence {
    levels: VecDeque<bool>,
    last: bool,
    warmup: Duration,
    resource: String,
}

impl ScriptedPresence {
    pub fn new(levels: impl IntoIterator<Item = bool>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            last: false,
            warmup: Duration::ZERO,
            resource: "scripted:presence".to_string(),
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }
}

impl PresenceTransport for ScriptedPresence {
    fn begin(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    fn read_level(&mut self) -> Result<bool, HalError> {
        if let Some(level) = self.levels.pop_front() {
            self.last = level;
        }
        Ok(self.last)
    }

    fn warmup(&self) -> Duration {
        self.warmup
    }

    fn resource_id(&self) -> String {
        self.resource.clone()
    }
}
