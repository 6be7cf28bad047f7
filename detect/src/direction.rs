//! Debounced direction classification
//!
//! Each tick turns one window-average delta into an instantaneous
//! direction; the confirmed direction only changes after the same
//! instantaneous direction has repeated for the configured number of
//! samples. That debounce is what keeps noisy deltas from flickering the
//! exposed direction between Approaching, Stationary and Receding.

use crate::Direction;

/// Debounced candidate/confirmed direction state machine
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    sensitivity_mm: u32,
    required_stable: u32,
    candidate: Direction,
    stability: u32,
    confirmed: Direction,
}

impl DirectionClassifier {
    /// Create a classifier.
    ///
    /// `sensitivity_mm` is the dead band for the instantaneous rule;
    /// `required_stable` is how many consecutive identical instantaneous
    /// classifications promote a candidate to confirmed.
    pub fn new(sensitivity_mm: u32, required_stable: u32) -> Self {
        Self {
            sensitivity_mm,
            required_stable: required_stable.max(1),
            candidate: Direction::Unknown,
            stability: 0,
            confirmed: Direction::Unknown,
        }
    }

    /// Instantaneous direction of a single delta
    fn instantaneous(&self, delta: i64) -> Direction {
        let band = self.sensitivity_mm as i64;
        if delta <= -band {
            Direction::Approaching
        } else if delta >= band {
            Direction::Receding
        } else {
            Direction::Stationary
        }
    }

    /// Feed one tick's delta (current average minus previous average).
    ///
    /// Returns the confirmed direction after debouncing.
    pub fn classify(&mut self, delta: i64) -> Direction {
        let instant = self.instantaneous(delta);

        if instant == self.candidate {
            self.stability = self.stability.saturating_add(1);
        } else {
            self.candidate = instant;
            self.stability = 1;
        }

        if self.stability >= self.required_stable && self.confirmed != self.candidate {
            tracing::debug!(from = ?self.confirmed, to = ?self.candidate, "direction confirmed");
            self.confirmed = self.candidate;
        }

        self.confirmed
    }

    /// Re-seed the candidate across a wipe discontinuity.
    ///
    /// `delta` is the fresh raw sample minus the pre-wipe average. Seeding
    /// the candidate directly, instead of resetting to Unknown, preserves
    /// the directional information the discontinuity itself carries, so a
    /// sudden close appearance does not cost a full debounce cycle.
    pub fn seed(&mut self, delta: i64) {
        self.candidate = self.instantaneous(delta);
        self.stability = 1;
        if self.required_stable <= 1 && self.confirmed != self.candidate {
            self.confirmed = self.candidate;
        }
    }

    /// Confirmed (externally exposed) direction
    pub fn confirmed(&self) -> Direction {
        self.confirmed
    }

    /// Current candidate direction, which may change every tick
    pub fn candidate(&self) -> Direction {
        self.candidate
    }

    /// Consecutive ticks the current candidate has held
    pub fn stability(&self) -> u32 {
        self.stability
    }

    /// Update the dead band (threshold-only config edit)
    pub fn set_sensitivity(&mut self, sensitivity_mm: u32) {
        self.sensitivity_mm = sensitivity_mm;
    }

    /// Update the debounce length after a cadence or stability-time edit.
    ///
    /// The current candidate run is kept; a shortened requirement promotes
    /// it on the next classify, a lengthened one makes it wait.
    pub fn set_required_stable(&mut self, required_stable: u32) {
        self.required_stable = required_stable.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantaneous_rule_boundaries() {
        let mut c = DirectionClassifier::new(100, 1);
        assert_eq!(c.classify(-100), Direction::Approaching);

        let mut c = DirectionClassifier::new(100, 1);
        assert_eq!(c.classify(100), Direction::Receding);

        let mut c = DirectionClassifier::new(100, 1);
        assert_eq!(c.classify(99), Direction::Stationary);
        let mut c = DirectionClassifier::new(100, 1);
        assert_eq!(c.classify(-99), Direction::Stationary);
    }

    #[test]
    fn confirmation_requires_stable_run() {
        let mut c = DirectionClassifier::new(100, 4);

        for _ in 0..3 {
            assert_eq!(c.classify(-200), Direction::Unknown);
        }
        assert_eq!(c.candidate(), Direction::Approaching);
        assert_eq!(c.classify(-200), Direction::Approaching);
    }

    #[test]
    fn single_contrary_tick_does_not_flicker() {
        let mut c = DirectionClassifier::new(100, 4);
        for _ in 0..4 {
            c.classify(-200);
        }
        assert_eq!(c.confirmed(), Direction::Approaching);

        // requiredStableSamples - 1 contrary ticks, then a stationary one:
        // confirmed direction must hold.
        for _ in 0..3 {
            assert_eq!(c.classify(200), Direction::Approaching);
        }
        assert_eq!(c.classify(0), Direction::Approaching);
    }

    #[test]
    fn candidate_reset_on_direction_change() {
        let mut c = DirectionClassifier::new(100, 3);
        c.classify(-200);
        c.classify(-200);
        assert_eq!(c.stability(), 2);
        c.classify(200);
        assert_eq!(c.candidate(), Direction::Receding);
        assert_eq!(c.stability(), 1);
    }

    #[test]
    fn seed_skips_unknown_state() {
        let mut c = DirectionClassifier::new(100, 6);
        // 256 mm raw against a 1407 mm pre-wipe average
        c.seed(256 - 1407);
        assert_eq!(c.candidate(), Direction::Approaching);
        assert_eq!(c.stability(), 1);
        assert_eq!(c.confirmed(), Direction::Unknown);

        // Continued approach confirms without restarting from Unknown.
        for _ in 0..5 {
            c.classify(-150 - 100);
        }
        assert_eq!(c.confirmed(), Direction::Approaching);
    }
}
