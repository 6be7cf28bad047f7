//! Rolling sample window
//!
//! Fixed-capacity circular buffer with a running average over the samples
//! currently held, so the smoothed distance is usable before the window has
//! filled. `previous_average` always holds the average immediately before
//! the most recent insertion; movement and direction deltas are computed
//! from that pair.

/// Smallest permitted window capacity.
pub const MIN_WINDOW: usize = 3;
/// Largest permitted window capacity.
pub const MAX_WINDOW: usize = 20;

/// Circular buffer of raw millimeter samples with a running average
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: Vec<u32>,
    capacity: usize,
    index: usize,
    count: usize,
    previous_average: u32,
}

impl SampleWindow {
    /// Create a window; capacity is clamped to [3, 20]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(MIN_WINDOW, MAX_WINDOW);
        Self {
            samples: vec![0; capacity],
            capacity,
            index: 0,
            count: 0,
            previous_average: 0,
        }
    }

    /// Insert a raw sample, overwriting the oldest once at capacity
    pub fn push(&mut self, raw: u32) {
        self.previous_average = self.average();
        self.samples[self.index] = raw;
        self.index = (self.index + 1) % self.capacity;
        self.count = (self.count + 1).min(self.capacity);
    }

    /// Clear the window and reseed it with one value.
    ///
    /// Used on a wipe: the average instantly tracks the new reality instead
    /// of being dragged toward stale samples. The pre-wipe average is
    /// preserved as `previous_average` so direction can be re-derived across
    /// the discontinuity.
    pub fn reset_with(&mut self, raw: u32) {
        self.previous_average = self.average();
        self.samples.fill(0);
        self.samples[0] = raw;
        self.index = 1 % self.capacity;
        self.count = 1;
    }

    /// Arithmetic mean of the currently-held samples (0 when empty)
    pub fn average(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        let sum: u64 = self.samples[..self.count].iter().map(|&s| s as u64).sum();
        (sum / self.count as u64) as u32
    }

    /// Average immediately prior to the most recent insertion
    pub fn previous_average(&self) -> u32 {
        self.previous_average
    }

    /// True once the window has ever held `capacity` samples
    pub fn is_filled(&self) -> bool {
        self.count == self.capacity
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_matches_mean_of_last_w_samples() {
        for capacity in MIN_WINDOW..=MAX_WINDOW {
            let mut window = SampleWindow::new(capacity);
            let pushed: Vec<u32> = (0..capacity as u32 * 2).map(|i| 100 + i * 7).collect();

            for (n, &value) in pushed.iter().enumerate() {
                window.push(value);
                let held = &pushed[n.saturating_sub(capacity - 1)..=n];
                let mean = (held.iter().map(|&v| v as u64).sum::<u64>() / held.len() as u64) as u32;
                assert_eq!(window.average(), mean, "capacity {} after {} pushes", capacity, n + 1);
            }
        }
    }

    #[test]
    fn partial_window_averages_only_held_samples() {
        let mut window = SampleWindow::new(5);
        assert_eq!(window.average(), 0);
        assert!(!window.is_filled());

        window.push(1000);
        assert_eq!(window.average(), 1000);
        window.push(2000);
        assert_eq!(window.average(), 1500);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn previous_average_tracks_pre_insertion_state() {
        let mut window = SampleWindow::new(3);
        window.push(900);
        window.push(300);
        assert_eq!(window.previous_average(), 900);
        window.push(300);
        assert_eq!(window.previous_average(), 600);
    }

    #[test]
    fn is_filled_after_capacity_pushes() {
        let mut window = SampleWindow::new(3);
        window.push(1);
        window.push(2);
        assert!(!window.is_filled());
        window.push(3);
        assert!(window.is_filled());
        window.push(4);
        assert!(window.is_filled());
        assert_eq!(window.average(), 3);
    }

    #[test]
    fn reset_preserves_previous_average_and_seeds() {
        let mut window = SampleWindow::new(4);
        for _ in 0..4 {
            window.push(1400);
        }
        window.reset_with(250);
        assert_eq!(window.previous_average(), 1400);
        assert_eq!(window.average(), 250);
        assert_eq!(window.len(), 1);
        assert!(!window.is_filled());
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(SampleWindow::new(1).capacity(), MIN_WINDOW);
        assert_eq!(SampleWindow::new(50).capacity(), MAX_WINDOW);
        assert_eq!(SampleWindow::new(10).capacity(), 10);
    }
}
