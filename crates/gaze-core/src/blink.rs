#![forbid(unsafe_code)]

//! Blink duration tracking and prolonged-blink detection.
//!
//! A short blink only freezes the pointer. A blink held past the threshold is
//! a deliberate gesture that downstream code may treat as a click. The
//! tracker reports that edge exactly once per blink.

use web_time::{Duration, Instant};

/// What the tracker concluded from one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlinkObservation {
    /// The eyes are currently closed.
    pub blinking: bool,
    /// How long the current (or just-finished) blink has lasted.
    pub duration: Duration,
    /// This observation is the first one to cross the prolonged threshold.
    pub prolonged_edge: bool,
}

/// Tracks a single ongoing blink.
#[derive(Debug, Clone)]
pub struct BlinkTracker {
    threshold: Duration,
    started: Option<Instant>,
    fired: bool,
    producer_flag: bool,
}

impl BlinkTracker {
    /// Create a tracker that fires after a blink lasting `threshold`.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            started: None,
            fired: false,
            producer_flag: false,
        }
    }

    /// Threshold a blink must reach to count as prolonged.
    #[inline]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feed the blink flags of one sample observed at `now`.
    ///
    /// `producer_prolonged` is the sample's own prolonged-blink flag; its
    /// rising edge counts the same as crossing the threshold locally.
    pub fn observe(&mut self, blink: bool, producer_prolonged: bool, now: Instant) -> BlinkObservation {
        let producer_edge = producer_prolonged && !self.producer_flag;
        self.producer_flag = producer_prolonged;

        if !blink {
            let duration = self
                .started
                .map(|s| now.saturating_duration_since(s))
                .unwrap_or_default();
            self.started = None;
            let edge = producer_edge && !self.fired;
            self.fired = false;
            return BlinkObservation {
                blinking: false,
                duration,
                prolonged_edge: edge,
            };
        }

        let started = *self.started.get_or_insert(now);
        let duration = now.saturating_duration_since(started);
        let crossed = duration >= self.threshold || producer_edge;
        let edge = crossed && !self.fired;
        if edge {
            self.fired = true;
            #[cfg(feature = "tracing")]
            tracing::debug!(duration_ms = duration.as_millis() as u64, "prolonged blink");
        }
        BlinkObservation {
            blinking: true,
            duration,
            prolonged_edge: edge,
        }
    }

    /// Forget any ongoing blink.
    pub fn reset(&mut self) {
        self.started = None;
        self.fired = false;
        self.producer_flag = false;
    }
}

impl Default for BlinkTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn short_blink_never_fires() {
        let mut t = BlinkTracker::default();
        let t0 = Instant::now();
        for i in 0..5 {
            assert!(!t.observe(true, false, t0 + MS_100 * i).prolonged_edge);
        }
        let end = t.observe(false, false, t0 + MS_100 * 5);
        assert!(!end.prolonged_edge);
        assert_eq!(end.duration, MS_100 * 5);
    }

    #[test]
    fn prolonged_blink_fires_exactly_once() {
        let mut t = BlinkTracker::default();
        let t0 = Instant::now();
        let fired: Vec<bool> = (0..20)
            .map(|i| t.observe(true, false, t0 + MS_100 * i).prolonged_edge)
            .collect();
        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert!(fired[10]);
    }

    #[test]
    fn reopening_rearms() {
        let mut t = BlinkTracker::new(Duration::from_millis(200));
        let t0 = Instant::now();
        t.observe(true, false, t0);
        assert!(t.observe(true, false, t0 + MS_100 * 2).prolonged_edge);
        t.observe(false, false, t0 + MS_100 * 3);
        t.observe(true, false, t0 + MS_100 * 4);
        assert!(t.observe(true, false, t0 + MS_100 * 6).prolonged_edge);
    }

    #[test]
    fn producer_flag_edge_counts_once() {
        let mut t = BlinkTracker::default();
        let t0 = Instant::now();
        assert!(t.observe(true, true, t0).prolonged_edge);
        assert!(!t.observe(true, true, t0 + MS_100).prolonged_edge);
        // Local threshold crossing after the producer already fired stays quiet.
        assert!(!t.observe(true, true, t0 + MS_100 * 15).prolonged_edge);
    }
}
