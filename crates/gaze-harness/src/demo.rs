#![forbid(unsafe_code)]

//! Synthetic gaze source for running without a tracker.
//!
//! Produces ~30 Hz samples around a fixation point with uniform jitter and
//! the occasional blink. The fixation is the viewport centre unless
//! wandering is enabled. Seeded, so a given seed always yields the same
//! stream.

use gaze_core::geometry::{Point, Rect};

use crate::determinism::XorShift64;
use crate::replay::SampleRecord;

/// Tunables for [`DemoSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Sample period. Default: 33ms.
    pub interval_ms: u64,
    /// Uniform jitter magnitude per axis (px). Default: 50.
    pub jitter: f32,
    /// Probability that any one frame is a blink. Default: 0.05.
    pub blink_probability: f32,
    /// Move to a new random fixation point this often. Default: `None`
    /// (stay on the centre of `area`).
    pub wander_ms: Option<u64>,
    /// Region fixation points are drawn from.
    pub area: Rect,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            interval_ms: 33,
            jitter: 50.0,
            blink_probability: 0.05,
            wander_ms: None,
            area: Rect::from_size(800.0, 480.0),
        }
    }
}

/// Endless stream of synthetic [`SampleRecord`]s.
#[derive(Debug, Clone)]
pub struct DemoSource {
    config: DemoConfig,
    rng: XorShift64,
    t_ms: u64,
    fixation: Point,
    fixation_until: u64,
}

impl DemoSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, DemoConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, config: DemoConfig) -> Self {
        Self {
            fixation: config.area.center(),
            config,
            rng: XorShift64::new(seed),
            t_ms: 0,
            fixation_until: 0,
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    fn pick_fixation(&mut self) -> Point {
        let area = self.config.area;
        Point::new(
            area.x + self.rng.next_f32() * area.width,
            area.y + self.rng.next_f32() * area.height,
        )
    }
}

impl Iterator for DemoSource {
    type Item = SampleRecord;

    fn next(&mut self) -> Option<SampleRecord> {
        match self.config.wander_ms {
            Some(wander_ms) if self.t_ms >= self.fixation_until => {
                self.fixation = self.pick_fixation();
                self.fixation_until = self.t_ms + wander_ms.max(1);
            }
            _ => {}
        }
        let jitter = self.config.jitter;
        let p = self.config.area.clamp_point(Point::new(
            self.fixation.x + self.rng.jitter(jitter),
            self.fixation.y + self.rng.jitter(jitter),
        ));
        let mut record = SampleRecord::at(self.t_ms, p.x, p.y);
        record.blink = self.rng.chance(self.config.blink_probability);
        self.t_ms += self.config.interval_ms.max(1);
        Some(record)
    }
}
