#![forbid(unsafe_code)]

//! Rate-independent exponential smoothing for noisy gaze input.
//!
//! [`SignalSmoother`] turns an irregular stream of [`GazeSample`]s into a
//! stable pointer position. Downstream hit-testing and dwell timing read only
//! this position, so its stability directly bounds how often targets flicker.
//!
//! # Algorithm
//!
//! For each accepted sample, with `Δt` measured against the smoother's own
//! last-processed instant and `n = Δt / nominal_frame`:
//!
//! 1. `factor = 1 - (1 - alpha)^n`, so the response per unit time does not
//!    depend on the sample rate.
//! 2. Per axis, a delta below the `deadzone` holds that axis still; otherwise
//!    the axis moves by `delta * factor`.
//! 3. The displacement vector is clamped to `max_step * n` pixels.
//! 4. The result is clamped to the viewport.
//!
//! # Invariants
//!
//! 1. The output is always finite and inside the viewport.
//! 2. Two consecutive outputs never differ by more than `max_step * n`.
//! 3. A frozen output equals the last non-frozen output.
//! 4. Rejected samples (non-finite or negative) leave every piece of state
//!    untouched, including the clock.
//!
//! # Failure Modes
//!
//! - Very large gaps between samples: `n` is capped by `max_dt`, so the
//!   pointer catches up over several samples instead of jumping.
//! - Repeated or backwards timestamps: `Δt` is zero and the position holds.

use web_time::{Duration, Instant};

use crate::geometry::{Point, Rect};
use crate::sample::GazeSample;

/// Tuning for [`SignalSmoother`].
#[derive(Debug, Clone, PartialEq)]
pub struct SmootherConfig {
    /// Per-frame smoothing weight at the nominal rate, in `(0, 1]` (default: 0.45).
    pub alpha: f32,
    /// Frame duration the `alpha` and `max_step` values are expressed in
    /// (default: 16.67ms).
    pub nominal_frame: Duration,
    /// Maximum displacement per nominal frame in pixels (default: 120).
    pub max_step: f32,
    /// Per-axis deltas below this many pixels are ignored (default: 0.2).
    pub deadzone: f32,
    /// Longest elapsed time a single update may account for (default: 250ms).
    pub max_dt: Duration,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            alpha: 0.45,
            nominal_frame: Duration::from_micros(16_667),
            max_step: 120.0,
            deadzone: 0.2,
            max_dt: Duration::from_millis(250),
        }
    }
}

/// The authoritative pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StablePosition {
    pub x: f32,
    pub y: f32,
    /// Live input is currently unusable and the position is being held.
    pub frozen: bool,
    /// A magnet target is pulling the rendered cursor. Set by the consumer;
    /// the smoother itself always reports `false`.
    pub magnetized: bool,
}

impl StablePosition {
    /// The position as a point.
    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Builder: set the magnetized flag.
    #[must_use]
    pub fn with_magnetized(mut self, magnetized: bool) -> Self {
        self.magnetized = magnetized;
        self
    }
}

/// Exponential smoother with outlier clamping and a micro-jitter deadzone.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    config: SmootherConfig,
    viewport: Rect,
    current: StablePosition,
    last_update: Option<Instant>,
}

impl SignalSmoother {
    /// Create a smoother resting at the centre of `viewport`.
    #[must_use]
    pub fn new(config: SmootherConfig, viewport: Rect) -> Self {
        let center = viewport.center();
        Self {
            config,
            viewport,
            current: StablePosition {
                x: center.x,
                y: center.y,
                frozen: false,
                magnetized: false,
            },
            last_update: None,
        }
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// The visible surface outputs are clamped to.
    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Latest output.
    #[inline]
    pub fn position(&self) -> StablePosition {
        self.current
    }

    /// Change the visible surface. The current position is re-clamped.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        let p = viewport.clamp_point(self.current.point());
        self.current.x = p.x;
        self.current.y = p.y;
    }

    /// Place the pointer at `p` (clamped) and forget the clock.
    pub fn reset_to(&mut self, p: Point) {
        let p = self.viewport.clamp_point(p);
        self.current = StablePosition {
            x: p.x,
            y: p.y,
            frozen: false,
            magnetized: false,
        };
        self.last_update = None;
    }

    /// Forget the last-processed instant. The next accepted sample is treated
    /// as arriving one nominal frame after the previous one.
    pub fn clear_clock(&mut self) {
        self.last_update = None;
    }

    /// Feed one sample observed at `now` and return the new stable position.
    pub fn update(&mut self, sample: &GazeSample, now: Instant) -> StablePosition {
        if !sample.has_valid_coordinates() {
            #[cfg(feature = "tracing")]
            tracing::trace!(x = sample.x, y = sample.y, "gaze sample rejected");
            return self.current;
        }

        let frames = self.elapsed_frames(now);
        self.last_update = Some(now);

        if sample.requests_freeze() {
            self.current.frozen = true;
            return self.current;
        }

        let target = self.viewport.clamp_point(sample.point());
        let next = self.step_toward(target, frames);
        self.current = StablePosition {
            x: next.x,
            y: next.y,
            frozen: false,
            magnetized: false,
        };
        self.current
    }

    /// Elapsed time since the last update in nominal frames, capped by `max_dt`.
    fn elapsed_frames(&self, now: Instant) -> f32 {
        let nominal = self.config.nominal_frame.as_secs_f32().max(1e-6);
        let dt = match self.last_update {
            Some(last) => now.saturating_duration_since(last).min(self.config.max_dt),
            None => self.config.nominal_frame,
        };
        dt.as_secs_f32() / nominal
    }

    fn step_toward(&self, target: Point, frames: f32) -> Point {
        let prev = self.current.point();
        let factor = 1.0 - (1.0 - self.config.alpha).powf(frames);

        let mut dx = target.x - prev.x;
        let mut dy = target.y - prev.y;
        dx = if dx.abs() < self.config.deadzone {
            0.0
        } else {
            dx * factor
        };
        dy = if dy.abs() < self.config.deadzone {
            0.0
        } else {
            dy * factor
        };

        let limit = self.config.max_step * frames;
        let magnitude = dx.hypot(dy);
        if magnitude > limit {
            let scale = if magnitude > 0.0 { limit / magnitude } else { 0.0 };
            dx *= scale;
            dy *= scale;
        }

        self.viewport
            .clamp_point(Point::new(prev.x + dx, prev.y + dy))
    }
}
