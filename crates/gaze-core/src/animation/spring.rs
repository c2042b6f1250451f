#![forbid(unsafe_code)]

//! Damped spring used to animate the rendered cursor.
//!
//! Based on the classical damped spring equation:
//!
//!   F = -stiffness × (position - target) - damping × velocity
//!
//! Uses semi-implicit Euler integration. Large time steps are subdivided
//! into 4ms slices so stiff presets stay stable at low frame rates.
//!
//! # Invariants
//!
//! 1. Stiffness is clamped to at least 0.1 and damping to at least 0.0.
//! 2. A spring at rest stays at rest until its target moves.
//! 3. [`SpringPoint::snap_to`] places both axes at rest on the given point.

use web_time::Duration;

use crate::geometry::Point;

/// Maximum dt per integration step (4ms).
const MAX_STEP_SECS: f64 = 0.004;

/// Default rest threshold: position delta below which the spring is "at rest".
const DEFAULT_REST_THRESHOLD: f64 = 0.01;

/// Velocity below which (combined with position threshold) the spring is at rest.
const DEFAULT_VELOCITY_THRESHOLD: f64 = 0.05;

/// Minimum stiffness to prevent degenerate springs.
const MIN_STIFFNESS: f64 = 0.1;

/// Stiffness and damping for a spring.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringParams {
    pub stiffness: f64,
    pub damping: f64,
}

impl SpringParams {
    /// Create parameters, clamping to valid ranges.
    #[must_use]
    pub fn new(stiffness: f64, damping: f64) -> Self {
        Self {
            stiffness: stiffness.max(MIN_STIFFNESS),
            damping: damping.max(0.0),
        }
    }

    /// Gentle tracking: follows the stable position without visible bounce.
    #[must_use]
    pub fn tracking() -> Self {
        Self::new(170.0, 26.0)
    }

    /// Stiff snapping: near-critical, used while a magnet target is active.
    #[must_use]
    pub fn snap() -> Self {
        Self::new(400.0, 38.0)
    }

    /// Critical damping coefficient for this stiffness.
    #[must_use]
    pub fn critical_damping(&self) -> f64 {
        2.0 * self.stiffness.sqrt()
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::tracking()
    }
}

/// A one-dimensional damped harmonic oscillator.
#[derive(Debug, Clone)]
pub struct Spring {
    position: f64,
    velocity: f64,
    target: f64,
    params: SpringParams,
    at_rest: bool,
}

impl Spring {
    /// Create a spring resting at `position`.
    #[must_use]
    pub fn new(position: f64, params: SpringParams) -> Self {
        Self {
            position,
            velocity: 0.0,
            target: position,
            params,
            at_rest: true,
        }
    }

    /// Current position.
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current target.
    #[inline]
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether the spring has settled at the target.
    #[inline]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Current parameters.
    #[inline]
    pub fn params(&self) -> SpringParams {
        self.params
    }

    /// Swap stiffness/damping without disturbing position or velocity.
    pub fn set_params(&mut self, params: SpringParams) {
        self.params = params;
    }

    /// Change the target. Wakes the spring if it was at rest.
    pub fn set_target(&mut self, target: f64) {
        if (self.target - target).abs() > f64::EPSILON {
            self.target = target;
            self.at_rest = false;
        }
    }

    /// Jump to `position` and rest there.
    pub fn snap_to(&mut self, position: f64) {
        self.position = position;
        self.target = position;
        self.velocity = 0.0;
        self.at_rest = true;
    }

    fn step(&mut self, dt: f64) {
        let displacement = self.position - self.target;
        let acceleration =
            -self.params.stiffness * displacement - self.params.damping * self.velocity;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }

    /// Advance the spring by `dt`, subdividing for stability.
    pub fn advance(&mut self, dt: Duration) {
        if self.at_rest {
            return;
        }
        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let step_dt = remaining.min(MAX_STEP_SECS);
            self.step(step_dt);
            remaining -= step_dt;
        }
        if (self.position - self.target).abs() < DEFAULT_REST_THRESHOLD
            && self.velocity.abs() < DEFAULT_VELOCITY_THRESHOLD
        {
            self.position = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }
    }
}

/// Two independent springs driving a point.
#[derive(Debug, Clone)]
pub struct SpringPoint {
    x: Spring,
    y: Spring,
}

impl SpringPoint {
    /// Create a spring point resting at `p`.
    #[must_use]
    pub fn new(p: Point, params: SpringParams) -> Self {
        Self {
            x: Spring::new(f64::from(p.x), params),
            y: Spring::new(f64::from(p.y), params),
        }
    }

    /// Current position.
    pub fn position(&self) -> Point {
        Point::new(self.x.position() as f32, self.y.position() as f32)
    }

    /// Current target.
    pub fn target(&self) -> Point {
        Point::new(self.x.target() as f32, self.y.target() as f32)
    }

    /// Both axes have settled.
    pub fn is_at_rest(&self) -> bool {
        self.x.is_at_rest() && self.y.is_at_rest()
    }

    /// Retarget both axes.
    pub fn set_target(&mut self, p: Point) {
        self.x.set_target(f64::from(p.x));
        self.y.set_target(f64::from(p.y));
    }

    /// Swap parameters on both axes.
    pub fn set_params(&mut self, params: SpringParams) {
        self.x.set_params(params);
        self.y.set_params(params);
    }

    /// Jump to `p` and rest there.
    pub fn snap_to(&mut self, p: Point) {
        self.x.snap_to(f64::from(p.x));
        self.y.snap_to(f64::from(p.y));
    }

    /// Advance both axes by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.x.advance(dt);
        self.y.advance(dt);
    }
}
