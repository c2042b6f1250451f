#![forbid(unsafe_code)]

//! Optional position pre-filters applied before the signal smoother.
//!
//! The smoother already stabilizes the pointer; these filters exist for
//! producers whose raw output is noisy enough that a model-based estimate
//! helps. They run only on samples the smoother would accept (finite,
//! non-negative, not frozen).
//!
//! | Filter | Behaviour |
//! |--------|-----------|
//! | [`Passthrough`] | Identity. |
//! | [`Kalman`] | Constant-velocity Kalman filter, outputs the predicted position. |
//! | [`WindowMean`] | Mean of the samples inside a trailing time window. |

use std::collections::VecDeque;

use web_time::{Duration, Instant};

use crate::geometry::Point;

/// A stateful per-sample position filter.
pub trait GazeFilter: std::fmt::Debug {
    /// Filter one position observed at `now`.
    fn step(&mut self, p: Point, now: Instant) -> Point;

    /// Drop all history.
    fn reset(&mut self);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Selects a pre-filter implementation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum FilterKind {
    /// No filtering.
    #[default]
    Passthrough,
    /// Constant-velocity Kalman filter.
    Kalman {
        /// Process noise variance (default: 50.0).
        process_var: f32,
        /// Measurement noise variance (default: 0.2).
        measurement_var: f32,
    },
    /// Trailing-window mean.
    WindowMean {
        /// Window length in milliseconds (default: 500).
        window_ms: u64,
    },
}

impl FilterKind {
    /// Kalman filter with the default variances.
    #[must_use]
    pub fn kalman() -> Self {
        Self::Kalman {
            process_var: 50.0,
            measurement_var: 0.2,
        }
    }

    /// Window mean with the default 500ms window.
    #[must_use]
    pub fn window_mean() -> Self {
        Self::WindowMean { window_ms: 500 }
    }

    /// Instantiate the selected filter.
    #[must_use]
    pub fn build(&self) -> Box<dyn GazeFilter> {
        match *self {
            Self::Passthrough => Box::new(Passthrough),
            Self::Kalman {
                process_var,
                measurement_var,
            } => Box::new(Kalman::new(process_var, measurement_var)),
            Self::WindowMean { window_ms } => {
                Box::new(WindowMean::new(Duration::from_millis(window_ms)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Passthrough
// ---------------------------------------------------------------------------

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl GazeFilter for Passthrough {
    fn step(&mut self, p: Point, _now: Instant) -> Point {
        p
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

// ---------------------------------------------------------------------------
// Kalman
// ---------------------------------------------------------------------------

/// Two-state (position, velocity) Kalman filter for one axis.
///
/// The step is one frame (`dt = 1`), the process noise is `q·I` and the
/// initial covariance is the identity.
#[derive(Debug, Clone)]
struct AxisKalman {
    pos: f32,
    vel: f32,
    p00: f32,
    p01: f32,
    p10: f32,
    p11: f32,
}

impl AxisKalman {
    fn seeded(z: f32) -> Self {
        Self {
            pos: z,
            vel: 0.0,
            p00: 1.0,
            p01: 0.0,
            p10: 0.0,
            p11: 1.0,
        }
    }

    /// Predict, then correct with `z`. Returns the prediction.
    fn step(&mut self, z: f32, q: f32, r: f32) -> f32 {
        // Predict: x = F x, P = F P Fᵀ + Q with F = [[1, 1], [0, 1]].
        self.pos += self.vel;
        let p00 = self.p00 + self.p01 + self.p10 + self.p11 + q;
        let p01 = self.p01 + self.p11;
        let p10 = self.p10 + self.p11;
        let p11 = self.p11 + q;
        let predicted = self.pos;

        // Correct with H = [1, 0].
        let s = p00 + r;
        let k0 = p00 / s;
        let k1 = p10 / s;
        let innovation = z - self.pos;
        self.pos += k0 * innovation;
        self.vel += k1 * innovation;
        self.p00 = (1.0 - k0) * p00;
        self.p01 = (1.0 - k0) * p01;
        self.p10 = p10 - k1 * p00;
        self.p11 = p11 - k1 * p01;

        predicted
    }
}

/// Constant-velocity Kalman filter over `[x, y, vx, vy]`.
///
/// The axes are independent under this model, so the filter runs as two
/// decoupled 2-state filters. The first measurement seeds the state.
#[derive(Debug, Clone)]
pub struct Kalman {
    process_var: f32,
    measurement_var: f32,
    axes: Option<(AxisKalman, AxisKalman)>,
}

impl Kalman {
    /// Create a filter with the given process and measurement variances.
    #[must_use]
    pub fn new(process_var: f32, measurement_var: f32) -> Self {
        Self {
            process_var: process_var.max(0.0),
            measurement_var: measurement_var.max(f32::EPSILON),
            axes: None,
        }
    }
}

impl GazeFilter for Kalman {
    fn step(&mut self, p: Point, _now: Instant) -> Point {
        let (q, r) = (self.process_var, self.measurement_var);
        let (ax, ay) = self
            .axes
            .get_or_insert_with(|| (AxisKalman::seeded(p.x), AxisKalman::seeded(p.y)));
        Point::new(ax.step(p.x, q, r), ay.step(p.y, q, r))
    }

    fn reset(&mut self) {
        self.axes = None;
    }

    fn name(&self) -> &'static str {
        "kalman"
    }
}

// ---------------------------------------------------------------------------
// WindowMean
// ---------------------------------------------------------------------------

/// Mean of the positions observed within the trailing `window`.
#[derive(Debug, Clone)]
pub struct WindowMean {
    window: Duration,
    history: VecDeque<(Instant, Point)>,
}

impl WindowMean {
    /// Create a filter averaging over `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            history: VecDeque::with_capacity(32),
        }
    }
}

impl GazeFilter for WindowMean {
    fn step(&mut self, p: Point, now: Instant) -> Point {
        self.history.push_back((now, p));
        while let Some(&(t, _)) = self.history.front() {
            if now.saturating_duration_since(t) > self.window {
                self.history.pop_front();
            } else {
                break;
            }
        }

        if self.history.len() < 2 {
            return p;
        }
        let n = self.history.len() as f32;
        let (sx, sy) = self
            .history
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), (_, q)| (sx + q.x, sy + q.y));
        Point::new(sx / n, sy / n)
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn name(&self) -> &'static str {
        "window_mean"
    }
}
