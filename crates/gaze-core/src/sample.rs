#![forbid(unsafe_code)]

//! The gaze sample contract.
//!
//! A [`GazeSample`] is what the engine receives from whatever produces gaze
//! coordinates (a regression model, a network stream, a replay file). The
//! engine never learns how the coordinates were computed; it only relies on
//! the fields below.

use web_time::Instant;

use crate::geometry::Point;

/// One raw gaze observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    /// Horizontal screen coordinate in pixels.
    pub x: f32,
    /// Vertical screen coordinate in pixels.
    pub y: f32,
    /// The eyes are closed in this frame.
    pub blink: bool,
    /// The producer has a calibration loaded. Uncalibrated coordinates are garbage.
    pub calibrated: bool,
    /// The producer already decided this blink is long enough to count as a click.
    pub prolonged_blink: bool,
    /// When the producer observed the sample.
    ///
    /// Carried for diagnostics only: elapsed time is always measured against
    /// the consumer's own clock, since producer timestamps can repeat or run
    /// backwards.
    pub timestamp: Instant,
}

impl GazeSample {
    /// A calibrated, open-eye sample at `(x, y)`.
    #[must_use]
    pub fn at(x: f32, y: f32, timestamp: Instant) -> Self {
        Self {
            x,
            y,
            blink: false,
            calibrated: true,
            prolonged_blink: false,
            timestamp,
        }
    }

    /// Builder: mark the sample as a blink frame.
    #[must_use]
    pub fn with_blink(mut self, blink: bool) -> Self {
        self.blink = blink;
        self
    }

    /// Builder: set the calibration flag.
    #[must_use]
    pub fn with_calibrated(mut self, calibrated: bool) -> Self {
        self.calibrated = calibrated;
        self
    }

    /// Builder: set the prolonged-blink flag.
    #[must_use]
    pub fn with_prolonged_blink(mut self, prolonged: bool) -> Self {
        self.prolonged_blink = prolonged;
        self
    }

    /// The sample position as a point.
    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Coordinates are finite and non-negative.
    #[inline]
    pub fn has_valid_coordinates(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.x >= 0.0 && self.y >= 0.0
    }

    /// Tracking is unreliable for this frame and the pointer should hold still.
    #[inline]
    pub fn requests_freeze(&self) -> bool {
        self.blink || !self.calibrated
    }
}
