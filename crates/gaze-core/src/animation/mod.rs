#![forbid(unsafe_code)]

//! Motion primitives: easing curves for scripted pointer moves and springs
//! for the rendered cursor.

pub mod spring;

pub use spring::{Spring, SpringParams, SpringPoint};

/// An easing curve mapping normalized time `t ∈ [0, 1]` to progress.
pub type EasingFn = fn(f32) -> f32;

/// Constant speed.
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic acceleration from rest.
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic deceleration to rest.
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Accelerate through the first half, decelerate through the second.
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Named easing curves usable from configuration and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    /// The curve as a function pointer.
    #[must_use]
    pub fn function(self) -> EasingFn {
        match self {
            Self::Linear => linear,
            Self::EaseIn => ease_in,
            Self::EaseOut => ease_out,
            Self::EaseInOut => ease_in_out,
        }
    }

    /// Evaluate the curve at `t`.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        (self.function())(t)
    }
}
