#![forbid(unsafe_code)]

//! Core: gaze samples, geometry, pre-filters, and signal smoothing.
//!
//! # Role in the gaze stack
//! `gaze-core` is the input layer. It owns the sample contract and every
//! transformation that happens to a sample before anything looks at what is
//! on screen.
//!
//! # Primary responsibilities
//! - **GazeSample**: the record a gaze producer hands to the engine.
//! - **SignalSmoother**: rate-independent smoothing with outlier clamping.
//! - **Filters**: optional Kalman or windowed-mean pre-filters.
//! - **BlinkTracker**: prolonged-blink detection.
//! - **Animation**: easing curves and springs for scripted and rendered motion.
//!
//! # How it fits in the system
//! The runtime (`gaze-runtime`) feeds samples through a [`SignalSmoother`] and
//! resolves the resulting [`StablePosition`] against the element tree. Nothing
//! in this crate holds engine state, so it is safe to use on its own.

pub mod animation;
pub mod blink;
pub mod filter;
pub mod geometry;
pub mod sample;
pub mod smoother;

pub use blink::{BlinkObservation, BlinkTracker};
pub use filter::{FilterKind, GazeFilter};
pub use geometry::{Point, Rect};
pub use sample::GazeSample;
pub use smoother::{SignalSmoother, SmootherConfig, StablePosition};
