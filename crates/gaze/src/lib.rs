#![forbid(unsafe_code)]

//! Gaze-driven interaction engine: public facade.
//!
//! This crate is the stable surface for applications. It re-exports the
//! types an integration needs from `gaze-core` and `gaze-runtime`, offers a
//! prelude, and folds the library error types into one [`Error`].
//!
//! ```
//! use gaze::prelude::*;
//! use web_time::Instant;
//!
//! struct Toggle(bool);
//!
//! impl GazeTarget for Toggle {
//!     fn on_activate(&mut self) -> std::result::Result<(), TargetError> {
//!         self.0 = !self.0;
//!         Ok(())
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let page = scene.add("page", Rect::from_size(800.0, 480.0));
//! let button = scene
//!     .add_control(page, "button", Rect::new(300.0, 190.0, 200.0, 100.0))
//!     .unwrap();
//!
//! let now = Instant::now();
//! let mut root = InteractionRoot::new(EngineConfig::default(), scene, now);
//! root.attach(button, Toggle(false));
//! root.ingest(&GazeSample::at(400.0, 240.0, now), now);
//! assert_eq!(root.engine().active_target(), Some(button));
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use gaze_core::animation::{Easing, Spring, SpringParams, SpringPoint};
pub use gaze_core::blink::{BlinkObservation, BlinkTracker};
pub use gaze_core::filter::{FilterKind, GazeFilter};
pub use gaze_core::geometry::{Point, Rect};
pub use gaze_core::sample::GazeSample;
pub use gaze_core::smoother::{SignalSmoother, SmootherConfig, StablePosition};

// --- Runtime re-exports ----------------------------------------------------

pub use gaze_runtime::autopilot::{Autopilot, AutopilotState, Locator, Script, Step};
pub use gaze_runtime::cancellation::{CancellationSource, CancellationToken};
pub use gaze_runtime::config::{ConfigError, EngineConfig};
pub use gaze_runtime::dwell::{CancelReason, DwellPoll, RejectReason};
pub use gaze_runtime::engine::{EngineSnapshot, GazeEngine, InputSource, TargetStatus};
pub use gaze_runtime::registry::{DwellProfile, GazeTarget, Registration, TargetError};
pub use gaze_runtime::root::InteractionRoot;
pub use gaze_runtime::scene::{ElementId, ElementTree, Scene};
pub use gaze_runtime::trace::{Activation, InteractionEvent, InteractionKind, InteractionTrace};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for gaze integrations.
#[derive(Debug)]
pub enum Error {
    /// Loading or validating an [`EngineConfig`] failed.
    Config(ConfigError),
    /// A target callback failed outside the engine.
    Target(TargetError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Target(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Target(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<TargetError> for Error {
    fn from(err: TargetError) -> Self {
        Self::Target(err)
    }
}

/// Standard result type for gaze APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Activation, CancelReason, DwellProfile, ElementId, ElementTree, EngineConfig, Error,
        GazeSample, GazeTarget, InputSource, InteractionKind, InteractionRoot, Locator, Point,
        Rect, Result, Scene, Script, TargetError,
    };

    pub use crate::{core, runtime};
}

pub use gaze_core as core;
pub use gaze_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert() {
        let err: Error = EngineConfig {
            smoothing: gaze_runtime::config::SmoothingConfig {
                alpha: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
        .validated()
        .map_err(Error::from)
        .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Validation(_))));
        assert!(err.to_string().contains("smoothing.alpha"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn target_errors_convert() {
        fn fails() -> Result<()> {
            Err(TargetError::failed("stuck"))?
        }
        let err = fails().unwrap_err();
        assert_eq!(err.to_string(), "target callback failed: stuck");
    }
}
