#![forbid(unsafe_code)]

//! Tunable parameters for the interaction engine.
//!
//! Captures every threshold the engine uses as a single [`EngineConfig`] that
//! can be loaded from TOML or JSON at startup. Nothing inside the engine uses
//! a hard-coded literal for these values.
//!
//! # Loading
//!
//! ```toml
//! # gaze.toml
//! [smoothing]
//! alpha = 0.45
//! max_step = 120.0
//!
//! [dwell]
//! standard_ms = 1500
//! cooldown_ms = 1500
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("gaze.toml")?.validated()?;
//! ```
//!
//! # Defaults
//!
//! Every field has a default, so a partial file only overrides what it names.
//! Durations are stored as integer milliseconds and exposed as [`Duration`]
//! through accessor methods.

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

use gaze_core::animation::SpringParams;
use gaze_core::filter::FilterKind;
use gaze_core::geometry::Rect;
use gaze_core::smoother::SmootherConfig;

use crate::trace::DEFAULT_TRACE_CAPACITY;

// ---------------------------------------------------------------------------
// Top-level EngineConfig
// ---------------------------------------------------------------------------

/// Every tunable parameter of the gaze interaction engine.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Visible surface the pointer is clamped to.
    pub viewport: ViewportConfig,
    /// Signal smoother and pre-filter.
    pub smoothing: SmoothingConfig,
    /// Hit resolution hysteresis.
    pub targeting: TargetingConfig,
    /// Dwell durations and pointer-lock cooldown.
    pub dwell: DwellConfig,
    /// Magnet assist for the rendered cursor.
    pub magnet: MagnetConfig,
    /// Prolonged-blink click.
    pub blink: BlinkConfig,
    /// Scripted autopilot timings.
    pub autopilot: AutopilotConfig,
    /// Interaction trace retention.
    pub trace: TraceConfig,
}

impl EngineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to a pretty TOML document.
    #[cfg(feature = "config-file")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlSer)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            errors.push(format!(
                "viewport must have a positive size, got {}x{}",
                self.viewport.width, self.viewport.height
            ));
        }

        // Smoothing alpha must be in (0, 1]
        if !(self.smoothing.alpha > 0.0 && self.smoothing.alpha <= 1.0) {
            errors.push(format!(
                "smoothing.alpha must be in (0, 1], got {}",
                self.smoothing.alpha
            ));
        }
        if self.smoothing.nominal_frame_us == 0 {
            errors.push("smoothing.nominal_frame_us must be > 0".into());
        }
        if !(self.smoothing.max_step > 0.0) {
            errors.push(format!(
                "smoothing.max_step must be > 0, got {}",
                self.smoothing.max_step
            ));
        }
        if !(self.smoothing.deadzone >= 0.0) {
            errors.push(format!(
                "smoothing.deadzone must be >= 0, got {}",
                self.smoothing.deadzone
            ));
        }
        if self.smoothing.max_dt_ms == 0 {
            errors.push("smoothing.max_dt_ms must be > 0".into());
        }
        match self.smoothing.filter {
            FilterKind::Kalman {
                process_var,
                measurement_var,
            } if !(process_var >= 0.0) || !(measurement_var > 0.0) => {
                errors.push(format!(
                    "smoothing.filter kalman variances must be process >= 0 and measurement > 0, got {process_var} / {measurement_var}"
                ));
            }
            FilterKind::WindowMean { window_ms: 0 } => {
                errors.push("smoothing.filter.window_ms must be > 0".into());
            }
            _ => {}
        }

        if !(self.targeting.sticky_margin >= 0.0) {
            errors.push(format!(
                "targeting.sticky_margin must be >= 0, got {}",
                self.targeting.sticky_margin
            ));
        }

        if self.dwell.standard_ms == 0 {
            errors.push("dwell.standard_ms must be > 0".into());
        }
        if self.dwell.coarse_ms == 0 {
            errors.push("dwell.coarse_ms must be > 0".into());
        }
        if self.dwell.poll_interval_ms == 0 {
            errors.push("dwell.poll_interval_ms must be > 0".into());
        }

        if self.magnet.interval_ms == 0 {
            errors.push("magnet.interval_ms must be > 0".into());
        }
        if !(self.magnet.snap_stiffness > 0.0 && self.magnet.tracking_stiffness > 0.0) {
            errors.push("magnet stiffness values must be > 0".into());
        }

        if self.blink.prolonged_ms == 0 {
            errors.push("blink.prolonged_ms must be > 0".into());
        }

        if self.autopilot.move_steps == 0 {
            errors.push("autopilot.move_steps must be > 0".into());
        }
        if self.autopilot.poll_interval_ms == 0 {
            errors.push("autopilot.poll_interval_ms must be > 0".into());
        }

        if self.trace.capacity == 0 {
            errors.push("trace.capacity must be > 0".into());
        }

        errors
    }

    /// Consume the config, returning it only if [`validate`](Self::validate)
    /// reports nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            tracing::warn!(count = errors.len(), "rejected engine config");
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Sections (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// Visible surface size in pixels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewportConfig {
    /// Default: 800.
    pub width: f32,
    /// Default: 480.
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
        }
    }
}

impl ViewportConfig {
    /// The viewport as a rectangle anchored at the origin.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

/// Signal smoother parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SmoothingConfig {
    /// Per-frame smoothing weight. Default: 0.45.
    pub alpha: f32,
    /// Nominal frame in microseconds. Default: 16 667.
    pub nominal_frame_us: u64,
    /// Max displacement per nominal frame (px). Default: 120.
    pub max_step: f32,
    /// Per-axis micro-jitter deadzone (px). Default: 0.2.
    pub deadzone: f32,
    /// Longest elapsed time one update may account for. Default: 250.
    pub max_dt_ms: u64,
    /// Pre-filter applied before smoothing. Default: passthrough.
    pub filter: FilterKind,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.45,
            nominal_frame_us: 16_667,
            max_step: 120.0,
            deadzone: 0.2,
            max_dt_ms: 250,
            filter: FilterKind::Passthrough,
        }
    }
}

impl SmoothingConfig {
    /// Build the core [`SmootherConfig`].
    #[must_use]
    pub fn to_smoother_config(&self) -> SmootherConfig {
        SmootherConfig {
            alpha: self.alpha,
            nominal_frame: Duration::from_micros(self.nominal_frame_us),
            max_step: self.max_step,
            deadzone: self.deadzone,
            max_dt: Duration::from_millis(self.max_dt_ms),
        }
    }
}

/// Hit-resolution hysteresis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TargetingConfig {
    /// Margin around the active target that retains it (px). Default: 35.
    pub sticky_margin: f32,
    /// Delay before a leave takes effect. Default: 320.
    pub exit_delay_ms: u64,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            sticky_margin: 35.0,
            exit_delay_ms: 320,
        }
    }
}

impl TargetingConfig {
    #[inline]
    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.exit_delay_ms)
    }
}

/// Dwell activation timings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DwellConfig {
    /// Standard controls. Default: 1500.
    pub standard_ms: u64,
    /// Coarse or demo controls. Default: 3000.
    pub coarse_ms: u64,
    /// Progress polling cadence. Default: 50.
    pub poll_interval_ms: u64,
    /// Global pointer-lock after an activation. Default: 1500.
    pub cooldown_ms: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            standard_ms: 1500,
            coarse_ms: 3000,
            poll_interval_ms: 50,
            cooldown_ms: 1500,
        }
    }
}

impl DwellConfig {
    #[inline]
    pub fn standard(&self) -> Duration {
        Duration::from_millis(self.standard_ms)
    }

    #[inline]
    pub fn coarse(&self) -> Duration {
        Duration::from_millis(self.coarse_ms)
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Magnet assist and rendered-cursor springs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MagnetConfig {
    /// Default: true.
    pub enabled: bool,
    /// Re-evaluation interval. Default: 90.
    pub interval_ms: u64,
    /// Spring stiffness while following the stable position. Default: 170.
    pub tracking_stiffness: f64,
    /// Default: 26.
    pub tracking_damping: f64,
    /// Spring stiffness while snapped to a control. Default: 400.
    pub snap_stiffness: f64,
    /// Default: 38.
    pub snap_damping: f64,
}

impl Default for MagnetConfig {
    fn default() -> Self {
        let tracking = SpringParams::tracking();
        let snap = SpringParams::snap();
        Self {
            enabled: true,
            interval_ms: 90,
            tracking_stiffness: tracking.stiffness,
            tracking_damping: tracking.damping,
            snap_stiffness: snap.stiffness,
            snap_damping: snap.damping,
        }
    }
}

impl MagnetConfig {
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn tracking(&self) -> SpringParams {
        SpringParams::new(self.tracking_stiffness, self.tracking_damping)
    }

    #[must_use]
    pub fn snap(&self) -> SpringParams {
        SpringParams::new(self.snap_stiffness, self.snap_damping)
    }
}

/// Prolonged-blink click.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlinkConfig {
    /// A blink held this long counts as prolonged. Default: 1000.
    pub prolonged_ms: u64,
    /// Activate the hovered target on a prolonged blink. Default: true.
    pub click_on_prolonged: bool,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            prolonged_ms: 1000,
            click_on_prolonged: true,
        }
    }
}

impl BlinkConfig {
    #[inline]
    pub fn prolonged(&self) -> Duration {
        Duration::from_millis(self.prolonged_ms)
    }
}

/// Scripted autopilot timings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AutopilotConfig {
    /// Default duration of a cursor move. Default: 600.
    pub move_duration_ms: u64,
    /// Discrete interpolation steps per move. Default: 20.
    pub move_steps: u32,
    /// Cadence for condition polling and hold re-injection. Default: 50.
    pub poll_interval_ms: u64,
    /// Default bound for every wait. Default: 5000.
    pub wait_timeout_ms: u64,
    /// Extra hold beyond the target's dwell duration before giving up. Default: 1000.
    pub hold_margin_ms: u64,
    /// Radius of the warm-up sweep around the viewport centre (px). Default: 80.
    pub warm_up_radius: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            move_duration_ms: 600,
            move_steps: 20,
            poll_interval_ms: 50,
            wait_timeout_ms: 5000,
            hold_margin_ms: 1000,
            warm_up_radius: 80.0,
        }
    }
}

impl AutopilotConfig {
    #[inline]
    pub fn move_duration(&self) -> Duration {
        Duration::from_millis(self.move_duration_ms)
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    #[inline]
    pub fn hold_margin(&self) -> Duration {
        Duration::from_millis(self.hold_margin_ms)
    }
}

/// Interaction trace retention.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TraceConfig {
    /// Events kept before the oldest are evicted. Default: 10 000.
    pub capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an engine configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// TOML serialization error.
    #[cfg(feature = "config-file")]
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => write!(f, "TOML serialization error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
