#![forbid(unsafe_code)]

//! Runtime: target resolution, dwell activation, and scripted driving.
//!
//! # Role in the gaze stack
//! `gaze-runtime` takes the stable pointer produced by `gaze-core` and turns
//! it into interaction: which control is under the pointer, whether the user
//! has looked at it long enough, and what to do about it.
//!
//! # Primary responsibilities
//! - **TargetRegistry**: controls that opted in to gaze, resolved by walking
//!   the element tree upward from the hit element.
//! - **HoverTracker**: sticky margin and exit delay around the active target.
//! - **DwellMachine**: one global dwell session, completion, and the
//!   pointer-lock cooldown.
//! - **MagnetAssist**: a spring-driven, rendering-only cursor that snaps to
//!   the control under the pointer.
//! - **GazeEngine**: the pipeline tying the above together, plus the
//!   interaction trace.
//! - **Autopilot**: a cooperative, cancellable script runner that drives the
//!   engine with synthetic samples.
//! - **InteractionRoot**: owner and teardown scope for all of the above.
//!
//! # How it fits in the system
//! A platform adapter implements [`ElementTree`] for its widget tree (or uses
//! the in-memory [`Scene`]), attaches [`GazeTarget`]s, and then calls
//! [`InteractionRoot::ingest`] per sample and [`InteractionRoot::tick`] on a
//! timer. Everything runs on the caller's thread; time is always passed in.

pub mod autopilot;
pub mod cancellation;
pub mod config;
pub mod dwell;
pub mod engine;
pub mod hover;
pub mod magnet;
pub mod registry;
pub mod root;
pub mod scene;
pub mod trace;

pub use autopilot::{Autopilot, AutopilotState, Locator, Script, Step};
pub use cancellation::{CancellationSource, CancellationToken};
pub use config::{ConfigError, EngineConfig};
pub use dwell::{CancelReason, DwellMachine, DwellPoll, RejectReason};
pub use engine::{EngineSnapshot, GazeEngine, InputSource, TargetStatus};
pub use hover::{HoverConfig, HoverTracker, HoverTransition};
pub use magnet::MagnetAssist;
pub use registry::{DwellProfile, GazeTarget, Registration, TargetError, TargetRegistry};
pub use root::InteractionRoot;
pub use scene::{ElementId, ElementTree, Scene};
pub use trace::{Activation, InteractionEvent, InteractionKind, InteractionTrace};
