#![forbid(unsafe_code)]

//! Deterministic harness for the gaze interaction engine.
//!
//! Everything here runs on a virtual clock so that a scenario's interaction
//! trace is a pure function of its inputs:
//!
//! - [`fixture`]: the two-device smart-home panel and its guided script.
//! - [`replay`]: JSONL sample traces, loading, saving, and replaying them.
//! - [`demo`]: a seeded synthetic gaze source.
//! - [`scenario`]: the autopilot, replay, and demo runs built from the above.
//! - [`cli`]: the `gaze-harness` command line.

pub mod cli;
pub mod demo;
pub mod determinism;
pub mod error;
pub mod fixture;
pub mod replay;
pub mod report;
pub mod scenario;

pub use determinism::{VirtualClock, XorShift64};
pub use error::{HarnessError, Result};
pub use fixture::{SharedScene, SmartHome};
pub use replay::{ReplayError, SampleRecord, SampleTrace};
pub use scenario::{AutopilotOptions, RunOutcome, run_autopilot, run_demo, run_replay};
