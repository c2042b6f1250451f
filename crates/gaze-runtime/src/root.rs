#![forbid(unsafe_code)]

//! Interaction root: the scope that owns the engine and the autopilot.
//!
//! Everything that would otherwise be process-wide (the target registry, the
//! dwell machine, the autopilot's lifecycle flags) lives inside one
//! [`InteractionRoot`]. Unmounting the root, explicitly or by dropping it,
//! tears all of it down synchronously.

use web_time::Instant;

use gaze_core::sample::GazeSample;
use gaze_core::smoother::StablePosition;

use crate::autopilot::{Autopilot, AutopilotState, Script};
use crate::config::EngineConfig;
use crate::dwell::{CancelReason, DwellPoll};
use crate::engine::GazeEngine;
use crate::registry::{GazeTarget, Registration};
use crate::scene::{ElementId, ElementTree};

/// Owns a [`GazeEngine`] and its [`Autopilot`].
#[derive(Debug)]
pub struct InteractionRoot<T: ElementTree> {
    engine: GazeEngine<T>,
    autopilot: Autopilot<T>,
    last_now: Instant,
    mounted: bool,
}

impl<T: ElementTree> InteractionRoot<T> {
    /// Mount a root over `tree` at `now`.
    #[must_use]
    pub fn new(config: EngineConfig, tree: T, now: Instant) -> Self {
        let autopilot = Autopilot::new(config.autopilot.clone());
        Self {
            engine: GazeEngine::new(config, tree, now),
            autopilot,
            last_now: now,
            mounted: true,
        }
    }

    pub fn engine(&self) -> &GazeEngine<T> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GazeEngine<T> {
        &mut self.engine
    }

    pub fn autopilot(&self) -> &Autopilot<T> {
        &self.autopilot
    }

    pub fn autopilot_state(&self) -> AutopilotState {
        self.autopilot.state()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn attach(&mut self, element: ElementId, target: impl GazeTarget + 'static) -> Registration {
        self.engine.attach(element, target)
    }

    pub fn detach(&mut self, registration: Registration, now: Instant) -> bool {
        self.observe(now);
        self.engine.detach(registration, now)
    }

    /// Feed one live sample.
    pub fn ingest(&mut self, sample: &GazeSample, now: Instant) -> StablePosition {
        self.observe(now);
        self.engine.ingest(sample, now)
    }

    /// Poll the autopilot, then run the engine's timers.
    pub fn tick(&mut self, now: Instant) -> DwellPoll {
        self.observe(now);
        if !self.mounted {
            return DwellPoll::Idle;
        }
        self.autopilot.poll(&mut self.engine, now);
        self.engine.tick(now)
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.engine.next_deadline(), self.autopilot.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn start_autopilot(&mut self, script: Script<T>, now: Instant) -> bool {
        self.observe(now);
        self.mounted && self.autopilot.start(&mut self.engine, script, now)
    }

    pub fn warm_up(&mut self, now: Instant) -> bool {
        self.observe(now);
        self.mounted && self.autopilot.warm_up(&mut self.engine, now)
    }

    pub fn cancel_autopilot(&mut self, now: Instant) {
        self.observe(now);
        self.autopilot.cancel(&mut self.engine, now);
    }

    /// Tear down: cancel the autopilot and clear its timers, cancel any
    /// dwell, and detach every target. Idempotent.
    pub fn unmount(&mut self, now: Instant) {
        if !self.mounted {
            return;
        }
        self.observe(now);
        self.mounted = false;
        self.autopilot.cancel(&mut self.engine, now);
        self.engine.cancel_dwell(CancelReason::Teardown, now);
        let detached = self.engine.detach_all(now);
        tracing::debug!(detached, "interaction root unmounted");
    }

    fn observe(&mut self, now: Instant) {
        if now > self.last_now {
            self.last_now = now;
        }
    }
}

impl<T: ElementTree> Drop for InteractionRoot<T> {
    fn drop(&mut self) {
        if self.mounted {
            self.unmount(self.last_now);
        }
    }
}
