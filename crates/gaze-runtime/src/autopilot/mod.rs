#![forbid(unsafe_code)]

//! Autopilot sequencer.
//!
//! A cooperative scripted driver that synthesizes pointer movement against
//! the same engine live samples go through. Every synthetic point enters via
//! [`GazeEngine::inject`], so hit resolution, hover hysteresis, and the dwell
//! machine behave exactly as they do for a real user.
//!
//! The sequencer never blocks. The owner calls [`Autopilot::poll`] before
//! each engine tick; the current step checks its timers, does whatever is
//! due, and either resolves (the next step begins in the same poll) or stays
//! suspended until a later poll.
//!
//! # Invariants
//!
//! 1. `start` and `warm_up` each run at most once per autopilot. The flags
//!    guarding them only ever go from `false` to `true`.
//! 2. While a script is driving, the engine's input source is
//!    [`InputSource::Scripted`]. On completion or cancellation it is
//!    [`InputSource::Live`] again.
//! 3. Every timer a step creates is cleared when that step resolves, and
//!    cancellation clears every outstanding timer.
//! 4. The cancellation token is checked on every poll and before every step.
//!
//! # Failure Modes
//!
//! - A wait that times out, or a locator that finds nothing, logs a warning
//!   and skips the step. Only cancellation stops the whole script.
//! - A dwell step whose target never activates gives up after the target's
//!   dwell duration plus `hold_margin`.

mod script;
pub mod timers;

pub use script::{Condition, Locator, Query, Script, Step};
pub use timers::{TimerId, TimerSet};

use std::collections::VecDeque;
use std::fmt;

use web_time::{Duration, Instant};

use gaze_core::animation::Easing;
use gaze_core::geometry::Point;
use gaze_core::sample::GazeSample;

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::config::AutopilotConfig;
use crate::dwell::CancelReason;
use crate::engine::{GazeEngine, InputSource};
use crate::scene::{ElementId, ElementTree};

/// Observable lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutopilotState {
    /// `start` has been called. Never reset.
    pub started: bool,
    /// Steps remain (a warm-up or a script).
    pub running: bool,
    /// The script reached its recommendation wait and is watching for the
    /// accept control.
    pub waiting_for_recommendation: bool,
    /// The script ran to its end.
    pub completed: bool,
    /// The script was cancelled.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Step execution state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Move {
    from: Point,
    to: Point,
    started: Instant,
    duration: Duration,
    easing: Easing,
    step: u32,
    steps: u32,
    timer: TimerId,
}

enum Waiting<T> {
    Condition { label: String, condition: Condition<T> },
    Element(Query<T>),
}

impl<T> Waiting<T> {
    fn satisfied(&self, tree: &T) -> bool {
        match self {
            Self::Condition { condition, .. } => condition(tree),
            Self::Element(query) => query(tree).is_some(),
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Condition { label, .. } => label,
            Self::Element(_) => "element",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DwellPhase {
    /// Waiting for the pointer-lock cooldown to clear.
    Cooldown { poll: TimerId, deadline: TimerId },
    Moving(Move),
    Holding { poll: TimerId, deadline: TimerId },
}

enum Action<T> {
    Pause(TimerId),
    Move(Move),
    Wait {
        what: Waiting<T>,
        poll: TimerId,
        deadline: TimerId,
    },
    Dwell {
        target: ElementId,
        center: Point,
        /// When the step began. Any activation of `target` from then on
        /// satisfies it, including one that lands mid-move.
        since: Instant,
        phase: DwellPhase,
    },
    Watch {
        query: Query<T>,
        poll: TimerId,
    },
}

struct Current<T> {
    action: Action<T>,
    span: tracing::Span,
}

enum Drive {
    Pending,
    Resolved,
}

// ---------------------------------------------------------------------------
// Autopilot
// ---------------------------------------------------------------------------

/// The scripted driver.
pub struct Autopilot<T> {
    config: AutopilotConfig,
    cancellation: CancellationSource,
    state: AutopilotState,
    warmed_up: bool,
    timers: TimerSet,
    queue: VecDeque<Step<T>>,
    current: Option<Current<T>>,
    next_index: usize,
}

impl<T> fmt::Debug for Autopilot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autopilot")
            .field("state", &self.state)
            .field("warmed_up", &self.warmed_up)
            .field("timers", &self.timers.len())
            .field("queued", &self.queue.len())
            .field("busy", &self.current.is_some())
            .finish()
    }
}

impl<T: ElementTree> Autopilot<T> {
    #[must_use]
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            cancellation: CancellationSource::new(),
            state: AutopilotState::default(),
            warmed_up: false,
            timers: TimerSet::new(),
            queue: VecDeque::new(),
            current: None,
            next_index: 0,
        }
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn state(&self) -> AutopilotState {
        self.state
    }

    /// A token that cancels this autopilot from anywhere.
    pub fn token(&self) -> CancellationToken {
        self.cancellation.token()
    }

    /// Outstanding timers.
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    /// Steps not yet begun.
    pub fn pending_steps(&self) -> usize {
        self.queue.len()
    }

    /// When the next poll has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Begin `script`. Returns `false` if a script was already started or the
    /// autopilot was cancelled.
    pub fn start(&mut self, engine: &mut GazeEngine<T>, script: Script<T>, now: Instant) -> bool {
        if self.state.started || self.state.cancelled {
            tracing::debug!("autopilot start ignored");
            return false;
        }
        self.state.started = true;
        self.state.running = true;
        self.queue.extend(script.into_steps());
        engine.set_input_source(InputSource::Scripted);
        tracing::info!(steps = self.queue.len(), "autopilot started");
        self.poll(engine, now);
        true
    }

    /// Queue a short sweep around the viewport centre. Runs at most once and
    /// never after a script has started.
    pub fn warm_up(&mut self, engine: &mut GazeEngine<T>, now: Instant) -> bool {
        if self.warmed_up || self.state.started || self.state.cancelled {
            return false;
        }
        self.warmed_up = true;
        let c = engine.config().viewport.rect().center();
        let r = self.config.warm_up_radius;
        let duration = self.config.move_duration() / 2;
        for p in [
            Point::new(c.x - r, c.y),
            Point::new(c.x + r, c.y),
            c,
        ] {
            self.queue.push_back(Step::MoveTo {
                to: Locator::Point(p),
                duration: Some(duration),
                easing: Easing::EaseInOut,
            });
        }
        self.state.running = true;
        engine.set_input_source(InputSource::Scripted);
        tracing::debug!(radius = r, "autopilot warm-up queued");
        self.poll(engine, now);
        true
    }

    /// Stop everything. Idempotent, and a no-op once the script completed.
    ///
    /// Clears every timer and drops the remaining steps. If the autopilot was
    /// driving the pointer it also cancels the dwell it started, leaves the
    /// hovered target, puts the rendered cursor back on the authoritative
    /// position, and returns the engine to live input. A dwell the user holds
    /// while the autopilot is idle or waiting on live input is left alone.
    pub fn cancel(&mut self, engine: &mut GazeEngine<T>, now: Instant) {
        if self.state.cancelled || self.state.completed {
            return;
        }
        self.cancellation.cancel();
        let cleared = self.timers.clear_all();
        self.queue.clear();
        self.current = None;
        let was_running = self.state.running;
        self.state.cancelled = true;
        self.state.running = false;
        self.state.waiting_for_recommendation = false;

        if !was_running {
            tracing::debug!(timers_cleared = cleared, "idle autopilot cancelled");
            return;
        }
        if engine.input_source() == InputSource::Scripted {
            engine.cancel_dwell(CancelReason::Autopilot, now);
            engine.release_hover(now);
        }
        engine.release_magnet();
        engine.set_input_source(InputSource::Live);
        tracing::info!(timers_cleared = cleared, "autopilot cancelled");
    }

    /// Drive the current step at `now`.
    pub fn poll(&mut self, engine: &mut GazeEngine<T>, now: Instant) {
        if self.cancellation.is_cancelled() {
            self.cancel(engine, now);
            return;
        }
        if !self.state.running {
            return;
        }

        loop {
            let mut current = match self.current.take() {
                Some(current) => current,
                None => {
                    if self.cancellation.is_cancelled() {
                        self.cancel(engine, now);
                        return;
                    }
                    let Some(step) = self.queue.pop_front() else {
                        self.finish(engine);
                        return;
                    };
                    match self.begin(step, engine, now) {
                        Some(current) => current,
                        None => continue,
                    }
                }
            };

            let resolved = {
                let _guard = current.span.enter();
                match self.drive(&mut current.action, engine, now) {
                    Drive::Pending => false,
                    Drive::Resolved => {
                        self.timers.clear_all();
                        tracing::debug!("autopilot step resolved");
                        true
                    }
                }
            };
            if !resolved {
                self.current = Some(current);
                return;
            }
        }
    }

    fn finish(&mut self, engine: &mut GazeEngine<T>) {
        self.state.running = false;
        engine.set_input_source(InputSource::Live);
        if self.state.started {
            self.state.completed = true;
            tracing::info!(steps = self.next_index, "autopilot completed");
        } else {
            tracing::debug!("autopilot warm-up finished");
        }
    }

    // -----------------------------------------------------------------------
    // Step setup
    // -----------------------------------------------------------------------

    /// Set up `step`. `None` means the step resolved (or was skipped) without
    /// suspending.
    fn begin(&mut self, step: Step<T>, engine: &mut GazeEngine<T>, now: Instant) -> Option<Current<T>> {
        let index = self.next_index;
        self.next_index += 1;
        let kind = step.kind();
        let span = tracing::info_span!("autopilot.step", index, kind);
        let action = {
            let _guard = span.enter();
            tracing::debug!(?step, "autopilot step begin");
            self.setup(step, engine, now)
        };
        action.map(|action| Current { action, span })
    }

    fn setup(&mut self, step: Step<T>, engine: &mut GazeEngine<T>, now: Instant) -> Option<Action<T>> {
        match step {
            Step::Pause(duration) => Some(Action::Pause(self.timers.set_timeout(now, duration, "pause"))),
            Step::MoveTo {
                to,
                duration,
                easing,
            } => {
                let Some(to) = to.resolve(engine.tree()) else {
                    tracing::warn!("autopilot move target not found; step skipped");
                    return None;
                };
                let duration = duration.unwrap_or(self.config.move_duration());
                Some(Action::Move(self.start_move(engine.position().point(), to, duration, easing, now)))
            }
            Step::DwellOn { on } => self.setup_dwell(&on, engine, now),
            Step::WaitFor {
                label,
                condition,
                timeout,
            } => self.setup_wait(Waiting::Condition { label, condition }, timeout, engine, now),
            Step::WaitForElement { query, timeout } => {
                self.setup_wait(Waiting::Element(query), timeout, engine, now)
            }
            Step::AwaitRecommendation { query } => {
                self.state.waiting_for_recommendation = true;
                engine.set_input_source(InputSource::Live);
                tracing::info!("autopilot waiting for a recommendation");
                if let Some(found) = query(engine.tree()) {
                    self.accept_recommendation(found, engine);
                    return None;
                }
                let poll = self
                    .timers
                    .set_interval(now, self.config.poll_interval(), "recommendation");
                Some(Action::Watch { query, poll })
            }
        }
    }

    fn start_move(&mut self, from: Point, to: Point, duration: Duration, easing: Easing, now: Instant) -> Move {
        let steps = self.config.move_steps.max(1);
        Move {
            from,
            to,
            started: now,
            duration,
            easing,
            step: 0,
            steps,
            timer: self.timers.set_interval(now, duration / steps, "move"),
        }
    }

    fn setup_dwell(&mut self, on: &Locator<T>, engine: &mut GazeEngine<T>, now: Instant) -> Option<Action<T>> {
        let Some(center) = on.resolve(engine.tree()) else {
            tracing::warn!(locator = ?on, "autopilot dwell target not found; step skipped");
            return None;
        };
        let target = engine
            .registry()
            .resolve(engine.tree(), center)
            .or_else(|| on.element(engine.tree()).filter(|e| engine.registry().contains(*e)));
        let Some(target) = target else {
            tracing::warn!(x = center.x, y = center.y, "no gaze target under dwell point; step skipped");
            return None;
        };

        let phase = if engine.is_locked(now) {
            DwellPhase::Cooldown {
                poll: self.timers.set_interval(now, self.config.poll_interval(), "cooldown"),
                deadline: self
                    .timers
                    .set_timeout(now, self.config.wait_timeout(), "cooldown timeout"),
            }
        } else {
            DwellPhase::Moving(self.start_move(
                engine.position().point(),
                center,
                self.config.move_duration(),
                Easing::EaseInOut,
                now,
            ))
        };
        Some(Action::Dwell {
            target,
            center,
            since: now,
            phase,
        })
    }

    fn setup_wait(
        &mut self,
        what: Waiting<T>,
        timeout: Option<Duration>,
        engine: &GazeEngine<T>,
        now: Instant,
    ) -> Option<Action<T>> {
        if what.satisfied(engine.tree()) {
            return None;
        }
        let timeout = timeout.unwrap_or(self.config.wait_timeout());
        Some(Action::Wait {
            poll: self.timers.set_interval(now, self.config.poll_interval(), "wait"),
            deadline: self.timers.set_timeout(now, timeout, "wait timeout"),
            what,
        })
    }

    fn accept_recommendation(&mut self, found: ElementId, engine: &mut GazeEngine<T>) {
        tracing::info!(element = %found, "recommendation shown; accepting");
        self.state.waiting_for_recommendation = false;
        engine.set_input_source(InputSource::Scripted);
        self.queue.push_front(Step::DwellOn {
            on: Locator::Element(found),
        });
    }

    // -----------------------------------------------------------------------
    // Step driving
    // -----------------------------------------------------------------------

    fn drive(&mut self, action: &mut Action<T>, engine: &mut GazeEngine<T>, now: Instant) -> Drive {
        match action {
            Action::Pause(timer) => resolved_if(self.timers.fire(*timer, now)),
            Action::Move(mv) => resolved_if(advance_move(&mut self.timers, mv, engine, now)),
            Action::Wait {
                what,
                poll,
                deadline,
            } => {
                if self.timers.fire(*poll, now) && what.satisfied(engine.tree()) {
                    return Drive::Resolved;
                }
                if self.timers.fire(*deadline, now) {
                    tracing::warn!(waiting_for = what.label(), "autopilot wait timed out; step skipped");
                    return Drive::Resolved;
                }
                Drive::Pending
            }
            Action::Dwell {
                target,
                center,
                since,
                phase,
            } => self.drive_dwell(*target, *center, *since, phase, engine, now),
            Action::Watch { query, poll } => {
                if !self.timers.fire(*poll, now) {
                    return Drive::Pending;
                }
                match query(engine.tree()) {
                    Some(found) => {
                        self.accept_recommendation(found, engine);
                        Drive::Resolved
                    }
                    None => Drive::Pending,
                }
            }
        }
    }

    fn drive_dwell(
        &mut self,
        target: ElementId,
        center: Point,
        since: Instant,
        phase: &mut DwellPhase,
        engine: &mut GazeEngine<T>,
        now: Instant,
    ) -> Drive {
        let activated = engine
            .last_activation()
            .is_some_and(|(e, at)| e == target && at >= since);
        match *phase {
            DwellPhase::Cooldown { poll, deadline } => {
                if self.timers.fire(poll, now) && !engine.is_locked(now) {
                    self.timers.clear(poll);
                    self.timers.clear(deadline);
                    *phase = DwellPhase::Moving(self.start_move(
                        engine.position().point(),
                        center,
                        self.config.move_duration(),
                        Easing::EaseInOut,
                        now,
                    ));
                    return Drive::Pending;
                }
                if self.timers.fire(deadline, now) {
                    tracing::warn!(element = %target, "pointer lock did not clear; dwell step skipped");
                    return Drive::Resolved;
                }
                Drive::Pending
            }
            DwellPhase::Moving(_) if activated => {
                tracing::debug!(element = %target, "dwell completed during the move");
                engine.release_hover(now);
                Drive::Resolved
            }
            DwellPhase::Moving(mut mv) => {
                if !advance_move(&mut self.timers, &mut mv, engine, now) {
                    *phase = DwellPhase::Moving(mv);
                    return Drive::Pending;
                }
                let hold = engine
                    .dwell_duration(target)
                    .unwrap_or(engine.config().dwell.standard())
                    + self.config.hold_margin();
                engine.allow_reentry(target);
                engine.inject(&GazeSample::at(center.x, center.y, now), now);
                *phase = DwellPhase::Holding {
                    poll: self.timers.set_interval(now, self.config.poll_interval(), "hold"),
                    deadline: self.timers.set_timeout(now, hold, "hold timeout"),
                };
                Drive::Pending
            }
            DwellPhase::Holding { poll, deadline } => {
                if !activated {
                    if self.timers.fire(poll, now) {
                        engine.inject(&GazeSample::at(center.x, center.y, now), now);
                    }
                    if !self.timers.fire(deadline, now) {
                        return Drive::Pending;
                    }
                    tracing::warn!(element = %target, "dwell did not complete; step skipped");
                }
                engine.release_hover(now);
                Drive::Resolved
            }
        }
    }
}

fn resolved_if(done: bool) -> Drive {
    if done { Drive::Resolved } else { Drive::Pending }
}

/// Inject the next interpolation point if the move's timer is due. Returns
/// `true` once the final point has been injected.
fn advance_move<T: ElementTree>(
    timers: &mut TimerSet,
    mv: &mut Move,
    engine: &mut GazeEngine<T>,
    now: Instant,
) -> bool {
    if !timers.fire(mv.timer, now) {
        return false;
    }
    let fraction = if mv.duration.is_zero() {
        1.0
    } else {
        now.saturating_duration_since(mv.started).as_secs_f32() / mv.duration.as_secs_f32()
    };
    // Catch up if polls arrive slower than the step interval.
    let due = (fraction * mv.steps as f32).floor() as u32;
    mv.step = due.clamp(mv.step + 1, mv.steps);
    let t = mv.step as f32 / mv.steps as f32;
    let p = mv.from.lerp(mv.to, mv.easing.apply(t));
    engine.inject(&GazeSample::at(p.x, p.y, now), now);
    if mv.step >= mv.steps {
        timers.clear(mv.timer);
        return true;
    }
    false
}
