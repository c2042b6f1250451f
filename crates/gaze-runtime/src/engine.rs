#![forbid(unsafe_code)]

//! The gaze interaction engine.
//!
//! [`GazeEngine`] wires the pipeline together:
//!
//! ```text
//! sample ─▶ blink tracker ─▶ pre-filter ─▶ smoother ─▶ registry.resolve
//!                                               │            │
//!                                               │       hover hysteresis
//!                                               │            │
//!                                               ▼            ▼
//!                                       magnet (cosmetic)  dwell machine ─▶ on_activate
//! ```
//!
//! Two entry points drive it:
//!
//! - [`GazeEngine::ingest`] / [`GazeEngine::inject`] push one sample through
//!   the position pipeline and apply any immediate hover transitions.
//! - [`GazeEngine::tick`] runs everything time-based: the disabled check,
//!   dwell completion, pending hover leaves, and the magnet.
//!
//! Callers decide the cadence; [`GazeEngine::next_deadline`] says when the
//! next timer is due.
//!
//! # Invariants
//!
//! 1. A dwell never completes while a leave is pending on its target. If the
//!    pointer returns within the exit delay the session resumes and completes
//!    on the next tick; otherwise the leave cancels it. A target that is
//!    disabled by then is cancelled instead.
//! 2. Every leave's callback runs before the next enter's callback.
//! 3. Callback failures (errors or panics) are logged and traced; the engine
//!    finishes its own bookkeeping regardless.
//! 4. While the input source is [`InputSource::Scripted`], live samples are
//!    ignored. Switching sources resets the pre-filter, the blink tracker,
//!    and the smoother clock.
//!
//! # Failure Modes
//!
//! - A target removed from the tree but still registered resolves to nothing;
//!   its hover ends through the normal exit delay.
//! - A callback that mutates the tree through a shared handle sees the change
//!   on the next sample, not within the current one.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use web_time::{Duration, Instant};

use gaze_core::blink::BlinkTracker;
use gaze_core::filter::GazeFilter;
use gaze_core::geometry::Point;
use gaze_core::sample::GazeSample;
use gaze_core::smoother::{SignalSmoother, StablePosition};

use crate::config::EngineConfig;
use crate::dwell::{BeginOutcome, CancelReason, DwellMachine, DwellPoll, RejectReason};
use crate::hover::{HoverConfig, HoverTracker, HoverTransition};
use crate::magnet::MagnetAssist;
use crate::registry::{GazeTarget, Registration, TargetError, TargetRegistry};
use crate::scene::{ElementId, ElementTree};
use crate::trace::{Activation, Callback, InteractionEvent, InteractionKind, InteractionTrace};

/// Who is feeding the smoother.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputSource {
    /// Samples from the gaze producer.
    #[default]
    Live,
    /// Synthetic samples from the autopilot.
    Scripted,
}

/// Per-control projection for a presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetStatus {
    pub dwelling: bool,
    /// `0.0..=100.0`.
    pub progress: f32,
}

/// Everything a presentation layer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSnapshot {
    pub position: StablePosition,
    pub rendered: Point,
    pub active: Option<ElementId>,
    pub dwelling: Option<ElementId>,
    pub progress: f32,
    pub locked: bool,
    pub source: InputSource,
}

/// Run a target callback, turning panics into [`TargetError::Panicked`].
fn guarded(callback: impl FnOnce() -> Result<(), TargetError>) -> Result<(), TargetError> {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(result) => result,
        Err(payload) => Err(TargetError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Smoother, registry, hover, dwell, and magnet over one element tree.
pub struct GazeEngine<T> {
    config: EngineConfig,
    tree: T,
    smoother: SignalSmoother,
    filter: Box<dyn GazeFilter>,
    blink: BlinkTracker,
    registry: TargetRegistry,
    hover: HoverTracker,
    dwell: DwellMachine,
    magnet: MagnetAssist,
    trace: InteractionTrace,
    source: InputSource,
    scratch: Vec<HoverTransition>,
}

impl<T> fmt::Debug for GazeEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GazeEngine")
            .field("position", &self.smoother.position())
            .field("filter", &self.filter.name())
            .field("registry", &self.registry)
            .field("hover", &self.hover)
            .field("dwell", &self.dwell)
            .field("source", &self.source)
            .field("trace_len", &self.trace.len())
            .finish_non_exhaustive()
    }
}

impl<T: ElementTree> GazeEngine<T> {
    /// Create an engine over `tree`. Trace timestamps are relative to `epoch`.
    #[must_use]
    pub fn new(config: EngineConfig, tree: T, epoch: Instant) -> Self {
        let smoother = SignalSmoother::new(
            config.smoothing.to_smoother_config(),
            config.viewport.rect(),
        );
        let start = smoother.position().point();
        Self {
            filter: config.smoothing.filter.build(),
            blink: BlinkTracker::new(config.blink.prolonged()),
            hover: HoverTracker::new(HoverConfig {
                sticky_margin: config.targeting.sticky_margin,
                exit_delay: config.targeting.exit_delay(),
            }),
            dwell: DwellMachine::new(config.dwell.poll_interval(), config.dwell.cooldown()),
            magnet: MagnetAssist::new(&config.magnet, start),
            trace: InteractionTrace::with_capacity(epoch, config.trace.capacity),
            registry: TargetRegistry::new(),
            source: InputSource::Live,
            scratch: Vec::with_capacity(4),
            smoother,
            tree,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn trace(&self) -> &InteractionTrace {
        &self.trace
    }

    /// Remove and return the trace recorded so far.
    pub fn take_trace(&mut self) -> Vec<InteractionEvent> {
        self.trace.drain()
    }

    pub fn epoch(&self) -> Instant {
        self.trace.epoch()
    }

    pub fn input_source(&self) -> InputSource {
        self.source
    }

    /// Authoritative pointer position. `magnetized` reports whether the
    /// rendered cursor is currently snapped.
    pub fn position(&self) -> StablePosition {
        self.smoother
            .position()
            .with_magnetized(self.magnet.is_active())
    }

    /// Where the cursor should be drawn.
    pub fn rendered(&self) -> Point {
        self.magnet.rendered()
    }

    pub fn active_target(&self) -> Option<ElementId> {
        self.hover.active()
    }

    pub fn dwelling_target(&self) -> Option<ElementId> {
        self.dwell.dwelling()
    }

    pub fn magnet_target(&self) -> Option<ElementId> {
        self.magnet.target()
    }

    pub fn is_locked(&self, now: Instant) -> bool {
        self.dwell.is_locked(now)
    }

    /// When the pointer-lock cooldown ends, if it is running.
    pub fn locked_until(&self, now: Instant) -> Option<Instant> {
        self.dwell.locked_until(now)
    }

    /// Most recent activation.
    pub fn last_activation(&self) -> Option<(ElementId, Instant)> {
        self.dwell.last_completed()
    }

    /// Dwell duration configured for a registered element.
    pub fn dwell_duration(&self, element: ElementId) -> Option<Duration> {
        self.registry
            .get(element)
            .map(|t| t.dwell_profile().duration(&self.config.dwell))
    }

    pub fn target_status(&self, element: ElementId) -> TargetStatus {
        let (dwelling, progress) = self.dwell.status(element);
        TargetStatus { dwelling, progress }
    }

    pub fn snapshot(&self, now: Instant) -> EngineSnapshot {
        let dwelling = self.dwell.dwelling();
        EngineSnapshot {
            position: self.position(),
            rendered: self.rendered(),
            active: self.hover.active(),
            dwelling,
            progress: self.dwell.session().map_or(0.0, |s| s.progress),
            locked: self.dwell.is_locked(now),
            source: self.source,
        }
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.dwell.next_poll(),
            self.hover.pending_leave(),
            self.magnet.next_eval(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Bind `target` to `element`.
    pub fn attach(&mut self, element: ElementId, target: impl GazeTarget + 'static) -> Registration {
        self.registry.register(element, Box::new(target))
    }

    /// Undo an [`attach`](Self::attach). A stale handle does nothing.
    pub fn detach(&mut self, registration: Registration, now: Instant) -> bool {
        if !self.registry.deregister(registration) {
            return false;
        }
        self.forget(registration.element(), CancelReason::Detached, now);
        true
    }

    /// Detach every target. Returns how many were registered.
    pub fn detach_all(&mut self, now: Instant) -> usize {
        let elements = self.registry.clear();
        for element in &elements {
            self.forget(*element, CancelReason::Teardown, now);
        }
        elements.len()
    }

    fn forget(&mut self, element: ElementId, reason: CancelReason, now: Instant) {
        self.hover.forget(element);
        if self.dwell.cancel(element).is_some() {
            self.trace
                .record(now, element, InteractionKind::DwellCancelled { reason });
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Feed one live sample observed at `now`. Ignored while scripted.
    pub fn ingest(&mut self, sample: &GazeSample, now: Instant) -> StablePosition {
        if self.source == InputSource::Scripted {
            tracing::trace!("live sample ignored while scripted");
            return self.position();
        }
        self.feed(sample, now)
    }

    /// Feed one synthetic sample. Ignored unless the source is scripted.
    pub fn inject(&mut self, sample: &GazeSample, now: Instant) -> StablePosition {
        if self.source != InputSource::Scripted {
            tracing::debug!("synthetic sample ignored while live");
            return self.position();
        }
        self.feed(sample, now)
    }

    /// Switch who feeds the smoother.
    pub fn set_input_source(&mut self, source: InputSource) {
        if self.source == source {
            return;
        }
        tracing::debug!(?source, "input source switched");
        self.source = source;
        self.filter.reset();
        self.blink.reset();
        self.smoother.clear_clock();
    }

    fn feed(&mut self, sample: &GazeSample, now: Instant) -> StablePosition {
        let blink = self.blink.observe(sample.blink, sample.prolonged_blink, now);

        let mut filtered = *sample;
        if sample.has_valid_coordinates() && !sample.requests_freeze() {
            let p = self
                .smoother
                .viewport()
                .clamp_point(self.filter.step(sample.point(), now));
            filtered.x = p.x;
            filtered.y = p.y;
        }

        let position = self.smoother.update(&filtered, now);
        if !position.frozen {
            self.resolve(now);
        }
        if blink.prolonged_edge && self.config.blink.click_on_prolonged {
            self.blink_click(now);
        }
        self.position()
    }

    fn resolve(&mut self, now: Instant) {
        let pointer = self.smoother.position().point();
        let resolved = self.registry.resolve(&self.tree, pointer);
        let active_bounds = self.hover.active().and_then(|a| self.tree.bounds(a));
        let mut out = std::mem::take(&mut self.scratch);
        self.hover
            .update(resolved, pointer, active_bounds, now, &mut out);
        self.apply(&mut out, now);
        self.scratch = out;
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Run every time-based transition due at `now`.
    pub fn tick(&mut self, now: Instant) -> DwellPoll {
        let span = tracing::debug_span!("gaze.tick");
        let _guard = span.enter();

        if let Some(target) = self.dwell.dwelling() {
            let reason = match self.registry.get(target) {
                None => Some(CancelReason::Detached),
                Some(t) if !t.is_enabled() => Some(CancelReason::Disabled),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                self.dwell.cancel(target);
                tracing::debug!(element = %target, ?reason, "dwell cancelled");
                self.trace
                    .record(now, target, InteractionKind::DwellCancelled { reason });
            }
        }

        // A pending leave on the dwelling target means the pointer is already
        // outside the sticky zone; completion waits to see if it returns.
        let leaving = self.hover.pending_leave().is_some()
            && self.dwell.dwelling().is_some()
            && self.hover.active() == self.dwell.dwelling();
        let poll = if leaving {
            self.dwell.hold(now)
        } else {
            self.dwell.poll(now)
        };
        if let DwellPoll::Completed(target) = poll {
            self.activate(target, Activation::Dwell, now);
        }

        let mut out = std::mem::take(&mut self.scratch);
        self.hover.poll(now, &mut out);
        self.apply(&mut out, now);
        self.scratch = out;

        self.magnet
            .update(&self.tree, self.smoother.position().point(), now);
        poll
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn apply(&mut self, transitions: &mut Vec<HoverTransition>, now: Instant) {
        for transition in transitions.drain(..) {
            match transition {
                HoverTransition::Enter(element) => self.enter(element, now),
                HoverTransition::Leave(element) => self.leave(element, now),
            }
        }
    }

    fn enter(&mut self, element: ElementId, now: Instant) {
        tracing::debug!(%element, "gaze enter");
        self.trace.record(now, element, InteractionKind::Enter);
        let Some(target) = self.registry.get_mut(element) else {
            return;
        };
        let result = guarded(|| target.on_enter());
        let enabled = target.is_enabled();
        let duration = target.dwell_profile().duration(&self.config.dwell);
        if let Err(err) = result {
            self.callback_failed(element, Callback::Enter, &err, now);
        }

        match self.dwell.begin(element, enabled, duration, now) {
            BeginOutcome::Started => self.trace.record(
                now,
                element,
                InteractionKind::DwellStarted {
                    duration_ms: duration.as_millis() as u64,
                },
            ),
            BeginOutcome::AlreadyDwelling => {}
            BeginOutcome::Rejected(reason) => {
                tracing::debug!(%element, ?reason, "dwell rejected");
                self.trace
                    .record(now, element, InteractionKind::DwellRejected { reason });
            }
        }
    }

    fn leave(&mut self, element: ElementId, now: Instant) {
        tracing::debug!(%element, "gaze leave");
        self.trace.record(now, element, InteractionKind::Leave);
        let result = match self.registry.get_mut(element) {
            Some(target) => guarded(|| target.on_leave()),
            None => Ok(()),
        };
        if let Err(err) = result {
            self.callback_failed(element, Callback::Leave, &err, now);
        }
        if self.dwell.cancel(element).is_some() {
            self.trace.record(
                now,
                element,
                InteractionKind::DwellCancelled {
                    reason: CancelReason::Left,
                },
            );
        }
    }

    fn activate(&mut self, element: ElementId, via: Activation, now: Instant) {
        tracing::info!(%element, ?via, "target activated");
        self.trace
            .record(now, element, InteractionKind::Activated { via });
        let result = match self.registry.get_mut(element) {
            Some(target) => guarded(|| target.on_activate()),
            None => Ok(()),
        };
        if let Err(err) = result {
            self.callback_failed(element, Callback::Activate, &err, now);
        }
        self.dwell.finish(element, now);
    }

    fn blink_click(&mut self, now: Instant) {
        let Some(element) = self.hover.active() else {
            return;
        };
        let reject = if self.dwell.is_locked(now) {
            Some(RejectReason::CoolingDown)
        } else if !self.registry.get(element).is_some_and(|t| t.is_enabled()) {
            Some(RejectReason::Disabled)
        } else {
            None
        };
        if let Some(reason) = reject {
            tracing::debug!(%element, ?reason, "prolonged blink ignored");
            self.trace
                .record(now, element, InteractionKind::DwellRejected { reason });
            return;
        }
        if let Some(session) = self.dwell.cancel_any() {
            self.trace.record(
                now,
                session.target,
                InteractionKind::DwellCancelled {
                    reason: CancelReason::Consumed,
                },
            );
        }
        self.activate(element, Activation::ProlongedBlink, now);
    }

    fn callback_failed(&mut self, element: ElementId, callback: Callback, err: &TargetError, now: Instant) {
        tracing::warn!(%element, ?callback, error = %err, "target callback failed");
        self.trace.record(
            now,
            element,
            InteractionKind::CallbackFailed {
                callback,
                message: err.to_string(),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Control surface used by the autopilot and the interaction root
    // -----------------------------------------------------------------------

    /// Cancel whatever dwell is running.
    pub fn cancel_dwell(&mut self, reason: CancelReason, now: Instant) -> Option<ElementId> {
        let session = self.dwell.cancel_any()?;
        tracing::debug!(element = %session.target, ?reason, "dwell cancelled");
        self.trace.record(
            now,
            session.target,
            InteractionKind::DwellCancelled { reason },
        );
        Some(session.target)
    }

    /// Leave the active target now and suppress its re-entry until the
    /// pointer resolves elsewhere.
    pub fn release_hover(&mut self, now: Instant) {
        let mut out = std::mem::take(&mut self.scratch);
        self.hover.release(&mut out);
        self.apply(&mut out, now);
        self.scratch = out;
    }

    /// Lift a re-entry suppression left by [`release_hover`](Self::release_hover).
    pub fn allow_reentry(&mut self, element: ElementId) {
        self.hover.allow_reentry(element);
    }

    /// Drop the magnet target and put the rendered cursor back on the
    /// authoritative position.
    pub fn release_magnet(&mut self) {
        self.magnet.release(self.smoother.position().point());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use gaze_core::filter::FilterKind;
    use gaze_core::geometry::Rect;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Probe {
        enters: Rc<Cell<u32>>,
        leaves: Rc<Cell<u32>>,
        activations: Rc<Cell<u32>>,
        disabled: Rc<Cell<bool>>,
    }

    impl GazeTarget for Probe {
        fn is_enabled(&self) -> bool {
            !self.disabled.get()
        }

        fn on_enter(&mut self) -> Result<(), TargetError> {
            self.enters.set(self.enters.get() + 1);
            Ok(())
        }

        fn on_leave(&mut self) -> Result<(), TargetError> {
            self.leaves.set(self.leaves.get() + 1);
            Ok(())
        }

        fn on_activate(&mut self) -> Result<(), TargetError> {
            self.activations.set(self.activations.get() + 1);
            Ok(())
        }
    }

    struct Panicky;

    impl GazeTarget for Panicky {
        fn on_activate(&mut self) -> Result<(), TargetError> {
            panic!("boom");
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Button centred on the default viewport centre (400, 240).
    fn setup() -> (GazeEngine<Scene>, ElementId, Instant) {
        let mut scene = Scene::new();
        let page = scene.add("page", Rect::from_size(800.0, 480.0));
        let button = scene
            .add_control(page, "button", Rect::new(300.0, 190.0, 200.0, 100.0))
            .unwrap();
        let t0 = Instant::now();
        (GazeEngine::new(EngineConfig::default(), scene, t0), button, t0)
    }

    fn hold(engine: &mut GazeEngine<Scene>, p: Point, t0: Instant, from: u64, to: u64) {
        let mut t = from;
        while t <= to {
            let now = t0 + ms(t);
            engine.ingest(&GazeSample::at(p.x, p.y, now), now);
            engine.tick(now);
            t += 50;
        }
    }

    #[test]
    fn dwell_completes_once() {
        let (mut engine, button, t0) = setup();
        let probe = Probe::default();
        engine.attach(button, probe.clone());
        hold(&mut engine, Point::new(400.0, 240.0), t0, 0, 1500);
        assert_eq!(probe.enters.get(), 1);
        assert_eq!(probe.activations.get(), 1);
        assert!(engine.is_locked(t0 + ms(1500)));
        assert_eq!(engine.trace().activations(button), 1);
    }

    #[test]
    fn panicking_callback_still_engages_cooldown() {
        let (mut engine, button, t0) = setup();
        engine.attach(button, Panicky);
        hold(&mut engine, Point::new(400.0, 240.0), t0, 0, 1500);
        assert!(engine.is_locked(t0 + ms(1500)));
        assert!(engine.trace().events().iter().any(|e| matches!(
            &e.kind,
            InteractionKind::CallbackFailed { callback: Callback::Activate, message } if message == "boom"
        )));
    }

    #[test]
    fn disabled_mid_dwell_cancels() {
        let (mut engine, button, t0) = setup();
        let probe = Probe::default();
        engine.attach(button, probe.clone());
        hold(&mut engine, Point::new(400.0, 240.0), t0, 0, 500);
        probe.disabled.set(true);
        hold(&mut engine, Point::new(400.0, 240.0), t0, 550, 2000);
        assert_eq!(probe.activations.get(), 0);
        assert!(engine.trace().events().iter().any(|e| e.kind
            == InteractionKind::DwellCancelled {
                reason: CancelReason::Disabled
            }));
    }

    #[test]
    fn live_samples_ignored_while_scripted() {
        let (mut engine, _, t0) = setup();
        engine.set_input_source(InputSource::Scripted);
        let before = engine.position();
        engine.ingest(&GazeSample::at(10.0, 10.0, t0), t0);
        assert_eq!(engine.position(), before);
        engine.inject(&GazeSample::at(10.0, 10.0, t0), t0);
        assert_ne!(engine.position().point(), before.point());
    }

    #[test]
    fn synthetic_samples_ignored_while_live() {
        let (mut engine, _, t0) = setup();
        let before = engine.position();
        engine.inject(&GazeSample::at(10.0, 10.0, t0), t0);
        assert_eq!(engine.position(), before);
    }

    #[test]
    fn detach_cancels_dwell() {
        let (mut engine, button, t0) = setup();
        let probe = Probe::default();
        let reg = engine.attach(button, probe.clone());
        hold(&mut engine, Point::new(400.0, 240.0), t0, 0, 500);
        assert_eq!(engine.dwelling_target(), Some(button));
        assert!(engine.detach(reg, t0 + ms(500)));
        assert_eq!(engine.dwelling_target(), None);
        assert_eq!(engine.active_target(), None);
        assert!(!engine.detach(reg, t0 + ms(500)));
    }

    #[test]
    fn prolonged_blink_activates_hovered_target() {
        let (mut engine, button, t0) = setup();
        let probe = Probe::default();
        engine.attach(button, probe.clone());
        engine.ingest(&GazeSample::at(400.0, 240.0, t0), t0);
        assert_eq!(engine.active_target(), Some(button));
        let mut t = 50;
        while t <= 1100 {
            let now = t0 + ms(t);
            engine.ingest(&GazeSample::at(400.0, 240.0, now).with_blink(true), now);
            t += 50;
        }
        assert_eq!(probe.activations.get(), 1);
        assert_eq!(engine.dwelling_target(), None);
        assert!(engine.trace().events().iter().any(|e| e.kind
            == InteractionKind::Activated {
                via: Activation::ProlongedBlink
            }));
    }

    #[test]
    fn prolonged_blink_click_can_be_disabled() {
        let mut config = EngineConfig::default();
        config.blink.click_on_prolonged = false;
        let (engine, button, t0) = setup();
        let mut engine = GazeEngine::new(config, engine.tree().clone(), t0);
        let probe = Probe::default();
        engine.attach(button, probe.clone());
        engine.ingest(&GazeSample::at(400.0, 240.0, t0), t0);
        let now = t0 + ms(50);
        engine.ingest(
            &GazeSample::at(400.0, 240.0, now)
                .with_blink(true)
                .with_prolonged_blink(true),
            now,
        );
        assert_eq!(probe.activations.get(), 0);
    }

    #[test]
    fn magnet_never_moves_authoritative_position() {
        let (mut engine, button, t0) = setup();
        engine.attach(button, Probe::default());
        hold(&mut engine, Point::new(320.0, 200.0), t0, 0, 1000);
        let stable = engine.position();
        assert!(stable.magnetized);
        assert_eq!(engine.magnet_target(), Some(button));
        assert!(stable.point().distance(Point::new(320.0, 200.0)) < 1.0);
        assert!(engine.rendered().distance(Point::new(400.0, 240.0)) < 2.0);
        engine.release_magnet();
        assert_eq!(engine.rendered(), engine.position().point());
    }

    #[test]
    fn source_switch_resets_filter() {
        let mut config = EngineConfig::default();
        config.smoothing.filter = FilterKind::kalman();
        let (engine, _, t0) = setup();
        let mut engine = GazeEngine::new(config, engine.tree().clone(), t0);
        engine.ingest(&GazeSample::at(100.0, 100.0, t0), t0);
        engine.set_input_source(InputSource::Scripted);
        assert_eq!(engine.input_source(), InputSource::Scripted);
        engine.set_input_source(InputSource::Live);
        assert_eq!(engine.input_source(), InputSource::Live);
    }

    #[test]
    fn next_deadline_tracks_dwell_poll() {
        let (mut engine, button, t0) = setup();
        engine.attach(button, Probe::default());
        engine.ingest(&GazeSample::at(400.0, 240.0, t0), t0);
        assert_eq!(engine.next_deadline(), Some(t0 + ms(50)));
    }
}
