#![forbid(unsafe_code)]

//! Autopilot logging, cancellation, and input-source hand-off.
//!
//! Run:
//!   cargo test -p gaze-runtime --test autopilot_observability

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use gaze_core::geometry::Rect;
use gaze_core::sample::GazeSample;
use gaze_runtime::autopilot::{Locator, Script};
use gaze_runtime::config::EngineConfig;
use gaze_runtime::dwell::CancelReason;
use gaze_runtime::engine::InputSource;
use gaze_runtime::registry::{GazeTarget, TargetError};
use gaze_runtime::root::InteractionRoot;
use gaze_runtime::scene::{ElementId, Scene};
use gaze_runtime::trace::InteractionKind;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use web_time::{Duration, Instant};

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
    span: Option<String>,
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn warnings(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == tracing::Level::WARN)
            .collect()
    }
}

struct FieldVisitor(HashMap<String, String>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(HashMap::new());
        event.record(&mut visitor);
        let span = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|s| s.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
            span,
        });
    }
}

fn with_captured_events(f: impl FnOnce()) -> EventCapture {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

// ============================================================================
// Fixture
// ============================================================================

struct Counter(Rc<Cell<u32>>);

impl GazeTarget for Counter {
    fn on_activate(&mut self) -> Result<(), TargetError> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

fn mount(config: EngineConfig) -> (InteractionRoot<Scene>, ElementId, Rc<Cell<u32>>, Instant) {
    let mut scene = Scene::new();
    let page = scene.add("page", Rect::from_size(800.0, 480.0));
    let button = scene
        .add_control(page, "button", Rect::new(540.0, 300.0, 200.0, 120.0))
        .unwrap();
    let t0 = Instant::now();
    let mut root = InteractionRoot::new(config, scene, t0);
    let hits = Rc::new(Cell::new(0));
    root.attach(button, Counter(Rc::clone(&hits)));
    (root, button, hits, t0)
}

fn run(root: &mut InteractionRoot<Scene>, from: Instant, ms: u64) -> Instant {
    let mut now = from;
    for _ in 0..ms / 10 {
        now += Duration::from_millis(10);
        root.tick(now);
    }
    now
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn wait_timeout_warns_inside_the_step_span_and_continues() {
    let mut config = EngineConfig::default();
    config.autopilot.wait_timeout_ms = 300;
    let (mut root, button, hits, t0) = mount(config);

    let capture = with_captured_events(|| {
        let script = Script::new()
            .wait_for("recommendation banner", |s: &Scene| s.find_visible("banner").is_some())
            .dwell_on(Locator::Element(button));
        root.start_autopilot(script, t0);
        run(&mut root, t0, 5000);
    });

    let warnings = capture.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(warnings[0].span.as_deref(), Some("autopilot.step"));
    assert_eq!(
        warnings[0].fields.get("waiting_for").map(String::as_str),
        Some("recommendation banner")
    );

    assert_eq!(hits.get(), 1, "the script carried on after the timeout");
    assert!(root.autopilot_state().completed);
    assert!(
        capture
            .events()
            .iter()
            .any(|e| e.level == tracing::Level::INFO
                && e.fields.get("message").is_some_and(|m| m == "autopilot completed"))
    );
}

#[test]
fn cancel_mid_dwell_restores_the_authoritative_cursor() {
    let (mut root, button, hits, t0) = mount(EngineConfig::default());
    root.start_autopilot(Script::new().dwell_on(Locator::Element(button)), t0);
    let now = run(&mut root, t0, 1100);

    assert_eq!(root.engine().dwelling_target(), Some(button));
    assert_eq!(root.engine().magnet_target(), Some(button));

    root.cancel_autopilot(now);

    let engine = root.engine();
    assert_eq!(engine.dwelling_target(), None);
    assert_eq!(engine.magnet_target(), None);
    assert_eq!(engine.rendered(), engine.position().point());
    assert_eq!(engine.input_source(), InputSource::Live);
    assert!(root.autopilot().timers().is_empty());
    assert!(engine.trace().events().iter().any(|e| e.element == button
        && e.kind
            == InteractionKind::DwellCancelled {
                reason: CancelReason::Autopilot
            }));

    run(&mut root, now, 3000);
    assert_eq!(hits.get(), 0);
}

#[test]
fn live_samples_are_ignored_while_scripted() {
    let (mut root, button, _, t0) = mount(EngineConfig::default());
    root.start_autopilot(
        Script::new()
            .pause(Duration::from_millis(500))
            .dwell_on(Locator::Element(button)),
        t0,
    );

    let before = root.engine().position();
    let now = t0 + Duration::from_millis(100);
    root.ingest(&GazeSample::at(10.0, 10.0, now), now);
    assert_eq!(root.engine().position(), before);

    let now = run(&mut root, t0, 5000);
    assert!(root.autopilot_state().completed);
    let moved = root.ingest(&GazeSample::at(10.0, 10.0, now), now);
    assert_ne!(moved.point(), before.point(), "live input resumes after completion");
}

#[test]
fn external_token_cancels_at_the_next_poll() {
    let (mut root, button, hits, t0) = mount(EngineConfig::default());
    root.start_autopilot(Script::new().dwell_on(Locator::Element(button)), t0);
    let token = root.autopilot().token();
    let now = run(&mut root, t0, 200);

    token.cancel();
    let now = run(&mut root, now, 10);
    assert!(root.autopilot_state().cancelled);
    assert!(root.autopilot().timers().is_empty());

    run(&mut root, now, 3000);
    assert_eq!(hits.get(), 0);
}

#[test]
fn cancel_while_waiting_on_live_input_keeps_the_user_dwell() {
    let (mut root, button, hits, t0) = mount(EngineConfig::default());
    root.start_autopilot(
        Script::new().await_recommendation(|s: &Scene| s.find_visible("accept")),
        t0,
    );
    assert!(root.autopilot_state().waiting_for_recommendation);
    assert_eq!(root.engine().input_source(), InputSource::Live);

    let mut now = t0;
    for ms in (0..600).step_by(10) {
        now = t0 + Duration::from_millis(ms);
        if ms % 30 == 0 {
            root.ingest(&GazeSample::at(640.0, 360.0, now), now);
        }
        root.tick(now);
    }
    assert_eq!(root.engine().dwelling_target(), Some(button));

    root.cancel_autopilot(now);
    let state = root.autopilot_state();
    assert!(state.cancelled && !state.running && !state.waiting_for_recommendation);
    assert!(root.autopilot().timers().is_empty());
    assert_eq!(root.engine().dwelling_target(), Some(button));

    for ms in (600..2200).step_by(10) {
        let now = t0 + Duration::from_millis(ms);
        if ms % 30 == 0 {
            root.ingest(&GazeSample::at(640.0, 360.0, now), now);
        }
        root.tick(now);
    }
    assert_eq!(hits.get(), 1);
}

#[test]
fn cancel_after_completion_is_ignored() {
    let (mut root, button, hits, t0) = mount(EngineConfig::default());
    root.start_autopilot(Script::new().dwell_on(Locator::Element(button)), t0);
    let now = run(&mut root, t0, 4000);
    assert!(root.autopilot_state().completed);
    assert_eq!(hits.get(), 1);

    let capture = with_captured_events(|| root.cancel_autopilot(now));
    let state = root.autopilot_state();
    assert!(state.completed && !state.cancelled);
    assert!(
        !capture
            .events()
            .iter()
            .any(|e| e.fields.get("message").is_some_and(|m| m == "autopilot cancelled"))
    );
}
