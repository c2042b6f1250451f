//! Property-based invariant tests for the engine and the target registry.
//!
//! Engine (checked against the interaction trace of random gaze scripts):
//! 1. At most one dwell session is open at any time
//! 2. A dwell activation happens no earlier than its duration after it began
//! 3. Activations are separated by at least the pointer-lock cooldown
//! 4. Nothing activates while its target is disabled
//!
//! Registry:
//! 5. At most one registration per element; stale handles never deregister

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use gaze_core::geometry::{Point, Rect};
use gaze_core::sample::GazeSample;
use gaze_runtime::config::EngineConfig;
use gaze_runtime::engine::GazeEngine;
use gaze_runtime::registry::{GazeTarget, Registration, TargetError, TargetRegistry};
use gaze_runtime::scene::{ElementId, Scene};
use gaze_runtime::trace::{Activation, InteractionEvent, InteractionKind};
use proptest::prelude::*;
use web_time::{Duration, Instant};

const DWELL_MS: u64 = 1500;
const COOLDOWN_MS: u64 = 1500;

// ── Engine ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    /// Look at control `i` (3 = empty space) for `ms`.
    Look(usize, u64),
    /// Keep the eyes closed for `ms`.
    Blink(u64),
    /// Flip control `i` between enabled and disabled.
    Toggle(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..4, 10u64..2500).prop_map(|(i, ms)| Op::Look(i, ms)),
        1 => (10u64..1500).prop_map(Op::Blink),
        1 => (0usize..3).prop_map(Op::Toggle),
    ]
}

struct Flag(Rc<Cell<bool>>);

impl GazeTarget for Flag {
    fn is_enabled(&self) -> bool {
        !self.0.get()
    }

    fn on_activate(&mut self) -> Result<(), TargetError> {
        Ok(())
    }
}

const CONTROLS: [Rect; 3] = [
    Rect::new(40.0, 60.0, 200.0, 120.0),
    Rect::new(300.0, 60.0, 200.0, 120.0),
    Rect::new(560.0, 60.0, 200.0, 120.0),
];
const EMPTY: Point = Point::new(400.0, 400.0);

/// Run `ops`, returning the trace and every `(element, at_ms, disabled)`
/// toggle.
fn run(ops: &[Op]) -> (Vec<InteractionEvent>, Vec<(ElementId, u64, bool)>) {
    let mut scene = Scene::new();
    let page = scene.add("page", Rect::from_size(800.0, 480.0));
    let ids: Vec<ElementId> = CONTROLS
        .iter()
        .enumerate()
        .map(|(i, r)| scene.add_control(page, format!("c{i}"), *r).unwrap())
        .collect();

    let t0 = Instant::now();
    let mut engine = GazeEngine::new(EngineConfig::default(), scene, t0);
    let flags: Vec<Rc<Cell<bool>>> = ids
        .iter()
        .map(|id| {
            let flag = Rc::new(Cell::new(false));
            engine.attach(*id, Flag(Rc::clone(&flag)));
            flag
        })
        .collect();

    let mut toggles = Vec::new();
    let mut ms = 0u64;
    let mut point = EMPTY;
    for op in ops {
        let (until, blink) = match *op {
            Op::Look(i, d) => {
                point = CONTROLS.get(i).map_or(EMPTY, |r| r.center());
                (ms + d, false)
            }
            Op::Blink(d) => (ms + d, true),
            Op::Toggle(i) => {
                let disabled = !flags[i].get();
                flags[i].set(disabled);
                toggles.push((ids[i], ms, disabled));
                continue;
            }
        };
        while ms < until {
            let now = t0 + Duration::from_millis(ms);
            if ms % 30 == 0 {
                engine.ingest(&GazeSample::at(point.x, point.y, now).with_blink(blink), now);
            }
            engine.tick(now);
            ms += 10;
        }
    }
    (engine.take_trace(), toggles)
}

fn disabled_at(toggles: &[(ElementId, u64, bool)], element: ElementId, at_ms: u64) -> bool {
    toggles
        .iter()
        .filter(|(e, t, _)| *e == element && *t <= at_ms)
        .last()
        .is_some_and(|(_, _, disabled)| *disabled)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn dwell_sessions_are_exclusive_and_timed(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let (trace, toggles) = run(&ops);
        let mut open: Option<(ElementId, u64)> = None;
        let mut last_activation: Option<u64> = None;

        for event in &trace {
            match event.kind {
                InteractionKind::DwellStarted { duration_ms } => {
                    prop_assert!(open.is_none(), "second session opened: {event:?}");
                    prop_assert_eq!(duration_ms, DWELL_MS);
                    open = Some((event.element, event.at_ms));
                }
                InteractionKind::DwellCancelled { .. } => {
                    prop_assert_eq!(open.map(|(e, _)| e), Some(event.element));
                    open = None;
                }
                InteractionKind::Activated { via } => {
                    if via == Activation::Dwell {
                        let (element, started) = open.take().unwrap_or((event.element, 0));
                        prop_assert_eq!(element, event.element);
                        prop_assert!(event.at_ms - started >= DWELL_MS);
                    } else {
                        prop_assert!(open.is_none(), "blink click left a session open");
                    }
                    if let Some(prev) = last_activation {
                        prop_assert!(
                            event.at_ms - prev >= COOLDOWN_MS,
                            "activations {prev} and {} inside the cooldown", event.at_ms
                        );
                    }
                    last_activation = Some(event.at_ms);
                    prop_assert!(!disabled_at(&toggles, event.element, event.at_ms));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn engine_is_deterministic(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let (a, _) = run(&ops);
        let (b, _) = run(&ops);
        prop_assert_eq!(a, b);
    }
}

// ── Registry ────────────────────────────────────────────────────────────

struct Noop;

impl GazeTarget for Noop {
    fn on_activate(&mut self) -> Result<(), TargetError> {
        Ok(())
    }
}

proptest! {
    #[test]
    fn one_registration_per_element(ops in prop::collection::vec((0u64..5, any::<bool>()), 1..60)) {
        let mut registry = TargetRegistry::new();
        let mut live: HashMap<ElementId, Registration> = HashMap::new();
        let mut stale: Vec<Registration> = Vec::new();

        for (raw, register) in ops {
            let element = ElementId::new(raw);
            if register {
                let handle = registry.register(element, Box::new(Noop));
                if let Some(old) = live.insert(element, handle) {
                    stale.push(old);
                }
            } else if let Some(handle) = live.remove(&element) {
                prop_assert!(registry.deregister(handle));
                stale.push(handle);
            }
            prop_assert_eq!(registry.len(), live.len());
        }

        for handle in stale {
            prop_assert!(!registry.deregister(handle));
            prop_assert_eq!(registry.len(), live.len());
        }
    }
}
