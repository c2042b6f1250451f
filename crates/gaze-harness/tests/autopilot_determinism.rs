#![forbid(unsafe_code)]

//! The guided smart-home script is a pure function of its configuration.
//!
//! Run:
//!   cargo test -p gaze-harness --test autopilot_determinism

use gaze_harness::demo::DemoSource;
use gaze_harness::scenario::{AutopilotOptions, run_autopilot, run_demo};
use gaze_runtime::config::EngineConfig;
use gaze_runtime::trace::{Activation, InteractionKind};

fn subsequence(log: &[String], expected: &[&str]) -> bool {
    let mut wanted = expected.iter().peekable();
    for entry in log {
        if wanted.peek().is_some_and(|w| *w == entry) {
            wanted.next();
        }
    }
    wanted.peek().is_none()
}

#[test]
fn identical_runs_produce_identical_traces() {
    let options = AutopilotOptions::default();
    let a = run_autopilot(EngineConfig::default(), &options);
    let b = run_autopilot(EngineConfig::default(), &options);

    assert!(!a.trace.is_empty());
    assert_eq!(a.trace, b.trace);
    assert_eq!(a.home, b.home);
    assert_eq!(a.elapsed_ms, b.elapsed_ms);
}

#[test]
fn script_pages_toggles_and_then_waits() {
    let outcome = run_autopilot(EngineConfig::default(), &AutopilotOptions::default());

    let state = outcome.autopilot.unwrap();
    assert!(state.started);
    assert!(state.waiting_for_recommendation);
    assert!(!state.completed);

    let home = &outcome.home;
    assert_eq!(home.page, 1);
    assert!(!home.devices[1].on, "switched on, then off again");
    assert!(
        subsequence(&home.log, &["page 1", "Thermostat on", "Thermostat off"]),
        "{:?}",
        home.log
    );

    let activations: Vec<u64> = outcome
        .trace
        .iter()
        .filter(|e| {
            e.kind
                == InteractionKind::Activated {
                    via: Activation::Dwell,
                }
        })
        .map(|e| e.at_ms)
        .collect();
    assert_eq!(activations.len(), 3);
    assert!(
        activations[2] - activations[1] >= 10_000,
        "the device stays on for the pause: {activations:?}"
    );
}

#[test]
fn recommendation_is_accepted_once_it_appears() {
    let options = AutopilotOptions {
        recommend_at_ms: Some(20_000),
        ..AutopilotOptions::default()
    };
    let outcome = run_autopilot(EngineConfig::default(), &options);

    let state = outcome.autopilot.unwrap();
    assert!(state.completed, "{state:?}");
    assert!(!state.waiting_for_recommendation);
    assert_eq!(outcome.home.recommendations_accepted, 1);
    assert!(!outcome.home.recommendation_shown);
    assert!(outcome.elapsed_ms > 20_000);
}

#[test]
fn warm_up_does_not_change_the_outcome() {
    let options = AutopilotOptions {
        warm_up: true,
        ..AutopilotOptions::default()
    };
    let outcome = run_autopilot(EngineConfig::default(), &options);
    assert!(outcome.autopilot.unwrap().waiting_for_recommendation);
    assert!(!outcome.home.devices[1].on);
    assert_eq!(outcome.home.page, 1);
}

#[test]
fn demo_source_runs_are_reproducible() {
    let a = run_demo(EngineConfig::default(), DemoSource::new(7), 5);
    let b = run_demo(EngineConfig::default(), DemoSource::new(7), 5);
    assert_eq!(a.trace, b.trace);
    assert_eq!(a.home, b.home);
}
