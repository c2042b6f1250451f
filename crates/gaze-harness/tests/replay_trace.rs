#![forbid(unsafe_code)]

//! Replaying recorded sample traces, from file to interaction trace.
//!
//! Run:
//!   cargo test -p gaze-harness --test replay_trace

use std::io::Write;

use gaze_harness::cli::{Cli, Commands, ReplayArgs, run};
use gaze_harness::fixture::{NEXT, POWER};
use gaze_harness::replay::{ReplayError, SampleRecord, SampleTrace};
use gaze_harness::scenario::run_replay;
use gaze_runtime::config::EngineConfig;
use gaze_runtime::trace::InteractionKind;

/// Look at `(x, y)` from `from_ms` to `to_ms` at ~30 Hz.
fn look(trace: &mut SampleTrace, x: f32, y: f32, from_ms: u64, to_ms: u64) {
    let mut t = from_ms;
    while t < to_ms {
        assert!(trace.push(SampleRecord::at(t, x, y)));
        t += 33;
    }
}

fn power_on_trace() -> SampleTrace {
    let mut trace = SampleTrace::new();
    let p = POWER.center();
    look(&mut trace, p.x, p.y, 0, 2500);
    look(&mut trace, 400.0, 20.0, 2500, 3500);
    trace
}

#[test]
fn saved_trace_replays_to_an_activation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("power.jsonl");
    power_on_trace().save(&path).unwrap();

    let loaded = SampleTrace::load(&path).unwrap();
    assert_eq!(loaded, power_on_trace());

    let outcome = run_replay(EngineConfig::default(), loaded.records());
    assert!(outcome.home.devices[0].on);
    let activations = outcome
        .trace
        .iter()
        .filter(|e| matches!(e.kind, InteractionKind::Activated { .. }))
        .count();
    assert_eq!(activations, 1);
}

#[test]
fn replay_is_deterministic() {
    let trace = power_on_trace();
    let a = run_replay(EngineConfig::default(), trace.records());
    let b = run_replay(EngineConfig::default(), trace.records());
    assert_eq!(a.trace, b.trace);
}

#[test]
fn disabled_control_never_activates() {
    // On the first page "previous" has nowhere to go.
    let mut trace = SampleTrace::new();
    look(&mut trace, 80.0, 430.0, 0, 4000);
    let outcome = run_replay(EngineConfig::default(), trace.records());
    assert_eq!(outcome.home.page, 0);
    assert!(
        !outcome
            .trace
            .iter()
            .any(|e| matches!(e.kind, InteractionKind::Activated { .. }))
    );
}

#[test]
fn blinks_freeze_the_pointer_short_of_the_control() {
    let mut trace = SampleTrace::new();
    let next = NEXT.center();
    let mut t = 0;
    while t < 4000 {
        let mut r = SampleRecord::at(t, next.x, next.y);
        r.blink = true;
        trace.push(r);
        t += 33;
    }
    let outcome = run_replay(EngineConfig::default(), trace.records());
    assert_eq!(outcome.home.page, 0);
}

#[test]
fn malformed_file_reports_the_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"t_ms":0,"x":1.0,"y":1.0}}"#).unwrap();
    writeln!(file, r#"{{"t_ms":33,"x":"left","y":1.0}}"#).unwrap();

    match SampleTrace::load(file.path()) {
        Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn cli_writes_trace_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    power_on_trace().save(&input).unwrap();

    run(Cli {
        json: false,
        command: Commands::Replay(ReplayArgs {
            file: input,
            config: None,
            out: Some(output.clone()),
        }),
    })
    .unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let summary = lines.last().unwrap();
    assert_eq!(summary["status"], "ok");
    assert_eq!(summary["scenario"], "replay");
    assert_eq!(summary["counts"]["activations"], 1);
    assert!(lines[..lines.len() - 1].iter().all(|l| l.get("at_ms").is_some()));
}
