//! Property-based checks for the harness scenarios.
//!
//! 1. A demo run is a pure function of its seed
//! 2. Any replayed trace keeps activations at least one cooldown apart and
//!    the panel page in range
//! 3. Writing a sample trace and reading it back yields the same records
//!
//! Run:
//!   cargo test -p gaze-harness --test proptest_harness_invariants

use gaze_harness::demo::DemoSource;
use gaze_harness::replay::{SampleRecord, SampleTrace};
use gaze_harness::scenario::{run_demo, run_replay};
use gaze_runtime::config::EngineConfig;
use gaze_runtime::trace::InteractionKind;
use proptest::prelude::*;

/// Records with non-decreasing timestamps and whole-pixel coordinates.
fn records_strategy(max_len: usize) -> impl Strategy<Value = Vec<SampleRecord>> {
    prop::collection::vec(
        (0u64..120, 0u16..800, 0u16..480, prop::bool::weighted(0.05)),
        1..max_len,
    )
    .prop_map(|steps| {
        let mut t_ms = 0;
        steps
            .into_iter()
            .map(|(gap, x, y, blink)| {
                t_ms += gap;
                let mut record = SampleRecord::at(t_ms, f32::from(x), f32::from(y));
                record.blink = blink;
                record
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn demo_run_depends_only_on_the_seed(seed in any::<u64>()) {
        let a = run_demo(EngineConfig::default(), DemoSource::new(seed), 3);
        let b = run_demo(EngineConfig::default(), DemoSource::new(seed), 3);
        prop_assert_eq!(&a.trace, &b.trace);
        prop_assert_eq!(a.elapsed_ms, b.elapsed_ms);
    }

    #[test]
    fn replayed_activations_respect_the_cooldown(records in records_strategy(400)) {
        let config = EngineConfig::default();
        let cooldown_ms = config.dwell.cooldown_ms;
        let outcome = run_replay(config, &records);

        let activations: Vec<u64> = outcome
            .trace
            .iter()
            .filter(|e| matches!(e.kind, InteractionKind::Activated { .. }))
            .map(|e| e.at_ms)
            .collect();
        for pair in activations.windows(2) {
            prop_assert!(
                pair[1] - pair[0] >= cooldown_ms,
                "activations at {} and {} ms", pair[0], pair[1]
            );
        }
        prop_assert!(outcome.home.page < outcome.home.devices.len());
    }

    #[test]
    fn written_traces_read_back_unchanged(records in records_strategy(200)) {
        let trace = SampleTrace::from_records(records).unwrap();
        let mut buf = Vec::new();
        trace.write(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        prop_assert_eq!(SampleTrace::parse(&text).unwrap(), trace);
    }
}
