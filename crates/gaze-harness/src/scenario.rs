#![forbid(unsafe_code)]

//! The three harness scenarios, each on a virtual clock.
//!
//! - [`run_autopilot`]: the guided smart-home demo script.
//! - [`run_replay`]: a recorded sample trace fed into the smart-home panel.
//! - [`run_demo`]: the seeded synthetic source fed into the same panel.
//!
//! The autopilot run ticks the root every [`TICK_MS`]; sample-driven runs
//! tick at the dwell poll cadence. Samples are ingested at their own
//! timestamps. Nothing reads the wall clock after the epoch is taken, so a
//! scenario's interaction trace depends only on its inputs.

use tracing::info_span;

use gaze_runtime::autopilot::AutopilotState;
use gaze_runtime::config::EngineConfig;
use gaze_runtime::root::InteractionRoot;
use gaze_runtime::trace::InteractionEvent;

use crate::demo::DemoSource;
use crate::determinism::VirtualClock;
use crate::fixture::{HomeState, SharedScene, SmartHome};
use crate::replay::{self, SampleRecord};
use crate::report::{RunSummary, TraceCounts};

/// Root tick period for scripted runs.
pub const TICK_MS: u64 = 10;

/// Knobs for [`run_autopilot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutopilotOptions {
    /// Hard stop on the virtual timeline.
    pub max_ms: u64,
    /// Reveal the recommendation banner at this time. Without it the run
    /// stops as soon as the script starts waiting for one.
    pub recommend_at_ms: Option<u64>,
    /// Run the warm-up sweep before the script.
    pub warm_up: bool,
}

impl Default for AutopilotOptions {
    fn default() -> Self {
        Self {
            max_ms: 60_000,
            recommend_at_ms: None,
            warm_up: false,
        }
    }
}

/// What a scenario left behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub scenario: &'static str,
    pub trace: Vec<InteractionEvent>,
    pub autopilot: Option<AutopilotState>,
    pub home: HomeState,
    pub elapsed_ms: u64,
    /// The run stopped at its time limit rather than on its own.
    pub timed_out: bool,
}

impl RunOutcome {
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: if self.timed_out { "timeout" } else { "ok" },
            scenario: self.scenario,
            elapsed_ms: self.elapsed_ms,
            counts: TraceCounts::tally(&self.trace),
            autopilot: self.autopilot,
            home: self.home.clone(),
        }
    }
}

fn mount(config: EngineConfig, clock: &VirtualClock) -> (SmartHome, InteractionRoot<SharedScene>) {
    let home = SmartHome::demo();
    let mut root = InteractionRoot::new(config, home.tree(), clock.now());
    home.attach_all(&mut root);
    (home, root)
}

/// Run the guided demo script against the smart-home panel.
pub fn run_autopilot(config: EngineConfig, options: &AutopilotOptions) -> RunOutcome {
    let _span = info_span!("scenario", name = "autopilot").entered();
    let mut clock = VirtualClock::new();
    let (home, mut root) = mount(config, &clock);

    if options.warm_up {
        root.warm_up(clock.now());
    }
    root.start_autopilot(home.demo_script(), clock.now());

    let mut shown = false;
    let mut finished = false;
    while clock.elapsed_ms() < options.max_ms {
        let now = clock.advance(TICK_MS);
        let due = options
            .recommend_at_ms
            .is_some_and(|at| clock.elapsed_ms() >= at);
        if due && !shown {
            home.show_recommendation();
            shown = true;
        }
        root.tick(now);

        let state = root.autopilot_state();
        if state.completed || state.cancelled {
            finished = true;
            break;
        }
        if state.waiting_for_recommendation && options.recommend_at_ms.is_none() {
            tracing::info!(at_ms = clock.elapsed_ms(), "waiting for a recommendation");
            finished = true;
            break;
        }
    }
    if !finished {
        tracing::warn!(max_ms = options.max_ms, "autopilot run hit the time limit");
    }

    let autopilot = Some(root.autopilot_state());
    let mut outcome = finish(root, home, clock, "autopilot", autopilot);
    outcome.timed_out = !finished;
    outcome
}

/// Feed `records` into the smart-home panel.
pub fn run_replay(config: EngineConfig, records: &[SampleRecord]) -> RunOutcome {
    let _span = info_span!("scenario", name = "replay", records = records.len()).entered();
    let mut clock = VirtualClock::new();
    let tick_ms = config.dwell.poll_interval_ms;
    let tail_ms = config.dwell.standard_ms.max(config.dwell.coarse_ms);
    let (home, mut root) = mount(config, &clock);

    replay::replay(&mut root, records, &mut clock, tick_ms, tail_ms);

    finish(root, home, clock, "replay", None)
}

/// The first `seconds` of `source`.
pub fn demo_records(source: DemoSource, seconds: u64) -> Vec<SampleRecord> {
    let limit_ms = seconds.saturating_mul(1000);
    source.take_while(|r| r.t_ms < limit_ms).collect()
}

/// Feed `seconds` of the synthetic source into the smart-home panel.
pub fn run_demo(config: EngineConfig, source: DemoSource, seconds: u64) -> RunOutcome {
    let _span = info_span!("scenario", name = "demo", seconds).entered();
    let records = demo_records(source, seconds);

    let mut clock = VirtualClock::new();
    let tick_ms = config.dwell.poll_interval_ms;
    let (home, mut root) = mount(config, &clock);
    replay::replay(&mut root, &records, &mut clock, tick_ms, 0);

    finish(root, home, clock, "demo", None)
}

fn finish(
    mut root: InteractionRoot<SharedScene>,
    home: SmartHome,
    clock: VirtualClock,
    scenario: &'static str,
    autopilot: Option<AutopilotState>,
) -> RunOutcome {
    // Teardown events belong to the run.
    root.unmount(clock.now());
    let evicted = root.engine().trace().evicted();
    if evicted > 0 {
        tracing::warn!(evicted, "interaction trace overflowed; oldest events are missing");
    }
    let trace = root.engine_mut().take_trace();
    tracing::info!(
        scenario,
        events = trace.len(),
        elapsed_ms = clock.elapsed_ms(),
        "scenario finished"
    );
    RunOutcome {
        scenario,
        trace,
        autopilot,
        home: home.state(),
        elapsed_ms: clock.elapsed_ms(),
        timed_out: false,
    }
}
