#![forbid(unsafe_code)]

//! Run summaries and JSONL output.

use std::io::{self, Write};

use serde::Serialize;

use gaze_runtime::autopilot::AutopilotState;
use gaze_runtime::trace::{InteractionEvent, InteractionKind};

use crate::fixture::HomeState;

/// Write one JSON object per line.
pub fn write_jsonl<'a, T, W>(mut out: W, items: impl IntoIterator<Item = &'a T>) -> io::Result<()>
where
    T: Serialize + 'a,
    W: Write,
{
    for item in items {
        serde_json::to_writer(&mut out, item).map_err(io::Error::other)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Counts over an interaction trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceCounts {
    pub events: usize,
    pub enters: usize,
    pub dwells_started: usize,
    pub dwells_cancelled: usize,
    pub dwells_rejected: usize,
    pub activations: usize,
    pub callback_failures: usize,
}

impl TraceCounts {
    #[must_use]
    pub fn tally(events: &[InteractionEvent]) -> Self {
        let mut counts = Self {
            events: events.len(),
            ..Self::default()
        };
        for event in events {
            match event.kind {
                InteractionKind::Enter => counts.enters += 1,
                InteractionKind::Leave => {}
                InteractionKind::DwellStarted { .. } => counts.dwells_started += 1,
                InteractionKind::DwellRejected { .. } => counts.dwells_rejected += 1,
                InteractionKind::DwellCancelled { .. } => counts.dwells_cancelled += 1,
                InteractionKind::Activated { .. } => counts.activations += 1,
                InteractionKind::CallbackFailed { .. } => counts.callback_failures += 1,
            }
        }
        counts
    }
}

/// Final line printed by every harness command.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: &'static str,
    pub scenario: &'static str,
    pub elapsed_ms: u64,
    pub counts: TraceCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autopilot: Option<AutopilotState>,
    pub home: HomeState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_runtime::scene::ElementId;

    fn event(at_ms: u64, kind: InteractionKind) -> InteractionEvent {
        InteractionEvent {
            at_ms,
            element: ElementId::new(3),
            kind,
        }
    }

    #[test]
    fn jsonl_is_one_object_per_line() {
        let events = [
            event(0, InteractionKind::Enter),
            event(10, InteractionKind::DwellStarted { duration_ms: 1500 }),
        ];
        let mut out = Vec::new();
        write_jsonl(&mut out, &events).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"at_ms":0,"element":3,"kind":"enter"}"#);
        assert_eq!(
            lines[1],
            r#"{"at_ms":10,"element":3,"kind":"dwell_started","duration_ms":1500}"#
        );
    }

    #[test]
    fn tally_counts_by_kind() {
        let events = [
            event(0, InteractionKind::Enter),
            event(0, InteractionKind::DwellStarted { duration_ms: 1500 }),
            event(1500, InteractionKind::Activated {
                via: gaze_runtime::trace::Activation::Dwell,
            }),
            event(1600, InteractionKind::Leave),
        ];
        let counts = TraceCounts::tally(&events);
        assert_eq!(counts.events, 4);
        assert_eq!(counts.enters, 1);
        assert_eq!(counts.dwells_started, 1);
        assert_eq!(counts.activations, 1);
        assert_eq!(counts.dwells_cancelled, 0);
    }
}
