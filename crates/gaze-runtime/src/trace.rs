#![forbid(unsafe_code)]

//! Interaction trace: an ordered log of every observable engine transition.
//!
//! The trace is the oracle for determinism checks. Two runs over the same
//! fixture and the same inputs must produce equal traces. Timestamps are
//! milliseconds since the engine epoch, so traces from different wall-clock
//! runs compare equal.
//!
//! The trace is bounded. Once it holds `capacity` events the oldest one is
//! evicted on every new record, and [`InteractionTrace::evicted`] counts how
//! many were lost. Owners that need the full history drain it regularly.

use std::collections::VecDeque;

use web_time::Instant;

use crate::dwell::{CancelReason, RejectReason};
use crate::scene::ElementId;

/// What triggered an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Activation {
    Dwell,
    ProlongedBlink,
}

/// Which target callback misbehaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Callback {
    Enter,
    Leave,
    Activate,
}

/// The transition recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum InteractionKind {
    Enter,
    Leave,
    DwellStarted { duration_ms: u64 },
    DwellRejected { reason: RejectReason },
    DwellCancelled { reason: CancelReason },
    Activated { via: Activation },
    CallbackFailed { callback: Callback, message: String },
}

/// One trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionEvent {
    /// Milliseconds since the engine epoch.
    pub at_ms: u64,
    pub element: ElementId,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: InteractionKind,
}

/// Capacity used by [`InteractionTrace::new`].
pub const DEFAULT_TRACE_CAPACITY: usize = 10_000;

/// Fixed-capacity ring of [`InteractionEvent`]s.
#[derive(Debug, Clone)]
pub struct InteractionTrace {
    epoch: Instant,
    events: VecDeque<InteractionEvent>,
    capacity: usize,
    evicted: u64,
}

impl InteractionTrace {
    #[must_use]
    pub fn new(epoch: Instant) -> Self {
        Self::with_capacity(epoch, DEFAULT_TRACE_CAPACITY)
    }

    /// A capacity of 0 is clamped to 1.
    #[must_use]
    pub fn with_capacity(epoch: Instant, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            epoch,
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    /// Instant that `at_ms == 0` refers to.
    #[inline]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Record `kind` for `element` at `now`.
    pub fn record(&mut self, now: Instant, element: ElementId, kind: InteractionKind) {
        let at_ms = now.saturating_duration_since(self.epoch).as_millis() as u64;
        if self.events.len() == self.capacity {
            self.events.pop_front();
            if self.evicted == 0 {
                tracing::debug!(capacity = self.capacity, "interaction trace full; evicting oldest events");
            }
            self.evicted += 1;
        }
        self.events.push_back(InteractionEvent {
            at_ms,
            element,
            kind,
        });
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> &VecDeque<InteractionEvent> {
        &self.events
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to stay within capacity since the trace was created.
    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of activations recorded for `element`.
    pub fn activations(&self, element: ElementId) -> usize {
        self.events
            .iter()
            .filter(|e| e.element == element && matches!(e.kind, InteractionKind::Activated { .. }))
            .count()
    }

    /// Events recorded at or after `since`.
    pub fn since(&self, since: Instant) -> std::collections::vec_deque::Iter<'_, InteractionEvent> {
        let at_ms = since.saturating_duration_since(self.epoch).as_millis() as u64;
        let start = self.events.partition_point(|e| e.at_ms < at_ms);
        self.events.range(start..)
    }

    /// Remove and return every retained event.
    pub fn drain(&mut self) -> Vec<InteractionEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use web_time::Duration;

    #[test]
    fn timestamps_are_relative_to_epoch() {
        let t0 = Instant::now();
        let mut trace = InteractionTrace::new(t0);
        trace.record(t0 + Duration::from_millis(250), ElementId::new(1), InteractionKind::Enter);
        assert_eq!(trace.events()[0].at_ms, 250);
    }

    #[test]
    fn counts_activations_per_element() {
        let t0 = Instant::now();
        let mut trace = InteractionTrace::new(t0);
        let a = ElementId::new(1);
        trace.record(t0, a, InteractionKind::Enter);
        trace.record(t0, a, InteractionKind::Activated { via: Activation::Dwell });
        trace.record(t0, ElementId::new(2), InteractionKind::Activated { via: Activation::Dwell });
        assert_eq!(trace.activations(a), 1);
    }

    #[test]
    fn since_slices_by_time() {
        let t0 = Instant::now();
        let mut trace = InteractionTrace::new(t0);
        for ms in [0, 100, 200, 300] {
            trace.record(t0 + Duration::from_millis(ms), ElementId::new(ms), InteractionKind::Enter);
        }
        assert_eq!(trace.since(t0 + Duration::from_millis(150)).len(), 2);
        assert_eq!(trace.drain().len(), 4);
        assert!(trace.is_empty());
    }

    #[test]
    fn full_trace_evicts_oldest() {
        let t0 = Instant::now();
        let mut trace = InteractionTrace::with_capacity(t0, 3);
        for ms in 0..5 {
            trace.record(t0 + Duration::from_millis(ms), ElementId::new(ms), InteractionKind::Enter);
        }
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.evicted(), 2);
        let kept: Vec<u64> = trace.events().iter().map(|e| e.at_ms).collect();
        assert_eq!(kept, [2, 3, 4]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let t0 = Instant::now();
        let mut trace = InteractionTrace::with_capacity(t0, 0);
        assert_eq!(trace.capacity(), 1);
        trace.record(t0, ElementId::new(1), InteractionKind::Enter);
        trace.record(t0, ElementId::new(2), InteractionKind::Leave);
        assert_eq!(trace.events()[0].kind, InteractionKind::Leave);
    }
}
