#![forbid(unsafe_code)]

//! Explicit timer bookkeeping for the autopilot.
//!
//! Every suspension the sequencer creates (a pause, a move's step interval, a
//! wait's poll interval and its timeout) is an entry in one [`TimerSet`].
//! Nothing ticks on its own: the owner asks which timers are due at `now` and
//! clears them when the step they belong to resolves.
//!
//! # Invariants
//!
//! 1. A cleared timer never fires.
//! 2. `clear_all` leaves the set empty, so no tick survives a cancellation.
//! 3. Timer ids are never reused within one set.

use std::collections::BTreeMap;

use web_time::{Duration, Instant};

/// Handle to one timer in a [`TimerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Timeout,
    Interval(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Instant,
    kind: Kind,
    purpose: &'static str,
}

/// The set of outstanding timeouts and intervals.
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    next_id: u64,
    timers: BTreeMap<TimerId, Timer>,
}

impl TimerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot timer due `delay` after `now`.
    pub fn set_timeout(&mut self, now: Instant, delay: Duration, purpose: &'static str) -> TimerId {
        self.insert(now + delay, Kind::Timeout, purpose)
    }

    /// Repeating timer, first due `period` after `now`.
    ///
    /// A zero period is treated as one millisecond so the interval cannot
    /// fire on every poll without time advancing.
    pub fn set_interval(&mut self, now: Instant, period: Duration, purpose: &'static str) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.insert(now + period, Kind::Interval(period), purpose)
    }

    fn insert(&mut self, due: Instant, kind: Kind, purpose: &'static str) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.insert(id, Timer { due, kind, purpose });
        tracing::trace!(timer = id.0, purpose, "timer set");
        id
    }

    /// Whether `id` is still outstanding.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Whether `id` is due at `now` (without firing it).
    pub fn is_due(&self, id: TimerId, now: Instant) -> bool {
        self.timers.get(&id).is_some_and(|t| now >= t.due)
    }

    /// Fire `id` if it is due at `now`.
    ///
    /// A timeout is removed once it fires. An interval is rescheduled one
    /// period after `now`; missed periods are not replayed.
    pub fn fire(&mut self, id: TimerId, now: Instant) -> bool {
        let Some(timer) = self.timers.get_mut(&id) else {
            return false;
        };
        if now < timer.due {
            return false;
        }
        match timer.kind {
            Kind::Timeout => {
                self.timers.remove(&id);
            }
            Kind::Interval(period) => timer.due = now + period,
        }
        true
    }

    /// Remove one timer. Returns `true` if it was outstanding.
    pub fn clear(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                tracing::trace!(timer = id.0, purpose = timer.purpose, "timer cleared");
                true
            }
            None => false,
        }
    }

    /// Remove every timer. Returns how many were outstanding.
    pub fn clear_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest due instant across all timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.due).min()
    }
}
