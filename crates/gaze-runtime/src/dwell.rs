#![forbid(unsafe_code)]

//! Dwell activation state machine.
//!
//! Converts sustained presence on a target into exactly one activation.
//!
//! ```text
//!            begin (enabled, unlocked, idle)
//!   IDLE ─────────────────────────────────────▶ DWELLING
//!    ▲                                            │    │
//!    │        cancel (leave / disabled / teardown)│    │ poll: elapsed ≥ duration
//!    └────────────────────────────────────────────┘    ▼
//!    └──────────────── finish (cooldown starts) ── COMPLETED
//! ```
//!
//! # Invariants
//!
//! 1. At most one session exists across all targets.
//! 2. A session completes at most once. Completion removes the session, so a
//!    later cancel for the same target is a no-op.
//! 3. No session may begin while the pointer-lock cooldown is running.
//! 4. The cooldown starts when [`DwellMachine::finish`] is called, after the
//!    activation callback has returned.
//! 5. Progress reported for a session never decreases.
//! 6. A held session ([`DwellMachine::hold`]) never completes; it resumes
//!    from the elapsed time on the next ordinary poll.

use web_time::{Duration, Instant};

use crate::scene::ElementId;

/// Why a dwell could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RejectReason {
    /// Another target holds the only session.
    Busy,
    /// The target reported itself disabled.
    Disabled,
    /// The pointer-lock cooldown is running.
    CoolingDown,
}

/// Why a dwell ended without activating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CancelReason {
    /// The pointer left the target.
    Left,
    /// The target became disabled mid-dwell.
    Disabled,
    /// The target was detached.
    Detached,
    /// A prolonged blink activated the target first.
    Consumed,
    /// The autopilot was cancelled.
    Autopilot,
    /// The interaction root was unmounted.
    Teardown,
}

/// Result of [`DwellMachine::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// A session is now running for the target.
    Started,
    /// The target already has the running session.
    AlreadyDwelling,
    Rejected(RejectReason),
}

/// One running dwell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellSession {
    pub target: ElementId,
    pub started: Instant,
    pub duration: Duration,
    /// Last polled progress in percent, `0.0..=100.0`.
    pub progress: f32,
}

impl DwellSession {
    fn progress_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 100.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32() * 100.0).min(100.0)
    }
}

/// Result of [`DwellMachine::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DwellPoll {
    /// No session is running.
    Idle,
    /// The session advanced to this percentage.
    Progress(f32),
    /// The session reached 100%. The caller must invoke the activation and
    /// then call [`DwellMachine::finish`].
    Completed(ElementId),
}

/// The global dwell state machine.
#[derive(Debug, Clone)]
pub struct DwellMachine {
    poll_interval: Duration,
    cooldown: Duration,
    session: Option<DwellSession>,
    last_poll: Option<Instant>,
    locked_until: Option<Instant>,
    last_completed: Option<(ElementId, Instant)>,
}

impl DwellMachine {
    #[must_use]
    pub fn new(poll_interval: Duration, cooldown: Duration) -> Self {
        Self {
            poll_interval,
            cooldown,
            session: None,
            last_poll: None,
            locked_until: None,
            last_completed: None,
        }
    }

    /// The running session, if any.
    #[inline]
    pub fn session(&self) -> Option<&DwellSession> {
        self.session.as_ref()
    }

    /// Target of the running session.
    #[inline]
    pub fn dwelling(&self) -> Option<ElementId> {
        self.session.map(|s| s.target)
    }

    /// Last completed target and when it completed.
    #[inline]
    pub fn last_completed(&self) -> Option<(ElementId, Instant)> {
        self.last_completed
    }

    /// The pointer-lock cooldown is running at `now`.
    pub fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// When the cooldown ends, if it is running at `now`.
    pub fn locked_until(&self, now: Instant) -> Option<Instant> {
        self.locked_until.filter(|until| now < *until)
    }

    /// Try to start a dwell on `target`.
    pub fn begin(
        &mut self,
        target: ElementId,
        enabled: bool,
        duration: Duration,
        now: Instant,
    ) -> BeginOutcome {
        if let Some(session) = self.session {
            return if session.target == target {
                BeginOutcome::AlreadyDwelling
            } else {
                BeginOutcome::Rejected(RejectReason::Busy)
            };
        }
        if !enabled {
            return BeginOutcome::Rejected(RejectReason::Disabled);
        }
        if self.is_locked(now) {
            return BeginOutcome::Rejected(RejectReason::CoolingDown);
        }
        self.session = Some(DwellSession {
            target,
            started: now,
            duration,
            progress: 0.0,
        });
        self.last_poll = Some(now);
        tracing::debug!(%target, duration_ms = duration.as_millis() as u64, "dwell started");
        BeginOutcome::Started
    }

    /// Cancel the session if it belongs to `target`.
    pub fn cancel(&mut self, target: ElementId) -> Option<DwellSession> {
        match self.session {
            Some(s) if s.target == target => self.take(),
            _ => None,
        }
    }

    /// Cancel whatever session is running.
    pub fn cancel_any(&mut self) -> Option<DwellSession> {
        self.take()
    }

    fn take(&mut self) -> Option<DwellSession> {
        self.last_poll = None;
        self.session.take()
    }

    /// Advance the running session to `now`.
    pub fn poll(&mut self, now: Instant) -> DwellPoll {
        let Some(session) = self.session.as_mut() else {
            return DwellPoll::Idle;
        };
        let complete = now.saturating_duration_since(session.started) >= session.duration;
        let progress = if complete {
            100.0
        } else {
            session.progress_at(now).max(session.progress)
        };
        session.progress = progress;
        self.last_poll = Some(now);
        if complete {
            let target = session.target;
            self.session = None;
            self.last_poll = None;
            DwellPoll::Completed(target)
        } else {
            DwellPoll::Progress(progress)
        }
    }

    /// Poll without completing: progress stays where it was while the
    /// pointer is on its way out of the target.
    pub fn hold(&mut self, now: Instant) -> DwellPoll {
        let Some(session) = self.session.as_ref() else {
            return DwellPoll::Idle;
        };
        self.last_poll = Some(now);
        DwellPoll::Progress(session.progress)
    }

    /// Record a completed activation of `target` and start the cooldown.
    pub fn finish(&mut self, target: ElementId, now: Instant) {
        self.last_completed = Some((target, now));
        self.locked_until = Some(now + self.cooldown);
        tracing::debug!(%target, cooldown_ms = self.cooldown.as_millis() as u64, "pointer lock engaged");
    }

    /// When the next progress poll is due.
    pub fn next_poll(&self) -> Option<Instant> {
        self.last_poll
            .filter(|_| self.session.is_some())
            .map(|t| t + self.poll_interval)
    }

    /// `(dwelling, progress)` for `target`.
    pub fn status(&self, target: ElementId) -> (bool, f32) {
        match self.session {
            Some(s) if s.target == target => (true, s.progress),
            _ => (false, 0.0),
        }
    }

    /// Drop the session and the cooldown.
    pub fn reset(&mut self) {
        self.session = None;
        self.last_poll = None;
        self.locked_until = None;
    }
}

impl Default for DwellMachine {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(1500))
    }
}
