#![forbid(unsafe_code)]

//! Hover hysteresis: decides when the pointer has really entered or left a
//! target.
//!
//! Gaze jitters around control boundaries far more than a mouse does. The
//! tracker keeps the active target through short excursions and never lets
//! two targets be active at once.
//!
//! # Algorithm
//!
//! On every stable-position update, with `resolved` the registered target
//! under the pointer:
//!
//! 1. `resolved` equals the active target: keep it and drop any pending leave.
//! 2. Nothing resolves but the pointer is inside the active target's bounds
//!    inflated by the sticky margin: keep it and drop any pending leave.
//! 3. Otherwise schedule a leave at `now + exit_delay` (if none is pending)
//!    and remember `resolved` as the candidate to enter afterwards.
//! 4. With no active target, a resolved target is entered immediately.
//!
//! [`HoverTracker::poll`] fires the pending leave once its deadline passes,
//! then enters the queued candidate. A leave is always emitted before the
//! next enter.
//!
//! # Invariants
//!
//! 1. At most one target is active.
//! 2. Every `Enter(a)` is followed by exactly one `Leave(a)` before any other
//!    `Enter`.
//! 3. A suppressed element is never entered until resolution moves elsewhere.

use web_time::{Duration, Instant};

use gaze_core::geometry::{Point, Rect};

use crate::scene::ElementId;

/// A hover change the engine must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverTransition {
    Enter(ElementId),
    Leave(ElementId),
}

/// Hysteresis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverConfig {
    /// Pixels around the active target that still count as on it.
    pub sticky_margin: f32,
    /// How long the pointer must stay off a target before it is left.
    pub exit_delay: Duration,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            sticky_margin: 35.0,
            exit_delay: Duration::from_millis(320),
        }
    }
}

/// Tracks the active gaze target.
#[derive(Debug, Clone, Default)]
pub struct HoverTracker {
    config: HoverConfig,
    active: Option<ElementId>,
    leave_at: Option<Instant>,
    queued: Option<ElementId>,
    suppressed: Option<ElementId>,
}

impl HoverTracker {
    #[must_use]
    pub fn new(config: HoverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[inline]
    pub fn config(&self) -> HoverConfig {
        self.config
    }

    /// The currently active target.
    #[inline]
    pub fn active(&self) -> Option<ElementId> {
        self.active
    }

    /// Deadline of the pending leave, if one is scheduled.
    #[inline]
    pub fn pending_leave(&self) -> Option<Instant> {
        self.leave_at
    }

    /// Element whose re-entry is currently suppressed.
    #[inline]
    pub fn suppressed(&self) -> Option<ElementId> {
        self.suppressed
    }

    /// Apply one resolution result.
    ///
    /// `active_bounds` is the current bounding box of the active target (used
    /// for the sticky zone). Immediate transitions are appended to `out`.
    pub fn update(
        &mut self,
        resolved: Option<ElementId>,
        pointer: Point,
        active_bounds: Option<Rect>,
        now: Instant,
        out: &mut Vec<HoverTransition>,
    ) {
        let resolved = match (resolved, self.suppressed) {
            (Some(r), Some(s)) if r == s => None,
            _ => {
                self.suppressed = None;
                resolved
            }
        };

        let Some(active) = self.active else {
            if let Some(r) = resolved {
                self.enter(r, out);
            }
            return;
        };

        if resolved == Some(active) {
            self.clear_pending();
            return;
        }

        let in_sticky_zone = active_bounds
            .is_some_and(|b| b.inflate(self.config.sticky_margin).contains(pointer));
        if resolved.is_none() && in_sticky_zone {
            self.clear_pending();
            return;
        }

        if self.leave_at.is_none() {
            self.leave_at = Some(now + self.config.exit_delay);
            tracing::trace!(element = %active, "leave scheduled");
        }
        self.queued = resolved;
    }

    /// Fire the pending leave (and queued enter) if its deadline has passed.
    pub fn poll(&mut self, now: Instant, out: &mut Vec<HoverTransition>) {
        let Some(deadline) = self.leave_at else {
            return;
        };
        if now < deadline {
            return;
        }
        self.leave_at = None;
        if let Some(active) = self.active.take() {
            out.push(HoverTransition::Leave(active));
        }
        if let Some(next) = self.queued.take() {
            self.enter(next, out);
        }
    }

    /// Leave the active target immediately and suppress its re-entry until
    /// resolution moves elsewhere.
    pub fn release(&mut self, out: &mut Vec<HoverTransition>) {
        self.clear_pending();
        if let Some(active) = self.active.take() {
            self.suppressed = Some(active);
            out.push(HoverTransition::Leave(active));
        }
    }

    /// Lift the suppression on `element`, if any.
    pub fn allow_reentry(&mut self, element: ElementId) {
        if self.suppressed == Some(element) {
            self.suppressed = None;
        }
    }

    /// Drop every reference to `element` without emitting transitions.
    ///
    /// Returns `true` if it was the active target.
    pub fn forget(&mut self, element: ElementId) -> bool {
        if self.queued == Some(element) {
            self.queued = None;
        }
        if self.suppressed == Some(element) {
            self.suppressed = None;
        }
        if self.active == Some(element) {
            self.active = None;
            self.leave_at = None;
            return true;
        }
        false
    }

    /// Drop all hover state without emitting transitions.
    pub fn reset(&mut self) {
        self.active = None;
        self.suppressed = None;
        self.clear_pending();
    }

    fn enter(&mut self, element: ElementId, out: &mut Vec<HoverTransition>) {
        self.active = Some(element);
        self.clear_pending();
        out.push(HoverTransition::Enter(element));
    }

    fn clear_pending(&mut self) {
        self.leave_at = None;
        self.queued = None;
    }
}
