#![forbid(unsafe_code)]

//! Magnet assist: pulls the *rendered* cursor toward the control under it.
//!
//! Every `interval` the assist looks at the element under the stable
//! position. If it (or an ancestor) is an actionable control, the cursor
//! spring retargets to that control's centre with stiff snap parameters;
//! otherwise it follows the stable position with gentle tracking parameters.
//!
//! # Invariants
//!
//! 1. The output is cosmetic. Nothing here feeds back into hit resolution or
//!    dwell timing; the engine only ever resolves the smoother's position.
//! 2. [`MagnetAssist::release`] drops the target and snaps the rendered
//!    cursor back onto the stable position.

use web_time::{Duration, Instant};

use gaze_core::animation::{SpringParams, SpringPoint};
use gaze_core::geometry::Point;

use crate::config::MagnetConfig;
use crate::scene::{ElementId, ElementTree, ancestors};

/// Rendering-only cursor driven by springs.
#[derive(Debug, Clone)]
pub struct MagnetAssist {
    enabled: bool,
    interval: Duration,
    tracking: SpringParams,
    snap: SpringParams,
    cursor: SpringPoint,
    target: Option<ElementId>,
    next_eval: Option<Instant>,
    last_advance: Option<Instant>,
}

impl MagnetAssist {
    /// Create an assist whose cursor rests at `start`.
    #[must_use]
    pub fn new(config: &MagnetConfig, start: Point) -> Self {
        let tracking = config.tracking();
        Self {
            enabled: config.enabled,
            interval: config.interval(),
            tracking,
            snap: config.snap(),
            cursor: SpringPoint::new(start, tracking),
            target: None,
            next_eval: None,
            last_advance: None,
        }
    }

    /// The control the cursor is snapped to.
    #[inline]
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// A magnet target is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Where the cursor should be drawn.
    #[inline]
    pub fn rendered(&self) -> Point {
        self.cursor.position()
    }

    /// When the next re-evaluation is due.
    #[inline]
    pub fn next_eval(&self) -> Option<Instant> {
        self.next_eval
    }

    /// Re-evaluate (if due) and advance the cursor to `now`.
    pub fn update<T: ElementTree + ?Sized>(&mut self, tree: &T, stable: Point, now: Instant) {
        if self.next_eval.is_none_or(|due| now >= due) {
            self.evaluate(tree, stable);
            self.next_eval = Some(now + self.interval);
        }
        if self.target.is_none() {
            self.cursor.set_target(stable);
        }
        let dt = self
            .last_advance
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.cursor.advance(dt);
        self.last_advance = Some(now);
    }

    fn evaluate<T: ElementTree + ?Sized>(&mut self, tree: &T, stable: Point) {
        let control = if self.enabled {
            tree.element_at(stable).and_then(|hit| {
                ancestors(tree, hit)
                    .into_iter()
                    .find(|id| tree.is_actionable(*id))
            })
        } else {
            None
        };
        let center = control.and_then(|id| tree.bounds(id).map(|b| (id, b.center())));

        match center {
            Some((id, c)) => {
                if self.target != Some(id) {
                    tracing::trace!(element = %id, "magnet engaged");
                    self.cursor.set_params(self.snap);
                }
                self.target = Some(id);
                self.cursor.set_target(c);
            }
            None => {
                if self.target.take().is_some() {
                    tracing::trace!("magnet disengaged");
                    self.cursor.set_params(self.tracking);
                }
            }
        }
    }

    /// Drop the magnet target and put the rendered cursor on `stable`.
    pub fn release(&mut self, stable: Point) {
        self.target = None;
        self.next_eval = None;
        self.cursor.set_params(self.tracking);
        self.cursor.snap_to(stable);
    }
}
