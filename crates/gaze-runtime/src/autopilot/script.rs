#![forbid(unsafe_code)]

//! Autopilot scripts: an ordered list of primitive steps.
//!
//! Scripts are built with chained `#[must_use]` methods:
//!
//! ```
//! use gaze_core::geometry::Point;
//! use gaze_runtime::autopilot::{Locator, Script};
//! use gaze_runtime::scene::Scene;
//! use web_time::Duration;
//!
//! let script: Script<Scene> = Script::new()
//!     .pause(Duration::from_millis(500))
//!     .move_to(Locator::Point(Point::new(100.0, 100.0)))
//!     .dwell_on(Locator::query(|scene: &Scene| scene.find_visible("power")))
//!     .wait_for("power is on", |scene: &Scene| scene.find_visible("on").is_some());
//! assert_eq!(script.len(), 4);
//! ```

use std::collections::VecDeque;
use std::fmt;

use web_time::Duration;

use gaze_core::animation::Easing;
use gaze_core::geometry::Point;

use crate::scene::{ElementId, ElementTree};

/// Finds an element in the tree.
pub type Query<T> = Box<dyn Fn(&T) -> Option<ElementId>>;

/// Checks a condition against the tree.
pub type Condition<T> = Box<dyn Fn(&T) -> bool>;

/// Where a step points.
pub enum Locator<T> {
    /// A known element; resolves to the centre of its bounds.
    Element(ElementId),
    /// A fixed viewport position.
    Point(Point),
    /// Looked up when the step runs.
    Query(Query<T>),
}

impl<T: ElementTree> Locator<T> {
    /// Locator from a lookup closure.
    pub fn query(f: impl Fn(&T) -> Option<ElementId> + 'static) -> Self {
        Self::Query(Box::new(f))
    }

    /// The element this locator names, if any.
    pub fn element(&self, tree: &T) -> Option<ElementId> {
        match self {
            Self::Element(id) => Some(*id),
            Self::Point(_) => None,
            Self::Query(f) => f(tree),
        }
    }

    /// Centre point to aim at, or `None` if the element is gone.
    pub fn resolve(&self, tree: &T) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => self
                .element(tree)
                .and_then(|id| tree.bounds(id))
                .map(|b| b.center()),
        }
    }
}

impl<T> fmt::Debug for Locator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(id) => f.debug_tuple("Element").field(id).finish(),
            Self::Point(p) => f.debug_tuple("Point").field(p).finish(),
            Self::Query(_) => f.write_str("Query(..)"),
        }
    }
}

/// One primitive of a script.
pub enum Step<T> {
    /// Do nothing for a while.
    Pause(Duration),
    /// Interpolate the synthetic pointer to `to`.
    MoveTo {
        to: Locator<T>,
        /// `None` uses the configured move duration.
        duration: Option<Duration>,
        easing: Easing,
    },
    /// Move to the element's centre and hold until it activates.
    DwellOn { on: Locator<T> },
    /// Poll until `condition` holds or the timeout passes.
    WaitFor {
        label: String,
        condition: Condition<T>,
        timeout: Option<Duration>,
    },
    /// Poll until `query` finds an element or the timeout passes.
    WaitForElement {
        query: Query<T>,
        timeout: Option<Duration>,
    },
    /// Hand the pointer back and wait for a recommendation prompt to show
    /// up. Once `query` finds the accept control, dwell on it.
    AwaitRecommendation { query: Query<T> },
}

impl<T> Step<T> {
    /// Short name used in logs and spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pause(_) => "pause",
            Self::MoveTo { .. } => "move_to",
            Self::DwellOn { .. } => "dwell_on",
            Self::WaitFor { .. } => "wait_for",
            Self::WaitForElement { .. } => "wait_for_element",
            Self::AwaitRecommendation { .. } => "await_recommendation",
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause(d) => f.debug_tuple("Pause").field(d).finish(),
            Self::MoveTo {
                to,
                duration,
                easing,
            } => f
                .debug_struct("MoveTo")
                .field("to", to)
                .field("duration", duration)
                .field("easing", easing)
                .finish(),
            Self::DwellOn { on } => f.debug_struct("DwellOn").field("on", on).finish(),
            Self::WaitFor { label, timeout, .. } => f
                .debug_struct("WaitFor")
                .field("label", label)
                .field("timeout", timeout)
                .finish_non_exhaustive(),
            Self::WaitForElement { timeout, .. } => f
                .debug_struct("WaitForElement")
                .field("timeout", timeout)
                .finish_non_exhaustive(),
            Self::AwaitRecommendation { .. } => f.write_str("AwaitRecommendation"),
        }
    }
}

/// An ordered list of [`Step`]s.
pub struct Script<T> {
    steps: VecDeque<Step<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }
}

impl<T> fmt::Debug for Script<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps.iter()).finish()
    }
}

impl<T: ElementTree> Script<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary step.
    #[must_use]
    pub fn step(mut self, step: Step<T>) -> Self {
        self.steps.push_back(step);
        self
    }

    #[must_use]
    pub fn pause(self, duration: Duration) -> Self {
        self.step(Step::Pause(duration))
    }

    /// Move with the configured duration and the default easing.
    #[must_use]
    pub fn move_to(self, to: Locator<T>) -> Self {
        self.step(Step::MoveTo {
            to,
            duration: None,
            easing: Easing::default(),
        })
    }

    #[must_use]
    pub fn move_with(self, to: Locator<T>, duration: Duration, easing: Easing) -> Self {
        self.step(Step::MoveTo {
            to,
            duration: Some(duration),
            easing,
        })
    }

    #[must_use]
    pub fn dwell_on(self, on: Locator<T>) -> Self {
        self.step(Step::DwellOn { on })
    }

    /// Wait with the configured timeout.
    #[must_use]
    pub fn wait_for(
        self,
        label: impl Into<String>,
        condition: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        self.step(Step::WaitFor {
            label: label.into(),
            condition: Box::new(condition),
            timeout: None,
        })
    }

    #[must_use]
    pub fn wait_for_element(
        self,
        query: impl Fn(&T) -> Option<ElementId> + 'static,
        timeout: Duration,
    ) -> Self {
        self.step(Step::WaitForElement {
            query: Box::new(query),
            timeout: Some(timeout),
        })
    }

    #[must_use]
    pub fn await_recommendation(self, query: impl Fn(&T) -> Option<ElementId> + 'static) -> Self {
        self.step(Step::AwaitRecommendation {
            query: Box::new(query),
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn into_steps(self) -> VecDeque<Step<T>> {
        self.steps
    }
}
