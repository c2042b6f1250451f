#![forbid(unsafe_code)]

//! Target registry: which elements react to gaze, and how.
//!
//! Each interactive control registers a [`GazeTarget`] for its element. The
//! registry answers "which registered target is under this point" by asking
//! the [`ElementTree`] for the topmost element and walking up its ancestors,
//! so a decorative icon inside a button routes to the button.
//!
//! # Invariants
//!
//! 1. At most one entry per element. Registering again replaces the entry
//!    and bumps its generation.
//! 2. [`TargetRegistry::deregister`] only removes the entry whose generation
//!    matches the [`Registration`] handle, so a stale handle can never
//!    remove a newer registration.
//! 3. [`TargetRegistry::resolve`] never mutates the registry.

use std::collections::BTreeMap;
use std::fmt;

use web_time::Duration;

use gaze_core::geometry::Point;

use crate::config::DwellConfig;
use crate::scene::{ElementId, ElementTree, ancestors};

/// How long a target must be dwelt on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DwellProfile {
    /// `dwell.standard_ms`.
    #[default]
    Standard,
    /// `dwell.coarse_ms`, for large or demo controls.
    Coarse,
    /// A per-target duration.
    Custom(Duration),
}

impl DwellProfile {
    /// Resolve against the configured class durations.
    #[must_use]
    pub fn duration(self, config: &DwellConfig) -> Duration {
        match self {
            Self::Standard => config.standard(),
            Self::Coarse => config.coarse(),
            Self::Custom(d) => d,
        }
    }
}

/// Failure reported by a target callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The callback returned an error.
    Failed(String),
    /// The callback panicked. Carries the panic message when it was a string.
    Panicked(String),
}

impl TargetError {
    /// Convenience constructor for [`TargetError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(m) => write!(f, "target callback failed: {m}"),
            Self::Panicked(m) => write!(f, "target callback panicked: {m}"),
        }
    }
}

impl std::error::Error for TargetError {}

/// The handlers an interactive control binds to its element.
///
/// Only [`on_activate`](Self::on_activate) is required. Callbacks run
/// synchronously on the engine's timeline; whatever they return, the engine
/// completes its own bookkeeping.
pub trait GazeTarget {
    /// Dwell duration class for this control.
    fn dwell_profile(&self) -> DwellProfile {
        DwellProfile::Standard
    }

    /// Whether a dwell may start (or continue) on this control right now.
    fn is_enabled(&self) -> bool {
        true
    }

    /// The pointer settled on this control.
    fn on_enter(&mut self) -> Result<(), TargetError> {
        Ok(())
    }

    /// The pointer left this control.
    fn on_leave(&mut self) -> Result<(), TargetError> {
        Ok(())
    }

    /// The dwell (or a prolonged blink) completed.
    fn on_activate(&mut self) -> Result<(), TargetError>;
}

/// Handle returned by [`TargetRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    element: ElementId,
    generation: u64,
}

impl Registration {
    /// The registered element.
    #[inline]
    pub fn element(&self) -> ElementId {
        self.element
    }

    /// Generation of this registration.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Entry {
    generation: u64,
    target: Box<dyn GazeTarget>,
}

/// Map from element to gaze target.
#[derive(Default)]
pub struct TargetRegistry {
    entries: BTreeMap<ElementId, Entry>,
    next_generation: u64,
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("elements", &self.entries.keys().collect::<Vec<_>>())
            .field("next_generation", &self.next_generation)
            .finish()
    }
}

impl TargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `target` to `element`, replacing any previous binding.
    pub fn register(&mut self, element: ElementId, target: Box<dyn GazeTarget>) -> Registration {
        self.next_generation += 1;
        let generation = self.next_generation;
        let replaced = self
            .entries
            .insert(element, Entry { generation, target })
            .is_some();
        tracing::debug!(%element, generation, replaced, "target registered");
        Registration {
            element,
            generation,
        }
    }

    /// Remove the binding `registration` refers to.
    ///
    /// Returns `false` (and leaves the registry unchanged) if the element has
    /// since been re-registered or was already removed.
    pub fn deregister(&mut self, registration: Registration) -> bool {
        match self.entries.get(&registration.element) {
            Some(entry) if entry.generation == registration.generation => {
                self.entries.remove(&registration.element);
                tracing::debug!(element = %registration.element, "target deregistered");
                true
            }
            _ => false,
        }
    }

    /// Remove every binding, returning the elements that were registered.
    pub fn clear(&mut self) -> Vec<ElementId> {
        let elements = self.entries.keys().copied().collect();
        self.entries.clear();
        elements
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.entries.contains_key(&element)
    }

    /// Current generation of `element`'s registration.
    pub fn generation(&self, element: ElementId) -> Option<u64> {
        self.entries.get(&element).map(|e| e.generation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered elements in id order.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, element: ElementId) -> Option<&dyn GazeTarget> {
        self.entries.get(&element).map(|e| e.target.as_ref())
    }

    pub fn get_mut(&mut self, element: ElementId) -> Option<&mut (dyn GazeTarget + 'static)> {
        self.entries.get_mut(&element).map(|e| e.target.as_mut())
    }

    /// Nearest registered element at or above the topmost element at `p`.
    pub fn resolve<T: ElementTree + ?Sized>(&self, tree: &T, p: Point) -> Option<ElementId> {
        let hit = tree.element_at(p)?;
        ancestors(tree, hit)
            .into_iter()
            .find(|id| self.entries.contains_key(id))
    }
}
