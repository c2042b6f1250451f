#![forbid(unsafe_code)]

//! Element-tree capability and an in-memory scene.
//!
//! The engine never talks to a widget toolkit directly. It asks an
//! [`ElementTree`] four questions: what is topmost at a point, who is an
//! element's parent, where is it, and is it an actionable control. A
//! platform adapter answers them from whatever native tree exists; [`Scene`]
//! answers them from a flat list of nodes and is what tests and the harness
//! use.
//!
//! # Invariants
//!
//! 1. [`Scene::element_at`] returns the most recently added visible node whose
//!    bounds contain the point and whose ancestors are all visible.
//! 2. Removing a node removes its whole subtree.
//! 3. Element ids are never reused within one scene.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use gaze_core::geometry::{Point, Rect};

/// Opaque identity of an element in an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ElementId(u64);

impl ElementId {
    /// Wrap a raw identifier.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of whatever element tree sits under the pointer.
pub trait ElementTree {
    /// Topmost element whose bounds contain `p`, if any.
    fn element_at(&self, p: Point) -> Option<ElementId>;

    /// Parent of `id`, or `None` for a root or an unknown element.
    fn parent(&self, id: ElementId) -> Option<ElementId>;

    /// On-screen bounding box of `id`, or `None` if it no longer exists or
    /// is not shown.
    fn bounds(&self, id: ElementId) -> Option<Rect>;

    /// Whether `id` is an interactive control (as opposed to decoration).
    fn is_actionable(&self, id: ElementId) -> bool;
}

/// Shared trees let activation callbacks mutate the scene (pagination,
/// showing a recommendation) while the engine keeps a handle to it.
impl<T: ElementTree> ElementTree for Rc<RefCell<T>> {
    fn element_at(&self, p: Point) -> Option<ElementId> {
        self.borrow().element_at(p)
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.borrow().parent(id)
    }

    fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.borrow().bounds(id)
    }

    fn is_actionable(&self, id: ElementId) -> bool {
        self.borrow().is_actionable(id)
    }
}

/// Deepest ancestor chain the engine is willing to walk.
pub const MAX_DEPTH: usize = 64;

/// `id` followed by its ancestors, nearest first, capped at [`MAX_DEPTH`].
pub fn ancestors<T: ElementTree + ?Sized>(tree: &T, id: ElementId) -> Vec<ElementId> {
    let mut chain = Vec::with_capacity(8);
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        if chain.len() >= MAX_DEPTH {
            break;
        }
        chain.push(current);
        cursor = tree.parent(current);
    }
    chain
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Node {
    id: ElementId,
    parent: Option<ElementId>,
    label: String,
    bounds: Rect,
    actionable: bool,
    visible: bool,
}

/// A flat, paint-ordered element tree.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    next_id: u64,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the scene for shared mutation.
    #[must_use]
    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Add a root-level decorative node painted above everything so far.
    pub fn add(&mut self, label: impl Into<String>, bounds: Rect) -> ElementId {
        self.push(None, label.into(), bounds)
    }

    /// Add a decorative child of `parent`. Returns `None` if `parent` is unknown.
    pub fn add_child(
        &mut self,
        parent: ElementId,
        label: impl Into<String>,
        bounds: Rect,
    ) -> Option<ElementId> {
        self.index(parent)?;
        Some(self.push(Some(parent), label.into(), bounds))
    }

    /// Add an actionable child of `parent`.
    pub fn add_control(
        &mut self,
        parent: ElementId,
        label: impl Into<String>,
        bounds: Rect,
    ) -> Option<ElementId> {
        let id = self.add_child(parent, label, bounds)?;
        self.set_actionable(id, true);
        Some(id)
    }

    fn push(&mut self, parent: Option<ElementId>, label: String, bounds: Rect) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.nodes.push(Node {
            id,
            parent,
            label,
            bounds,
            actionable: false,
            visible: true,
        });
        id
    }

    fn index(&self, id: ElementId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Mark `id` as an interactive control. Returns `false` if unknown.
    pub fn set_actionable(&mut self, id: ElementId, actionable: bool) -> bool {
        self.node_mut(id).map(|n| n.actionable = actionable).is_some()
    }

    /// Show or hide `id` and, implicitly, its subtree.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> bool {
        self.node_mut(id).map(|n| n.visible = visible).is_some()
    }

    /// Move or resize `id`.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) -> bool {
        self.node_mut(id).map(|n| n.bounds = bounds).is_some()
    }

    /// Remove `id` and its whole subtree. Returns how many nodes went away.
    pub fn remove(&mut self, id: ElementId) -> usize {
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                self.nodes
                    .iter()
                    .filter(|n| n.parent == Some(parent))
                    .map(|n| n.id),
            );
            i += 1;
        }
        let before = self.nodes.len();
        self.nodes.retain(|n| !doomed.contains(&n.id));
        before - self.nodes.len()
    }

    /// Label given at creation.
    pub fn label(&self, id: ElementId) -> Option<&str> {
        self.node(id).map(|n| n.label.as_str())
    }

    /// First node with the given label, visible or not.
    pub fn find(&self, label: &str) -> Option<ElementId> {
        self.nodes.iter().find(|n| n.label == label).map(|n| n.id)
    }

    /// First node with the given label that is currently shown.
    pub fn find_visible(&self, label: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .find(|n| n.label == label && self.is_shown(n.id))
            .map(|n| n.id)
    }

    /// Direct children of `id` in paint order.
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes
            .iter()
            .filter(move |n| n.parent == Some(id))
            .map(|n| n.id)
    }

    /// `id` and every ancestor are visible.
    pub fn is_shown(&self, id: ElementId) -> bool {
        let chain = ancestors(self, id);
        !chain.is_empty()
            && chain
                .iter()
                .all(|a| self.node(*a).is_some_and(|n| n.visible))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ElementTree for Scene {
    fn element_at(&self, p: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.bounds.contains(p) && self.is_shown(n.id))
            .map(|n| n.id)
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).and_then(|n| n.parent)
    }

    fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.node(id)
            .filter(|n| self.is_shown(n.id))
            .map(|n| n.bounds)
    }

    fn is_actionable(&self, id: ElementId) -> bool {
        self.node(id).is_some_and(|n| n.actionable) && self.is_shown(id)
    }
}
