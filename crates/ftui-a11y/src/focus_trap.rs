#![forbid(unsafe_code)]

//! Keyboard focus confinement for a subtree.
//!
//! A [`FocusTrap`] brackets its element with two invisible, tabbable anchors.
//! When Tab moves focus onto the end anchor, focus wraps to the first
//! tabbable element inside the region; Shift+Tab onto the start anchor wraps
//! to the last one.
//!
//! # Region markers
//!
//! | Attribute | Effect |
//! |-----------|--------|
//! | `ftui-focus-initial` | Preferred target of [`FocusTrap::focus_initial_element`] |
//! | `ftui-focus-region-start` | Overrides the first tabbable element |
//! | `ftui-focus-region-end` | Overrides the last tabbable element |
//!
//! # Invariants
//!
//! 1. Anchors are inserted at most once and always as the element's
//!    immediate previous/next siblings.
//! 2. Anchors are tabbable exactly while the trap is enabled.
//! 3. `destroy()` removes anchors and listeners; calling it again is a no-op.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Anchors not attached | Element has no parent yet | `attach_anchors` returns `false`; retry later |
//! | Initial marker not focusable | Marker on a plain container | Its first tabbable descendant is focused instead |
//! | Empty region | No tabbable descendants | Focus calls return `false` |

use std::cell::{Cell, RefCell};
use std::fmt;

use ftui_dom::{Document, FocusEventKind, FocusOrigin, ListenerId, ListenerScope, NodeId};
use ftui_runtime::Scheduler;

use crate::interactivity::InteractivityChecker;

/// Marks the element that should receive focus first.
pub const FOCUS_INITIAL_ATTR: &str = "ftui-focus-initial";
/// Marks the first element of the tab cycle.
pub const FOCUS_REGION_START_ATTR: &str = "ftui-focus-region-start";
/// Marks the last element of the tab cycle.
pub const FOCUS_REGION_END_ATTR: &str = "ftui-focus-region-end";
/// Class carried by both trap anchors.
pub const ANCHOR_CLASS: &str = "ftui-focus-trap-anchor";

/// Options forwarded to every focus call a trap makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusOptions {
    pub origin: FocusOrigin,
}

impl FocusOptions {
    #[must_use]
    pub const fn with_origin(origin: FocusOrigin) -> Self {
        Self { origin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// The trapped subtree plus everything needed to move focus within it.
///
/// Cheap to clone; deferred callbacks capture a `TrapRegion` rather than the
/// trap itself.
#[derive(Debug, Clone)]
pub struct TrapRegion {
    doc: Document,
    element: NodeId,
    checker: InteractivityChecker,
}

impl TrapRegion {
    #[must_use]
    pub fn new(doc: Document, element: NodeId) -> Self {
        Self {
            doc,
            element,
            checker: InteractivityChecker::new(),
        }
    }

    #[must_use]
    pub fn element(&self) -> NodeId {
        self.element
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Whether `node` is the region element or inside it.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.doc.contains(self.element, node)
    }

    /// Whether the document's active element is inside the region.
    #[must_use]
    pub fn has_focus(&self) -> bool {
        self.doc.active_element().is_some_and(|a| self.contains(a))
    }

    /// First tabbable node in preorder, `root` included.
    #[must_use]
    pub fn first_tabbable(&self, root: NodeId) -> Option<NodeId> {
        if self.is_candidate(root) {
            return Some(root);
        }
        self.doc
            .children(root)
            .into_iter()
            .find_map(|child| self.first_tabbable(child))
    }

    /// Last tabbable node, `root` checked before its children.
    #[must_use]
    pub fn last_tabbable(&self, root: NodeId) -> Option<NodeId> {
        if self.is_candidate(root) {
            return Some(root);
        }
        self.doc
            .children(root)
            .into_iter()
            .rev()
            .find_map(|child| self.last_tabbable(child))
    }

    fn is_candidate(&self, node: NodeId) -> bool {
        self.checker.is_focusable(&self.doc, node) && self.checker.is_tabbable(&self.doc, node)
    }

    fn boundary(&self, bound: Bound) -> Option<NodeId> {
        let (attr, marker_selector) = match bound {
            Bound::Start => (FOCUS_REGION_START_ATTR, "[ftui-focus-region-start]"),
            Bound::End => (FOCUS_REGION_END_ATTR, "[ftui-focus-region-end]"),
        };
        let markers = self.doc.query_selector_all(self.element, marker_selector);
        let marker = match bound {
            Bound::Start => markers.first().copied(),
            Bound::End => markers.last().copied(),
        };
        if let Some(marker) = marker {
            tracing::trace!(attr, node = marker.index(), "focus region marker");
            return Some(marker);
        }
        match bound {
            Bound::Start => self.first_tabbable(self.element),
            Bound::End => self.last_tabbable(self.element),
        }
    }

    /// Focus the `ftui-focus-initial` element, or the first tabbable one.
    pub fn focus_initial_element(&self, options: FocusOptions) -> bool {
        let Some(redirect) = self
            .doc
            .query_selector(self.element, "[ftui-focus-initial]")
        else {
            return self.focus_first_tabbable_element(options);
        };
        if self.checker.is_focusable(&self.doc, redirect) {
            return self.doc.focus(redirect, options.origin);
        }
        #[cfg(debug_assertions)]
        tracing::warn!(
            node = redirect.index(),
            attr = FOCUS_INITIAL_ATTR,
            "initial focus target is not focusable; using its first tabbable descendant"
        );
        self.first_tabbable(redirect)
            .is_some_and(|child| self.doc.focus(child, options.origin))
    }

    /// Focus the start of the tab cycle.
    pub fn focus_first_tabbable_element(&self, options: FocusOptions) -> bool {
        self.boundary(Bound::Start)
            .is_some_and(|node| self.doc.focus(node, options.origin))
    }

    /// Focus the end of the tab cycle.
    pub fn focus_last_tabbable_element(&self, options: FocusOptions) -> bool {
        self.boundary(Bound::End)
            .is_some_and(|node| self.doc.focus(node, options.origin))
    }
}

#[derive(Debug, Default)]
struct Anchors {
    start: Option<NodeId>,
    end: Option<NodeId>,
    listeners: Vec<ListenerId>,
    attached: bool,
}

/// Confines Tab navigation to a region via a pair of wrap-around anchors.
pub struct FocusTrap {
    region: TrapRegion,
    scheduler: Scheduler,
    enabled: Cell<bool>,
    anchors: RefCell<Anchors>,
    destroyed: Cell<bool>,
}

impl fmt::Debug for FocusTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTrap")
            .field("element", &self.region.element)
            .field("enabled", &self.enabled.get())
            .field("attached", &self.anchors.borrow().attached)
            .finish()
    }
}

impl FocusTrap {
    /// Create an enabled trap around `element`.
    ///
    /// Unless `defer_anchors` is set, anchors are attached right away (which
    /// only succeeds if `element` already has a parent).
    #[must_use]
    pub fn new(doc: Document, element: NodeId, scheduler: Scheduler, defer_anchors: bool) -> Self {
        let trap = Self {
            region: TrapRegion::new(doc, element),
            scheduler,
            enabled: Cell::new(true),
            anchors: RefCell::new(Anchors::default()),
            destroyed: Cell::new(false),
        };
        if !defer_anchors {
            trap.attach_anchors();
        }
        trap
    }

    #[must_use]
    pub fn region(&self) -> &TrapRegion {
        &self.region
    }

    #[must_use]
    pub fn element(&self) -> NodeId {
        self.region.element
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Enable or disable the trap, toggling anchor tabbability.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
        self.toggle_anchors(enabled);
    }

    pub(crate) fn set_enabled_flag(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Make anchors tabbable (or not) without changing the enabled flag.
    pub(crate) fn toggle_anchors(&self, enabled: bool) {
        let (start, end) = {
            let anchors = self.anchors.borrow();
            (anchors.start, anchors.end)
        };
        let doc = &self.region.doc;
        for anchor in [start, end].into_iter().flatten() {
            if enabled {
                doc.set_attribute(anchor, "tabindex", "0");
            } else {
                doc.remove_attribute(anchor, "tabindex");
            }
        }
    }

    /// Whether both anchors are in the tree.
    #[must_use]
    pub fn has_attached(&self) -> bool {
        self.anchors.borrow().attached
    }

    /// The start and end anchors, once created.
    #[must_use]
    pub fn anchors(&self) -> Option<(NodeId, NodeId)> {
        let anchors = self.anchors.borrow();
        anchors.start.zip(anchors.end)
    }

    /// Insert the anchors around the element.
    ///
    /// Returns whether anchors are attached afterwards.
    pub fn attach_anchors(&self) -> bool {
        if self.destroyed.get() {
            return false;
        }
        if self.anchors.borrow().attached {
            return true;
        }
        self.create_anchors();
        let doc = &self.region.doc;
        let element = self.region.element;
        let Some(parent) = doc.parent(element) else {
            return false;
        };
        let mut anchors = self.anchors.borrow_mut();
        let (Some(start), Some(end)) = (anchors.start, anchors.end) else {
            return false;
        };
        doc.insert_before(parent, start, Some(element));
        doc.insert_before(parent, end, doc.next_sibling(element));
        anchors.attached = true;
        tracing::trace!(element = element.index(), "focus trap anchors attached");
        true
    }

    fn create_anchors(&self) {
        if self.anchors.borrow().start.is_some() {
            return;
        }
        let doc = &self.region.doc;
        let enabled = self.enabled.get();
        let make = || {
            let anchor = doc.create_element("div");
            doc.add_class(anchor, ANCHOR_CLASS);
            doc.add_class(anchor, "ftui-visually-hidden");
            doc.set_attribute(anchor, "aria-hidden", "true");
            if enabled {
                doc.set_attribute(anchor, "tabindex", "0");
            }
            anchor
        };
        let start = make();
        let end = make();

        let region = self.region.clone();
        let on_start = doc.add_focus_listener(ListenerScope::Node(start), move |_, event| {
            if event.kind == FocusEventKind::Focus {
                region.focus_last_tabbable_element(FocusOptions::with_origin(event.origin));
            }
        });
        let region = self.region.clone();
        let on_end = doc.add_focus_listener(ListenerScope::Node(end), move |_, event| {
            if event.kind == FocusEventKind::Focus {
                region.focus_first_tabbable_element(FocusOptions::with_origin(event.origin));
            }
        });

        let mut anchors = self.anchors.borrow_mut();
        anchors.start = Some(start);
        anchors.end = Some(end);
        anchors.listeners = vec![on_start, on_end];
    }

    /// Remove anchors and their listeners. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let anchors = std::mem::take(&mut *self.anchors.borrow_mut());
        let doc = &self.region.doc;
        for id in anchors.listeners {
            doc.remove_listener(id);
        }
        for anchor in [anchors.start, anchors.end].into_iter().flatten() {
            doc.remove(anchor);
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn focus_initial_element(&self, options: FocusOptions) -> bool {
        self.region.focus_initial_element(options)
    }

    pub fn focus_first_tabbable_element(&self, options: FocusOptions) -> bool {
        self.region.focus_first_tabbable_element(options)
    }

    pub fn focus_last_tabbable_element(&self, options: FocusOptions) -> bool {
        self.region.focus_last_tabbable_element(options)
    }

    /// Like [`focus_initial_element`](Self::focus_initial_element), once
    /// rendering has settled. `done` receives the outcome.
    pub fn focus_initial_element_when_ready(
        &self,
        options: FocusOptions,
        done: impl FnOnce(bool) + 'static,
    ) {
        let region = self.region.clone();
        self.scheduler
            .after_next_render(move || done(region.focus_initial_element(options)));
    }

    pub fn focus_first_tabbable_element_when_ready(
        &self,
        options: FocusOptions,
        done: impl FnOnce(bool) + 'static,
    ) {
        let region = self.region.clone();
        self.scheduler
            .after_next_render(move || done(region.focus_first_tabbable_element(options)));
    }

    pub fn focus_last_tabbable_element_when_ready(
        &self,
        options: FocusOptions,
        done: impl FnOnce(bool) + 'static,
    ) {
        let region = self.region.clone();
        self.scheduler
            .after_next_render(move || done(region.focus_last_tabbable_element(options)));
    }
}
