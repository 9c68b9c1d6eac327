#![forbid(unsafe_code)]

//! Overlay layer hosting dialog panes.
//!
//! The dialog service only needs a narrow contract from the overlay engine:
//! create a floating pane (optionally with a backdrop), attach an element to
//! it, tear it down, and expose its input streams. [`Overlay`] and
//! [`OverlayRef`] are that contract; [`HeadlessOverlay`] implements it on a
//! [`Document`] without any layout.
//!
//! # DOM layout
//!
//! ```text
//! body
//! └── div.ftui-overlay-container
//!     ├── div.ftui-overlay-backdrop      (when has_backdrop)
//!     └── div.ftui-overlay-host
//!         └── div.ftui-overlay-pane      ← attached content
//! ```
//!
//! # Invariants
//!
//! 1. Keyboard events are delivered to the most recently created overlay
//!    that is still attached.
//! 2. `dispose()` detaches first (emitting on `detachments`), then removes
//!    every node and completes every stream. A second call is a no-op.
//! 3. `detach_backdrop()` removes the backdrop immediately so the page below
//!    becomes interactive while the pane is still animating out.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ftui_a11y::OVERLAY_PANE_CLASS;
use ftui_dom::{Document, FocusOrigin, KeyEvent, NodeId, PointerEvent};
use ftui_runtime::Subject;

use super::config::{DialogConfig, DialogPosition, DialogSize, Direction};

/// Class of the element that contains every overlay.
pub const OVERLAY_CONTAINER_CLASS: &str = "ftui-overlay-container";
/// Class of each overlay's host element.
pub const OVERLAY_HOST_CLASS: &str = "ftui-overlay-host";
/// Class of each overlay's backdrop.
pub const OVERLAY_BACKDROP_CLASS: &str = "ftui-overlay-backdrop";

/// What the overlay engine needs to build a pane for one dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayConfig {
    pub has_backdrop: bool,
    pub backdrop_class: Vec<String>,
    pub panel_class: Vec<String>,
    pub size: DialogSize,
    pub position: Option<DialogPosition>,
    pub direction: Option<Direction>,
    pub dispose_on_navigation: bool,
}

impl OverlayConfig {
    /// Derive the overlay settings from a resolved dialog config.
    #[must_use]
    pub fn from_dialog(config: &DialogConfig) -> Self {
        Self {
            has_backdrop: config.has_backdrop(),
            backdrop_class: config.backdrop_class.clone().unwrap_or_default(),
            panel_class: config.panel_class.clone().unwrap_or_default(),
            size: config.size.clone(),
            position: config.position.clone(),
            direction: config.direction,
            dispose_on_navigation: config.close_on_navigation(),
        }
    }
}

/// Factory for overlay panes.
pub trait Overlay {
    /// Create a new pane above every existing one.
    fn create(&self, config: &OverlayConfig) -> Rc<dyn OverlayRef>;

    /// The element that holds every overlay; its siblings are background
    /// content.
    fn container_element(&self) -> NodeId;
}

/// Handle to one overlay pane.
pub trait OverlayRef {
    fn host_element(&self) -> NodeId;
    fn pane_element(&self) -> NodeId;
    fn backdrop_element(&self) -> Option<NodeId>;

    /// Move `element` into the pane.
    fn attach(&self, element: NodeId);
    fn has_attached(&self) -> bool;

    /// Remove the pane content, emitting on `detachments`.
    fn detach(&self);
    fn detach_backdrop(&self);
    fn dispose(&self);
    fn is_disposed(&self) -> bool;

    fn update_size(&self, size: &DialogSize);
    fn update_position(&self, position: &DialogPosition);
    fn add_panel_class(&self, class: &str);
    fn remove_panel_class(&self, class: &str);

    fn backdrop_click(&self) -> &Subject<PointerEvent>;
    fn keydown_events(&self) -> &Subject<KeyEvent>;
    fn outside_pointer_events(&self) -> &Subject<PointerEvent>;
    fn detachments(&self) -> &Subject<()>;
}

struct OverlayRegistry {
    doc: Document,
    container: Cell<Option<NodeId>>,
    open: RefCell<Vec<Weak<HeadlessOverlayRef>>>,
}

impl OverlayRegistry {
    fn container(&self) -> NodeId {
        if let Some(container) = self.container.get()
            && self.doc.is_connected(container)
        {
            return container;
        }
        let container = self.doc.create_element("div");
        self.doc.add_class(container, OVERLAY_CONTAINER_CLASS);
        self.doc.append_child(self.doc.body(), container);
        self.container.set(Some(container));
        container
    }

    fn live(&self) -> Vec<Rc<HeadlessOverlayRef>> {
        let mut open = self.open.borrow_mut();
        open.retain(|o| o.upgrade().is_some_and(|o| !o.disposed.get()));
        open.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Layout-free overlay engine over a [`Document`].
#[derive(Clone)]
pub struct HeadlessOverlay {
    registry: Rc<OverlayRegistry>,
}

impl fmt::Debug for HeadlessOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessOverlay")
            .field("container", &self.registry.container.get())
            .field("open", &self.registry.open.borrow().len())
            .finish()
    }
}

impl HeadlessOverlay {
    #[must_use]
    pub fn new(doc: Document) -> Self {
        Self {
            registry: Rc::new(OverlayRegistry {
                doc,
                container: Cell::new(None),
                open: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Overlays that have not been disposed, oldest first.
    #[must_use]
    pub fn open_overlays(&self) -> Vec<Rc<HeadlessOverlayRef>> {
        self.registry.live()
    }

    /// Deliver a key press to the topmost attached overlay.
    ///
    /// Returns whether an overlay received the event.
    pub fn dispatch_keydown(&self, event: &KeyEvent) -> bool {
        let top = self
            .registry
            .live()
            .into_iter()
            .rev()
            .find(|o| o.has_attached());
        match top {
            Some(overlay) => {
                overlay.keydown.next(event);
                true
            }
            None => false,
        }
    }

    /// Deliver a pointer press on `target`.
    ///
    /// A press on a backdrop is a backdrop click for that overlay. Otherwise
    /// overlays are visited from the top; each one not containing the target
    /// receives an outside-pointer event, stopping at the first that does.
    ///
    /// Before any event is delivered, focus moves the way a press moves it:
    /// to the nearest focusable element at or above `target`, or nowhere.
    pub fn dispatch_pointer(&self, target: NodeId) {
        let doc = &self.registry.doc;
        let mut focusable = Some(target);
        while let Some(node) = focusable
            && !doc.accepts_focus(node)
        {
            focusable = doc.parent(node);
        }
        match focusable {
            Some(node) => {
                doc.focus(node, FocusOrigin::Mouse);
            }
            None => doc.blur(),
        }

        let event = PointerEvent::new(Some(target));
        let overlays = self.registry.live();
        if let Some(owner) = overlays
            .iter()
            .find(|o| o.backdrop.get() == Some(target))
        {
            owner.backdrop_click.next(&event);
            return;
        }
        for overlay in overlays.iter().rev().filter(|o| o.has_attached()) {
            if doc.contains(overlay.host, target) {
                break;
            }
            overlay.outside_pointer.next(&event);
        }
    }

    /// Click the backdrop of the topmost overlay that has one.
    ///
    /// Returns whether a backdrop was found.
    pub fn click_backdrop(&self) -> bool {
        let backdrop = self
            .registry
            .live()
            .into_iter()
            .rev()
            .find_map(|o| o.backdrop.get());
        match backdrop {
            Some(backdrop) => {
                self.dispatch_pointer(backdrop);
                true
            }
            None => false,
        }
    }

    /// Simulate a location change: dispose every overlay created with
    /// `dispose_on_navigation`.
    pub fn navigate(&self) {
        for overlay in self.registry.live() {
            if overlay.dispose_on_navigation {
                tracing::debug!(host = overlay.host.index(), "overlay disposed on navigation");
                overlay.dispose();
            }
        }
    }
}

impl Overlay for HeadlessOverlay {
    fn create(&self, config: &OverlayConfig) -> Rc<dyn OverlayRef> {
        let doc = &self.registry.doc;
        let container = self.registry.container();

        let host = doc.create_element("div");
        doc.add_class(host, OVERLAY_HOST_CLASS);
        let pane = doc.create_element("div");
        doc.add_class(pane, OVERLAY_PANE_CLASS);
        for class in &config.panel_class {
            doc.add_class(pane, class);
        }
        if let Some(direction) = config.direction {
            doc.set_attribute(host, "dir", direction.as_str());
        }
        doc.append_child(host, pane);

        let backdrop = config.has_backdrop.then(|| {
            let backdrop = doc.create_element("div");
            doc.add_class(backdrop, OVERLAY_BACKDROP_CLASS);
            for class in &config.backdrop_class {
                doc.add_class(backdrop, class);
            }
            doc.append_child(container, backdrop);
            backdrop
        });
        doc.append_child(container, host);

        let overlay = Rc::new(HeadlessOverlayRef {
            doc: doc.clone(),
            host,
            pane,
            backdrop: Cell::new(backdrop),
            attached: Cell::new(false),
            disposed: Cell::new(false),
            dispose_on_navigation: config.dispose_on_navigation,
            styles: RefCell::new(BTreeMap::new()),
            backdrop_click: Subject::new(),
            keydown: Subject::new(),
            outside_pointer: Subject::new(),
            detachments: Subject::new(),
        });
        overlay.update_size(&config.size);
        if let Some(position) = &config.position {
            overlay.update_position(position);
        }
        self.registry.open.borrow_mut().push(Rc::downgrade(&overlay));
        overlay
    }

    fn container_element(&self) -> NodeId {
        self.registry.container()
    }
}

/// One pane created by [`HeadlessOverlay`].
pub struct HeadlessOverlayRef {
    doc: Document,
    host: NodeId,
    pane: NodeId,
    backdrop: Cell<Option<NodeId>>,
    attached: Cell<bool>,
    disposed: Cell<bool>,
    dispose_on_navigation: bool,
    styles: RefCell<BTreeMap<&'static str, String>>,
    backdrop_click: Subject<PointerEvent>,
    keydown: Subject<KeyEvent>,
    outside_pointer: Subject<PointerEvent>,
    detachments: Subject<()>,
}

impl fmt::Debug for HeadlessOverlayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessOverlayRef")
            .field("host", &self.host)
            .field("pane", &self.pane)
            .field("attached", &self.attached.get())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl HeadlessOverlayRef {
    fn set_styles(&self, entries: &[(&'static str, Option<&String>)]) {
        let mut styles = self.styles.borrow_mut();
        for &(property, value) in entries {
            match value {
                Some(value) => {
                    styles.insert(property, value.clone());
                }
                None => {
                    styles.remove(property);
                }
            }
        }
        let style = styles
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        if style.is_empty() {
            self.doc.remove_attribute(self.pane, "style");
        } else {
            self.doc.set_attribute(self.pane, "style", style);
        }
    }
}

impl OverlayRef for HeadlessOverlayRef {
    fn host_element(&self) -> NodeId {
        self.host
    }

    fn pane_element(&self) -> NodeId {
        self.pane
    }

    fn backdrop_element(&self) -> Option<NodeId> {
        self.backdrop.get()
    }

    fn attach(&self, element: NodeId) {
        if self.disposed.get() {
            return;
        }
        self.doc.append_child(self.pane, element);
        self.attached.set(true);
    }

    fn has_attached(&self) -> bool {
        self.attached.get()
    }

    fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        self.detach_backdrop();
        for child in self.doc.children(self.pane) {
            self.doc.remove(child);
        }
        self.detachments.next(&());
    }

    fn detach_backdrop(&self) {
        if let Some(backdrop) = self.backdrop.take() {
            self.doc.remove(backdrop);
        }
    }

    fn dispose(&self) {
        if self.disposed.get() {
            return;
        }
        self.detach();
        self.disposed.set(true);
        self.detach_backdrop();
        self.doc.remove(self.host);
        self.backdrop_click.complete();
        self.keydown.complete();
        self.outside_pointer.complete();
        self.detachments.complete();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn update_size(&self, size: &DialogSize) {
        self.set_styles(&[
            ("width", size.width.as_ref()),
            ("height", size.height.as_ref()),
            ("min-width", size.min_width.as_ref()),
            ("min-height", size.min_height.as_ref()),
            ("max-width", size.max_width.as_ref()),
            ("max-height", size.max_height.as_ref()),
        ]);
    }

    fn update_position(&self, position: &DialogPosition) {
        self.set_styles(&[
            ("top", position.top.as_ref()),
            ("bottom", position.bottom.as_ref()),
            ("left", position.left.as_ref()),
            ("right", position.right.as_ref()),
        ]);
    }

    fn add_panel_class(&self, class: &str) {
        self.doc.add_class(self.pane, class);
    }

    fn remove_panel_class(&self, class: &str) {
        self.doc.remove_class(self.pane, class);
    }

    fn backdrop_click(&self) -> &Subject<PointerEvent> {
        &self.backdrop_click
    }

    fn keydown_events(&self) -> &Subject<KeyEvent> {
        &self.keydown
    }

    fn outside_pointer_events(&self) -> &Subject<PointerEvent> {
        &self.outside_pointer
    }

    fn detachments(&self) -> &Subject<()> {
        &self.detachments
    }
}
