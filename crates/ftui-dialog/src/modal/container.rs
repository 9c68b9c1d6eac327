#![forbid(unsafe_code)]

//! Dialog container: hosts the projected content and owns focus.
//!
//! The container element sits inside the overlay pane and carries the ARIA
//! attributes of the dialog. Once content is attached it:
//!
//! 1) wraps itself in a [`ConfigurableFocusTrap`],
//! 2) remembers which element had focus before the dialog opened,
//! 3) applies the [`AutoFocus`] policy after the next render.
//!
//! Closing switches the trap off; teardown restores focus per
//! [`RestoreFocus`] and destroys the trap.
//!
//! # Invariants
//!
//! 1. At most one piece of content is attached at a time.
//! 2. Focus is restored only while it is inside the dialog or nowhere; a
//!    consumer that already moved focus elsewhere keeps it there.
//! 3. A transition event from a superseded transition is ignored.
//! 4. `destroy()` runs once; later calls are no-ops.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `ContentAlreadyAttached` | second attach before detach | `Err` returned, nothing changes |
//! | Auto-focus selector matches nothing | typo or late content | warning (debug builds), container focused |
//! | Restore target unusable | element detached or not focusable | skipped silently |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ftui_a11y::{
    ConfigurableFocusTrap, ConfigurableFocusTrapConfig, ConfigurableFocusTrapFactory,
    FocusOptions, InteractivityChecker,
};
use ftui_dom::{
    Document, FocusEventKind, FocusOrigin, Injector, ListenerId, ListenerScope, NodeId,
};
use ftui_runtime::{Scheduler, Subject, Subscription};

use super::animation::{AnimationDriver, AnimationEvent, AnimationPhase, TransitionState};
use super::config::{AutoFocus, DialogConfig, RestoreFocus};
use super::dialog::DialogError;
use super::overlay::OverlayRef;
use super::portal::{
    ComponentPortal, ComponentRef, ContentContext, DomOrigin, DomPortal, TemplatePortal,
};

/// Class of every dialog container element.
pub const DIALOG_CONTAINER_CLASS: &str = "ftui-dialog-container";

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [role=heading]";

/// Lifecycle notifications emitted by a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    Opening,
    Opened,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerEvent {
    pub state: ContainerState,
    pub total_time: Duration,
}

#[derive(Debug)]
enum AttachedContent {
    Component,
    Template,
    Dom(DomOrigin),
}

/// Collaborators a container is built from.
pub(crate) struct ContainerParts {
    pub doc: Document,
    pub scheduler: Scheduler,
    pub traps: ConfigurableFocusTrapFactory,
    pub animation: Rc<dyn AnimationDriver>,
    pub overlay: Rc<dyn OverlayRef>,
    pub config: Rc<DialogConfig>,
    pub disable_close: Rc<Cell<bool>>,
}

struct ContainerInner {
    doc: Document,
    scheduler: Scheduler,
    element: NodeId,
    config: Rc<DialogConfig>,
    disable_close: Rc<Cell<bool>>,
    traps: ConfigurableFocusTrapFactory,
    animation: Rc<dyn AnimationDriver>,
    checker: InteractivityChecker,
    trap: RefCell<Option<Rc<ConfigurableFocusTrap>>>,
    previously_focused: Cell<Option<NodeId>>,
    content: RefCell<Option<AttachedContent>>,
    state_changed: Subject<ContainerEvent>,
    transition: Cell<u64>,
    close_origin: Cell<FocusOrigin>,
    backdrop_subscription: RefCell<Option<Subscription>>,
    overlay: Rc<dyn OverlayRef>,
    exiting: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Cheap-to-clone handle to a dialog container.
#[derive(Clone)]
pub struct DialogContainer {
    inner: Rc<ContainerInner>,
}

impl fmt::Debug for DialogContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogContainer")
            .field("element", &self.inner.element)
            .field("content", &self.inner.content.borrow())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl DialogContainer {
    pub(crate) fn new(parts: ContainerParts) -> Self {
        let ContainerParts {
            doc,
            scheduler,
            traps,
            animation,
            overlay,
            config,
            disable_close,
        } = parts;

        let element = doc.create_element("div");
        doc.add_class(element, DIALOG_CONTAINER_CLASS);
        doc.set_attribute(element, "tabindex", "-1");
        doc.set_attribute(element, "role", config.role().as_str());
        doc.set_attribute(
            element,
            "aria-modal",
            if config.aria_modal() { "true" } else { "false" },
        );
        if let Some(id) = &config.id {
            doc.set_attribute(element, "id", id.as_str());
        }
        for (name, value) in [
            ("aria-label", &config.aria_label),
            ("aria-labelledby", &config.aria_labelledby),
            ("aria-describedby", &config.aria_describedby),
        ] {
            if let Some(value) = value {
                doc.set_attribute(element, name, value.as_str());
            }
        }

        Self {
            inner: Rc::new(ContainerInner {
                doc,
                scheduler,
                element,
                config,
                disable_close,
                traps,
                animation,
                checker: InteractivityChecker::new(),
                trap: RefCell::new(None),
                previously_focused: Cell::new(None),
                content: RefCell::new(None),
                state_changed: Subject::new(),
                transition: Cell::new(0),
                close_origin: Cell::new(FocusOrigin::Program),
                backdrop_subscription: RefCell::new(None),
                overlay,
                exiting: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// The container element.
    #[must_use]
    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    #[must_use]
    pub fn config(&self) -> &DialogConfig {
        &self.inner.config
    }

    /// Element that had focus when content was attached.
    #[must_use]
    pub fn previously_focused(&self) -> Option<NodeId> {
        self.inner.previously_focused.get()
    }

    #[must_use]
    pub fn focus_trap(&self) -> Option<Rc<ConfigurableFocusTrap>> {
        self.inner.trap.borrow().clone()
    }

    #[must_use]
    pub fn has_attached(&self) -> bool {
        self.inner.content.borrow().is_some()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Lifecycle events (opening, opened, closing, closed).
    #[must_use]
    pub fn state_changed(&self) -> &Subject<ContainerEvent> {
        &self.inner.state_changed
    }

    /// Whether focus is on the container or inside it.
    #[must_use]
    pub fn contains_focus(&self) -> bool {
        self.inner.contains_focus()
    }

    fn context(&self, injector: Injector) -> ContentContext {
        ContentContext {
            doc: self.inner.doc.clone(),
            host: self.inner.element,
            injector,
        }
    }

    fn ensure_empty(&self) -> Result<(), DialogError> {
        if self.has_attached() {
            return Err(DialogError::ContentAlreadyAttached);
        }
        Ok(())
    }

    /// Build a component inside the container.
    pub fn attach_component_portal<C: 'static>(
        &self,
        portal: ComponentPortal<C>,
        injector: Injector,
    ) -> Result<ComponentRef<C>, DialogError> {
        self.ensure_empty()?;
        let instance = portal.create(&self.context(injector));
        *self.inner.content.borrow_mut() = Some(AttachedContent::Component);
        self.content_attached();
        Ok(ComponentRef::new(instance, self.inner.element))
    }

    /// Render a template inside the container.
    pub fn attach_template_portal(
        &self,
        portal: TemplatePortal,
        injector: Injector,
    ) -> Result<(), DialogError> {
        self.ensure_empty()?;
        portal.render(&self.context(injector));
        *self.inner.content.borrow_mut() = Some(AttachedContent::Template);
        self.content_attached();
        Ok(())
    }

    /// Move an existing element into the container.
    pub fn attach_dom_portal(&self, portal: DomPortal) -> Result<(), DialogError> {
        self.ensure_empty()?;
        let doc = &self.inner.doc;
        let origin = DomOrigin::capture(doc, portal.element);
        doc.append_child(self.inner.element, portal.element);
        *self.inner.content.borrow_mut() = Some(AttachedContent::Dom(origin));
        self.content_attached();
        Ok(())
    }

    fn content_attached(&self) {
        let inner = &self.inner;
        let trap = inner
            .traps
            .create(inner.element, ConfigurableFocusTrapConfig::default());
        if inner.exiting.get() {
            trap.set_enabled(false);
        }
        *inner.trap.borrow_mut() = Some(trap);
        inner.previously_focused.set(inner.doc.active_element());

        let weak = Rc::downgrade(inner);
        let subscription = inner.overlay.backdrop_click().subscribe(move |_| {
            if let Some(inner) = weak.upgrade()
                && inner.disable_close.get()
            {
                inner.recapture_focus();
            }
        });
        *inner.backdrop_subscription.borrow_mut() = Some(subscription);

        let weak = Rc::downgrade(inner);
        inner.scheduler.after_next_render(move || {
            if let Some(inner) = weak.upgrade()
                && !inner.destroyed.get()
                && !inner.exiting.get()
            {
                inner.apply_auto_focus();
            }
        });
    }

    /// Record how the close was triggered, for focus restoration.
    pub fn set_close_origin(&self, origin: FocusOrigin) {
        self.inner.close_origin.set(origin);
    }

    pub fn start_enter_animation(&self) {
        self.inner.start_transition(TransitionState::Enter);
    }

    /// Begin closing. The trap is switched off first so focus may leave
    /// the dialog while it animates out.
    pub fn start_exit_animation(&self) {
        self.inner.exiting.set(true);
        if let Some(trap) = self.focus_trap() {
            trap.set_enabled(false);
        }
        self.inner.start_transition(TransitionState::Exit);
    }

    /// Restore focus, destroy the trap, and return DOM content. Idempotent.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        inner.restore_focus();
        inner.backdrop_subscription.borrow_mut().take();
        inner.transition.set(inner.transition.get() + 1);
        let content = inner.content.borrow_mut().take();
        if let Some(AttachedContent::Dom(origin)) = content {
            origin.restore(&inner.doc);
        }
        inner.state_changed.complete();
    }
}

impl ContainerInner {
    fn contains_focus(&self) -> bool {
        self.doc
            .active_element()
            .is_some_and(|active| self.doc.contains(self.element, active))
    }

    fn focus_container(&self) -> bool {
        self.doc.focus(self.element, FocusOrigin::Program)
    }

    fn focus_initial(&self) -> bool {
        let trap = self.trap.borrow().clone();
        trap.is_some_and(|t| t.focus_initial_element(FocusOptions::default()))
    }

    fn apply_auto_focus(&self) {
        match self.config.auto_focus() {
            AutoFocus::Dialog => {
                if !self.contains_focus() {
                    self.focus_container();
                }
            }
            AutoFocus::FirstTabbable => {
                if !self.focus_initial() {
                    self.focus_container();
                }
            }
            AutoFocus::FirstHeading => self.focus_by_selector(HEADING_SELECTOR),
            AutoFocus::Selector(selector) => self.focus_by_selector(&selector),
        }
    }

    fn focus_by_selector(&self, selector: &str) {
        match self.doc.query_selector(self.element, selector) {
            Some(target) => self.force_focus(target),
            None => {
                #[cfg(debug_assertions)]
                tracing::warn!(selector, "auto-focus selector matched nothing; focusing the dialog");
                self.focus_container();
            }
        }
    }

    /// Focus `node`, giving it a temporary tabindex if it cannot take focus.
    fn force_focus(&self, node: NodeId) {
        if !self.checker.is_focusable(&self.doc, node) {
            self.doc.set_attribute(node, "tabindex", "-1");
            let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
            let own_id = Rc::clone(&slot);
            let id = self
                .doc
                .add_focus_listener(ListenerScope::Node(node), move |doc, event| {
                    if event.kind == FocusEventKind::Blur {
                        doc.remove_attribute(node, "tabindex");
                        if let Some(id) = own_id.take() {
                            doc.remove_listener(id);
                        }
                    }
                });
            slot.set(Some(id));
        }
        self.doc.focus(node, FocusOrigin::Program);
    }

    fn recapture_focus(&self) {
        if self.contains_focus() {
            return;
        }
        if let Some(active) = self.doc.active_element() {
            tracing::debug!(
                active = active.index(),
                "focus was moved outside the dialog; not recapturing"
            );
            return;
        }
        let focused = self.config.auto_focus() != AutoFocus::Dialog && self.focus_initial();
        if !focused {
            self.focus_container();
        }
    }

    fn restore_focus(&self) {
        let target = match self.config.restore_focus() {
            RestoreFocus::Disabled => None,
            RestoreFocus::Previous => self.previously_focused.get(),
            RestoreFocus::Selector(selector) => self.doc.query_selector(self.doc.body(), &selector),
            RestoreFocus::Element(node) => Some(node),
        };
        if let Some(target) = target {
            let active = self.doc.active_element();
            let untouched = active.is_none_or(|a| self.doc.contains(self.element, a));
            if !untouched {
                tracing::debug!("focus was moved during close; leaving it in place");
            } else if !self.doc.focus(target, self.close_origin.get()) {
                tracing::debug!(target = target.index(), "focus restore target is not focusable");
            }
        }
        if let Some(trap) = self.trap.borrow_mut().take() {
            trap.destroy();
        }
    }

    fn start_transition(self: &Rc<Self>, to_state: TransitionState) {
        let serial = self.transition.get() + 1;
        self.transition.set(serial);
        let (duration, started, done) = match to_state {
            TransitionState::Enter => (
                self.config.enter_duration(),
                ContainerState::Opening,
                ContainerState::Opened,
            ),
            TransitionState::Exit | TransitionState::Void => (
                self.config.exit_duration(),
                ContainerState::Closing,
                ContainerState::Closed,
            ),
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        let on_event = Rc::new(move |event: AnimationEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.transition.get() != serial {
                return;
            }
            let state = match event.phase {
                AnimationPhase::Started => started,
                AnimationPhase::Done => done,
            };
            inner.state_changed.next(&ContainerEvent {
                state,
                total_time: event.total_time,
            });
        });
        self.animation
            .start(self.element, to_state, duration, on_event);
    }
}
