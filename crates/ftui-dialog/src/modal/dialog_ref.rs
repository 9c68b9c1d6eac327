#![forbid(unsafe_code)]

//! Per-dialog handle and lifecycle state machine.
//!
//! ```text
//!          close()                 exit transition done
//!  Open ───────────────► Closing ─────────────────────────► Closed
//!                          │          (or fallback timer)
//!                          └─ before_closed, backdrop detached,
//!                             exit transition started, fallback armed
//! ```
//!
//! Entering `Closed` restores focus through the container, disposes the
//! overlay, then emits `after_closed` with the result.
//!
//! # Invariants
//!
//! 1. `close()` only acts while `Open`; `after_closed` fires exactly once.
//! 2. The fallback timer and the exit transition race; whichever finishes
//!    first wins and the other has no effect.
//! 3. Component and container references are released once `Closed`.
//! 4. Every lifecycle stream completes by the time the dialog is `Closed`,
//!    so late subscribers see completion instead of waiting.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ftui_dom::{FocusOrigin, KeyCode, KeyEvent, PointerEvent};
use ftui_runtime::{Scheduler, Subject, Subscription, TimerHandle};

use super::config::{DialogConfig, DialogConfigHandle, DialogPosition, DialogSize};
use super::container::{ContainerEvent, ContainerState, DialogContainer};
use super::overlay::OverlayRef;
use super::stack::DialogSerial;

/// Slack added to the exit duration before the close fallback fires.
pub const CLOSE_FALLBACK_SLACK: Duration = Duration::from_millis(100);

/// Lifecycle state of one dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    Open,
    Closing,
    Closed,
}

pub(crate) struct RefParts {
    pub id: String,
    pub serial: DialogSerial,
    pub config: Rc<DialogConfig>,
    pub disable_close: Rc<Cell<bool>>,
    pub overlay: Rc<dyn OverlayRef>,
    pub container: DialogContainer,
    pub scheduler: Scheduler,
}

struct RefInner<R> {
    id: String,
    serial: DialogSerial,
    config: Rc<DialogConfig>,
    disable_close: Rc<Cell<bool>>,
    overlay: Rc<dyn OverlayRef>,
    container: RefCell<Option<DialogContainer>>,
    component: RefCell<Option<Rc<dyn Any>>>,
    scheduler: Scheduler,
    state: Cell<DialogState>,
    result: RefCell<Option<R>>,
    fallback: RefCell<Option<TimerHandle>>,
    subscriptions: RefCell<Vec<Subscription>>,
    before_opened: Subject<()>,
    after_opened: Subject<()>,
    before_closed: Subject<Option<R>>,
    after_closed: Subject<Option<R>>,
}

/// Handle to one open dialog producing a result of type `R`.
///
/// Clones share the same dialog.
pub struct DialogRef<R: 'static> {
    inner: Rc<RefInner<R>>,
}

impl<R: 'static> Clone for DialogRef<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R: 'static> fmt::Debug for DialogRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRef")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.get())
            .field("disable_close", &self.inner.disable_close.get())
            .finish()
    }
}

impl<R: 'static> DialogRef<R> {
    pub(crate) fn new(parts: RefParts) -> Self {
        let RefParts {
            id,
            serial,
            config,
            disable_close,
            overlay,
            container,
            scheduler,
        } = parts;
        let this = Self {
            inner: Rc::new(RefInner {
                id,
                serial,
                config,
                disable_close,
                overlay,
                container: RefCell::new(Some(container.clone())),
                component: RefCell::new(None),
                scheduler,
                state: Cell::new(DialogState::Open),
                result: RefCell::new(None),
                fallback: RefCell::new(None),
                subscriptions: RefCell::new(Vec::new()),
                before_opened: Subject::new(),
                after_opened: Subject::new(),
                before_closed: Subject::new(),
                after_closed: Subject::new(),
            }),
        };
        this.wire(&container);
        this
    }

    fn upgrade(weak: &Weak<RefInner<R>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn wire(&self, container: &DialogContainer) {
        let inner = &self.inner;
        let mut subscriptions = Vec::with_capacity(4);

        let weak = Rc::downgrade(inner);
        subscriptions.push(inner.overlay.keydown_events().subscribe(move |event: &KeyEvent| {
            if let Some(this) = Self::upgrade(&weak)
                && event.code == KeyCode::Escape
                && !event.has_modifier()
                && !this.disable_close()
            {
                event.prevent_default();
                this.close_with_origin(None, FocusOrigin::Keyboard);
            }
        }));

        let weak = Rc::downgrade(inner);
        subscriptions.push(inner.overlay.backdrop_click().subscribe(move |_: &PointerEvent| {
            if let Some(this) = Self::upgrade(&weak)
                && !this.disable_close()
            {
                this.close_with_origin(None, FocusOrigin::Mouse);
            }
        }));

        if inner.config.close_on_overlay_detachments() {
            let weak = Rc::downgrade(inner);
            subscriptions.push(inner.overlay.detachments().subscribe(move |_: &()| {
                if let Some(this) = Self::upgrade(&weak) {
                    this.close(None);
                }
            }));
        }

        let weak = Rc::downgrade(inner);
        subscriptions.push(container.state_changed().subscribe(move |event: &ContainerEvent| {
            let Some(this) = Self::upgrade(&weak) else {
                return;
            };
            match event.state {
                ContainerState::Opening => this.inner.before_opened.next_and_complete(&()),
                ContainerState::Opened => this.inner.after_opened.next_and_complete(&()),
                ContainerState::Closing => {}
                ContainerState::Closed => this.finish(),
            }
        }));

        *inner.subscriptions.borrow_mut() = subscriptions;
    }

    /// The dialog id (generated when the config had none).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn serial(&self) -> DialogSerial {
        self.inner.serial
    }

    #[must_use]
    pub fn state(&self) -> DialogState {
        self.inner.state.get()
    }

    /// The resolved configuration this dialog was opened with.
    #[must_use]
    pub fn config(&self) -> DialogConfigHandle {
        DialogConfigHandle(Rc::clone(&self.inner.config))
    }

    /// Whether Escape and backdrop clicks are ignored.
    #[must_use]
    pub fn disable_close(&self) -> bool {
        self.inner.disable_close.get()
    }

    pub fn set_disable_close(&self, disable: bool) {
        self.inner.disable_close.set(disable);
    }

    /// Close with a programmatic origin.
    pub fn close(&self, result: Option<R>) {
        self.close_with_origin(result, FocusOrigin::Program);
    }

    /// Close, recording `origin` as the cause for focus restoration.
    ///
    /// No-op unless the dialog is open.
    pub fn close_with_origin(&self, result: Option<R>, origin: FocusOrigin) {
        let inner = &self.inner;
        if inner.state.get() != DialogState::Open {
            return;
        }
        inner.state.set(DialogState::Closing);
        tracing::debug!(dialog = %inner.id, ?origin, "dialog closing");

        inner.before_closed.next_and_complete(&result);
        *inner.result.borrow_mut() = result;

        let container = inner.container.borrow().clone();
        if let Some(container) = &container {
            container.set_close_origin(origin);
        }
        inner.overlay.detach_backdrop();
        if let Some(container) = &container {
            container.start_exit_animation();
        }

        let weak = Rc::downgrade(inner);
        let delay = inner.config.exit_duration() + CLOSE_FALLBACK_SLACK;
        let handle = inner.scheduler.set_timeout(delay, move || {
            if let Some(this) = Self::upgrade(&weak)
                && this.state() == DialogState::Closing
            {
                tracing::debug!(dialog = %this.inner.id, "exit transition timed out");
                this.finish();
            }
        });
        *inner.fallback.borrow_mut() = Some(handle);
    }

    fn finish(&self) {
        let inner = &self.inner;
        if inner.state.replace(DialogState::Closed) == DialogState::Closed {
            return;
        }
        if let Some(fallback) = inner.fallback.borrow_mut().take() {
            fallback.cancel();
        }
        let container = inner.container.borrow_mut().take();
        if let Some(container) = container {
            container.destroy();
        }
        inner.overlay.dispose();
        tracing::debug!(dialog = %inner.id, "dialog closed");

        let result = inner.result.borrow_mut().take();
        inner.after_closed.next_and_complete(&result);
        inner.component.borrow_mut().take();
        inner.before_opened.complete();
        inner.after_opened.complete();
        inner.before_closed.complete();
        let subscriptions = std::mem::take(&mut *inner.subscriptions.borrow_mut());
        drop(subscriptions);
    }

    /// Emits when the enter transition starts.
    #[must_use]
    pub fn before_opened(&self) -> &Subject<()> {
        &self.inner.before_opened
    }

    /// Emits once the enter transition finished.
    #[must_use]
    pub fn after_opened(&self) -> &Subject<()> {
        &self.inner.after_opened
    }

    /// Emits the result when closing starts.
    #[must_use]
    pub fn before_closed(&self) -> &Subject<Option<R>> {
        &self.inner.before_closed
    }

    /// Emits the result once the dialog is fully closed.
    #[must_use]
    pub fn after_closed(&self) -> &Subject<Option<R>> {
        &self.inner.after_closed
    }

    #[must_use]
    pub fn backdrop_click(&self) -> &Subject<PointerEvent> {
        self.inner.overlay.backdrop_click()
    }

    #[must_use]
    pub fn keydown_events(&self) -> &Subject<KeyEvent> {
        self.inner.overlay.keydown_events()
    }

    #[must_use]
    pub fn outside_pointer_events(&self) -> &Subject<PointerEvent> {
        self.inner.overlay.outside_pointer_events()
    }

    pub fn update_size(&self, size: &DialogSize) -> &Self {
        self.inner.overlay.update_size(size);
        self
    }

    pub fn update_position(&self, position: &DialogPosition) -> &Self {
        self.inner.overlay.update_position(position);
        self
    }

    pub fn add_panel_class(&self, class: &str) -> &Self {
        self.inner.overlay.add_panel_class(class);
        self
    }

    pub fn remove_panel_class(&self, class: &str) -> &Self {
        self.inner.overlay.remove_panel_class(class);
        self
    }

    /// The content component, while the dialog is not closed.
    #[must_use]
    pub fn component_instance<C: 'static>(&self) -> Option<Rc<C>> {
        let component = self.inner.component.borrow().clone()?;
        component.downcast::<C>().ok()
    }

    /// The container, while the dialog is not closed.
    #[must_use]
    pub fn container_instance(&self) -> Option<DialogContainer> {
        self.inner.container.borrow().clone()
    }

    pub(crate) fn set_component(&self, component: Rc<dyn Any>) {
        *self.inner.component.borrow_mut() = Some(component);
    }
}

/// Type-erased view of an open dialog, as kept by the registry.
pub trait OpenDialog {
    fn id(&self) -> &str;
    fn serial(&self) -> DialogSerial;
    fn state(&self) -> DialogState;
    fn close_on_destroy(&self) -> bool;
    /// Close without a result.
    fn dismiss(&self);
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to any open dialog.
pub type AnyDialogRef = Rc<dyn OpenDialog>;

impl<R: 'static> OpenDialog for DialogRef<R> {
    fn id(&self) -> &str {
        DialogRef::id(self)
    }

    fn serial(&self) -> DialogSerial {
        self.inner.serial
    }

    fn state(&self) -> DialogState {
        DialogRef::state(self)
    }

    fn close_on_destroy(&self) -> bool {
        self.inner.config.close_on_destroy()
    }

    fn dismiss(&self) {
        self.close(None);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::animation::{ManualAnimationDriver, TransitionState};
    use crate::modal::dialog::{Dialog, DialogHost};
    use crate::modal::portal::TemplateContext;
    use ftui_dom::{Document, Modifiers};

    fn setup() -> (Document, Scheduler, Dialog, crate::modal::overlay::HeadlessOverlay) {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let (host, overlay) = DialogHost::headless(&doc, &scheduler);
        (doc, scheduler, Dialog::new(host), overlay)
    }

    fn open_empty<R: 'static>(dialog: &Dialog, config: DialogConfig) -> DialogRef<R> {
        dialog
            .open_template::<R>(|_: &TemplateContext<R>| {}, config)
            .expect("open")
    }

    #[test]
    fn close_runs_state_machine_once() {
        let (_doc, scheduler, dialog, _overlay) = setup();
        let dialog_ref = open_empty::<u32>(&dialog, DialogConfig::new());
        scheduler.run_until_idle();

        let closed = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&closed);
        dialog_ref
            .after_closed()
            .subscribe(move |result| c.borrow_mut().push(*result))
            .detach();

        dialog_ref.close(Some(7));
        assert_eq!(dialog_ref.state(), DialogState::Closing);
        dialog_ref.close(Some(8));
        scheduler.run_until_idle();
        dialog_ref.close(Some(9));

        assert_eq!(dialog_ref.state(), DialogState::Closed);
        assert_eq!(*closed.borrow(), vec![Some(7)]);
        assert!(dialog_ref.container_instance().is_none());
        assert!(dialog_ref.after_closed().is_closed());
        assert!(dialog_ref.before_opened().is_closed());
    }

    #[test]
    fn escape_with_modifier_is_ignored() {
        let (_doc, scheduler, dialog, overlay) = setup();
        let dialog_ref = open_empty::<()>(&dialog, DialogConfig::new());
        scheduler.run_until_idle();

        let chord = KeyEvent::new(KeyCode::Escape).with_modifiers(Modifiers::SHIFT);
        overlay.dispatch_keydown(&chord);
        assert_eq!(dialog_ref.state(), DialogState::Open);
        assert!(!chord.default_prevented());

        let escape = KeyEvent::new(KeyCode::Escape);
        overlay.dispatch_keydown(&escape);
        assert!(escape.default_prevented());
        assert_eq!(dialog_ref.state(), DialogState::Closing);
    }

    #[test]
    fn set_disable_close_gates_escape() {
        let (_doc, scheduler, dialog, overlay) = setup();
        let dialog_ref = open_empty::<()>(&dialog, DialogConfig::new());
        scheduler.run_until_idle();
        dialog_ref.set_disable_close(true);
        overlay.dispatch_keydown(&KeyEvent::new(KeyCode::Escape));
        assert_eq!(dialog_ref.state(), DialogState::Open);
        dialog_ref.set_disable_close(false);
        overlay.dispatch_keydown(&KeyEvent::new(KeyCode::Escape));
        assert_eq!(dialog_ref.state(), DialogState::Closing);
    }

    #[test]
    fn fallback_finishes_when_transition_never_completes() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let driver = ManualAnimationDriver::new(scheduler.clone());
        let (host, _overlay) = DialogHost::headless(&doc, &scheduler);
        let dialog = Dialog::new(host.with_animation_driver(Rc::new(driver.clone())));
        let dialog_ref = open_empty::<()>(
            &dialog,
            DialogConfig::new().with_exit_animation_duration(Duration::from_millis(75)),
        );
        scheduler.run_until_idle();
        let element = dialog_ref
            .container_instance()
            .map(|c| c.element())
            .expect("container");

        dialog_ref.close(None);
        scheduler.advance(Duration::from_millis(174));
        assert_eq!(dialog_ref.state(), DialogState::Closing);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(dialog_ref.state(), DialogState::Closed);

        // A late transition event is harmless.
        assert_eq!(driver.finish(element, TransitionState::Exit), 1);
        assert_eq!(dialog_ref.state(), DialogState::Closed);
    }

    #[test]
    fn transition_done_cancels_fallback() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let driver = ManualAnimationDriver::new(scheduler.clone());
        let (host, _overlay) = DialogHost::headless(&doc, &scheduler);
        let dialog = Dialog::new(host.with_animation_driver(Rc::new(driver.clone())));
        let dialog_ref = open_empty::<()>(&dialog, DialogConfig::new());
        scheduler.run_until_idle();
        let element = dialog_ref
            .container_instance()
            .map(|c| c.element())
            .expect("container");

        dialog_ref.close(None);
        scheduler.flush();
        assert_eq!(driver.finish(element, TransitionState::Exit), 1);
        assert_eq!(dialog_ref.state(), DialogState::Closed);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn component_instance_is_released_on_close() {
        let (_doc, scheduler, dialog, _overlay) = setup();
        let dialog_ref = dialog
            .open_component::<String, ()>(|_| String::from("body"), DialogConfig::new())
            .expect("open");
        assert_eq!(
            dialog_ref.component_instance::<String>().as_deref().map(String::as_str),
            Some("body")
        );
        assert!(dialog_ref.component_instance::<u8>().is_none());
        dialog_ref.close(None);
        scheduler.run_until_idle();
        assert!(dialog_ref.component_instance::<String>().is_none());
    }
}
