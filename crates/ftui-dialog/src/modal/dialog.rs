#![forbid(unsafe_code)]

//! The dialog service.
//!
//! [`Dialog`] opens content in an overlay, keeps the registry of open
//! dialogs, and hides the rest of the page from assistive technology while
//! any dialog is open. Scopes created with [`Dialog::child`] share the
//! registry of their root, so `close_all` and `get_by_id` behave the same
//! from every scope; `destroy` only closes what the scope itself opened.
//!
//! # Opening
//!
//! 1. Merge the config over the scope defaults and settle the id.
//! 2. Create the overlay pane and attach a [`DialogContainer`] to it.
//! 3. Build the [`DialogRef`] and the content injector.
//! 4. Attach the content; the container starts trapping focus.
//! 5. Hide the page if this is the first open dialog.
//! 6. Register the dialog, emit `after_opened`, start the enter transition.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `DuplicateId` | id already open anywhere on the shared registry | `Err` before any DOM change |
//! | `ContentAlreadyAttached` | content attached twice to one container | `Err`, the half-open dialog is closed |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ftui_a11y::{ConfigurableFocusTrapFactory, FocusTrapManager};
use ftui_dom::{Document, Injector, NodeId, Provider};
use ftui_runtime::{Scheduler, Subject, Subscription};

use super::animation::{AnimationDriver, TimedAnimationDriver};
use super::config::{DialogConfig, DialogConfigHandle};
use super::container::{ContainerParts, DialogContainer};
use super::dialog_ref::{AnyDialogRef, DialogRef, DialogState, RefParts};
use super::overlay::{HeadlessOverlay, Overlay, OverlayConfig};
use super::portal::{ComponentPortal, ContentContext, DomPortal, TemplateContext, TemplatePortal};
use super::stack::{DialogScope, DialogSerial};

static DIALOG_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_dialog_id() -> String {
    format!("ftui-dialog-{}", DIALOG_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Errors from opening a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    /// Another open dialog already uses this id.
    DuplicateId { id: String },
    /// The container already hosts content.
    ContentAlreadyAttached,
}

impl std::fmt::Display for DialogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(
                f,
                "Dialog with ID \"{id}\" exists already. The dialog ID must be unique."
            ),
            Self::ContentAlreadyAttached => {
                write!(f, "attempting to attach dialog content after content is already attached")
            }
        }
    }
}

impl std::error::Error for DialogError {}

/// Collaborators shared by every dialog a service opens.
#[derive(Clone)]
pub struct DialogHost {
    doc: Document,
    scheduler: Scheduler,
    overlay: Rc<dyn Overlay>,
    animation: Rc<dyn AnimationDriver>,
    focus_traps: ConfigurableFocusTrapFactory,
    injector: Injector,
}

impl fmt::Debug for DialogHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogHost")
            .field("doc", &self.doc)
            .field("traps", &self.focus_traps.manager().len())
            .finish_non_exhaustive()
    }
}

impl DialogHost {
    /// Host with timed transitions, a fresh trap manager, and an empty
    /// root injector.
    pub fn new(doc: Document, scheduler: Scheduler, overlay: Rc<dyn Overlay>) -> Self {
        let focus_traps =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler.clone(), FocusTrapManager::new());
        Self {
            animation: Rc::new(TimedAnimationDriver::new(scheduler.clone())),
            doc,
            scheduler,
            overlay,
            focus_traps,
            injector: Injector::root(),
        }
    }

    /// Host over a [`HeadlessOverlay`], returned alongside for driving input.
    #[must_use]
    pub fn headless(doc: &Document, scheduler: &Scheduler) -> (Self, HeadlessOverlay) {
        let overlay = HeadlessOverlay::new(doc.clone());
        let host = Self::new(doc.clone(), scheduler.clone(), Rc::new(overlay.clone()));
        (host, overlay)
    }

    #[must_use]
    pub fn with_animation_driver(mut self, animation: Rc<dyn AnimationDriver>) -> Self {
        self.animation = animation;
        self
    }

    /// Share a trap factory (and its manager) with other overlays.
    #[must_use]
    pub fn with_focus_trap_factory(mut self, focus_traps: ConfigurableFocusTrapFactory) -> Self {
        self.focus_traps = focus_traps;
        self
    }

    /// Parent injector for dialogs whose config names none.
    #[must_use]
    pub fn with_injector(mut self, injector: Injector) -> Self {
        self.injector = injector;
        self
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn focus_trap_manager(&self) -> &FocusTrapManager {
        self.focus_traps.manager()
    }
}

struct DialogInner {
    host: DialogHost,
    defaults: DialogConfig,
    scope: DialogScope,
    /// Dialogs opened through this scope, oldest first.
    tracked: RefCell<Vec<AnyDialogRef>>,
    destroyed: Cell<bool>,
}

impl DialogInner {
    fn untrack(&self, serial: DialogSerial) {
        self.tracked.borrow_mut().retain(|d| d.serial() != serial);
    }
}

/// A dialog service scope.
pub struct Dialog {
    inner: Rc<DialogInner>,
}

impl fmt::Debug for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialog")
            .field("scope", &self.inner.scope)
            .field("tracked", &self.inner.tracked.borrow().len())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl Dialog {
    /// A root scope with built-in defaults.
    #[must_use]
    pub fn new(host: DialogHost) -> Self {
        Self::with_defaults(host, DialogConfig::default())
    }

    /// A root scope whose dialogs fall back to `defaults`.
    #[must_use]
    pub fn with_defaults(host: DialogHost, defaults: DialogConfig) -> Self {
        Self::from_parts(host, defaults, DialogScope::root())
    }

    fn from_parts(host: DialogHost, defaults: DialogConfig, scope: DialogScope) -> Self {
        Self {
            inner: Rc::new(DialogInner {
                host,
                defaults,
                scope,
                tracked: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// A child scope sharing this scope's registry and defaults.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::from_parts(
            self.inner.host.clone(),
            self.inner.defaults.clone(),
            self.inner.scope.child(),
        )
    }

    #[must_use]
    pub fn host(&self) -> &DialogHost {
        &self.inner.host
    }

    #[must_use]
    pub fn scope(&self) -> &DialogScope {
        &self.inner.scope
    }

    /// Open a component built by `factory`.
    pub fn open_component<C: 'static, R: 'static>(
        &self,
        factory: impl FnOnce(&ContentContext) -> C + 'static,
        config: DialogConfig,
    ) -> Result<DialogRef<R>, DialogError> {
        let portal = ComponentPortal::new(factory);
        self.open_with(config, |container, injector, _| {
            let component = container.attach_component_portal(portal, injector)?;
            Ok(Some(component.erased()))
        })
    }

    /// Open content rendered by `template`.
    pub fn open_template<R: 'static>(
        &self,
        template: impl FnOnce(&TemplateContext<R>) + 'static,
        config: DialogConfig,
    ) -> Result<DialogRef<R>, DialogError> {
        self.open_with(config, |container, injector, dialog_ref| {
            let dialog_ref = dialog_ref.clone();
            let portal = TemplatePortal::new(move |content: &ContentContext| {
                template(&TemplateContext {
                    dialog_ref,
                    data: content.data(),
                    content: content.clone(),
                });
            });
            container.attach_template_portal(portal, injector)?;
            Ok(None)
        })
    }

    /// Open a dialog around an existing element. The element goes back to
    /// where it was once the dialog closes.
    pub fn open_dom<R: 'static>(
        &self,
        element: NodeId,
        config: DialogConfig,
    ) -> Result<DialogRef<R>, DialogError> {
        self.open_with(config, |container, _, _| {
            container.attach_dom_portal(DomPortal::new(element))?;
            Ok(None)
        })
    }

    fn open_with<R: 'static>(
        &self,
        config: DialogConfig,
        attach: impl FnOnce(
            &DialogContainer,
            Injector,
            &DialogRef<R>,
        ) -> Result<Option<Rc<dyn std::any::Any>>, DialogError>,
    ) -> Result<DialogRef<R>, DialogError> {
        let inner = &self.inner;
        let host = &inner.host;
        let stack = Rc::clone(inner.scope.effective());

        let mut config = config.merged_over(&inner.defaults);
        let id = config.id.clone().unwrap_or_else(next_dialog_id);
        if stack.find_by_id(&id).is_some() {
            return Err(DialogError::DuplicateId { id });
        }
        config.id = Some(id.clone());
        let config = Rc::new(config);
        let disable_close = Rc::new(Cell::new(config.disable_close()));

        let overlay = host.overlay.create(&OverlayConfig::from_dialog(&config));
        let container = DialogContainer::new(ContainerParts {
            doc: host.doc.clone(),
            scheduler: host.scheduler.clone(),
            traps: host.focus_traps.clone(),
            animation: Rc::clone(&host.animation),
            overlay: Rc::clone(&overlay),
            config: Rc::clone(&config),
            disable_close: Rc::clone(&disable_close),
        });
        overlay.attach(container.element());

        let serial = DialogSerial::new();
        let dialog_ref = DialogRef::<R>::new(RefParts {
            id: id.clone(),
            serial,
            config: Rc::clone(&config),
            disable_close,
            overlay,
            container: container.clone(),
            scheduler: host.scheduler.clone(),
        });

        let mut providers = vec![
            Provider::value(dialog_ref.clone()),
            Provider::value(DialogConfigHandle(Rc::clone(&config))),
        ];
        if let Some(data) = &config.data {
            providers.push(Provider::value(data.clone()));
        }
        if let Some(direction) = config.direction {
            providers.push(Provider::value(direction));
        }
        providers.extend(config.providers.iter().cloned());
        let parent = config.injector.as_ref().unwrap_or(&host.injector);
        let injector = Injector::child(parent, providers);

        match attach(&container, injector, &dialog_ref) {
            Ok(Some(component)) => dialog_ref.set_component(component),
            Ok(None) => {}
            Err(err) => {
                dialog_ref.close(None);
                return Err(err);
            }
        }

        stack.hide_siblings_if_first(&host.doc, host.overlay.container_element());

        let any: AnyDialogRef = Rc::new(dialog_ref.clone());
        let scope: Weak<DialogInner> = Rc::downgrade(inner);
        let registry = Rc::clone(&stack);
        let doc = host.doc.clone();
        dialog_ref
            .after_closed()
            .subscribe(move |_| {
                if let Some(scope) = scope.upgrade() {
                    scope.untrack(serial);
                }
                registry.remove(&doc, serial, true);
            })
            .detach();

        inner.tracked.borrow_mut().push(Rc::clone(&any));
        tracing::debug!(dialog = %id, open = stack.len() + 1, "dialog opened");
        stack.push(any);
        // Content may have closed the dialog while it was being attached.
        if dialog_ref.state() == DialogState::Open {
            container.start_enter_animation();
        }
        Ok(dialog_ref)
    }

    /// Open dialogs on the shared registry, oldest first.
    #[must_use]
    pub fn open_dialogs(&self) -> Vec<AnyDialogRef> {
        self.inner.scope.effective().snapshot()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<AnyDialogRef> {
        self.inner.scope.effective().find_by_id(id)
    }

    /// Typed lookup; `None` if the id is unknown or `R` is not its result type.
    #[must_use]
    pub fn get_ref<R: 'static>(&self, id: &str) -> Option<DialogRef<R>> {
        let dialog = self.get_by_id(id)?;
        dialog.as_any().downcast_ref::<DialogRef<R>>().cloned()
    }

    /// Close every open dialog, newest first.
    pub fn close_all(&self) {
        let dialogs = self.open_dialogs();
        for dialog in dialogs.iter().rev() {
            dialog.dismiss();
        }
    }

    /// Emits each dialog right after it opens, from any scope.
    #[must_use]
    pub fn after_opened(&self) -> &Subject<AnyDialogRef> {
        self.inner.scope.effective().after_opened()
    }

    /// Call `on_closed` whenever the last open dialog has closed, and once
    /// right away if nothing is open now.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn after_all_closed(&self, mut on_closed: impl FnMut() + 'static) -> Subscription {
        let stack = self.inner.scope.effective();
        if stack.is_empty() {
            on_closed();
        }
        stack.after_all_closed().subscribe(move |_: &()| on_closed())
    }

    /// Tear the scope down.
    ///
    /// Dialogs this scope opened with `close_on_destroy == false` are only
    /// untracked; all other dialogs it opened are closed, newest first.
    /// Dialogs opened through other scopes are left alone. Idempotent.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        let stack = inner.scope.effective();
        let tracked = std::mem::take(&mut *inner.tracked.borrow_mut());
        for dialog in tracked.iter().rev().filter(|d| !d.close_on_destroy()) {
            stack.remove(&inner.host.doc, dialog.serial(), false);
        }
        for dialog in tracked.iter().rev().filter(|d| d.close_on_destroy()) {
            if dialog.state() == DialogState::Open {
                dialog.dismiss();
            }
        }
        if !inner.scope.is_inherited() {
            stack.after_opened().complete();
            stack.after_all_closed().complete();
        }
        tracing::debug!(closed = tracked.len(), "dialog scope destroyed");
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::config::{DEFAULT_EXIT_DURATION, Direction};
    use ftui_dom::KeyCode;

    fn service() -> (Document, Scheduler, Dialog, HeadlessOverlay) {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let (host, overlay) = DialogHost::headless(&doc, &scheduler);
        (doc, scheduler, Dialog::new(host), overlay)
    }

    #[test]
    fn generated_ids_are_distinct() {
        let (doc, _scheduler, dialog, _overlay) = service();
        let a = dialog.open_template::<()>(|_| {}, DialogConfig::new()).expect("a");
        let b = dialog.open_template::<()>(|_| {}, DialogConfig::new()).expect("b");
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("ftui-dialog-"));
        let element = a.container_instance().map(|c| c.element()).expect("container");
        assert_eq!(doc.attribute(element, "id").as_deref(), Some(a.id()));
    }

    #[test]
    fn duplicate_id_is_rejected_before_dom_changes() {
        let (_doc, _scheduler, dialog, overlay) = service();
        let first = dialog
            .open_template::<()>(|_| {}, DialogConfig::new().with_id("pizza"))
            .expect("first");
        let err = dialog
            .open_template::<()>(|_| {}, DialogConfig::new().with_id("pizza"))
            .expect_err("duplicate");
        assert_eq!(
            err.to_string(),
            "Dialog with ID \"pizza\" exists already. The dialog ID must be unique."
        );
        assert_eq!(overlay.open_overlays().len(), 1);
        let found = dialog.get_by_id("pizza").expect("registered");
        assert_eq!(found.serial(), first.serial());
    }

    #[test]
    fn defaults_apply_unless_overridden() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let (host, overlay) = DialogHost::headless(&doc, &scheduler);
        let dialog = Dialog::with_defaults(host, DialogConfig::new().with_disable_close(true));
        let locked = dialog.open_template::<()>(|_| {}, DialogConfig::new()).expect("open");
        scheduler.run_until_idle();
        overlay.dispatch_keydown(&ftui_dom::KeyEvent::new(KeyCode::Escape));
        assert_eq!(locked.state(), DialogState::Open);

        let open = dialog
            .open_template::<()>(|_| {}, DialogConfig::new().with_disable_close(false))
            .expect("open");
        overlay.dispatch_keydown(&ftui_dom::KeyEvent::new(KeyCode::Escape));
        assert_eq!(open.state(), DialogState::Closing);
        assert_eq!(locked.state(), DialogState::Open);
    }

    #[test]
    fn content_sees_injected_values() {
        let (_doc, _scheduler, dialog, _overlay) = service();
        #[derive(Clone)]
        struct Theme(&'static str);

        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let dialog_ref = dialog
            .open_component::<(), &'static str>(
                move |ctx| {
                    let theme = ctx.injector.get::<Theme>().map(|t| t.0);
                    let direction = ctx.injector.get::<Direction>();
                    let data = ctx.data().and_then(|d| d.get::<u32>().copied());
                    let own = ctx.dialog_ref::<&'static str>().map(|r| r.id().to_owned());
                    *s.borrow_mut() = Some((theme, direction, data, own));
                },
                DialogConfig::new()
                    .with_data(42_u32)
                    .with_direction(Direction::Rtl)
                    .with_provider(Provider::value(Theme("dark"))),
            )
            .expect("open");
        assert_eq!(
            *seen.borrow(),
            Some((
                Some("dark"),
                Some(Direction::Rtl),
                Some(42),
                Some(dialog_ref.id().to_owned())
            ))
        );
    }

    #[test]
    fn template_can_close_its_own_dialog() {
        let (_doc, scheduler, dialog, _overlay) = service();
        let closer = Rc::new(RefCell::new(None));
        let c = Rc::clone(&closer);
        let dialog_ref = dialog
            .open_template::<&'static str>(
                move |ctx| *c.borrow_mut() = Some(ctx.dialog_ref.clone()),
                DialogConfig::new(),
            )
            .expect("open");
        let result = Rc::new(RefCell::new(None));
        let r = Rc::clone(&result);
        dialog_ref
            .after_closed()
            .subscribe(move |value| *r.borrow_mut() = Some(*value))
            .detach();

        if let Some(own) = closer.borrow_mut().take() {
            own.close(Some("done"));
        }
        scheduler.run_until_idle();
        assert_eq!(*result.borrow(), Some(Some("done")));
        assert!(dialog.open_dialogs().is_empty());
    }

    #[test]
    fn closing_during_attach_skips_the_enter_transition() {
        let (_doc, scheduler, dialog, _overlay) = service();
        let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));
        let l = Rc::clone(&log);
        let dialog_ref = dialog
            .open_template::<()>(
                move |ctx| {
                    let (opened, closing) = (Rc::clone(&l), Rc::clone(&l));
                    ctx.dialog_ref
                        .after_opened()
                        .subscribe(move |_: &()| opened.borrow_mut().push("after_opened"))
                        .detach();
                    ctx.dialog_ref
                        .before_closed()
                        .subscribe(move |_| closing.borrow_mut().push("before_closed"))
                        .detach();
                    ctx.dialog_ref.close(None);
                },
                DialogConfig::new(),
            )
            .expect("open");
        let l = Rc::clone(&log);
        dialog_ref
            .after_closed()
            .subscribe(move |_| l.borrow_mut().push("after_closed"))
            .detach();
        assert_eq!(dialog_ref.state(), DialogState::Closing);
        assert!(dialog.host().focus_trap_manager().is_empty());

        let container = dialog_ref.container_instance().expect("closing");
        scheduler.flush();
        assert!(!container.contains_focus());

        scheduler.advance(DEFAULT_EXIT_DURATION);
        assert_eq!(dialog_ref.state(), DialogState::Closed);
        assert_eq!(*log.borrow(), vec!["before_closed", "after_closed"]);
        assert!(dialog.open_dialogs().is_empty());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn typed_lookup_checks_result_type() {
        let (_doc, _scheduler, dialog, _overlay) = service();
        let _ = dialog
            .open_template::<String>(|_| {}, DialogConfig::new().with_id("typed"))
            .expect("open");
        assert!(dialog.get_ref::<String>("typed").is_some());
        assert!(dialog.get_ref::<u8>("typed").is_none());
        assert!(dialog.get_ref::<String>("missing").is_none());
    }

    #[test]
    fn after_opened_reports_each_dialog() {
        let (_doc, _scheduler, dialog, _overlay) = service();
        let ids = Rc::new(RefCell::new(Vec::new()));
        let i = Rc::clone(&ids);
        let _sub = dialog
            .after_opened()
            .subscribe(move |d| i.borrow_mut().push(d.id().to_owned()));
        let child = dialog.child();
        let _ = child
            .open_template::<()>(|_| {}, DialogConfig::new().with_id("from-child"))
            .expect("open");
        assert_eq!(*ids.borrow(), vec!["from-child".to_owned()]);
    }

    #[test]
    fn destroy_untracks_dialogs_that_outlive_scope() {
        let (doc, scheduler, dialog, _overlay) = service();
        let main = doc.create_element("main");
        doc.append_child(doc.body(), main);
        let keep = dialog
            .open_template::<()>(|_| {}, DialogConfig::new().with_close_on_destroy(false))
            .expect("keep");
        let gone = dialog.open_template::<()>(|_| {}, DialogConfig::new()).expect("gone");
        assert_eq!(doc.attribute(main, "aria-hidden").as_deref(), Some("true"));

        let all_closed = Rc::new(Cell::new(0));
        let a = Rc::clone(&all_closed);
        let _sub = dialog.after_all_closed(move || a.set(a.get() + 1));
        assert_eq!(all_closed.get(), 0);

        dialog.destroy();
        dialog.destroy();
        scheduler.run_until_idle();
        assert_eq!(keep.state(), DialogState::Open);
        assert_eq!(gone.state(), DialogState::Closed);
        assert!(!doc.has_attribute(main, "aria-hidden"));
        assert!(dialog.open_dialogs().is_empty());
    }
}
