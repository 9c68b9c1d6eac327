#![forbid(unsafe_code)]

//! Focus traps that cooperate through a [`FocusTrapManager`].
//!
//! A [`ConfigurableFocusTrap`] wraps a [`FocusTrap`] and adds two things:
//!
//! - registration with the shared manager, so nested traps suspend the ones
//!   beneath them;
//! - an inert strategy that pulls focus back when it escapes the region.
//!
//! The `enabled` flag records what the owner asked for; whether the trap is
//! currently *active* is decided by the manager.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use ftui_dom::{Document, NodeId};
use ftui_runtime::Scheduler;

use crate::focus_trap::{FocusOptions, FocusTrap, TrapRegion};
use crate::inert::{EventListenerFocusTrapInertStrategy, FocusTrapInertStrategy};
use crate::manager::{FocusTrapManager, ManagedFocusTrap, TrapId};

/// Options for [`ConfigurableFocusTrapFactory::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigurableFocusTrapConfig {
    /// Postpone anchor insertion until [`FocusTrap::attach_anchors`].
    pub defer: bool,
}

/// A managed focus trap.
pub struct ConfigurableFocusTrap {
    id: TrapId,
    trap: FocusTrap,
    manager: FocusTrapManager,
    inert: Rc<dyn FocusTrapInertStrategy>,
    active: Cell<bool>,
    this: Weak<ConfigurableFocusTrap>,
}

impl fmt::Debug for ConfigurableFocusTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableFocusTrap")
            .field("id", &self.id)
            .field("trap", &self.trap)
            .field("active", &self.active.get())
            .finish()
    }
}

impl ConfigurableFocusTrap {
    fn new(
        trap: FocusTrap,
        manager: FocusTrapManager,
        inert: Rc<dyn FocusTrapInertStrategy>,
    ) -> Rc<Self> {
        let created = Rc::new_cyclic(|this| Self {
            id: TrapId::new(),
            trap,
            manager,
            inert,
            active: Cell::new(false),
            this: this.clone(),
        });
        created.manager.register(created.clone());
        created
    }

    #[must_use]
    pub fn id(&self) -> TrapId {
        self.id
    }

    /// The underlying anchor-based trap.
    #[must_use]
    pub fn trap(&self) -> &FocusTrap {
        &self.trap
    }

    #[must_use]
    pub fn region(&self) -> &TrapRegion {
        self.trap.region()
    }

    #[must_use]
    pub fn element(&self) -> NodeId {
        self.trap.element()
    }

    /// Whether the owner wants this trap on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.trap.is_enabled()
    }

    /// Whether this trap is the manager's top entry.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Turning the trap on registers it (making it the top trap); turning it
    /// off deregisters it.
    pub fn set_enabled(&self, enabled: bool) {
        self.trap.set_enabled_flag(enabled);
        if enabled {
            if let Some(this) = self.this.upgrade() {
                self.manager.register(this);
            }
        } else {
            self.manager.deregister(self);
        }
    }

    pub fn focus_initial_element(&self, options: FocusOptions) -> bool {
        self.trap.focus_initial_element(options)
    }

    pub fn focus_first_tabbable_element(&self, options: FocusOptions) -> bool {
        self.trap.focus_first_tabbable_element(options)
    }

    pub fn focus_last_tabbable_element(&self, options: FocusOptions) -> bool {
        self.trap.focus_last_tabbable_element(options)
    }

    pub fn focus_initial_element_when_ready(
        &self,
        options: FocusOptions,
        done: impl FnOnce(bool) + 'static,
    ) {
        self.trap.focus_initial_element_when_ready(options, done);
    }

    pub fn focus_first_tabbable_element_when_ready(
        &self,
        options: FocusOptions,
        done: impl FnOnce(bool) + 'static,
    ) {
        self.trap.focus_first_tabbable_element_when_ready(options, done);
    }

    /// Remove anchors and leave the manager's stack. Idempotent.
    pub fn destroy(&self) {
        self.trap.destroy();
        self.manager.deregister(self);
    }
}

impl ManagedFocusTrap for ConfigurableFocusTrap {
    fn trap_id(&self) -> TrapId {
        self.id
    }

    fn enable(&self) {
        if let Some(this) = self.this.upgrade() {
            self.inert.prevent_focus(&this);
        }
        self.trap.toggle_anchors(true);
        self.active.set(true);
    }

    fn disable(&self) {
        if let Some(this) = self.this.upgrade() {
            self.inert.allow_focus(&this);
        }
        self.trap.toggle_anchors(false);
        self.active.set(false);
    }
}

/// Creates [`ConfigurableFocusTrap`]s bound to one manager and strategy.
#[derive(Clone)]
pub struct ConfigurableFocusTrapFactory {
    doc: Document,
    scheduler: Scheduler,
    manager: FocusTrapManager,
    inert: Rc<dyn FocusTrapInertStrategy>,
}

impl fmt::Debug for ConfigurableFocusTrapFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableFocusTrapFactory")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl ConfigurableFocusTrapFactory {
    /// Factory using the event-listener inert strategy.
    #[must_use]
    pub fn new(doc: Document, scheduler: Scheduler, manager: FocusTrapManager) -> Self {
        let inert = Rc::new(EventListenerFocusTrapInertStrategy::new(scheduler.clone()));
        Self {
            doc,
            scheduler,
            manager,
            inert,
        }
    }

    /// Replace the inert strategy.
    #[must_use]
    pub fn with_inert_strategy(mut self, inert: Rc<dyn FocusTrapInertStrategy>) -> Self {
        self.inert = inert;
        self
    }

    #[must_use]
    pub fn manager(&self) -> &FocusTrapManager {
        &self.manager
    }

    /// Wrap `element` in a trap and register it as the active one.
    pub fn create(
        &self,
        element: NodeId,
        config: ConfigurableFocusTrapConfig,
    ) -> Rc<ConfigurableFocusTrap> {
        let trap = FocusTrap::new(self.doc.clone(), element, self.scheduler.clone(), config.defer);
        ConfigurableFocusTrap::new(trap, self.manager.clone(), Rc::clone(&self.inert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftui_dom::FocusOrigin;
    use std::time::Duration;

    fn region_with_button(doc: &Document) -> (NodeId, NodeId) {
        let region = doc.create_element("div");
        doc.append_child(doc.body(), region);
        let button = doc.create_element("button");
        doc.append_child(region, button);
        (region, button)
    }

    #[test]
    fn creation_registers_and_activates() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory = ConfigurableFocusTrapFactory::new(doc.clone(), scheduler, FocusTrapManager::new());
        let (region, _) = region_with_button(&doc);
        let trap = factory.create(region, ConfigurableFocusTrapConfig::default());
        assert!(trap.is_enabled());
        assert!(trap.is_active());
        assert_eq!(factory.manager().top(), Some(trap.id()));
    }

    #[test]
    fn nested_trap_suspends_outer_and_resumes_on_destroy() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory = ConfigurableFocusTrapFactory::new(doc.clone(), scheduler, FocusTrapManager::new());
        let (outer_region, _) = region_with_button(&doc);
        let (inner_region, _) = region_with_button(&doc);

        let outer = factory.create(outer_region, ConfigurableFocusTrapConfig::default());
        let inner = factory.create(inner_region, ConfigurableFocusTrapConfig::default());
        assert!(!outer.is_active());
        assert!(outer.is_enabled());
        assert!(inner.is_active());
        let (outer_start, _) = outer.trap().anchors().expect("anchors");
        assert!(!doc.has_attribute(outer_start, "tabindex"));

        inner.destroy();
        inner.destroy();
        assert!(outer.is_active());
        assert_eq!(doc.attribute(outer_start, "tabindex").as_deref(), Some("0"));
        assert_eq!(factory.manager().len(), 1);
    }

    #[test]
    fn disabling_deregisters() {
        let doc = Document::new();
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), Scheduler::new(), FocusTrapManager::new());
        let (region, _) = region_with_button(&doc);
        let trap = factory.create(region, ConfigurableFocusTrapConfig::default());
        trap.set_enabled(false);
        assert!(!trap.is_enabled());
        assert!(!trap.is_active());
        assert!(factory.manager().is_empty());
        trap.set_enabled(true);
        assert!(trap.is_active());
    }

    #[test]
    fn escaped_focus_is_pulled_back() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler.clone(), FocusTrapManager::new());
        let (region, button) = region_with_button(&doc);
        let outside = doc.create_element("button");
        doc.append_child(doc.body(), outside);
        let _trap = factory.create(region, ConfigurableFocusTrapConfig::default());

        assert!(doc.focus(outside, FocusOrigin::Mouse));
        assert_eq!(doc.active_element(), Some(outside));
        scheduler.advance(Duration::ZERO);
        assert_eq!(doc.active_element(), Some(button));
    }

    #[test]
    fn destroyed_trap_stops_pulling_focus() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler.clone(), FocusTrapManager::new());
        let (region, _) = region_with_button(&doc);
        let outside = doc.create_element("button");
        doc.append_child(doc.body(), outside);
        let trap = factory.create(region, ConfigurableFocusTrapConfig::default());
        trap.destroy();
        assert_eq!(doc.listener_count(), 0);
        doc.focus(outside, FocusOrigin::Mouse);
        scheduler.run_until_idle();
        assert_eq!(doc.active_element(), Some(outside));
    }
}
