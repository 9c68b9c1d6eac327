#![forbid(unsafe_code)]

//! Strategies that keep focus from escaping an active trap.
//!
//! The anchors of a [`FocusTrap`](crate::FocusTrap) only catch Tab
//! navigation. Clicking outside, or programmatic focus elsewhere, needs a
//! separate guard: an inert strategy is told when a trap becomes active
//! ([`prevent_focus`](FocusTrapInertStrategy::prevent_focus)) and when it
//! stops being active ([`allow_focus`](FocusTrapInertStrategy::allow_focus)).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Focus moves into another overlay pane | Nested overlay (menu, tooltip) | Tolerated |
//! | Trap disabled before the re-check runs | Dialog closed in the same tick | No refocus |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use ftui_dom::{FocusEventKind, ListenerId, ListenerScope};
use ftui_runtime::Scheduler;

use crate::configurable::ConfigurableFocusTrap;
use crate::focus_trap::FocusOptions;
use crate::manager::TrapId;

/// Class carried by every overlay pane; focus inside one is never pulled back.
pub const OVERLAY_PANE_CLASS: &str = "ftui-overlay-pane";

/// Hook invoked when a managed trap gains or loses the top position.
pub trait FocusTrapInertStrategy {
    /// Start keeping focus inside `trap`.
    fn prevent_focus(&self, trap: &Rc<ConfigurableFocusTrap>);

    /// Stop guarding `trap`.
    fn allow_focus(&self, trap: &Rc<ConfigurableFocusTrap>);
}

/// Watches document focus events and refocuses the trap after focus lands
/// outside it.
pub struct EventListenerFocusTrapInertStrategy {
    scheduler: Scheduler,
    listeners: RefCell<AHashMap<TrapId, ListenerId>>,
}

impl fmt::Debug for EventListenerFocusTrapInertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerFocusTrapInertStrategy")
            .field("guarded", &self.listeners.borrow().len())
            .finish()
    }
}

impl EventListenerFocusTrapInertStrategy {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            listeners: RefCell::new(AHashMap::new()),
        }
    }

    /// Number of traps currently guarded.
    #[must_use]
    pub fn guarded(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl FocusTrapInertStrategy for EventListenerFocusTrapInertStrategy {
    fn prevent_focus(&self, trap: &Rc<ConfigurableFocusTrap>) {
        if self.listeners.borrow().contains_key(&trap.id()) {
            return;
        }
        let weak = Rc::downgrade(trap);
        let scheduler = self.scheduler.clone();
        let region = trap.region().clone();
        let pane_selector = format!(".{OVERLAY_PANE_CLASS}");
        let doc = region.document().clone();
        let id = doc.add_focus_listener(ListenerScope::Document, move |doc, event| {
            if event.kind != FocusEventKind::Focus
                || region.contains(event.target)
                || doc.closest(event.target, &pane_selector).is_some()
            {
                return;
            }
            // Wait for the focus change to settle before pulling it back.
            let weak = weak.clone();
            let region = region.clone();
            scheduler.set_timeout(Duration::ZERO, move || {
                let Some(trap) = weak.upgrade() else {
                    return;
                };
                if trap.is_enabled() && trap.is_active() && !region.has_focus() {
                    tracing::debug!(trap = trap.id().id(), "focus escaped trap; refocusing");
                    trap.focus_first_tabbable_element(FocusOptions::default());
                }
            });
        });
        self.listeners.borrow_mut().insert(trap.id(), id);
    }

    fn allow_focus(&self, trap: &Rc<ConfigurableFocusTrap>) {
        let removed = self.listeners.borrow_mut().remove(&trap.id());
        if let Some(id) = removed {
            trap.region().document().remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurable::{ConfigurableFocusTrapConfig, ConfigurableFocusTrapFactory};
    use crate::manager::FocusTrapManager;
    use ftui_dom::{Document, FocusOrigin};

    #[test]
    fn focus_inside_overlay_pane_is_tolerated() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler.clone(), FocusTrapManager::new());
        let region = doc.create_element("div");
        doc.append_child(doc.body(), region);
        let inside = doc.create_element("button");
        doc.append_child(region, inside);
        let pane = doc.create_element("div");
        doc.add_class(pane, OVERLAY_PANE_CLASS);
        doc.append_child(doc.body(), pane);
        let menu_item = doc.create_element("button");
        doc.append_child(pane, menu_item);

        let _trap = factory.create(region, ConfigurableFocusTrapConfig::default());
        doc.focus(menu_item, FocusOrigin::Mouse);
        scheduler.run_until_idle();
        assert_eq!(doc.active_element(), Some(menu_item));
    }

    #[test]
    fn one_listener_per_trap() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let strategy = Rc::new(EventListenerFocusTrapInertStrategy::new(scheduler.clone()));
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler, FocusTrapManager::new())
                .with_inert_strategy(strategy.clone());
        let region = doc.create_element("div");
        doc.append_child(doc.body(), region);

        let trap = factory.create(region, ConfigurableFocusTrapConfig::default());
        assert_eq!(strategy.guarded(), 1);
        strategy.prevent_focus(&trap);
        assert_eq!(strategy.guarded(), 1);
        trap.destroy();
        assert_eq!(strategy.guarded(), 0);
    }

    #[test]
    fn suspended_trap_does_not_refocus() {
        let doc = Document::new();
        let scheduler = Scheduler::new();
        let factory =
            ConfigurableFocusTrapFactory::new(doc.clone(), scheduler.clone(), FocusTrapManager::new());
        let outer_region = doc.create_element("div");
        doc.append_child(doc.body(), outer_region);
        let outer_button = doc.create_element("button");
        doc.append_child(outer_region, outer_button);
        let inner_region = doc.create_element("div");
        doc.append_child(doc.body(), inner_region);
        let inner_button = doc.create_element("button");
        doc.append_child(inner_region, inner_button);

        let _outer = factory.create(outer_region, ConfigurableFocusTrapConfig::default());
        let _inner = factory.create(inner_region, ConfigurableFocusTrapConfig::default());
        doc.focus(outer_button, FocusOrigin::Mouse);
        scheduler.run_until_idle();
        assert_eq!(doc.active_element(), Some(inner_button));
    }
}
