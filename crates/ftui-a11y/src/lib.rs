#![forbid(unsafe_code)]

//! Accessibility building blocks for FrankenTUI modals.
//!
//! - [`InteractivityChecker`]: focusable / tabbable predicates
//! - [`FocusTrap`]: anchor-based Tab confinement
//! - [`ConfigurableFocusTrap`] + [`FocusTrapManager`]: nested traps where
//!   only the top one is active
//! - [`EventListenerFocusTrapInertStrategy`]: pulls escaped focus back
//! - [`AriaHiddenSnapshot`]: hides background content and restores it

pub mod aria_hidden;
pub mod configurable;
pub mod focus_trap;
pub mod inert;
pub mod interactivity;
pub mod manager;

pub use aria_hidden::AriaHiddenSnapshot;
pub use configurable::{
    ConfigurableFocusTrap, ConfigurableFocusTrapConfig, ConfigurableFocusTrapFactory,
};
pub use focus_trap::{
    ANCHOR_CLASS, FOCUS_INITIAL_ATTR, FOCUS_REGION_END_ATTR, FOCUS_REGION_START_ATTR,
    FocusOptions, FocusTrap, TrapRegion,
};
pub use inert::{EventListenerFocusTrapInertStrategy, FocusTrapInertStrategy, OVERLAY_PANE_CLASS};
pub use interactivity::{FocusableConfig, InteractivityChecker};
pub use manager::{FocusTrapManager, ManagedFocusTrap, TrapId};
