#![forbid(unsafe_code)]

//! Headless document model for FrankenTUI dialogs.
//!
//! This crate provides:
//! - [`Document`] for element trees, attributes, and focus tracking
//! - [`KeyEvent`] / [`PointerEvent`] input events with `prevent_default`
//! - [`Injector`] for type-keyed dependency lookup

pub mod dom;
pub mod event;
pub mod injector;

pub use dom::{
    Document, FocusEvent, FocusEventKind, FocusOrigin, ListenerId, ListenerScope, NodeId,
    Selector,
};
pub use event::{KeyCode, KeyEvent, Modifiers, PointerEvent};
pub use injector::{Injector, Provider};
