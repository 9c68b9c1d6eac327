#![forbid(unsafe_code)]

//! Input events delivered to overlays and dialogs.
//!
//! Events carry a shared "default prevented" flag so a handler deep in the
//! dispatch chain can signal the host that the keystroke or click was consumed.

use bitflags::bitflags;
use std::cell::Cell;

use crate::dom::NodeId;

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT = 0b0010;
        const CTRL = 0b0100;
        const SUPER = 0b1000;
    }
}

/// Key identifiers relevant to dialog handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    Enter,
    Char(char),
}

/// A keydown event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    default_prevented: Cell<bool>,
}

impl KeyEvent {
    /// Create a key event with no modifiers.
    #[must_use]
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            default_prevented: Cell::new(false),
        }
    }

    /// Set the held modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether any modifier key is held.
    #[inline]
    #[must_use]
    pub fn has_modifier(&self) -> bool {
        !self.modifiers.is_empty()
    }

    /// Mark the event as consumed.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Whether a handler consumed the event.
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// A pointer (mouse/touch) event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEvent {
    /// Element that received the pointer event, if any.
    pub target: Option<NodeId>,
    default_prevented: Cell<bool>,
}

impl PointerEvent {
    /// Create a pointer event aimed at `target`.
    #[must_use]
    pub fn new(target: Option<NodeId>) -> Self {
        Self {
            target,
            default_prevented: Cell::new(false),
        }
    }

    /// Mark the event as consumed.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Whether a handler consumed the event.
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}
