#![forbid(unsafe_code)]

//! Stack of focus traps where only the most recent one is active.
//!
//! Opening a nested dialog registers its trap on top of the stack, which
//! suspends the trap below. Closing the nested dialog deregisters its trap
//! and re-activates the one underneath.
//!
//! # Invariants
//!
//! 1. At most one registered trap is enabled, and it is the top of the stack.
//! 2. Re-registering a trap moves it to the top.
//! 3. Deregistering a trap below the top does not touch the top.
//! 4. `enable`/`disable` are never called while the stack is borrowed, so
//!    traps may call back into the manager.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a managed trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrapId(u64);

impl TrapId {
    /// Create a new unique trap ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl Default for TrapId {
    fn default() -> Self {
        Self::new()
    }
}

/// A trap the [`FocusTrapManager`] can suspend and resume.
pub trait ManagedFocusTrap {
    fn trap_id(&self) -> TrapId;

    /// Become the active trap.
    fn enable(&self);

    /// Stop trapping while another trap is on top (or permanently).
    fn disable(&self);
}

/// Shared LIFO stack of focus traps.
#[derive(Clone, Default)]
pub struct FocusTrapManager {
    stack: Rc<RefCell<Vec<Rc<dyn ManagedFocusTrap>>>>,
}

impl fmt::Debug for FocusTrapManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<TrapId> = self.stack.borrow().iter().map(|t| t.trap_id()).collect();
        f.debug_struct("FocusTrapManager")
            .field("stack", &ids)
            .finish()
    }
}

impl FocusTrapManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `trap` (moving it if already present) and make it the active trap.
    pub fn register(&self, trap: Rc<dyn ManagedFocusTrap>) {
        let id = trap.trap_id();
        let previous_top = {
            let mut stack = self.stack.borrow_mut();
            stack.retain(|t| t.trap_id() != id);
            stack.last().cloned()
        };
        if let Some(top) = previous_top {
            top.disable();
        }
        self.stack.borrow_mut().push(Rc::clone(&trap));
        tracing::trace!(trap = id.id(), depth = self.len(), "focus trap registered");
        trap.enable();
    }

    /// Disable `trap` and drop it from the stack, re-activating the new top
    /// if `trap` was on top.
    pub fn deregister(&self, trap: &dyn ManagedFocusTrap) {
        trap.disable();
        let id = trap.trap_id();
        let new_top = {
            let mut stack = self.stack.borrow_mut();
            let Some(index) = stack.iter().position(|t| t.trap_id() == id) else {
                return;
            };
            let was_top = index + 1 == stack.len();
            stack.remove(index);
            if was_top { stack.last().cloned() } else { None }
        };
        tracing::trace!(trap = id.id(), depth = self.len(), "focus trap deregistered");
        if let Some(top) = new_top {
            top.enable();
        }
    }

    /// Identifier of the active trap.
    #[must_use]
    pub fn top(&self) -> Option<TrapId> {
        self.stack.borrow().last().map(|t| t.trap_id())
    }

    #[must_use]
    pub fn contains(&self, id: TrapId) -> bool {
        self.stack.borrow().iter().any(|t| t.trap_id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.borrow().is_empty()
    }
}
