#![forbid(unsafe_code)]

//! Open-dialog registry shared across service scopes.
//!
//! An [`OpenDialogStack`] holds every open dialog in open order, the
//! service-wide `after_opened` and `after_all_closed` streams, and the
//! `aria-hidden` snapshot taken when the first dialog opened. A service
//! scope either owns a stack or borrows its parent's ([`DialogScope`]), so
//! lookups and `close_all` see the same dialogs from any scope.
//!
//! # Invariants
//!
//! 1. Ids are unique among the dialogs on one stack.
//! 2. The snapshot is applied on the 0 → 1 transition and restored on the
//!    1 → 0 transition, never in between.
//! 3. Only the dialog service mutates the stack.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ftui_a11y::AriaHiddenSnapshot;
use ftui_dom::{Document, NodeId};
use ftui_runtime::Subject;

use super::dialog_ref::AnyDialogRef;

static DIALOG_SERIAL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one opened dialog, independent of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DialogSerial(u64);

impl DialogSerial {
    pub(crate) fn new() -> Self {
        Self(DIALOG_SERIAL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Registry of open dialogs plus the streams and snapshot that go with it.
pub struct OpenDialogStack {
    dialogs: RefCell<Vec<AnyDialogRef>>,
    after_opened: Subject<AnyDialogRef>,
    after_all_closed: Subject<()>,
    aria: RefCell<AriaHiddenSnapshot>,
}

impl fmt::Debug for OpenDialogStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .dialogs
            .borrow()
            .iter()
            .map(|d| d.id().to_owned())
            .collect();
        f.debug_struct("OpenDialogStack")
            .field("dialogs", &ids)
            .field("aria_hidden", &self.aria.borrow().len())
            .finish()
    }
}

impl Default for OpenDialogStack {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenDialogStack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dialogs: RefCell::new(Vec::new()),
            after_opened: Subject::new(),
            after_all_closed: Subject::new(),
            aria: RefCell::new(AriaHiddenSnapshot::new()),
        }
    }

    /// Open dialogs, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AnyDialogRef> {
        self.dialogs.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dialogs.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dialogs.borrow().is_empty()
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<AnyDialogRef> {
        self.dialogs.borrow().iter().find(|d| d.id() == id).cloned()
    }

    #[must_use]
    pub fn after_opened(&self) -> &Subject<AnyDialogRef> {
        &self.after_opened
    }

    #[must_use]
    pub fn after_all_closed(&self) -> &Subject<()> {
        &self.after_all_closed
    }

    /// Whether siblings of the overlay container are currently hidden.
    #[must_use]
    pub fn is_hiding_siblings(&self) -> bool {
        self.aria.borrow().is_applied()
    }

    /// Hide everything next to `overlay_container` if nothing is open yet.
    pub(crate) fn hide_siblings_if_first(&self, doc: &Document, overlay_container: NodeId) {
        if self.is_empty() {
            self.aria.borrow_mut().hide_siblings(doc, overlay_container);
        }
    }

    pub(crate) fn push(&self, dialog: AnyDialogRef) {
        self.dialogs.borrow_mut().push(Rc::clone(&dialog));
        self.after_opened.next(&dialog);
    }

    /// Remove a dialog. When that empties the stack, restore `aria-hidden`
    /// and, if `notify` is set, emit `after_all_closed`.
    ///
    /// Returns whether the dialog was on the stack.
    pub(crate) fn remove(&self, doc: &Document, serial: DialogSerial, notify: bool) -> bool {
        let emptied = {
            let mut dialogs = self.dialogs.borrow_mut();
            let Some(index) = dialogs.iter().position(|d| d.serial() == serial) else {
                return false;
            };
            dialogs.remove(index);
            dialogs.is_empty()
        };
        if emptied {
            self.aria.borrow_mut().restore(doc);
            tracing::debug!(notify, "no dialogs left open");
            if notify {
                self.after_all_closed.next(&());
            }
        }
        true
    }
}

/// Where a service scope keeps its open dialogs.
#[derive(Debug, Clone)]
pub enum DialogScope {
    /// A root scope with its own stack.
    Owned(Rc<OpenDialogStack>),
    /// A child scope reading and writing its parent's stack.
    Inherited(Rc<OpenDialogStack>),
}

impl DialogScope {
    #[must_use]
    pub fn root() -> Self {
        Self::Owned(Rc::new(OpenDialogStack::new()))
    }

    /// A scope that forwards to this one's stack.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::Inherited(Rc::clone(self.effective()))
    }

    /// The stack every operation in this scope goes through.
    #[must_use]
    pub fn effective(&self) -> &Rc<OpenDialogStack> {
        match self {
            Self::Owned(stack) | Self::Inherited(stack) => stack,
        }
    }

    #[must_use]
    pub fn is_inherited(&self) -> bool {
        matches!(self, Self::Inherited(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::dialog_ref::{DialogState, OpenDialog};
    use proptest::prelude::*;
    use std::any::Any;
    use std::cell::Cell;

    struct Stub {
        id: String,
        serial: DialogSerial,
        dismissed: Cell<bool>,
    }

    impl OpenDialog for Stub {
        fn id(&self) -> &str {
            &self.id
        }
        fn serial(&self) -> DialogSerial {
            self.serial
        }
        fn state(&self) -> DialogState {
            DialogState::Open
        }
        fn close_on_destroy(&self) -> bool {
            true
        }
        fn dismiss(&self) {
            self.dismissed.set(true);
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn stub(id: &str) -> AnyDialogRef {
        Rc::new(Stub {
            id: id.to_owned(),
            serial: DialogSerial::new(),
            dismissed: Cell::new(false),
        })
    }

    #[test]
    fn serials_are_unique() {
        let a = DialogSerial::new();
        let b = DialogSerial::new();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn child_scope_shares_parent_stack() {
        let root = DialogScope::root();
        let child = root.child();
        let grandchild = child.child();
        assert!(!root.is_inherited());
        assert!(grandchild.is_inherited());
        assert!(Rc::ptr_eq(root.effective(), grandchild.effective()));

        grandchild.effective().push(stub("a"));
        assert!(root.effective().find_by_id("a").is_some());
    }

    #[test]
    fn removing_last_dialog_restores_aria_and_notifies() {
        let doc = Document::new();
        let main = doc.create_element("main");
        let overlays = doc.create_element("div");
        doc.append_child(doc.body(), main);
        doc.append_child(doc.body(), overlays);
        let stack = OpenDialogStack::new();
        let closed = Rc::new(Cell::new(0));
        let c = Rc::clone(&closed);
        stack
            .after_all_closed()
            .subscribe(move |_: &()| c.set(c.get() + 1))
            .detach();

        let (a, b) = (stub("a"), stub("b"));
        stack.hide_siblings_if_first(&doc, overlays);
        stack.push(Rc::clone(&a));
        stack.hide_siblings_if_first(&doc, overlays);
        stack.push(Rc::clone(&b));
        assert_eq!(doc.attribute(main, "aria-hidden").as_deref(), Some("true"));

        assert!(stack.remove(&doc, a.serial(), true));
        assert!(!stack.remove(&doc, a.serial(), true));
        assert_eq!(closed.get(), 0);
        assert!(stack.is_hiding_siblings());

        assert!(stack.remove(&doc, b.serial(), true));
        assert_eq!(closed.get(), 1);
        assert!(!doc.has_attribute(main, "aria-hidden"));
        assert!(!stack.is_hiding_siblings());
    }

    proptest! {
        #[test]
        fn removal_order_never_disturbs_the_rest(
            count in 1usize..8,
            order in proptest::collection::vec(any::<prop::sample::Index>(), 8),
        ) {
            let doc = Document::new();
            let stack = OpenDialogStack::new();
            let mut open: Vec<AnyDialogRef> =
                (0..count).map(|i| stub(&format!("d{i}"))).collect();
            for dialog in &open {
                stack.push(Rc::clone(dialog));
            }
            for index in order {
                if open.is_empty() {
                    break;
                }
                let victim = open.remove(index.index(open.len()));
                prop_assert!(stack.remove(&doc, victim.serial(), true));
                let remaining: Vec<DialogSerial> =
                    stack.snapshot().iter().map(|d| d.serial()).collect();
                let expected: Vec<DialogSerial> = open.iter().map(|d| d.serial()).collect();
                prop_assert_eq!(remaining, expected);
            }
        }
    }
}
