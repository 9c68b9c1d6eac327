#![forbid(unsafe_code)]

//! Hide background content from assistive technology while a modal is open.
//!
//! [`AriaHiddenSnapshot::hide_siblings`] sets `aria-hidden="true"` on every
//! sibling of the overlay container and remembers each sibling's previous
//! value. [`AriaHiddenSnapshot::restore`] puts those values back exactly:
//! previously absent attributes are removed, previously present ones are
//! reset to their old value.
//!
//! # Invariants
//!
//! 1. Hiding is applied at most once until the next restore.
//! 2. After restore, every touched element's `aria-hidden` equals its value
//!    before hiding.
//! 3. `script`, `style`, and `aria-live` elements are never touched.

use ahash::AHashMap;
use ftui_dom::{Document, NodeId};

const SKIPPED_TAGS: [&str; 2] = ["script", "style"];

/// Record of `aria-hidden` values overwritten while a modal is open.
#[derive(Debug, Default)]
pub struct AriaHiddenSnapshot {
    previous: AHashMap<NodeId, Option<String>>,
    applied: bool,
}

impl AriaHiddenSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether siblings are currently hidden.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Number of elements whose attribute was overwritten.
    #[must_use]
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Hide every sibling of `keep` from assistive technology.
    ///
    /// Does nothing while a previous hide is still applied or when `keep`
    /// has no parent.
    pub fn hide_siblings(&mut self, doc: &Document, keep: NodeId) {
        if self.applied {
            return;
        }
        let Some(parent) = doc.parent(keep) else {
            return;
        };
        for sibling in doc.children(parent).into_iter().rev() {
            if sibling == keep
                || SKIPPED_TAGS.contains(&doc.tag(sibling).as_str())
                || doc.has_attribute(sibling, "aria-live")
            {
                continue;
            }
            self.previous
                .insert(sibling, doc.attribute(sibling, "aria-hidden"));
            doc.set_attribute(sibling, "aria-hidden", "true");
        }
        self.applied = true;
        tracing::trace!(hidden = self.previous.len(), "background hidden from assistive technology");
    }

    /// Put back every recorded `aria-hidden` value.
    pub fn restore(&mut self, doc: &Document) {
        if !self.applied {
            return;
        }
        for (node, previous) in self.previous.drain() {
            match previous {
                Some(value) => doc.set_attribute(node, "aria-hidden", value),
                None => {
                    doc.remove_attribute(node, "aria-hidden");
                }
            }
        }
        self.applied = false;
    }
}
