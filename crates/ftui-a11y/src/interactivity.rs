#![forbid(unsafe_code)]

//! Stateless focusability predicates.
//!
//! | Predicate | Meaning |
//! |-----------|---------|
//! | [`is_visible`](InteractivityChecker::is_visible) | connected, no `hidden` ancestor |
//! | [`is_focusable`](InteractivityChecker::is_focusable) | `focus()` would succeed and the node is not inert |
//! | [`is_tabbable`](InteractivityChecker::is_tabbable) | reachable with the Tab key (tabindex ≥ 0 or native) |

use ftui_dom::{Document, NodeId};

/// Options for [`InteractivityChecker::is_focusable_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusableConfig {
    /// Treat hidden elements as focusable.
    pub ignore_visibility: bool,
}

/// Pure predicates over a [`Document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractivityChecker;

impl InteractivityChecker {
    /// Create a checker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Whether `node` is a disabled form control.
    #[must_use]
    pub fn is_disabled(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_disabled(node)
    }

    /// Whether `node` is rendered.
    #[must_use]
    pub fn is_visible(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_rendered(node)
    }

    /// Whether `node` or an ancestor carries the `inert` attribute.
    #[must_use]
    pub fn is_inert(&self, doc: &Document, node: NodeId) -> bool {
        doc.closest(node, "[inert]").is_some()
    }

    /// Parsed `tabindex`, if present and numeric.
    #[must_use]
    pub fn tab_index(&self, doc: &Document, node: NodeId) -> Option<i32> {
        doc.attribute(node, "tabindex")
            .and_then(|v| v.trim().parse::<i32>().ok())
    }

    /// Whether `node` can receive focus programmatically.
    #[must_use]
    pub fn is_focusable(&self, doc: &Document, node: NodeId) -> bool {
        self.is_focusable_with(doc, node, FocusableConfig::default())
    }

    /// [`is_focusable`](Self::is_focusable) with options.
    #[must_use]
    pub fn is_focusable_with(&self, doc: &Document, node: NodeId, config: FocusableConfig) -> bool {
        doc.accepts_focus(node)
            && !self.is_disabled(doc, node)
            && !self.is_inert(doc, node)
            && (config.ignore_visibility || self.is_visible(doc, node))
    }

    /// Whether `node` participates in sequential (Tab) navigation.
    #[must_use]
    pub fn is_tabbable(&self, doc: &Document, node: NodeId) -> bool {
        if !self.is_visible(doc, node) || self.is_inert(doc, node) {
            return false;
        }
        match self.tab_index(doc, node) {
            Some(index) => index >= 0,
            None => doc.accepts_focus(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &Document, tag: &str) -> NodeId {
        let node = doc.create_element(tag);
        doc.append_child(doc.body(), node);
        node
    }

    #[test]
    fn native_controls_are_focusable_and_tabbable() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        for tag in ["button", "input", "select", "textarea"] {
            let node = element(&doc, tag);
            assert!(checker.is_focusable(&doc, node), "{tag}");
            assert!(checker.is_tabbable(&doc, node), "{tag}");
        }
    }

    #[test]
    fn plain_elements_need_tabindex() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        let div = element(&doc, "div");
        assert!(!checker.is_focusable(&doc, div));
        doc.set_attribute(div, "tabindex", "-1");
        assert!(checker.is_focusable(&doc, div));
        assert!(!checker.is_tabbable(&doc, div));
        doc.set_attribute(div, "tabindex", "0");
        assert!(checker.is_tabbable(&doc, div));
    }

    #[test]
    fn negative_tabindex_removes_native_control_from_tab_order() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        let button = element(&doc, "button");
        doc.set_attribute(button, "tabindex", "-1");
        assert!(checker.is_focusable(&doc, button));
        assert!(!checker.is_tabbable(&doc, button));
    }

    #[test]
    fn links_need_href() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        let anchor = element(&doc, "a");
        assert!(!checker.is_focusable(&doc, anchor));
        doc.set_attribute(anchor, "href", "#top");
        assert!(checker.is_tabbable(&doc, anchor));
    }

    #[test]
    fn hidden_input_and_disabled_button_rejected() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        let input = element(&doc, "input");
        doc.set_attribute(input, "type", "hidden");
        assert!(!checker.is_focusable(&doc, input));

        let button = element(&doc, "button");
        doc.set_attribute(button, "disabled", "");
        assert!(checker.is_disabled(&doc, button));
        assert!(!checker.is_focusable(&doc, button));
    }

    #[test]
    fn visibility_and_inert_ancestors() {
        let doc = Document::new();
        let checker = InteractivityChecker::new();
        let wrapper = element(&doc, "div");
        let button = doc.create_element("button");
        doc.append_child(wrapper, button);

        doc.set_attribute(wrapper, "hidden", "");
        assert!(!checker.is_visible(&doc, button));
        assert!(!checker.is_focusable(&doc, button));
        assert!(!checker.is_tabbable(&doc, button));
        let relaxed = FocusableConfig {
            ignore_visibility: true,
        };
        assert!(checker.is_focusable_with(&doc, button, relaxed));

        doc.remove_attribute(wrapper, "hidden");
        doc.set_attribute(wrapper, "inert", "");
        assert!(checker.is_inert(&doc, button));
        assert!(!checker.is_focusable(&doc, button));
    }
}
