#![forbid(unsafe_code)]

//! Headless document model.
//!
//! A [`Document`] is a cheap-to-clone handle over a shared element tree. It
//! models exactly the parts of a browser document that dialog and focus
//! management depend on: element structure, attributes, a single active
//! (focused) element, and focus/blur listeners.
//!
//! # Invariants
//!
//! 1. `body()` always exists and is the root of every connected node.
//! 2. A node has at most one parent; re-inserting a node moves it.
//! 3. `active_element()` is always a connected node, or `None` (meaning the
//!    body has focus). Removing the active element or any of its ancestors
//!    resets focus to `None`.
//! 4. Listener callbacks run without any internal borrow held, so they may
//!    freely call back into the document (including `focus`).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `focus()` on a detached node | Node removed from tree | Returns `false` |
//! | `focus()` on a non-focusable node | No tabindex, not a form control | Returns `false` |
//! | Malformed selector | Unsupported syntax (combinators) | Matches nothing |
//! | Unknown `NodeId` | Id from another document | Treated as detached |

use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifier of a node within one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Get the raw index value.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// How a focus change was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FocusOrigin {
    Keyboard,
    Mouse,
    Touch,
    #[default]
    Program,
}

/// Kind of focus notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEventKind {
    Focus,
    Blur,
}

/// Focus notification delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub kind: FocusEventKind,
    pub target: NodeId,
    pub origin: FocusOrigin,
}

/// Handle returned by [`Document::add_focus_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Where a focus listener is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    /// Capturing listener on the document: sees every focus change first.
    Document,
    /// Listener on a single node: sees only changes targeting that node.
    Node(NodeId),
}

type FocusCallback = Rc<dyn Fn(&Document, &FocusEvent)>;

struct Listener {
    id: ListenerId,
    scope: ListenerScope,
    callback: FocusCallback,
}

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attributes: AHashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct DocumentInner {
    nodes: Vec<NodeData>,
    body: NodeId,
    active: Option<NodeId>,
    last_origin: FocusOrigin,
    listeners: Vec<Listener>,
    next_listener: u64,
}

/// Shared handle to a headless element tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &inner.nodes.len())
            .field("active", &inner.active)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only `<body>`.
    #[must_use]
    pub fn new() -> Self {
        let body = NodeData {
            tag: "body".into(),
            ..NodeData::default()
        };
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                nodes: vec![body],
                body: NodeId(0),
                active: None,
                last_origin: FocusOrigin::Program,
                listeners: Vec::new(),
                next_listener: 1,
            })),
        }
    }

    /// Whether two handles refer to the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The `<body>` element.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    // --- Tree structure ---

    /// Create a detached element with the given tag name.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len() as u32);
        inner.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference`.
    ///
    /// When `reference` is `None` or not a child of `parent`, the node is appended.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.contains(child, parent) {
            debug_assert!(false, "cannot insert a node into its own subtree");
            return;
        }
        self.detach(child);
        let mut inner = self.inner.borrow_mut();
        if inner.node(parent).is_none() || inner.node(child).is_none() {
            return;
        }
        let siblings = &mut inner.nodes[parent.0 as usize].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        inner.nodes[child.0 as usize].parent = Some(parent);
    }

    /// Remove `node` (and its subtree) from the tree.
    ///
    /// If the focused element was inside the removed subtree, focus resets to the body.
    pub fn remove(&self, node: NodeId) {
        let lost_focus = self
            .active_element()
            .is_some_and(|active| self.contains(node, active));
        self.detach(node);
        if lost_focus {
            self.inner.borrow_mut().active = None;
        }
    }

    fn detach(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.node(node).and_then(|n| n.parent) else {
            return;
        };
        inner.nodes[parent.0 as usize].children.retain(|&c| c != node);
        inner.nodes[node.0 as usize].parent = None;
    }

    /// Parent of `node`, if attached.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).and_then(|n| n.parent)
    }

    /// Children of `node` in document order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Sibling immediately after `node`.
    #[must_use]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.node(node)?.parent?;
        let siblings = &inner.nodes[parent.0 as usize].children;
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    /// Sibling immediately before `node`.
    #[must_use]
    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.node(node)?.parent?;
        let siblings = &inner.nodes[parent.0 as usize].children;
        let index = siblings.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Lower-case tag name of `node` (empty for unknown ids).
    #[must_use]
    pub fn tag(&self, node: NodeId) -> String {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = inner.node(id).and_then(|n| n.parent);
        }
        false
    }

    /// Whether `node` is attached (transitively) to the body.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        let body = self.body();
        self.contains(body, node)
    }

    /// All descendants of `root` in document (pre-)order, excluding `root`.
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner
            .node(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = inner.node(id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    // --- Attributes ---

    /// Attribute value, if present.
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|n| n.attributes.get(&name.to_ascii_lowercase()).cloned())
    }

    /// Whether the attribute is present (with any value).
    #[must_use]
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Set an attribute value.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.attributes.insert(name.to_ascii_lowercase(), value.into());
        }
    }

    /// Remove an attribute. Returns the previous value.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow_mut()
            .node_mut(node)
            .and_then(|n| n.attributes.remove(&name.to_ascii_lowercase()))
    }

    /// Whether the `class` attribute contains `class`.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Add a class to the `class` attribute (no-op if already present).
    pub fn add_class(&self, node: NodeId, class: &str) {
        if class.is_empty() || self.has_class(node, class) {
            return;
        }
        let list = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", list);
    }

    /// Remove a class from the `class` attribute.
    pub fn remove_class(&self, node: NodeId, class: &str) {
        let Some(existing) = self.attribute(node, "class") else {
            return;
        };
        let list: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        self.set_attribute(node, "class", list.join(" "));
    }

    // --- Selectors ---

    /// Whether `node` matches `selector`.
    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        Selector::parse(selector).is_some_and(|s| s.matches(self, node))
    }

    /// Closest inclusive ancestor of `node` matching `selector`.
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        let mut current = Some(node);
        while let Some(id) = current {
            if selector.matches(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// First descendant of `root` matching `selector`, in document order.
    #[must_use]
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        self.descendants(root)
            .into_iter()
            .find(|&id| selector.matches(self, id))
    }

    /// All descendants of `root` matching `selector`, in document order.
    #[must_use]
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    // --- Focus ---

    /// Whether `node` is a disabled form control.
    #[must_use]
    pub fn is_disabled(&self, node: NodeId) -> bool {
        matches!(
            self.tag(node).as_str(),
            "button" | "input" | "select" | "textarea" | "optgroup" | "option" | "fieldset"
        ) && self.has_attribute(node, "disabled")
    }

    /// Whether `node` is connected and neither it nor an ancestor is `hidden`.
    #[must_use]
    pub fn is_rendered(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.has_attribute(id, "hidden") {
                return false;
            }
            current = self.parent(id);
        }
        true
    }

    /// Whether the host would accept `focus()` on this node.
    ///
    /// Native form controls, links with `href`, media with `controls`,
    /// `contenteditable` elements, and anything carrying a numeric `tabindex`.
    #[must_use]
    pub fn accepts_focus(&self, node: NodeId) -> bool {
        if self.is_disabled(node) {
            return false;
        }
        if self
            .attribute(node, "tabindex")
            .is_some_and(|v| v.trim().parse::<i32>().is_ok())
        {
            return true;
        }
        match self.tag(node).as_str() {
            "button" | "select" | "textarea" => true,
            "input" => self.attribute(node, "type").as_deref() != Some("hidden"),
            "a" | "area" => self.has_attribute(node, "href"),
            "audio" | "video" => self.has_attribute(node, "controls"),
            _ => self
                .attribute(node, "contenteditable")
                .is_some_and(|v| v != "false"),
        }
    }

    /// The focused element, or `None` when the body has focus.
    #[must_use]
    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.borrow().active
    }

    /// Origin of the most recent focus change.
    #[must_use]
    pub fn last_focus_origin(&self) -> FocusOrigin {
        self.inner.borrow().last_origin
    }

    /// Move focus to `node`.
    ///
    /// Returns `false` (and leaves focus untouched) when the node is not
    /// rendered or does not accept focus.
    pub fn focus(&self, node: NodeId, origin: FocusOrigin) -> bool {
        if !self.is_rendered(node) || !self.accepts_focus(node) {
            return false;
        }
        if self.active_element() == Some(node) {
            return true;
        }
        let previous = self.inner.borrow_mut().active.take();
        if let Some(previous) = previous {
            self.dispatch(FocusEvent {
                kind: FocusEventKind::Blur,
                target: previous,
                origin,
            });
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.active = Some(node);
            inner.last_origin = origin;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(node = node.index(), ?origin, "focus moved");
        self.dispatch(FocusEvent {
            kind: FocusEventKind::Focus,
            target: node,
            origin,
        });
        true
    }

    /// Drop focus back to the body.
    pub fn blur(&self) {
        let previous = self.inner.borrow_mut().active.take();
        if let Some(previous) = previous {
            self.dispatch(FocusEvent {
                kind: FocusEventKind::Blur,
                target: previous,
                origin: FocusOrigin::Program,
            });
        }
    }

    /// Install a focus listener.
    pub fn add_focus_listener(
        &self,
        scope: ListenerScope,
        callback: impl Fn(&Document, &FocusEvent) + 'static,
    ) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push(Listener {
            id,
            scope,
            callback: Rc::new(callback),
        });
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        inner.listeners.len() != before
    }

    /// Number of installed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn dispatch(&self, event: FocusEvent) {
        // Capturing document listeners first, then the target's own.
        let callbacks: Vec<FocusCallback> = {
            let inner = self.inner.borrow();
            let capture = inner
                .listeners
                .iter()
                .filter(|l| l.scope == ListenerScope::Document);
            let target = inner
                .listeners
                .iter()
                .filter(|l| l.scope == ListenerScope::Node(event.target));
            capture.chain(target).map(|l| Rc::clone(&l.callback)).collect()
        };
        for callback in callbacks {
            callback(self, &event);
        }
    }
}

impl DocumentInner {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize)
    }
}

/// A parsed selector list: comma-separated compound selectors.
///
/// Supported: `tag`, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`
/// (value optionally quoted). Combinators are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Selector {
    /// Parse a selector list. Returns `None` on unsupported syntax.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let alternatives = input
            .split(',')
            .map(parse_compound)
            .collect::<Option<Vec<_>>>()?;
        if alternatives.is_empty() {
            return None;
        }
        Some(Self { alternatives })
    }

    /// Whether `node` matches any alternative.
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(doc, node))
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag
            && doc.tag(node) != *tag
        {
            return false;
        }
        if let Some(id) = &self.id
            && doc.attribute(node, "id").as_deref() != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attributes
            .iter()
            .all(|(name, expected)| match (doc.attribute(node, name), expected) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == *expected,
                (None, _) => false,
            })
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '#' | '.' | '[')
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return None;
    }
    let mut compound = Compound::default();
    let tag_end = rest.find(is_delimiter).unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if tag.contains(char::is_whitespace) {
            return None;
        }
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
    }
    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let end = body.find(is_delimiter).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return None;
                }
                if first == '#' {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']')?;
                let inner = &rest[1..close];
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => (
                        name.trim(),
                        Some(value.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (inner.trim(), None),
                };
                if name.is_empty() {
                    return None;
                }
                compound.attributes.push((name.to_ascii_lowercase(), value));
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let doc = Document::new();
        let section = doc.create_element("section");
        let input = doc.create_element("input");
        let button = doc.create_element("button");
        doc.append_child(doc.body(), section);
        doc.append_child(section, input);
        doc.append_child(section, button);
        (doc, section, input, button)
    }

    #[test]
    fn append_and_insert_before() {
        let (doc, section, input, button) = tree();
        let first = doc.create_element("span");
        doc.insert_before(section, first, Some(input));
        assert_eq!(doc.children(section), vec![first, input, button]);
        assert_eq!(doc.previous_sibling(input), Some(first));
        assert_eq!(doc.next_sibling(input), Some(button));
        assert_eq!(doc.next_sibling(button), None);
    }

    #[test]
    fn reinsert_moves_node() {
        let (doc, section, input, _) = tree();
        let other = doc.create_element("div");
        doc.append_child(doc.body(), other);
        doc.append_child(other, input);
        assert_eq!(doc.parent(input), Some(other));
        assert!(!doc.children(section).contains(&input));
    }

    #[test]
    fn contains_is_inclusive() {
        let (doc, section, input, _) = tree();
        assert!(doc.contains(section, section));
        assert!(doc.contains(section, input));
        assert!(!doc.contains(input, section));
    }

    #[test]
    fn detached_nodes_are_not_connected() {
        let (doc, section, input, _) = tree();
        assert!(doc.is_connected(input));
        doc.remove(section);
        assert!(!doc.is_connected(input));
        assert!(!doc.focus(input, FocusOrigin::Program));
    }

    #[test]
    fn focus_requires_focusable_node() {
        let (doc, section, input, _) = tree();
        assert!(!doc.focus(section, FocusOrigin::Program));
        assert!(doc.focus(input, FocusOrigin::Keyboard));
        assert_eq!(doc.active_element(), Some(input));
        assert_eq!(doc.last_focus_origin(), FocusOrigin::Keyboard);

        doc.set_attribute(section, "tabindex", "-1");
        assert!(doc.focus(section, FocusOrigin::Program));
    }

    #[test]
    fn disabled_and_hidden_nodes_reject_focus() {
        let (doc, section, input, button) = tree();
        doc.set_attribute(button, "disabled", "");
        assert!(!doc.focus(button, FocusOrigin::Program));
        doc.set_attribute(section, "hidden", "");
        assert!(!doc.focus(input, FocusOrigin::Program));
    }

    #[test]
    fn removing_active_subtree_resets_focus() {
        let (doc, section, input, _) = tree();
        doc.focus(input, FocusOrigin::Program);
        doc.remove(section);
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn listeners_see_blur_then_focus() {
        let (doc, _, input, button) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        doc.add_focus_listener(ListenerScope::Document, move |_, e| {
            sink.borrow_mut().push((e.kind, e.target));
        });
        doc.focus(input, FocusOrigin::Program);
        doc.focus(button, FocusOrigin::Program);
        assert_eq!(
            *log.borrow(),
            vec![
                (FocusEventKind::Focus, input),
                (FocusEventKind::Blur, input),
                (FocusEventKind::Focus, button),
            ]
        );
    }

    #[test]
    fn node_listener_only_sees_its_target() {
        let (doc, _, input, button) = tree();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = doc.add_focus_listener(ListenerScope::Node(button), move |_, e| {
            if e.kind == FocusEventKind::Focus {
                counter.set(counter.get() + 1);
            }
        });
        doc.focus(input, FocusOrigin::Program);
        doc.focus(button, FocusOrigin::Program);
        assert_eq!(hits.get(), 1);
        assert!(doc.remove_listener(id));
        assert!(!doc.remove_listener(id));
    }

    #[test]
    fn listener_may_redirect_focus() {
        let (doc, _, input, button) = tree();
        doc.add_focus_listener(ListenerScope::Node(input), move |doc, e| {
            if e.kind == FocusEventKind::Focus {
                doc.focus(button, FocusOrigin::Program);
            }
        });
        doc.focus(input, FocusOrigin::Program);
        assert_eq!(doc.active_element(), Some(button));
    }

    #[test]
    fn class_helpers() {
        let (doc, section, _, _) = tree();
        doc.add_class(section, "a");
        doc.add_class(section, "b");
        doc.add_class(section, "a");
        assert_eq!(doc.attribute(section, "class").as_deref(), Some("a b"));
        doc.remove_class(section, "a");
        assert!(!doc.has_class(section, "a"));
        assert!(doc.has_class(section, "b"));
    }

    #[test]
    fn selectors_match_compounds() {
        let (doc, section, input, button) = tree();
        doc.set_attribute(button, "id", "ok");
        doc.add_class(input, "field");
        doc.set_attribute(input, "role", "heading");

        assert_eq!(doc.query_selector(section, "#ok"), Some(button));
        assert_eq!(doc.query_selector(section, "input.field"), Some(input));
        assert_eq!(doc.query_selector(section, "[role=\"heading\"]"), Some(input));
        assert_eq!(doc.query_selector(section, "h1, button"), Some(button));
        assert_eq!(doc.query_selector_all(section, "input, button").len(), 2);
        assert_eq!(doc.query_selector(section, "section"), None);
        assert_eq!(doc.closest(input, "section"), Some(section));
    }

    #[test]
    fn malformed_selectors_match_nothing() {
        let (doc, section, _, _) = tree();
        assert!(Selector::parse("section input").is_none());
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("#").is_none());
        assert_eq!(doc.query_selector(doc.body(), "section input"), None);
        assert!(!doc.matches(section, "[unterminated"));
    }

    #[test]
    fn descendants_in_document_order() {
        let (doc, section, input, button) = tree();
        let nested = doc.create_element("b");
        doc.append_child(input, nested);
        assert_eq!(doc.descendants(section), vec![input, nested, button]);
    }
}
