#![forbid(unsafe_code)]

//! Content that can be projected into a dialog container.
//!
//! | Portal | Produces |
//! |--------|----------|
//! | [`ComponentPortal`] | a component instance built by a factory |
//! | [`TemplatePortal`] | DOM rendered by a closure, no instance |
//! | [`DomPortal`] | an existing element, moved in and later moved back |
//!
//! Factories and templates receive a [`ContentContext`]: the document, the
//! element to render into, and the dialog's injector.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ftui_dom::{Document, Injector, NodeId};

use super::config::{DialogConfigHandle, DialogData};
use super::dialog_ref::DialogRef;

/// Everything dialog content needs while it is being created.
#[derive(Debug, Clone)]
pub struct ContentContext {
    pub doc: Document,
    /// Element the content renders into.
    pub host: NodeId,
    /// Resolves `DialogRef<R>`, `DialogConfigHandle`, `DialogData`,
    /// `Direction`, and any configured providers.
    pub injector: Injector,
}

impl ContentContext {
    /// The dialog's reference, if `R` is its result type.
    #[must_use]
    pub fn dialog_ref<R: 'static>(&self) -> Option<DialogRef<R>> {
        self.injector.get::<DialogRef<R>>()
    }

    #[must_use]
    pub fn data(&self) -> Option<DialogData> {
        self.injector.get::<DialogData>()
    }

    #[must_use]
    pub fn config(&self) -> Option<DialogConfigHandle> {
        self.injector.get::<DialogConfigHandle>()
    }

    /// Create a `tag` element as the last child of `parent`.
    pub fn append(&self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.doc.create_element(tag);
        self.doc.append_child(parent, node);
        node
    }
}

/// Context handed to a template: the dialog ref and its data.
pub struct TemplateContext<R: 'static> {
    pub dialog_ref: DialogRef<R>,
    pub data: Option<DialogData>,
    pub content: ContentContext,
}

impl<R: 'static> fmt::Debug for TemplateContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateContext")
            .field("dialog", &self.dialog_ref.id())
            .field("host", &self.content.host)
            .finish()
    }
}

type Factory<C> = Box<dyn FnOnce(&ContentContext) -> C>;

/// A component to instantiate inside the container.
pub struct ComponentPortal<C> {
    factory: Factory<C>,
}

impl<C: 'static> ComponentPortal<C> {
    pub fn new(factory: impl FnOnce(&ContentContext) -> C + 'static) -> Self {
        Self {
            factory: Box::new(factory),
        }
    }

    pub(crate) fn create(self, context: &ContentContext) -> C {
        (self.factory)(context)
    }
}

impl<C> fmt::Debug for ComponentPortal<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPortal")
            .field("component", &std::any::type_name::<C>())
            .finish()
    }
}

/// Handle to an attached component.
pub struct ComponentRef<C> {
    instance: Rc<C>,
    host: NodeId,
}

impl<C> Clone for ComponentRef<C> {
    fn clone(&self) -> Self {
        Self {
            instance: Rc::clone(&self.instance),
            host: self.host,
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for ComponentRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("instance", &self.instance)
            .field("host", &self.host)
            .finish()
    }
}

impl<C: 'static> ComponentRef<C> {
    pub(crate) fn new(instance: C, host: NodeId) -> Self {
        Self {
            instance: Rc::new(instance),
            host,
        }
    }

    #[must_use]
    pub fn instance(&self) -> &Rc<C> {
        &self.instance
    }

    /// Element the component rendered into.
    #[must_use]
    pub fn host(&self) -> NodeId {
        self.host
    }

    pub(crate) fn erased(&self) -> Rc<dyn Any> {
        Rc::clone(&self.instance) as Rc<dyn Any>
    }
}

/// DOM rendered by a closure; there is no component instance.
pub struct TemplatePortal {
    render: Box<dyn FnOnce(&ContentContext)>,
}

impl TemplatePortal {
    pub fn new(render: impl FnOnce(&ContentContext) + 'static) -> Self {
        Self {
            render: Box::new(render),
        }
    }

    pub(crate) fn render(self, context: &ContentContext) {
        (self.render)(context);
    }
}

impl fmt::Debug for TemplatePortal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TemplatePortal(..)")
    }
}

/// An existing element to move into the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPortal {
    pub element: NodeId,
}

impl DomPortal {
    #[must_use]
    pub const fn new(element: NodeId) -> Self {
        Self { element }
    }
}

/// Where a DOM portal's element came from, so it can be put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DomOrigin {
    pub element: NodeId,
    pub parent: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl DomOrigin {
    pub(crate) fn capture(doc: &Document, element: NodeId) -> Self {
        Self {
            element,
            parent: doc.parent(element),
            next_sibling: doc.next_sibling(element),
        }
    }

    /// Move the element back where it was, or detach it if its old parent
    /// is gone.
    pub(crate) fn restore(self, doc: &Document) {
        match self.parent {
            Some(parent) if doc.is_connected(parent) => {
                let reference = self
                    .next_sibling
                    .filter(|sibling| doc.parent(*sibling) == Some(parent));
                doc.insert_before(parent, self.element, reference);
            }
            _ => doc.remove(self.element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_origin_restores_position() {
        let doc = Document::new();
        let list = doc.create_element("ul");
        doc.append_child(doc.body(), list);
        let [a, b, c] = ["li", "li", "li"].map(|tag| {
            let node = doc.create_element(tag);
            doc.append_child(list, node);
            node
        });
        let origin = DomOrigin::capture(&doc, b);
        let elsewhere = doc.create_element("div");
        doc.append_child(doc.body(), elsewhere);
        doc.append_child(elsewhere, b);
        assert_eq!(doc.children(list), vec![a, c]);

        origin.restore(&doc);
        assert_eq!(doc.children(list), vec![a, b, c]);
    }

    #[test]
    fn dom_origin_falls_back_when_sibling_moved() {
        let doc = Document::new();
        let list = doc.create_element("ul");
        doc.append_child(doc.body(), list);
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(list, a);
        doc.append_child(list, b);
        let origin = DomOrigin::capture(&doc, a);
        doc.remove(a);
        doc.remove(b);
        origin.restore(&doc);
        assert_eq!(doc.children(list), vec![a]);
    }

    #[test]
    fn component_portal_builds_with_context() {
        let doc = Document::new();
        let host = doc.create_element("div");
        let context = ContentContext {
            doc: doc.clone(),
            host,
            injector: Injector::root(),
        };
        let portal = ComponentPortal::new(|ctx: &ContentContext| {
            let title = ctx.append(ctx.host, "h2");
            ctx.doc.set_attribute(title, "id", "title");
            title
        });
        let title = portal.create(&context);
        assert_eq!(doc.parent(title), Some(host));
        assert!(context.data().is_none());
    }
}
