#![forbid(unsafe_code)]

//! Type-keyed dependency injector.
//!
//! An [`Injector`] maps a Rust type to a single value. Child injectors shadow
//! their parent: lookups walk the chain from the child upwards and stop at the
//! first match.
//!
//! ```
//! use ftui_dom::injector::{Injector, Provider};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Theme(&'static str);
//!
//! let root = Injector::root().with(Provider::value(Theme("dark")));
//! let child = Injector::child(&root, vec![Provider::value(42_u32)]);
//!
//! assert_eq!(child.get::<Theme>(), Some(Theme("dark")));
//! assert_eq!(child.get::<u32>(), Some(42));
//! assert_eq!(root.get::<u32>(), None);
//! ```

use ahash::AHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// A single `{token, value}` binding, keyed by the value's type.
#[derive(Clone)]
pub struct Provider {
    token: TypeId,
    type_name: &'static str,
    value: Rc<dyn Any>,
}

impl Provider {
    /// Provide `value` under its own type.
    pub fn value<T: Any>(value: T) -> Self {
        Self {
            token: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Rc::new(value),
        }
    }

    /// Type name of the provided value (for diagnostics).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.type_name).finish()
    }
}

struct InjectorInner {
    parent: Option<Injector>,
    providers: AHashMap<TypeId, Provider>,
}

/// Cheap-to-clone handle to an injector node.
#[derive(Clone)]
pub struct Injector {
    inner: Rc<InjectorInner>,
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.inner.providers.values().map(|p| p.type_name).collect();
        f.debug_struct("Injector")
            .field("providers", &names)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::root()
    }
}

impl Injector {
    /// An empty injector without a parent.
    #[must_use]
    pub fn root() -> Self {
        Self {
            inner: Rc::new(InjectorInner {
                parent: None,
                providers: AHashMap::new(),
            }),
        }
    }

    /// A child injector. Later providers win over earlier ones of the same type.
    #[must_use]
    pub fn child(parent: &Injector, providers: Vec<Provider>) -> Self {
        Self {
            inner: Rc::new(InjectorInner {
                parent: Some(parent.clone()),
                providers: providers.into_iter().map(|p| (p.token, p)).collect(),
            }),
        }
    }

    /// A copy of this injector with one more provider at the same level.
    #[must_use]
    pub fn with(self, provider: Provider) -> Self {
        let mut providers = self.inner.providers.clone();
        providers.insert(provider.token, provider);
        Self {
            inner: Rc::new(InjectorInner {
                parent: self.inner.parent.clone(),
                providers,
            }),
        }
    }

    /// Resolve a value by type, walking up the parent chain.
    #[must_use]
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        let token = TypeId::of::<T>();
        let mut current = Some(self);
        while let Some(injector) = current {
            if let Some(provider) = injector.inner.providers.get(&token) {
                return provider.value.downcast_ref::<T>().cloned();
            }
            current = injector.inner.parent.as_ref();
        }
        None
    }

    /// Whether a value of type `T` is resolvable.
    #[must_use]
    pub fn has<T: Any>(&self) -> bool {
        let token = TypeId::of::<T>();
        let mut current = Some(self);
        while let Some(injector) = current {
            if injector.inner.providers.contains_key(&token) {
                return true;
            }
            current = injector.inner.parent.as_ref();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Label(String);

    #[test]
    fn child_shadows_parent() {
        let root = Injector::root().with(Provider::value(Label("root".into())));
        let child = Injector::child(&root, vec![Provider::value(Label("child".into()))]);
        assert_eq!(child.get::<Label>(), Some(Label("child".into())));
        assert_eq!(root.get::<Label>(), Some(Label("root".into())));
    }

    #[test]
    fn missing_type_resolves_to_none() {
        let root = Injector::root();
        assert_eq!(root.get::<Label>(), None);
        assert!(!root.has::<Label>());
    }

    #[test]
    fn later_provider_wins_within_level() {
        let child = Injector::child(
            &Injector::root(),
            vec![Provider::value(1_u8), Provider::value(2_u8)],
        );
        assert_eq!(child.get::<u8>(), Some(2));
        assert!(child.has::<u8>());
    }
}
