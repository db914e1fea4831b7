//! Nested scopes.
//!
//! A context groups related registrations under one key of the parent:
//! `books.store`, `books.apiClient`. Resolving the context key builds a
//! child container (once) and returns its [`Bag`]. Child factories receive
//! the child bag, which resolves the child's own keys and falls back to the
//! parent for everything else, so a child factory can read both its
//! siblings and the parent's keys.

use std::sync::Arc;

use tracing::debug;

use crate::bag::Bag;
use crate::container::Container;
use crate::factory::{Factory, FactoryMap, Instance};
use crate::key::DependencyKey;
use crate::scope::Scope;

/// Builds a factory that exposes `factories` as a nested scope.
///
/// The returned factory is a singleton: the child container is created on
/// the first resolve of the context key, with the resolving container as
/// its parent, and the same child bag is returned on every later resolve.
/// Child keys shadow parent keys of the same name.
///
/// ```rust
/// use satchel_container::prelude::*;
/// use std::sync::Arc;
///
/// struct Store;
///
/// let container = Container::new([
///     ("books", context([("store", singleton(|_: &Bag| Ok(Store)))])),
/// ]);
///
/// let first = container.bag().nested("books").unwrap();
/// let second = container.bag().nested("books").unwrap();
/// assert!(first.same_scope(&second));
///
/// let a: Arc<Store> = first.get_as("store").unwrap();
/// let b: Arc<Store> = second.get_as("store").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
pub fn context<I, K>(factories: I) -> Factory
where
    I: IntoIterator<Item = (K, Factory)>,
    K: Into<DependencyKey>,
{
    let shape: Arc<FactoryMap> = Arc::new(
        factories
            .into_iter()
            .map(|(key, factory)| (key.into(), factory))
            .collect(),
    );
    let children = shape.clone();

    Factory::new(Scope::Singleton, move |parent: &Bag| {
        debug!(keys = children.len(), "Creating context");
        let child = Container::nested(
            children.iter().map(|(key, factory)| (key.clone(), factory.clone())),
            parent.clone(),
        );
        Ok(Arc::new(child.into_bag()) as Instance)
    })
    .into_singleton()
    .with_shape(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SatchelError};
    use crate::factory::{from_class, from_value, singleton, transient};
    use crate::settings::ContainerSettings;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct X;

    struct Y {
        deps: Bag,
    }

    fn scoped() -> Container {
        Container::new([(
            "ctx",
            context([
                ("x", singleton(|_: &Bag| Ok(X))),
                ("y", from_class(|deps: Bag| Y { deps })),
            ]),
        )])
    }

    #[test]
    fn context_returns_same_child_bag() {
        let container = scoped();

        let a = container.get("ctx").unwrap();
        let b = container.get("ctx").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.downcast_ref::<Bag>().is_some());
    }

    #[test]
    fn singletons_stay_stable_inside_context() {
        let container = scoped();

        let x1: Arc<X> = container.bag().nested("ctx").unwrap().get_as("x").unwrap();
        let x2: Arc<X> = container.bag().nested("ctx").unwrap().get_as("x").unwrap();
        assert!(Arc::ptr_eq(&x1, &x2));

        // Transient siblings are still rebuilt
        let y1: Arc<Y> = container.bag().path_as("ctx.y").unwrap();
        let y2: Arc<Y> = container.bag().path_as("ctx.y").unwrap();
        assert!(!Arc::ptr_eq(&y1, &y2));

        // ...and see the same sibling singleton through their own bag
        let x3: Arc<X> = y1.deps.get_as("x").unwrap();
        assert!(Arc::ptr_eq(&x1, &x3));
    }

    #[test]
    fn child_is_built_once() {
        let builds = Arc::new(AtomicU32::new(0));
        let container = Container::new([(
            "ctx",
            context([(
                "x",
                singleton({
                    let builds = builds.clone();
                    move |_: &Bag| {
                        builds.fetch_add(1, Ordering::SeqCst);
                        Ok(X)
                    }
                }),
            )]),
        )]);

        assert_eq!(builds.load(Ordering::SeqCst), 0);
        for _ in 0..3 {
            container.bag().path("ctx.x").unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_reads_parent_keys() {
        let container = Container::new([
            ("prefix", from_value(String::from("book:"))),
            (
                "books",
                context([(
                    "label",
                    transient(|deps: &Bag| -> Result<String> {
                        let prefix: Arc<String> = deps.get_as("prefix")?;
                        Ok(format!("{prefix}kings"))
                    }),
                )]),
            ),
        ]);

        let label: Arc<String> = container.bag().path_as("books.label").unwrap();
        assert_eq!(label.as_str(), "book:kings");
    }

    #[test]
    fn child_reads_itself_through_parent_key() {
        // A child factory written against the parent's shape: books.service
        // reads "books.store" starting from its own bag
        let container = Container::new([(
            "books",
            context([
                ("store", singleton(|_: &Bag| Ok(X))),
                ("service", transient(|deps: &Bag| deps.path_as::<X>("books.store"))),
            ]),
        )]);

        let direct: Arc<X> = container.bag().path_as("books.store").unwrap();
        let via_service: Arc<Arc<X>> = container.bag().path_as("books.service").unwrap();
        assert!(Arc::ptr_eq(&direct, &*via_service));
    }

    #[test]
    fn child_keys_shadow_parent_keys() {
        let container = Container::new([
            ("name", from_value("parent")),
            ("ctx", context([("name", from_value("child"))])),
        ]);

        let child: Arc<&str> = container.bag().path_as("ctx.name").unwrap();
        let parent: Arc<&str> = container.get_as("name").unwrap();
        assert_eq!((*child, *parent), ("child", "parent"));
    }

    #[test]
    fn missing_key_in_both_scopes_is_unregistered() {
        let container = scoped();

        match container.bag().path("ctx.z") {
            Err(SatchelError::UnregisteredKey(e)) => assert_eq!(e.requested.as_str(), "z"),
            other => panic!("Expected UnregisteredKey, got: {other:?}"),
        }
    }

    #[test]
    fn missing_key_in_context_suggests_child_keys() {
        let container = Container::new([
            ("stock", from_value(0u8)),
            ("books", context([("store", from_value(1u8))])),
        ]);

        match container.bag().path("books.stor") {
            Err(SatchelError::UnregisteredKey(e)) => {
                assert_eq!(e.requested.as_str(), "stor");
                assert_eq!(e.suggestions, ["store", "stock"]);
            }
            other => panic!("Expected UnregisteredKey, got: {other:?}"),
        }
    }

    #[test]
    fn missing_key_in_context_respects_inherited_settings() {
        let settings = ContainerSettings {
            max_suggestions: 1,
            ..ContainerSettings::default()
        };
        let container = Container::with_settings(
            [
                ("stock", from_value(0u8)),
                ("books", context([("store", from_value(1u8))])),
            ],
            settings,
        );

        match container.bag().path("books.stor") {
            Err(SatchelError::UnregisteredKey(e)) => assert_eq!(e.suggestions, ["store"]),
            other => panic!("Expected UnregisteredKey, got: {other:?}"),
        }
    }

    #[test]
    fn child_bag_keeps_child_alive() {
        let container = scoped();
        let child = container.bag().nested("ctx").unwrap();
        assert!(child.contains("x"));
        assert!(child.contains("ctx"));
        assert!(child.get("x").is_ok());
    }

    #[test]
    fn context_factory_exposes_shape() {
        let factory = context([("a", from_value(1u8)), ("b", from_value(2u8))]);
        assert_eq!(factory.scope(), Scope::Singleton);

        let mut keys: Vec<&str> = factory
            .shape()
            .unwrap()
            .keys()
            .map(DependencyKey::as_str)
            .collect();
        keys.sort();
        assert_eq!(keys, ["a", "b"]);
    }
}
