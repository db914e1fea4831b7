//! The lazy dependency bag handed to every factory.
//!
//! Reading a key from a [`Bag`] *is* resolving it: nothing is constructed
//! when the bag is created or when a factory starts running, only at the
//! moment a key is read. Registration order therefore never matters, and a
//! factory may read a key registered after its own.
//!
//! A bag holds a weak handle to its container. Services that keep their bag
//! around (the `from_class` style) do not keep the container alive, and a
//! read after the container is gone fails with
//! [`SatchelError::ContainerDropped`]. The bag of a context is the exception:
//! it owns its child container, which lives as long as the parent's cached
//! context value.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use tracing::trace;

use crate::container::Inner;
use crate::error::{Result, SatchelError};
use crate::factory::{Instance, downcast};
use crate::key::{DependencyKey, KeyPath};
use crate::record::Record;
use crate::settings::ContainerSettings;

/// Lazily-resolving view of a container.
#[derive(Clone)]
pub struct Bag {
    scope: Weak<Inner>,
    anchor: Option<Arc<Inner>>,
}

impl Bag {
    /// A non-owning view of `inner`.
    pub(crate) fn view(inner: &Arc<Inner>) -> Self {
        Self {
            scope: Arc::downgrade(inner),
            anchor: None,
        }
    }

    /// A view that keeps `inner` alive.
    pub(crate) fn owning(inner: Arc<Inner>) -> Self {
        Self {
            scope: Arc::downgrade(&inner),
            anchor: Some(inner),
        }
    }

    fn upgrade(&self, key: &str) -> Result<Arc<Inner>> {
        match &self.anchor {
            Some(inner) => Ok(inner.clone()),
            None => self.scope.upgrade().ok_or_else(|| SatchelError::ContainerDropped {
                key: DependencyKey::from(key),
            }),
        }
    }

    /// Resolves `key` right now, exactly like `container.get(key)`.
    ///
    /// Keys missing from this bag's container are looked up in the
    /// enclosing container, if any (see [`context`](crate::context::context)).
    pub fn get(&self, key: &str) -> Result<Instance> {
        self.upgrade(key)?.resolve(key)
    }

    /// Resolves `key` and downcasts it.
    ///
    /// # Errors
    /// [`SatchelError::TypeMismatch`] if the value is not a `T`, plus
    /// anything [`Bag::get`] returns.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        downcast(key, self.get(key)?)
    }

    /// Resolves a context key as its bag.
    pub fn nested(&self, key: &str) -> Result<Bag> {
        self.get_as::<Bag>(key).map(|bag| Bag::clone(&bag))
    }

    /// Resolves a dotted path such as `"books.store"`.
    pub fn path(&self, raw: &str) -> Result<Instance> {
        self.walk(&KeyPath::parse(raw)?)
    }

    /// Resolves a dotted path and downcasts the leaf.
    pub fn path_as<T: Any + Send + Sync>(&self, raw: &str) -> Result<Arc<T>> {
        downcast(raw, self.path(raw)?)
    }

    /// Walks `path` from this bag, one read per segment.
    ///
    /// The head segment is resolved here; each later segment is read off the
    /// previous value, which must be a [`Bag`] (resolved lazily) or a
    /// [`Record`].
    pub fn walk(&self, path: &KeyPath) -> Result<Instance> {
        trace!(path = %path, "Walking key path");

        let mut current = self.get(path.head().as_str())?;
        for (index, segment) in path.segments().iter().enumerate().skip(1) {
            current = read_field(&current, path, index, segment)?;
        }

        Ok(current)
    }

    /// Whether `key` is registered here or in an enclosing container.
    ///
    /// Does not resolve anything.
    pub fn contains(&self, key: &str) -> bool {
        self.upgrade(key).is_ok_and(|inner| inner.contains(key))
    }

    /// Whether both bags view the same container.
    pub fn same_scope(&self, other: &Bag) -> bool {
        Weak::ptr_eq(&self.scope, &other.scope)
    }

    pub(crate) fn settings(&self) -> ContainerSettings {
        self.scope
            .upgrade()
            .map(|inner| inner.settings().clone())
            .unwrap_or_default()
    }
}

fn read_field(
    value: &Instance,
    path: &KeyPath,
    index: usize,
    segment: &DependencyKey,
) -> Result<Instance> {
    let value: &(dyn Any + Send + Sync) = &**value;

    if let Some(bag) = value.downcast_ref::<Bag>() {
        return bag.get(segment.as_str());
    }

    if let Some(record) = value.downcast_ref::<Record>() {
        return record
            .field(segment.as_str())
            .ok_or_else(|| SatchelError::MissingPathSegment {
                path: path.render_focus(index),
                segment: segment.to_string(),
            });
    }

    Err(SatchelError::PathNotTraversable {
        path: path.render_focus(index),
        segment: segment.to_string(),
    })
}

impl fmt::Debug for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Bag");
        match self.scope.upgrade() {
            Some(inner) => debug.field("keys", &inner.keys()),
            None => debug.field("keys", &"<dropped>"),
        };
        debug.field("owning", &self.anchor.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::factory::{from_value, singleton, transient};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn reading_resolves_at_access_time() {
        let reads = Arc::new(AtomicU32::new(0));
        let container = Container::new([
            (
                "expensive",
                transient({
                    let reads = reads.clone();
                    move |_: &Bag| {
                        reads.fetch_add(1, Ordering::SeqCst);
                        Ok(1u8)
                    }
                }),
            ),
            (
                "lazy",
                transient(|bag: &Bag| Ok(LazyUser { deps: bag.clone() })),
            ),
        ]);

        let user: Arc<LazyUser> = container.get_as("lazy").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 0);

        user.deps.get("expensive").unwrap();
        user.deps.get("expensive").unwrap();
        // Each textual read is its own resolution
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    struct LazyUser {
        deps: Bag,
    }

    #[test]
    fn unread_keys_are_never_resolved() {
        let container = Container::new([
            (
                "broken",
                transient(|_: &Bag| -> Result<u8> { Err(SatchelError::construction("boom")) }),
            ),
            ("fine", transient(|_: &Bag| Ok(2u8))),
            ("consumer", transient(|bag: &Bag| bag.get_as::<u8>("fine").map(|v| *v + 1))),
        ]);

        assert_eq!(*container.get_as::<u8>("consumer").unwrap(), 3);
    }

    #[test]
    fn get_as_reports_type_mismatch() {
        let container = Container::new([("count", from_value(3u32))]);

        match container.bag().get_as::<String>("count") {
            Err(SatchelError::TypeMismatch { key, expected }) => {
                assert_eq!(key, "count");
                assert_eq!(expected, "String");
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn bag_outliving_container_fails_cleanly() {
        let bag = {
            let container = Container::new([("x", from_value(1u8))]);
            container.bag()
        };

        match bag.get("x") {
            Err(SatchelError::ContainerDropped { key }) => assert_eq!(key.as_str(), "x"),
            other => panic!("Expected ContainerDropped, got: {other:?}"),
        }
        assert!(!bag.contains("x"));
    }

    #[test]
    fn path_through_record() {
        let container = Container::new([(
            "limits",
            from_value(Record::new().with("max_books", 25usize)),
        )]);
        let bag = container.bag();

        assert_eq!(*bag.path_as::<usize>("limits.max_books").unwrap(), 25);

        match bag.path("limits.min_books") {
            Err(SatchelError::MissingPathSegment { path, segment }) => {
                assert_eq!(path, "limits.[min_books]");
                assert_eq!(segment, "min_books");
            }
            other => panic!("Expected MissingPathSegment, got: {other:?}"),
        }
    }

    #[test]
    fn path_through_opaque_value_fails() {
        let container = Container::new([("count", from_value(3u32))]);

        match container.bag().path("count.inner") {
            Err(SatchelError::PathNotTraversable { path, segment }) => {
                assert_eq!(path, "count.[inner]");
                assert_eq!(segment, "inner");
            }
            other => panic!("Expected PathNotTraversable, got: {other:?}"),
        }
    }

    #[test]
    fn same_scope_compares_containers() {
        let container = Container::new([("x", singleton(|_: &Bag| Ok(1u8)))]);
        let other = Container::new([("x", singleton(|_: &Bag| Ok(1u8)))]);

        assert!(container.bag().same_scope(&container.bag()));
        assert!(!container.bag().same_scope(&other.bag()));
    }

    #[test]
    fn debug_lists_keys() {
        let container = Container::new([("b", from_value(1u8)), ("a", from_value(2u8))]);
        let debug = format!("{:?}", container.bag());
        assert!(debug.contains("\"a\""));
        assert!(debug.contains("owning: false"));
    }
}
