//! Factories and the lifetime combinators that wrap them.
//!
//! A [`Factory`] turns a [`Bag`] into an [`Instance`]. The free functions in
//! this module build factories from ordinary closures and constructors:
//!
//! | combinator        | behaviour                                          |
//! |-------------------|----------------------------------------------------|
//! | [`transient`]     | calls the closure on every resolve                 |
//! | [`singleton`]     | calls the closure once, then returns the cached `Arc` |
//! | [`from_class`]    | hands the whole bag to a constructor               |
//! | [`try_from_class`]| same, for constructors that can fail               |
//! | [`from_value`]    | always returns the same pre-built value            |
//!
//! Nested scopes and positional arguments are covered by
//! [`context`](crate::context::context) and [`extract`](crate::extract::extract).

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use satchel_support::rendering::shorten_type_name;
use tracing::debug;

use crate::bag::Bag;
use crate::error::{Result, SatchelError};
use crate::key::{DependencyKey, KeyPath};
use crate::scope::Scope;

/// A resolved, type-erased value.
///
/// Always an `Arc`, so two resolves returning "the same instance" are
/// [`Arc::ptr_eq`].
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased construction function.
///
/// # Why `Arc` and not `Box`?
/// Factories are cloned into child registries and shared between threads;
/// clones must share one singleton cache cell.
pub type FactoryFn = Arc<dyn Fn(&Bag) -> Result<Instance> + Send + Sync>;

/// Key-to-factory mapping used to build containers and contexts.
pub type FactoryMap = HashMap<DependencyKey, Factory>;

/// A construction recipe for one key.
///
/// Cloning a `Factory` is cheap and the clone shares the original's
/// singleton cache, if any.
#[derive(Clone)]
pub struct Factory {
    call: FactoryFn,
    scope: Scope,
    requires: Arc<[KeyPath]>,
    shape: Option<Arc<FactoryMap>>,
}

impl Factory {
    /// Builds a factory from a raw, type-erased closure.
    ///
    /// Prefer the typed combinators ([`transient`], [`singleton`], ...);
    /// this is the escape hatch they are built on.
    pub fn new<F>(scope: Scope, call: F) -> Self
    where
        F: Fn(&Bag) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
            scope,
            requires: Arc::from(Vec::new()),
            shape: None,
        }
    }

    /// Runs the factory against `bag`.
    #[inline]
    pub fn invoke(&self, bag: &Bag) -> Result<Instance> {
        (self.call)(bag)
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Key paths this factory declared it reads (set by `extract`).
    #[inline]
    pub fn requires(&self) -> &[KeyPath] {
        &self.requires
    }

    /// Child registrations, if this factory builds a context.
    #[inline]
    pub fn shape(&self) -> Option<&FactoryMap> {
        self.shape.as_deref()
    }

    /// Wraps this factory so it constructs at most once.
    ///
    /// The first successful call stores its result; every later call returns
    /// that same `Arc` and ignores the bag it is given. A failed call leaves
    /// the cache empty. Concurrent first calls are serialized by the
    /// `OnceCell`, so the inner factory never runs twice.
    ///
    /// If the inner factory ends up resolving this same singleton again on
    /// the same thread, the call fails with
    /// [`SatchelError::CircularDependency`] instead of waiting on itself.
    /// A cycle split across threads still blocks.
    pub fn into_singleton(self) -> Factory {
        let cell: Arc<OnceCell<Instance>> = Arc::new(OnceCell::new());
        let inner = self.call;

        Factory {
            call: Arc::new(move |bag: &Bag| {
                if let Some(instance) = cell.get() {
                    return Ok(instance.clone());
                }

                let Some(_guard) = ConstructionGuard::enter(&cell) else {
                    return Err(SatchelError::CircularDependency { chain: Vec::new() });
                };

                cell.get_or_try_init(|| -> Result<Instance> {
                    let instance = inner(bag)?;
                    debug!("Singleton constructed");
                    Ok(instance)
                })
                .cloned()
            }),
            scope: Scope::Singleton,
            requires: self.requires,
            shape: self.shape,
        }
    }

    /// Identity wrapper: the same construction function, tagged transient.
    pub fn into_transient(self) -> Factory {
        Factory {
            scope: Scope::Transient,
            ..self
        }
    }

    pub(crate) fn with_requires(mut self, paths: Vec<KeyPath>) -> Self {
        self.requires = Arc::from(paths);
        self
    }

    pub(crate) fn with_shape(mut self, shape: Arc<FactoryMap>) -> Self {
        self.shape = Some(shape);
        self
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Factory");
        debug.field("scope", &self.scope);
        if !self.requires.is_empty() {
            debug.field("requires", &self.requires);
        }
        if let Some(shape) = &self.shape {
            let mut keys: Vec<&DependencyKey> = shape.keys().collect();
            keys.sort();
            debug.field("context", &keys);
        }
        debug.finish()
    }
}

thread_local! {
    /// Singleton cells whose construction is running on this thread.
    static CONSTRUCTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a singleton cell as under construction until dropped.
struct ConstructionGuard(usize);

impl ConstructionGuard {
    /// Returns `None` if this thread is already constructing `cell`.
    fn enter(cell: &Arc<OnceCell<Instance>>) -> Option<Self> {
        let id = Arc::as_ptr(cell) as usize;
        CONSTRUCTING.with_borrow_mut(|ids| {
            if ids.contains(&id) {
                return None;
            }
            ids.push(id);
            Some(Self(id))
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with_borrow_mut(|ids| ids.retain(|&id| id != self.0));
    }
}

/// Downcasts a resolved instance, reporting `key` on mismatch.
pub(crate) fn downcast<T: Any + Send + Sync>(key: &str, instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| SatchelError::TypeMismatch {
        key: key.to_string(),
        expected: shorten_type_name(type_name::<T>()),
    })
}

/// A factory that constructs a fresh value on every resolve.
///
/// ```rust
/// use satchel_container::prelude::*;
///
/// let container = Container::new([("answer", transient(|_: &Bag| Ok(42u32)))]);
/// let a: std::sync::Arc<u32> = container.get_as("answer").unwrap();
/// let b: std::sync::Arc<u32> = container.get_as("answer").unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub fn transient<T, F>(factory: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&Bag) -> Result<T> + Send + Sync + 'static,
{
    Factory::new(Scope::Transient, move |bag: &Bag| {
        Ok(Arc::new(factory(bag)?) as Instance)
    })
}

/// A factory that constructs once and returns the cached instance afterwards.
///
/// To make an existing [`Factory`] a singleton, use
/// [`Factory::into_singleton`].
pub fn singleton<T, F>(factory: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&Bag) -> Result<T> + Send + Sync + 'static,
{
    transient(factory).into_singleton()
}

/// Adapts a constructor that takes the whole dependency bag.
///
/// The constructor receives its own clone of the bag, so it may keep it and
/// read dependencies lazily later on.
pub fn from_class<T, C>(constructor: C) -> Factory
where
    T: Send + Sync + 'static,
    C: Fn(Bag) -> T + Send + Sync + 'static,
{
    transient(move |bag: &Bag| Ok(constructor(bag.clone())))
}

/// Like [`from_class`], for constructors that can fail.
///
/// The constructor's error is returned from `get` as-is.
pub fn try_from_class<T, C>(constructor: C) -> Factory
where
    T: Send + Sync + 'static,
    C: Fn(Bag) -> Result<T> + Send + Sync + 'static,
{
    transient(move |bag: &Bag| constructor(bag.clone()))
}

/// A constant factory: ignores the bag and always returns `value`.
///
/// The value is wrapped once, so every resolve returns the same `Arc`.
pub fn from_value<T>(value: T) -> Factory
where
    T: Send + Sync + 'static,
{
    let instance: Instance = Arc::new(value);
    Factory::new(Scope::Singleton, move |_: &Bag| Ok(instance.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;

    struct Store {
        id: u32,
    }

    fn counting<T>(
        counter: &Arc<AtomicU32>,
        make: fn(u32) -> T,
    ) -> impl Fn(&Bag) -> Result<T> + Send + Sync + 'static
    where
        T: Send + Sync + 'static,
    {
        let counter = counter.clone();
        move |_: &Bag| Ok(make(counter.fetch_add(1, Ordering::SeqCst)))
    }

    #[test]
    fn transient_creates_new_each_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let container =
            Container::new([("store", transient(counting(&counter, |id| Store { id })))]);

        let a: Arc<Store> = container.get_as("store").unwrap();
        let b: Arc<Store> = container.get_as("store").unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!((a.id, b.id), (0, 1));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn singleton_factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let container =
            Container::new([("store", singleton(counting(&counter, |id| Store { id })))]);

        let a: Arc<Store> = container.get_as("store").unwrap();
        let b: Arc<Store> = container.get_as("store").unwrap();
        let c: Arc<Store> = container.get_as("store").unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[test]
    fn singleton_ignores_later_bags() {
        let factory = singleton(|bag: &Bag| bag.get_as::<u32>("seed").map(|seed| *seed));

        let first = Container::new([("seed", from_value(1u32)), ("value", factory.clone())]);
        let second = Container::new([("seed", from_value(2u32)), ("value", factory)]);

        assert_eq!(*first.get_as::<u32>("value").unwrap(), 1);
        // Same wrapper, different bag: the cached value wins
        assert_eq!(*second.get_as::<u32>("value").unwrap(), 1);
    }

    #[test]
    fn singleton_retries_after_failure() {
        let attempts = Arc::new(AtomicU32::new(0));
        let factory = singleton({
            let attempts = attempts.clone();
            move |_: &Bag| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SatchelError::construction("not ready"))
                } else {
                    Ok(Store { id: 7 })
                }
            }
        });
        let container = Container::new([("store", factory)]);

        assert!(container.get("store").is_err());
        let a: Arc<Store> = container.get_as("store").unwrap();
        let b: Arc<Store> = container.get_as("store").unwrap();

        assert_eq!(a.id, 7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_constructs_once_under_contention() {
        const THREADS: usize = 8;
        let counter = Arc::new(AtomicU32::new(0));
        let container = Container::new([(
            "store",
            singleton({
                let counter = counter.clone();
                move |_: &Bag| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    Ok(Store { id: 1 })
                }
            }),
        )]);
        let barrier = Barrier::new(THREADS);

        let stores: Vec<Arc<Store>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.get_as::<Store>("store").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn singleton_cycle_fails_instead_of_hanging() {
        let container = Container::new([
            ("a", singleton(|deps: &Bag| deps.get("b"))),
            ("b", transient(|deps: &Bag| deps.get("a"))),
        ]);

        match container.get("a") {
            Err(SatchelError::CircularDependency { chain }) => {
                let chain: Vec<&str> = chain.iter().map(DependencyKey::as_str).collect();
                assert_eq!(chain, ["a", "b", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }

        // The failed attempt leaves nothing cached and nothing marked
        container.register("b", from_value(7u8));
        let a = container.get("a").unwrap();
        assert_eq!(a.downcast_ref::<Instance>().and_then(|b| b.downcast_ref::<u8>()), Some(&7));
    }

    #[test]
    fn singleton_reading_itself_names_key_twice() {
        let container = Container::new([("a", singleton(|deps: &Bag| deps.get("a")))]);

        let err = container.get("a").unwrap_err();
        assert_eq!(err.to_string(), "Circular dependency: a → a");
    }

    #[test]
    fn into_transient_keeps_behaviour() {
        let counter = Arc::new(AtomicU32::new(0));
        let factory = transient(counting(&counter, |id| id)).into_transient();
        assert_eq!(factory.scope(), Scope::Transient);

        let container = Container::new([("n", factory)]);
        container.get("n").unwrap();
        container.get("n").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn from_class_receives_bag() {
        struct Service {
            deps: Bag,
        }

        let container = Container::new([
            ("name", from_value(String::from("library"))),
            ("service", from_class(|deps: Bag| Service { deps })),
        ]);

        let service: Arc<Service> = container.get_as("service").unwrap();
        let name: Arc<String> = service.deps.get_as("name").unwrap();
        assert_eq!(name.as_str(), "library");
    }

    #[test]
    fn from_class_composes_with_into_singleton() {
        struct Service;

        let container =
            Container::new([("service", from_class(|_: Bag| Service).into_singleton())]);
        let a = container.get("service").unwrap();
        let b = container.get("service").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn try_from_class_propagates_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("bad config")]
        struct BadConfig;

        let container = Container::new([(
            "service",
            try_from_class(|_: Bag| -> Result<Store> {
                Err(SatchelError::construction(BadConfig))
            }),
        )]);

        match container.get("service") {
            Err(SatchelError::Construction(source)) => {
                assert!(source.downcast_ref::<BadConfig>().is_some())
            }
            other => panic!("Expected Construction, got: {other:?}"),
        }
    }

    #[test]
    fn from_value_returns_same_instance() {
        let container = Container::new([("limit", from_value(10usize))]);
        let a = container.get("limit").unwrap();
        let b = container.get("limit").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*container.get_as::<usize>("limit").unwrap(), 10);
    }

    #[test]
    fn debug_shows_scope() {
        assert!(format!("{:?}", from_value(1u8)).contains("Singleton"));
        assert!(format!("{:?}", transient(|_: &Bag| Ok(1u8))).contains("Transient"));
    }
}
