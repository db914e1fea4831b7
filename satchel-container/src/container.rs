//! # The Container
//!
//! Owns a registry of factories and resolves keys to instances on demand.
//!
//! # Architecture
//! ```text
//! Container::new(map) ─────────────────────────┐
//! ContainerBuilder ──build()──> validate() ────┤
//!                                              ▼
//!                         Container ──bag()──> Bag ──get(key)──┐
//!                             ▲                                │
//!                             └──── factory(&bag) <── registry ┘
//! ```
//!
//! # Examples
//! ```rust
//! use satchel_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Store;
//!
//! struct Service {
//!     store: Arc<Store>,
//! }
//!
//! let container = Container::new([
//!     ("store", singleton(|_: &Bag| Ok(Store))),
//!     ("service", transient(|deps: &Bag| Ok(Service { store: deps.get_as("store")? }))),
//! ]);
//!
//! let a: Arc<Service> = container.get_as("service").unwrap();
//! let b: Arc<Service> = container.get_as("service").unwrap();
//! assert!(!Arc::ptr_eq(&a, &b));
//! assert!(Arc::ptr_eq(&a.store, &b.store));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use satchel_support::rendering::suggest_similar;
use tracing::{info, instrument, trace};

use crate::bag::Bag;
use crate::error::{Result, SatchelError, UnregisteredKeyError};
use crate::factory::{Factory, Instance, downcast};
use crate::key::DependencyKey;
use crate::registry::Registry;
use crate::settings::ContainerSettings;
use crate::validate::PathValidator;

// ============================================================
// Inner (shared state behind Container and Bag)
// ============================================================

pub(crate) struct Inner {
    registry: Registry,
    parent: Option<Bag>,
    settings: ContainerSettings,
}

impl Inner {
    /// Resolves `key`: own registry first, then the enclosing scope.
    pub(crate) fn resolve(self: &Arc<Self>, key: &str) -> Result<Instance> {
        trace!(%key, "Resolving");

        if let Some(factory) = self.registry.get(key) {
            return factory
                .invoke(&Bag::view(self))
                .map_err(|err| err.passing_through(key));
        }

        match &self.parent {
            Some(parent) => {
                trace!(%key, "Delegating to enclosing scope");
                parent.get(key).map_err(|err| self.widen_suggestions(key, err))
            }
            None => Err(self.unregistered(key)),
        }
    }

    /// Re-scores the suggestions of an enclosing scope's miss for `key` so
    /// this scope's own keys are offered too.
    fn widen_suggestions(&self, key: &str, err: SatchelError) -> SatchelError {
        let mut missing = match err {
            SatchelError::UnregisteredKey(missing)
                if missing.requested.as_str() == key && missing.required_by.is_none() =>
            {
                missing
            }
            other => return other,
        };

        let own = self.registry.keys();
        let mut names: Vec<&str> = own.iter().map(DependencyKey::as_str).collect();
        names.extend(missing.suggestions.iter().map(String::as_str));
        names.sort_unstable();
        names.dedup();

        missing.suggestions = suggest_similar(key, &names, self.settings.max_suggestions);
        SatchelError::UnregisteredKey(missing)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
            || self.parent.as_ref().is_some_and(|parent| parent.contains(key))
    }

    pub(crate) fn keys(&self) -> Vec<DependencyKey> {
        self.registry.keys()
    }

    pub(crate) fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    fn unregistered(&self, key: &str) -> SatchelError {
        let known = self.registry.keys();
        let names: Vec<&str> = known.iter().map(DependencyKey::as_str).collect();

        SatchelError::UnregisteredKey(UnregisteredKeyError {
            requested: DependencyKey::from(key),
            required_by: None,
            suggestions: suggest_similar(key, &names, self.settings.max_suggestions),
        })
    }
}

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`], validating declared key paths.
///
/// [`Container::new`] accepts a partial registry as-is; the builder is for
/// registries that are complete up front and should fail at setup if an
/// `extract` path names a key nobody registered.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .register("store", singleton(|_: &Bag| Ok(BookStore::default())))
///     .register("service", extract(BookService::new, ["bookApiClient", "store"])?)
///     .register("bookApiClient", from_class(BookApiClient::new))
///     .build()?;
/// ```
pub struct ContainerBuilder {
    registrations: Vec<(DependencyKey, Factory)>,
    settings: ContainerSettings,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registrations: Vec::new(),
            settings: ContainerSettings::default(),
        }
    }

    /// Replaces the container settings.
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a registration. Later registrations of the same key win.
    pub fn register(mut self, key: impl Into<DependencyKey>, factory: Factory) -> Self {
        self.registrations.push((key.into(), factory));
        self
    }

    /// Build the container.
    ///
    /// With `validate_on_build` set, every declared path must reach a
    /// registered key (see [`Container::validate`]).
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        let validate = self.settings.validate_on_build;
        let container = Container::with_settings(self.registrations, self.settings);

        if validate {
            container.validate()?;
        }

        info!(registered = container.len(), "Container built");
        Ok(container)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// A lazily-resolving, thread-safe dependency container.
///
/// Cloning a `Container` yields another handle to the same registry.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Creates a container from a (possibly partial) key-to-factory map.
    ///
    /// No validation happens here: keys may be registered later with
    /// [`Container::register`].
    pub fn new<I, K>(factories: I) -> Self
    where
        I: IntoIterator<Item = (K, Factory)>,
        K: Into<DependencyKey>,
    {
        Self::with_settings(factories, ContainerSettings::default())
    }

    /// Like [`Container::new`], with explicit settings.
    pub fn with_settings<I, K>(factories: I, settings: ContainerSettings) -> Self
    where
        I: IntoIterator<Item = (K, Factory)>,
        K: Into<DependencyKey>,
    {
        Self::assemble(factories, None, settings)
    }

    /// Creates a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// A container whose bag falls back to `parent` for keys it lacks.
    pub(crate) fn nested<I, K>(factories: I, parent: Bag) -> Self
    where
        I: IntoIterator<Item = (K, Factory)>,
        K: Into<DependencyKey>,
    {
        let settings = parent.settings();
        Self::assemble(factories, Some(parent), settings)
    }

    fn assemble<I, K>(factories: I, parent: Option<Bag>, settings: ContainerSettings) -> Self
    where
        I: IntoIterator<Item = (K, Factory)>,
        K: Into<DependencyKey>,
    {
        let registry = Registry::new();
        for (key, factory) in factories {
            registry.register(key.into(), factory);
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                parent,
                settings,
            }),
        }
    }

    /// Resolves `key` by invoking its factory with this container's bag.
    ///
    /// The result is returned as-is: cached only if the factory is a
    /// singleton, and any error the factory raises passes through untouched.
    ///
    /// # Errors
    /// [`SatchelError::UnregisteredKey`] naming `key` if nothing is
    /// registered for it.
    pub fn get(&self, key: &str) -> Result<Instance> {
        self.inner.resolve(key)
    }

    /// Resolves `key` and downcasts it.
    ///
    /// ```rust,ignore
    /// let store: Arc<BookStore> = container.get_as("store")?;
    /// ```
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        downcast(key, self.get(key)?)
    }

    /// Inserts or replaces the factory for `key`; chainable.
    ///
    /// Replacing a singleton replaces its cache too: the next `get` runs the
    /// new factory. Instances handed out before stay as they are.
    pub fn register(&self, key: impl Into<DependencyKey>, factory: Factory) -> &Self {
        self.inner.registry.register(key.into(), factory);
        self
    }

    /// The lazy bag viewing this container.
    ///
    /// The bag does not keep the container alive.
    pub fn bag(&self) -> Bag {
        Bag::view(&self.inner)
    }

    /// Converts the container into a bag that owns it.
    pub fn into_bag(self) -> Bag {
        Bag::owning(self.inner)
    }

    /// Checks every path declared by an `extract` factory against the
    /// registered keys, descending into contexts.
    ///
    /// Paths continuing past a value that is not a context are accepted
    /// without being resolved.
    #[instrument(skip(self), name = "path_validation")]
    pub fn validate(&self) -> Result<()> {
        let root = self.inner.registry.snapshot();
        PathValidator::new(&self.inner.settings).validate(&root)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<DependencyKey> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.inner.registry.len())
            .finish()
    }
}

/// Creates a container from a (possibly partial) key-to-factory map.
///
/// Shorthand for [`Container::new`].
pub fn make<I, K>(factories: I) -> Container
where
    I: IntoIterator<Item = (K, Factory)>,
    K: Into<DependencyKey>,
{
    Container::new(factories)
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, make};
    pub use crate::bag::Bag;
    pub use crate::context::context;
    pub use crate::error::{Result, SatchelError};
    pub use crate::extract::{FromArgs, FromInstance, extract, extract_with_separator};
    pub use crate::factory::{
        Factory, Instance, from_class, from_value, singleton, transient, try_from_class,
    };
    pub use crate::key::{DependencyKey, KeyPath};
    pub use crate::record::Record;
    pub use crate::scope::Scope;
    pub use crate::settings::ContainerSettings;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
