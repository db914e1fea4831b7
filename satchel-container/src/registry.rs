//! Factory registry: the registrations of one container.
//!
//! The registry maps [`DependencyKey`] to [`Factory`]. It stays mutable for
//! the container's whole life: `register` may add or replace entries at any
//! time, including while other threads resolve.

use dashmap::DashMap;
use tracing::debug;

use crate::factory::{Factory, FactoryMap};
use crate::key::DependencyKey;

/// Stores all factory registrations of a container.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: DashMap<DependencyKey, Factory>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the factory for `key`.
    ///
    /// Returns the factory that was replaced, if any. The last registration
    /// for a key always wins.
    pub fn register(&self, key: DependencyKey, factory: Factory) -> Option<Factory> {
        debug!(key = %key, scope = %factory.scope(), "Registered dependency");
        let previous = self.registrations.insert(key, factory);
        if let Some(ref replaced) = previous {
            debug!(previous_scope = %replaced.scope(), "Replaced earlier registration");
        }
        previous
    }

    /// Looks up a factory by key.
    ///
    /// Returns a clone so no map lock is held while the factory runs; a
    /// factory resolving other keys of this same registry must not contend
    /// with itself.
    pub fn get(&self, key: &str) -> Option<Factory> {
        self.registrations.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registrations.contains_key(key)
    }

    /// Returns the registered keys, sorted.
    pub fn keys(&self) -> Vec<DependencyKey> {
        let mut keys: Vec<DependencyKey> = self
            .registrations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Copies the current registrations (for validation).
    pub fn snapshot(&self) -> FactoryMap {
        self.registrations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Returns the number of registered keys.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
