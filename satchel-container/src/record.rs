//! Plain field maps that key paths can walk through.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::factory::Instance;
use crate::key::DependencyKey;

/// An eagerly built set of named values.
///
/// Where a [`Bag`](crate::bag::Bag) resolves its fields on demand, a
/// `Record` already holds them. Register one with
/// [`from_value`](crate::factory::from_value) to expose grouped settings
/// that `extract` paths such as `"limits.max_books"` can reach.
///
/// ```rust
/// use satchel_container::record::Record;
///
/// let limits = Record::new().with("max_books", 25usize);
/// assert!(limits.field("max_books").is_some());
/// assert!(limits.field("min_books").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Record {
    fields: HashMap<DependencyKey, Instance>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a field holding `value`.
    pub fn with<T>(mut self, name: impl Into<DependencyKey>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Arc::new(value));
        self
    }

    /// Adds (or replaces) a field holding an already-shared instance.
    pub fn with_instance(mut self, name: impl Into<DependencyKey>, instance: Instance) -> Self {
        self.fields.insert(name.into(), instance);
        self
    }

    /// Returns the field's instance, if present.
    pub fn field(&self, name: &str) -> Option<Instance> {
        self.fields.get(name).cloned()
    }

    /// Typed field access; `None` when absent or of another type.
    pub fn field_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.field(name)?.downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&DependencyKey> = self.fields.keys().collect();
        names.sort();
        f.debug_struct("Record").field("fields", &names).finish()
    }
}
