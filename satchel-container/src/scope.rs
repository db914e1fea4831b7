//! Factory lifetimes.
//!
//! Every [`Factory`](crate::factory::Factory) carries a scope tag:
//! - [`Scope::Singleton`]: constructed at most once, then cached in the factory
//! - [`Scope::Transient`]: constructed anew on every resolve
//!
//! The tag is descriptive; caching itself lives in the wrapper built by
//! [`Factory::into_singleton`](crate::factory::Factory::into_singleton).
use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines how often a factory constructs its value.
///
/// # Examples
/// ```
/// use satchel_container::scope::Scope;
///
/// assert!(Scope::Singleton.is_cached());
/// assert!(!Scope::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One instance per factory wrapper.
    ///
    /// Created on first resolve, kept until the wrapper is dropped
    /// (replaced in the registry, or its container goes away).
    ///
    /// # When to use
    /// - Stores and caches shared by several services
    /// - API clients holding connection state
    /// - Nested contexts
    Singleton,

    /// New instance created on every resolve call.
    ///
    /// Never cached. Two resolves of the same key never share an instance.
    Transient,
}

impl Scope {
    /// Returns `true` if this scope caches instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Transient => write!(f, "Transient"),
        }
    }
}
