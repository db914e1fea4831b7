//! Error types for Satchel container operations.
//!
//! Every failure names the key or path it is about, so a misspelled
//! registration is obvious from the message alone.

use std::fmt;

use satchel_support::rendering::render_chain;

use crate::key::DependencyKey;

/// Boxed error raised by user construction code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Satchel operations.
#[derive(Debug, thiserror::Error)]
pub enum SatchelError {
    /// Requested key has no factory in the container (or any enclosing scope).
    #[error("{}", .0)]
    UnregisteredKey(UnregisteredKeyError),

    /// A resolved value was not of the type the caller asked for.
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch { key: String, expected: String },

    /// A dotted path could not be parsed.
    #[error("Invalid key path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The positional function takes a different number of arguments than
    /// there are paths.
    #[error("Argument count mismatch: function takes {expected} argument(s), {found} path(s) given")]
    ArityMismatch { expected: usize, found: usize },

    /// A path segment was read off a value that is neither a bag nor a record.
    #[error("Cannot read {path}: value before the marked segment has no fields")]
    PathNotTraversable { path: String, segment: String },

    /// A record along a path has no field named by the segment.
    #[error("Cannot read {path}: no field named {segment:?}")]
    MissingPathSegment { path: String, segment: String },

    /// A singleton's construction resolved that same singleton again on the
    /// same thread. The chain starts and ends with the repeated key.
    #[error("Circular dependency: {}", render_chain(.chain))]
    CircularDependency { chain: Vec<DependencyKey> },

    /// A bag was read after its container had been dropped.
    #[error("Cannot resolve {key}: the owning container was dropped")]
    ContainerDropped { key: DependencyKey },

    /// A factory failed while constructing its value.
    #[error(transparent)]
    Construction(BoxError),
}

impl SatchelError {
    /// Wraps a user error raised inside a factory or constructor.
    ///
    /// ```rust
    /// use satchel_container::error::SatchelError;
    ///
    /// let err = SatchelError::construction("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// ```
    pub fn construction(error: impl Into<BoxError>) -> Self {
        SatchelError::Construction(error.into())
    }

    /// Prepends `key` to a cycle chain that has not closed yet.
    pub(crate) fn passing_through(self, key: &str) -> Self {
        match self {
            SatchelError::CircularDependency { mut chain } => {
                let closed = chain.len() > 1 && chain.first() == chain.last();
                if !closed {
                    chain.insert(0, DependencyKey::from(key));
                }
                SatchelError::CircularDependency { chain }
            }
            other => other,
        }
    }

    /// Returns the unregistered key, if this is an [`SatchelError::UnregisteredKey`].
    pub fn unregistered_key(&self) -> Option<&DependencyKey> {
        match self {
            SatchelError::UnregisteredKey(err) => Some(&err.requested),
            _ => None,
        }
    }
}

/// Error when a key was not registered.
///
/// Includes helpful hints about what went wrong.
#[derive(Debug)]
pub struct UnregisteredKeyError {
    /// The key that was requested
    pub requested: DependencyKey,
    /// The factory that declared this key as a dependency (if known)
    pub required_by: Option<DependencyKey>,
    /// Similar keys that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnregisteredKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Convenient Result type for Satchel operations.
pub type Result<T> = std::result::Result<T, SatchelError>;
