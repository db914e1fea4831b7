//! Dependency identification keys and dotted key paths.
//!
//! [`DependencyKey`] names one dependency within a container's registry.
//! [`KeyPath`] is a parsed dotted path such as `"books.apiClient"`, used by
//! [`extract`](crate::extract::extract) to reach into nested scopes.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use satchel_support::rendering::render_path;

use crate::error::{Result, SatchelError};

/// Default separator between the segments of a [`KeyPath`].
pub const PATH_SEPARATOR: char = '.';

/// Names a dependency in a container.
///
/// Cheap to clone (`Arc<str>` inside) and borrowable as `&str`, so
/// registries can be probed with a plain string slice.
///
/// # Examples
/// ```
/// use satchel_container::key::DependencyKey;
///
/// let key = DependencyKey::from("store");
/// assert_eq!(key.as_str(), "store");
/// assert_eq!(key, DependencyKey::from(String::from("store")));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(Arc<str>);

impl DependencyKey {
    /// Creates a key from any string-like value.
    #[inline]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the key's name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DependencyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DependencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DependencyKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&String> for DependencyKey {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<String> for DependencyKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&DependencyKey> for DependencyKey {
    fn from(key: &DependencyKey) -> Self {
        key.clone()
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({:?})", &*self.0)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed dotted path into a dependency bag.
///
/// Every segment is non-empty; the first segment names a key of the bag
/// the walk starts from, and each later segment is read off the value
/// produced by the previous one.
///
/// ```
/// use satchel_container::key::KeyPath;
///
/// let path = KeyPath::parse("books.apiClient").unwrap();
/// assert_eq!(path.len(), 2);
/// assert_eq!(path.head().as_str(), "books");
/// assert!(KeyPath::parse("books..store").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    raw: String,
    separator: char,
    segments: Vec<DependencyKey>,
}

impl KeyPath {
    /// Parses `raw` using the default `.` separator.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, PATH_SEPARATOR)
    }

    /// Parses `raw`, splitting on `separator`.
    ///
    /// # Errors
    /// [`SatchelError::InvalidPath`] if the path is empty or any segment
    /// between separators is empty.
    pub fn parse_with(raw: &str, separator: char) -> Result<Self> {
        if raw.is_empty() {
            return Err(SatchelError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".into(),
            });
        }

        let mut segments = Vec::new();
        for (index, segment) in raw.split(separator).enumerate() {
            if segment.is_empty() {
                return Err(SatchelError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("segment {index} is empty"),
                });
            }
            segments.push(DependencyKey::new(segment));
        }

        Ok(Self {
            raw: raw.to_string(),
            separator,
            segments,
        })
    }

    /// The path exactly as written.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The first segment: the key looked up in the starting bag.
    #[inline]
    pub fn head(&self) -> &DependencyKey {
        // parse_with never produces an empty path
        &self.segments[0]
    }

    #[inline]
    pub fn segments(&self) -> &[DependencyKey] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false` for a parsed path; present for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the path with the segment at `index` highlighted, for errors.
    pub fn render_focus(&self, index: usize) -> String {
        render_path(&self.segments, self.separator, Some(index))
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({:?})", self.raw)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
