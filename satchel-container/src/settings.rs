//! Container settings.
//!
//! Settings are plain data and deserialize from any `serde` format, so they
//! can live next to the rest of an application's configuration. Missing
//! fields take their defaults.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Container`](crate::container::Container).
///
/// ```rust
/// use satchel_container::settings::ContainerSettings;
///
/// let settings = ContainerSettings::default();
/// assert_eq!(settings.max_suggestions, 3);
/// assert!(settings.validate_on_build);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// How many "did you mean" keys an unregistered-key error lists.
    pub max_suggestions: usize,
    /// Whether [`ContainerBuilder::build`](crate::container::ContainerBuilder::build)
    /// validates declared key paths.
    pub validate_on_build: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            validate_on_build: true,
        }
    }
}
