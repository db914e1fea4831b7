//! Key path validation.
//!
//! `extract` factories declare the paths they read. Validation walks each
//! declared path over the *registration shape* (the keys at each level,
//! and which of them are contexts with child registrations) without
//! constructing anything:
//! - The head segment must be registered at the declaring level or an
//!   enclosing one
//! - A segment reached through a context must be registered in that context
//!   (or, by fallback, where the context itself is registered or above)
//! - Walking stops at the first value that is not a context; what lies past
//!   it is only known once it is built
//!
//! Runs from [`ContainerBuilder::build()`](crate::container::ContainerBuilder::build)
//! or on demand via [`Container::validate()`](crate::container::Container::validate).

use satchel_support::rendering::suggest_similar;
use tracing::{debug, warn};

use crate::error::{Result, SatchelError, UnregisteredKeyError};
use crate::factory::{Factory, FactoryMap};
use crate::key::{DependencyKey, KeyPath};
use crate::settings::ContainerSettings;

/// Validates declared key paths against a registration shape.
///
/// # Algorithm
/// Depth-first over the levels (root registry, then each context's child
/// map). `chain` holds the levels visible from the current one, innermost
/// last, mirroring how a context's bag falls back to its parent.
pub(crate) struct PathValidator<'s> {
    settings: &'s ContainerSettings,
}

impl<'s> PathValidator<'s> {
    pub fn new(settings: &'s ContainerSettings) -> Self {
        Self { settings }
    }

    /// Validates every level reachable from `root`.
    ///
    /// # Errors
    /// [`SatchelError::UnregisteredKey`] for the first segment that names
    /// no registration, with `required_by` set to the declaring key.
    pub fn validate(&self, root: &FactoryMap) -> Result<()> {
        debug!(registered = root.len(), "Starting key path validation");

        let mut chain = vec![root];
        self.validate_level(root, &mut chain)?;

        debug!("Key path validation passed ✓");
        Ok(())
    }

    fn validate_level<'a>(
        &self,
        level: &'a FactoryMap,
        chain: &mut Vec<&'a FactoryMap>,
    ) -> Result<()> {
        // Sorted for deterministic error reporting
        let mut entries: Vec<(&'a DependencyKey, &'a Factory)> = level.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (key, factory) in entries {
            for path in factory.requires() {
                self.check_path(chain, key, path)?;
            }

            if let Some(child) = factory.shape() {
                chain.push(child);
                let result = self.validate_level(child, chain);
                chain.pop();
                result?;
            }
        }

        Ok(())
    }

    fn check_path<'a>(
        &self,
        chain: &[&'a FactoryMap],
        owner: &DependencyKey,
        path: &KeyPath,
    ) -> Result<()> {
        let mut visible: Vec<&'a FactoryMap> = chain.to_vec();

        for segment in path.segments() {
            let found = visible
                .iter()
                .enumerate()
                .rev()
                .find_map(|(depth, &level)| {
                    level.get(segment.as_str()).map(|factory| (depth, factory))
                });

            let Some((depth, factory)) = found else {
                warn!(
                    path = %path,
                    segment = %segment,
                    required_by = %owner,
                    "Unregistered key in path"
                );
                return Err(self.unregistered(&visible, segment, owner));
            };

            match factory.shape() {
                Some(child) => {
                    // A context's bag falls back to where the context is registered
                    visible.truncate(depth + 1);
                    visible.push(child);
                }
                None => return Ok(()),
            }
        }

        Ok(())
    }

    fn unregistered(
        &self,
        visible: &[&FactoryMap],
        segment: &DependencyKey,
        owner: &DependencyKey,
    ) -> SatchelError {
        let mut names: Vec<&str> = visible
            .iter()
            .flat_map(|level| level.keys().map(DependencyKey::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();

        SatchelError::UnregisteredKey(UnregisteredKeyError {
            requested: segment.clone(),
            required_by: Some(owner.clone()),
            suggestions: suggest_similar(segment.as_str(), &names, self.settings.max_suggestions),
        })
    }
}
