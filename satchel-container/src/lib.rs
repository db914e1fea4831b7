//! Core container implementation for Satchel.
//!
//! Factories are registered under string keys; a [`Bag`] hands every factory
//! a lazy view of the container so dependencies are resolved only when read.
//! [`context`] nests a scope under a key and [`extract`] feeds bag values to
//! functions taking positional arguments.

pub mod bag;
pub mod container;
pub mod context;
pub mod error;
pub mod extract;
pub mod factory;
pub mod key;
pub mod record;
mod registry;
pub mod scope;
pub mod settings;
mod validate;

pub use bag::Bag;
pub use container::{Container, ContainerBuilder, make, prelude};
pub use context::context;
pub use error::{Result, SatchelError};
pub use extract::{FromArgs, FromInstance, extract, extract_with_separator};
pub use factory::{Factory, Instance, from_class, from_value, singleton, transient, try_from_class};
pub use key::{DependencyKey, KeyPath};
pub use record::Record;
pub use scope::Scope;
pub use settings::ContainerSettings;
