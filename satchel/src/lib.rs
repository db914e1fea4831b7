//! # Satchel: a lazy, string-keyed dependency container
//!
//! Register factories under names, then ask for names. Each factory receives
//! a [`Bag`] and reads only the dependencies it needs, when it needs them,
//! so registration order never matters and unread keys are never built.
//!
//! ```rust
//! use satchel::prelude::*;
//! use std::sync::Arc;
//!
//! struct Store;
//! struct Service {
//!     store: Arc<Store>,
//! }
//!
//! let container = make([
//!     ("service", try_from_class(|deps: Bag| Ok(Service { store: deps.get_as("store")? }))),
//!     ("store", singleton(|_: &Bag| Ok(Store))),
//! ]);
//!
//! let service: Arc<Service> = container.get_as("service").unwrap();
//! let store: Arc<Store> = container.get_as("store").unwrap();
//! assert!(Arc::ptr_eq(&service.store, &store));
//! ```

pub use satchel_container::*;
pub use satchel_support::*;
