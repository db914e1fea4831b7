//! Positional-argument adapter.
//!
//! Most constructors want their dependencies as individual parameters rather
//! than a whole [`Bag`]. [`extract`] bridges the two: it reads one dotted
//! path per parameter off the bag and calls the function with the results,
//! in order.
//!
//! ```rust
//! use satchel_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct ApiClient;
//! struct Store;
//! struct Service {
//!     client: Arc<ApiClient>,
//!     store: Arc<Store>,
//! }
//!
//! let container = Container::new([
//!     ("books", context([
//!         ("apiClient", transient(|_: &Bag| Ok(ApiClient))),
//!         ("store", singleton(|_: &Bag| Ok(Store))),
//!     ])),
//!     (
//!         "service",
//!         extract(
//!             |(client, store): (Arc<ApiClient>, Arc<Store>)| Ok(Service { client, store }),
//!             ["books.apiClient", "books.store"],
//!         )
//!         .unwrap(),
//!     ),
//! ]);
//!
//! let service: Arc<Service> = container.get_as("service").unwrap();
//! let store: Arc<Store> = container.bag().path_as("books.store").unwrap();
//! assert!(Arc::ptr_eq(&service.store, &store));
//! ```

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::bag::Bag;
use crate::error::{Result, SatchelError};
use crate::factory::{Factory, Instance, downcast, transient};
use crate::key::{KeyPath, PATH_SEPARATOR};

/// One positional argument: converts a resolved instance into a parameter.
///
/// Implemented for `Arc<T>` (any registered value) and [`Bag`] (a context).
pub trait FromInstance: Sized {
    fn from_instance(path: &KeyPath, instance: Instance) -> Result<Self>;
}

impl<T: Any + Send + Sync> FromInstance for Arc<T> {
    fn from_instance(path: &KeyPath, instance: Instance) -> Result<Self> {
        downcast(path.as_str(), instance)
    }
}

impl FromInstance for Bag {
    fn from_instance(path: &KeyPath, instance: Instance) -> Result<Self> {
        downcast::<Bag>(path.as_str(), instance).map(|bag| Bag::clone(&bag))
    }
}

/// The full positional parameter list of an extracted function.
///
/// Implemented for `()` and for tuples of up to eight [`FromInstance`]
/// values; the tuple's length must equal the number of paths.
pub trait FromArgs: Sized {
    /// Number of positional parameters.
    const ARITY: usize;

    fn from_args(args: Vec<(KeyPath, Instance)>) -> Result<Self>;
}

macro_rules! impl_from_args {
    ($arity:literal; $($arg:ident),+) => {
        impl<$($arg: FromInstance),+> FromArgs for ($($arg,)+) {
            const ARITY: usize = $arity;

            fn from_args(args: Vec<(KeyPath, Instance)>) -> Result<Self> {
                let found = args.len();
                if found != $arity {
                    return Err(SatchelError::ArityMismatch { expected: $arity, found });
                }

                let mut args = args.into_iter();
                Ok(($(
                    {
                        let (path, instance) = args
                            .next()
                            .ok_or(SatchelError::ArityMismatch { expected: $arity, found })?;
                        $arg::from_instance(&path, instance)?
                    },
                )+))
            }
        }
    };
}

impl FromArgs for () {
    const ARITY: usize = 0;

    fn from_args(args: Vec<(KeyPath, Instance)>) -> Result<Self> {
        match args.len() {
            0 => Ok(()),
            found => Err(SatchelError::ArityMismatch { expected: 0, found }),
        }
    }
}

impl_from_args!(1; A);
impl_from_args!(2; A, B);
impl_from_args!(3; A, B, C);
impl_from_args!(4; A, B, C, D);
impl_from_args!(5; A, B, C, D, E);
impl_from_args!(6; A, B, C, D, E, F);
impl_from_args!(7; A, B, C, D, E, F, G);
impl_from_args!(8; A, B, C, D, E, F, G, H);

/// Builds a factory that calls `f` with the values found at `paths`.
///
/// Each path is split on `.`; its first segment is read from the bag and
/// each later segment from the value before it (a context's bag or a
/// [`Record`](crate::record::Record)). Every read happens when the factory
/// runs, never before. The factory is transient; wrap it with
/// [`Factory::into_singleton`] to cache.
///
/// # Errors
/// At setup: [`SatchelError::InvalidPath`] for a malformed path and
/// [`SatchelError::ArityMismatch`] if `f` takes a different number of
/// arguments than there are paths. At resolve time, whatever the walk or `f`
/// returns.
pub fn extract<A, T, F, I, P>(f: F, paths: I) -> Result<Factory>
where
    A: FromArgs,
    T: Send + Sync + 'static,
    F: Fn(A) -> Result<T> + Send + Sync + 'static,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    extract_with_separator(PATH_SEPARATOR, f, paths)
}

/// Like [`extract`], splitting paths on `separator`.
pub fn extract_with_separator<A, T, F, I, P>(separator: char, f: F, paths: I) -> Result<Factory>
where
    A: FromArgs,
    T: Send + Sync + 'static,
    F: Fn(A) -> Result<T> + Send + Sync + 'static,
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let paths: Vec<KeyPath> = paths
        .into_iter()
        .map(|raw| KeyPath::parse_with(raw.as_ref(), separator))
        .collect::<Result<_>>()?;

    if paths.len() != A::ARITY {
        return Err(SatchelError::ArityMismatch {
            expected: A::ARITY,
            found: paths.len(),
        });
    }

    let declared = paths.clone();
    let factory = transient(move |bag: &Bag| {
        let mut args = Vec::with_capacity(paths.len());
        for path in &paths {
            trace!(path = %path, "Extracting argument");
            args.push((path.clone(), bag.walk(path)?));
        }
        f(A::from_args(args)?)
    });

    Ok(factory.with_requires(declared))
}
