//! # Memoizer
//!
//! Memoization of function results in a shared key-value cache, with
//! versioned keys so that a whole function, a single receiver's method calls,
//! or one exact call can be invalidated cheaply.
//!
//! ## Features
//!
//! - **Canonical keys**: `f(1, 2)`, `f(b = 2, a = 1)` and `f(1)` with `b`
//!   defaulting to `2` all hit the same entry
//! - **Group invalidation**: dropping every result of a function is one
//!   backend write, no key scanning
//! - **Per-instance method caches**: results of a method are partitioned by
//!   the receiver's [`CacheableKey`] and can be invalidated per receiver
//! - **Refresh**: [`update_memoized`] recomputes and overwrites one entry
//! - **Failure tolerant**: a broken backend degrades to uncached calls unless
//!   debug mode is on
//!
//! ## Quick Start
//!
//! ```rust
//! use memoizer::{call, memoize, BoundArgs, Error, Signature};
//!
//! let area = memoize(
//!     Signature::function("geometry", "area").param("width").param_with_default("height", 1),
//!     |args: &BoundArgs| -> Result<u64, Error> {
//!         Ok(args.get::<u64>("width")? * args.get::<u64>("height")?)
//!     },
//! );
//!
//! assert_eq!(area.call(&call!(3, 4)).unwrap(), 12);
//! // served from the cache
//! assert_eq!(area.call(&call!(height = 4, width = 3)).unwrap(), 12);
//! ```
//!
//! ## Methods
//!
//! Receivers identify themselves through [`CacheableKey`]; deriving it from
//! `Debug` is one line:
//!
//! ```rust
//! use memoizer::{call, delete_memoized, memoize_method, BoundArgs, DefaultCacheableKey, Error, Signature};
//!
//! #[derive(Debug)]
//! struct Account {
//!     id: u64,
//! }
//! impl DefaultCacheableKey for Account {}
//!
//! let balance = memoize_method(
//!     Signature::method("bank", "Account", "balance").param("currency"),
//!     |account: &Account, args: &BoundArgs| -> Result<i64, Error> {
//!         let currency: String = args.get("currency")?;
//!         Ok(if currency == "EUR" { account.id as i64 * 100 } else { 0 })
//!     },
//! );
//!
//! let alice = Account { id: 7 };
//! assert_eq!(balance.call_on(&alice, &call!("EUR")).unwrap(), 700);
//!
//! // forget everything cached for alice only
//! delete_memoized(&balance.bind(&alice), &call!()).unwrap();
//! ```
//!
//! ## Default Memoizer
//!
//! The free functions in this crate use one process-wide [`Memoizer`], built
//! on first use over a [`LocalMemoryBackend`] with
//! [`MemoizeConfig::from_env`]. Build your own [`Memoizer`] to use another
//! backend or configuration.

use once_cell::sync::Lazy;
use serde::Serialize;

pub use memoizer_core::*;

/// The process-wide memoizer behind this crate's free functions.
///
/// Built on first access from `MEMOIZE_DEBUG` and `MEMOIZE_CACHE_PREFIX`;
/// changing those variables afterwards has no effect.
static DEFAULT_MEMOIZER: Lazy<Memoizer> = Lazy::new(|| {
    Memoizer::new(
        std::sync::Arc::new(LocalMemoryBackend::new()),
        MemoizeConfig::from_env(),
    )
});

/// Returns the process-wide default memoizer.
pub fn default_memoizer() -> &'static Memoizer {
    &DEFAULT_MEMOIZER
}

/// Memoizes a free function on the default memoizer.
///
/// # Arguments
///
/// * `signature` - Where the function lives and which parameters it declares
/// * `func` - The function body, receiving its arguments bound to `signature`
///
/// # Returns
///
/// The memoized function; call it with [`Memoized::call`].
pub fn memoize<R, E, F>(signature: Signature, func: F) -> Memoized<(), R, E>
where
    F: Fn(&BoundArgs) -> Result<R, E> + Send + Sync + 'static,
    R: 'static,
    E: 'static,
{
    DEFAULT_MEMOIZER.memoize(signature, func)
}

/// Like [`memoize`], with a timeout, a `make_name` hook or an `unless`
/// predicate.
pub fn memoize_with<R, E, F>(signature: Signature, options: MemoizeOptions, func: F) -> Memoized<(), R, E>
where
    F: Fn(&BoundArgs) -> Result<R, E> + Send + Sync + 'static,
    R: 'static,
    E: 'static,
{
    DEFAULT_MEMOIZER.memoize_with(signature, options, func)
}

/// Memoizes an instance method on the default memoizer.
pub fn memoize_method<S, R, E, F>(signature: Signature, func: F) -> Memoized<S, R, E>
where
    S: ?Sized,
    F: Fn(&S, &BoundArgs) -> Result<R, E> + Send + Sync + 'static,
{
    DEFAULT_MEMOIZER.memoize_method(signature, func)
}

/// Memoizes an instance method with explicit options on the default memoizer.
pub fn memoize_method_with<S, R, E, F>(signature: Signature, options: MemoizeOptions, func: F) -> Memoized<S, R, E>
where
    S: ?Sized,
    F: Fn(&S, &BoundArgs) -> Result<R, E> + Send + Sync + 'static,
{
    DEFAULT_MEMOIZER.memoize_method_with(signature, options, func)
}

/// Invalidates cached results of `f` through the default memoizer.
///
/// # Arguments
///
/// * `f` - A memoized function, or a method bound to one receiver
/// * `call` - Empty to drop every result of `f`, or the arguments of the one
///   entry to drop
///
/// # Examples
///
/// ```rust
/// use memoizer::{call, delete_memoized, memoize, BoundArgs, Error, Signature};
///
/// let square = memoize(
///     Signature::function("docs", "square").param("n"),
///     |args: &BoundArgs| -> Result<i64, Error> { Ok(args.get::<i64>("n")?.pow(2)) },
/// );
/// square.call(&call!(3)).unwrap();
///
/// delete_memoized(&square, &call!(3)).unwrap(); // one entry
/// delete_memoized(&square, &call!()).unwrap(); // everything
/// ```
pub fn delete_memoized<F>(f: &F, call: &Call) -> Result<(), Error>
where
    F: MemoizedFn + ?Sized,
{
    DEFAULT_MEMOIZER.delete_memoized(f, call)
}

/// Deletes the version entry of `f` through the default memoizer.
pub fn delete_memoized_verhash<F>(f: &F) -> Result<(), Error>
where
    F: MemoizedFn + ?Sized,
{
    DEFAULT_MEMOIZER.delete_memoized_verhash(f)
}

/// Recomputes `f` for `call` and overwrites its cached entry through the
/// default memoizer.
///
/// # Returns
///
/// The freshly computed value.
pub fn update_memoized<F>(f: &F, call: &Call) -> Result<F::Output, F::Error>
where
    F: CallThrough + ?Sized,
    F::Output: Serialize,
    F::Error: From<Error>,
{
    DEFAULT_MEMOIZER.update_memoized(f, call)
}
