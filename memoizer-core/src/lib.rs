//! # Memoizer Core
//!
//! Core types for memoizing function results in a shared key-value cache,
//! with versioned keys for cheap invalidation.
//!
//! ## Features
//!
//! - **Call Identity**: Every function gets a stable namespace; instance
//!   methods get one more per receiver, derived from its [`CacheableKey`]
//! - **Canonical Arguments**: Positional, keyword and defaulted forms of the
//!   same call share one cache entry
//! - **Versioned Keys**: Whole functions or single receivers are invalidated
//!   by swapping a version token, without scanning the cache
//! - **Pluggable Backends**: Anything implementing [`CacheBackend`]; a
//!   process-local [`LocalMemoryBackend`] is included
//! - **Degrading on Failure**: Backend errors are logged and the call goes
//!   through uncached, unless `debug` is on
//! - **Statistics**: Per-function hit/miss counters (`stats` feature)
//!
//! ## Module Organization
//!
//! - [`backend`] - The backend contract
//! - [`local_memory`] - In-process backend with timeouts and culling
//! - [`signature`] - Declared parameters, binding of calls
//! - [`namespace`] - Namespaces of functions and receivers
//! - [`canonical`] - Argument canonicalization for keys
//! - [`version`] - Version tokens and cache key construction
//! - [`memoized`] - The memoized function wrapper and its call flow
//! - [`config`] - Configuration and timeouts
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use memoizer_core::{call, BoundArgs, Error, Memoizer, MemoizeOptions, Signature, Timeout};
//!
//! let memoizer = Memoizer::default();
//! let greet = memoizer.memoize_with(
//!     Signature::function("app", "greet").param("name").param_with_default("punctuation", "!"),
//!     MemoizeOptions::new().timeout(Timeout::secs(60)),
//!     |args: &BoundArgs| -> Result<String, Error> {
//!         Ok(format!("Hello, {}{}", args.get::<String>("name")?, args.get::<String>("punctuation")?))
//!     },
//! );
//!
//! assert_eq!(greet.call(&call!("Ada")).unwrap(), "Hello, Ada!");
//! assert_eq!(greet.call(&call!(name = "Ada", punctuation = "!")).unwrap(), "Hello, Ada!");
//! ```

pub mod backend;
pub mod canonical;
pub mod config;
pub mod error;
pub mod local_memory;
pub mod memoized;
pub mod namespace;
pub mod signature;
pub mod version;

mod cache_entry;
mod call;
mod keys;
mod memoizer;

#[cfg(feature = "stats")]
mod stats;

pub use backend::CacheBackend;
pub use cache_entry::CacheEntry;
pub use call::Call;
pub use canonical::{canonicalize, CanonicalArgs};
pub use config::{MemoizeConfig, Timeout, DEFAULT_CACHE_PREFIX};
pub use error::{ArityError, BackendError, BackendResult, Error};
pub use keys::{CacheableKey, DefaultCacheableKey};
pub use local_memory::{LocalMemoryBackend, DEFAULT_BACKEND_TIMEOUT};
pub use memoized::{
    BoundMethod, CallThrough, KeyBuilder, KeyRequest, MemoizeOptions, Memoized, MemoizedBody,
    MemoizedFn, NameFn, UnlessFn,
};
pub use memoizer::Memoizer;
pub use namespace::{function_namespace, CallIdentity, Receiver};
pub use signature::{BoundArgs, Param, ReceiverKind, Signature};
pub use version::{version_key, VERSION_SUFFIX};

#[cfg(feature = "stats")]
pub use stats::CacheStats;

/// Re-exported so callers can build argument values without a direct
/// `serde_json` dependency.
pub use serde_json::{json, Value};
