//! # Errors
//!
//! Error types shared by every part of the memoizer.
//!
//! - [`BackendError`] - a failure reported by a [`CacheBackend`](crate::CacheBackend)
//! - [`ArityError`] - a call that does not satisfy the declared [`Signature`](crate::Signature)
//! - [`Error`] - the umbrella type returned by memoizer operations

use std::error::Error as StdError;

/// Errors that can occur while talking to a cache backend.
///
/// Backends wrap whatever their transport reports into this type. The memoizer
/// never inspects it beyond logging or propagating it.
#[derive(Debug, thiserror::Error)]
#[error("cache backend error: {message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl BackendError {
    /// Creates a backend error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error that wraps an underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The human readable description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience alias for results returned by backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// A call whose arguments do not fit the declared signature.
///
/// Raised only when the underlying function is actually invoked; building a
/// cache key never fails because of arity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArityError {
    #[error("{function}() missing required argument: '{name}'")]
    Missing { function: String, name: String },
    #[error("{function}() got multiple values for argument '{name}'")]
    Duplicate { function: String, name: String },
    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    TooMany {
        function: String,
        expected: usize,
        given: usize,
    },
    #[error("{function}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword { function: String, name: String },
}

/// Errors returned by memoizer operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A value could not be encoded for storage or decoded after retrieval.
    #[error("cache value codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Arity(#[from] ArityError),
    /// A bound argument exists but does not decode into the requested type.
    #[error("argument '{name}' has an unexpected type: {source}")]
    Argument {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Returns `true` for failures that came from the cache layer (backend
    /// transport or value codec) rather than from the call itself.
    ///
    /// Only these are subject to the debug swallow policy.
    pub fn is_cache_failure(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::Codec(_))
    }
}
