use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::namespace::short_type_name;
use crate::{
    BoundArgs, Call, CacheBackend, CallThrough, Error, LocalMemoryBackend, MemoizeConfig,
    MemoizeOptions, Memoized, MemoizedFn, ReceiverKind, Signature, Timeout,
};

/// Memoizes functions against a cache backend.
///
/// A `Memoizer` pairs a [`CacheBackend`] with a [`MemoizeConfig`]. It wraps
/// functions into [`Memoized`] values, builds their versioned cache keys and
/// invalidates them. Cloning is cheap and clones share the backend.
///
/// Backend failures on the memoization paths follow one policy: with
/// `config.debug` they are returned to the caller, otherwise they are logged
/// through `tracing` and the call degrades (a failed read becomes a miss, a
/// failed write or invalidation is skipped). The plain proxies (`get`, `set`,
/// ...) always return their errors.
///
/// # Examples
///
/// ```
/// use memoizer_core::{call, BoundArgs, Error, Memoizer, Signature};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let memoizer = Memoizer::default();
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
///
/// let add = memoizer.memoize(
///     Signature::function("shop", "add").param("a").param("b"),
///     move |args: &BoundArgs| -> Result<i64, Error> {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
///     },
/// );
///
/// assert_eq!(add.call(&call!(1, 2)).unwrap(), 3);
/// assert_eq!(add.call(&call!(b = 2, a = 1)).unwrap(), 3);
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
///
/// memoizer.delete_memoized(&add, &call!()).unwrap();
/// assert_eq!(add.call(&call!(1, 2)).unwrap(), 3);
/// assert_eq!(runs.load(Ordering::SeqCst), 2);
/// ```
#[derive(Clone)]
pub struct Memoizer {
    backend: Arc<dyn CacheBackend>,
    config: Arc<MemoizeConfig>,
}

impl fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Memoizer {
    /// A memoizer over a fresh [`LocalMemoryBackend`] with the default config.
    fn default() -> Self {
        Self::new(Arc::new(LocalMemoryBackend::new()), MemoizeConfig::default())
    }
}

impl Memoizer {
    pub fn new(backend: Arc<dyn CacheBackend>, config: MemoizeConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn config(&self) -> &MemoizeConfig {
        &self.config
    }

    // Backend proxies. Values are stored as JSON.

    /// Fetches and decodes the value under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.backend.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, timeout: Timeout) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.backend.set(key, bytes, timeout)?)
    }

    /// Stores `value` only if `key` is free. Returns whether it was stored.
    pub fn add<T: Serialize + ?Sized>(&self, key: &str, value: &T, timeout: Timeout) -> Result<bool, Error> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.backend.add(key, bytes, timeout)?)
    }

    pub fn delete(&self, key: &str) -> Result<(), Error> {
        Ok(self.backend.delete(key)?)
    }

    pub fn delete_many(&self, keys: &[&str]) -> Result<(), Error> {
        Ok(self.backend.delete_many(keys)?)
    }

    pub fn clear(&self) -> Result<(), Error> {
        Ok(self.backend.clear()?)
    }

    /// Fetches several keys; the result is aligned with `keys`.
    pub fn get_many<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<Vec<Option<T>>, Error> {
        self.backend
            .get_many(keys)?
            .into_iter()
            .map(|bytes| -> Result<Option<T>, Error> {
                match bytes {
                    Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                    None => Ok(None),
                }
            })
            .collect()
    }

    pub fn set_many<T: Serialize>(&self, entries: Vec<(String, T)>, timeout: Timeout) -> Result<(), Error> {
        let encoded = entries
            .into_iter()
            .map(|(key, value)| serde_json::to_vec(&value).map(|bytes| (key, bytes)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.backend.set_many(encoded, timeout)?)
    }

    /// Applies the debug policy to the outcome of a cache operation.
    ///
    /// `Ok(Some(_))` on success. A cache failure yields `Ok(None)` after being
    /// logged, or is returned under `debug`. Other errors are always returned.
    pub(crate) fn guard<T>(&self, operation: &'static str, result: Result<T, Error>) -> Result<Option<T>, Error> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.config.debug || !err.is_cache_failure() => Err(err),
            Err(err) => {
                tracing::error!(error = %err, operation, "exception possibly due to cache backend");
                Ok(None)
            }
        }
    }

    // Wrapping

    /// Memoizes a free function (or a static method) with default options.
    pub fn memoize<R, E, F>(&self, signature: Signature, func: F) -> Memoized<(), R, E>
    where
        F: Fn(&BoundArgs) -> Result<R, E> + Send + Sync + 'static,
        R: 'static,
        E: 'static,
    {
        self.memoize_with(signature, MemoizeOptions::default(), func)
    }

    /// Memoizes a free function with explicit options.
    ///
    /// Class-level methods are registered here too, with a
    /// [`Signature::class_method`] signature: the class takes the receiver
    /// slot of the key.
    pub fn memoize_with<R, E, F>(&self, signature: Signature, options: MemoizeOptions, func: F) -> Memoized<(), R, E>
    where
        F: Fn(&BoundArgs) -> Result<R, E> + Send + Sync + 'static,
        R: 'static,
        E: 'static,
    {
        Memoized::new(
            self.clone(),
            signature,
            options,
            Arc::new(move |_: &(), args: &BoundArgs| func(args)),
        )
    }

    /// Memoizes an instance method with default options.
    ///
    /// Call it through [`Memoized::call_on`] or [`Memoized::bind`]; the
    /// receiver's [`CacheableKey`](crate::CacheableKey) identity partitions the
    /// cache per instance.
    pub fn memoize_method<S, R, E, F>(&self, signature: Signature, func: F) -> Memoized<S, R, E>
    where
        S: ?Sized,
        F: Fn(&S, &BoundArgs) -> Result<R, E> + Send + Sync + 'static,
    {
        self.memoize_method_with(signature, MemoizeOptions::default(), func)
    }

    pub fn memoize_method_with<S, R, E, F>(
        &self,
        signature: Signature,
        options: MemoizeOptions,
        func: F,
    ) -> Memoized<S, R, E>
    where
        S: ?Sized,
        F: Fn(&S, &BoundArgs) -> Result<R, E> + Send + Sync + 'static,
    {
        // Unbound and bound calls must agree on the class-level namespace
        let signature = if signature.class().is_none() && signature.receiver() == ReceiverKind::Instance {
            signature.with_class(short_type_name::<S>())
        } else {
            signature
        };
        Memoized::new(self.clone(), signature, options, Arc::new(func))
    }

    // Invalidation

    /// Invalidates cached results of `f`.
    ///
    /// With an empty `call`, every result of `f` is invalidated by resetting
    /// its version: all calls of a function, or all calls on one receiver
    /// when `f` is a [`BoundMethod`](crate::BoundMethod). Otherwise only the
    /// entry for exactly these arguments is deleted.
    ///
    /// Backend failures are returned only under `debug`.
    pub fn delete_memoized<F>(&self, f: &F, call: &Call) -> Result<(), Error>
    where
        F: MemoizedFn + ?Sized,
    {
        let result = if call.is_empty() {
            self.reset_version(&f.call_identity(), f.cache_timeout())
        } else {
            f.make_cache_key(call).and_then(|key| self.delete(&key))
        };
        self.guard("delete_memoized", result).map(|_| ())
    }

    /// Deletes the version entry of `f` instead of replacing it.
    ///
    /// Invalidates the same results as `delete_memoized(f, &call!())`; the
    /// next call mints a new version.
    pub fn delete_memoized_verhash<F>(&self, f: &F) -> Result<(), Error>
    where
        F: MemoizedFn + ?Sized,
    {
        let result = self.delete_version(&f.call_identity());
        self.guard("delete_memoized_verhash", result).map(|_| ())
    }

    /// Calls `f` through and overwrites the cached entry with the fresh value.
    ///
    /// The entry is written with `f`'s current timeout, so its expiry restarts.
    /// Returns the fresh value. An error from the function itself is returned
    /// and nothing is written.
    pub fn update_memoized<F>(&self, f: &F, call: &Call) -> Result<F::Output, F::Error>
    where
        F: CallThrough + ?Sized,
        F::Output: Serialize,
        F::Error: From<Error>,
    {
        let key = self.guard("update_memoized", f.make_cache_key(call))?;
        let value = f.call_uncached(call)?;
        if let Some(key) = key {
            self.guard("update_memoized", self.set(&key, &value, f.cache_timeout()))?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendError, BackendResult};
    use serde_json::json;

    #[derive(Debug)]
    struct BrokenBackend;

    impl CacheBackend for BrokenBackend {
        fn get(&self, _key: &str) -> BackendResult<Option<Vec<u8>>> {
            Err(BackendError::new("get failed"))
        }
        fn set(&self, _key: &str, _value: Vec<u8>, _timeout: Timeout) -> BackendResult<()> {
            Err(BackendError::new("set failed"))
        }
        fn add(&self, _key: &str, _value: Vec<u8>, _timeout: Timeout) -> BackendResult<bool> {
            Err(BackendError::new("add failed"))
        }
        fn delete(&self, _key: &str) -> BackendResult<()> {
            Err(BackendError::new("delete failed"))
        }
        fn clear(&self) -> BackendResult<()> {
            Err(BackendError::new("clear failed"))
        }
    }

    #[test]
    fn test_proxies_roundtrip_json() {
        let memoizer = Memoizer::default();
        memoizer.set("a", &json!({"x": [1, 2]}), Timeout::Default).unwrap();
        assert_eq!(memoizer.get::<serde_json::Value>("a").unwrap(), Some(json!({"x": [1, 2]})));

        assert!(!memoizer.add("a", &1, Timeout::Default).unwrap());
        assert!(memoizer.add("b", &2, Timeout::Default).unwrap());

        memoizer
            .set_many(vec![("c".to_string(), 3), ("d".to_string(), 4)], Timeout::Default)
            .unwrap();
        assert_eq!(
            memoizer.get_many::<i64>(&["b", "c", "d", "missing"]).unwrap(),
            vec![Some(2), Some(3), Some(4), None]
        );

        memoizer.delete_many(&["b", "c"]).unwrap();
        assert_eq!(memoizer.get::<i64>("b").unwrap(), None);
        memoizer.clear().unwrap();
        assert_eq!(memoizer.get::<i64>("d").unwrap(), None);
    }

    #[test]
    fn test_stored_null_is_distinct_from_absence() {
        let memoizer = Memoizer::default();
        memoizer.set("none", &Option::<i64>::None, Timeout::Default).unwrap();
        assert_eq!(memoizer.get::<Option<i64>>("none").unwrap(), Some(None));
        assert_eq!(memoizer.get::<Option<i64>>("absent").unwrap(), None);
    }

    #[test]
    fn test_guard_swallows_cache_failures_without_debug() {
        let memoizer = Memoizer::new(Arc::new(BrokenBackend), MemoizeConfig::default());
        let outcome = memoizer.guard("get", memoizer.get::<i64>("k")).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn test_guard_propagates_in_debug() {
        let memoizer = Memoizer::new(Arc::new(BrokenBackend), MemoizeConfig::default().with_debug(true));
        let err = memoizer.guard("get", memoizer.get::<i64>("k")).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[test]
    fn test_guard_never_swallows_non_cache_errors() {
        let memoizer = Memoizer::default();
        let arity: Result<(), Error> = Err(crate::ArityError::Missing {
            function: "f".to_string(),
            name: "a".to_string(),
        }
        .into());
        assert!(memoizer.guard("call", arity).is_err());
    }
}
