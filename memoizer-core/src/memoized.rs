//! # Memoized Functions
//!
//! [`Memoized`] is what [`Memoizer::memoize`] and friends return: the original
//! function together with its signature, a mutable timeout, a replaceable key
//! builder, the per-wrapper options and statistics.
//!
//! ## Call flow
//!
//! 1. If the `unless` predicate returns `true`, the function is called
//!    directly; the cache is neither read nor written
//! 2. Otherwise the key is built with the current timeout and key builder,
//!    and the backend is read
//! 3. A hit is decoded and returned without calling the function
//! 4. A miss calls the function and stores an `Ok` result under the key;
//!    an `Err` is returned as is and never stored
//!
//! Backend failures during 2 and 4 follow the [`Memoizer`] debug policy: with
//! `debug` off a failed read turns into an uncached call and a failed write is
//! skipped.
//!
//! The function receives its arguments bound to the signature. Binding
//! happens only when the function actually runs, so a call that doesn't fit
//! the signature still gets a best-effort key and fails on invocation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::{
    function_namespace, BoundArgs, Call, CacheableKey, CallIdentity, Error, Memoizer, Receiver,
    Signature, Timeout,
};

/// Rewrites the namespace that goes into a result key.
pub type NameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Returns `true` when a call should bypass the cache.
pub type UnlessFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Builds the cache key of one call. The default is
/// [`Memoizer::make_cache_key`].
pub type KeyBuilder = Arc<dyn Fn(&Memoizer, &KeyRequest<'_>) -> Result<String, Error> + Send + Sync>;

/// The type-erased body of a memoized function.
pub type MemoizedBody<S, R, E> = Arc<dyn Fn(&S, &BoundArgs) -> Result<R, E> + Send + Sync>;

/// Everything a [`KeyBuilder`] gets to see about one call.
#[derive(Clone, Copy)]
pub struct KeyRequest<'a> {
    pub signature: &'a Signature,
    /// The bound instance, if the call has one.
    pub receiver: Option<&'a Receiver>,
    pub call: &'a Call,
    /// Timeout for version tokens minted while building the key.
    pub timeout: Timeout,
    pub make_name: Option<&'a NameFn>,
}

impl<'a> KeyRequest<'a> {
    pub fn new(
        signature: &'a Signature,
        receiver: Option<&'a Receiver>,
        call: &'a Call,
        timeout: Timeout,
    ) -> Self {
        Self {
            signature,
            receiver,
            call,
            timeout,
            make_name: None,
        }
    }

    pub fn with_make_name(mut self, make_name: Option<&'a NameFn>) -> Self {
        self.make_name = make_name;
        self
    }
}

impl fmt::Debug for KeyRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRequest")
            .field("signature", &self.signature.to_string())
            .field("receiver", &self.receiver)
            .field("call", &self.call)
            .field("timeout", &self.timeout)
            .field("make_name", &self.make_name.is_some())
            .finish()
    }
}

fn default_key_builder() -> KeyBuilder {
    Arc::new(|memoizer: &Memoizer, request: &KeyRequest<'_>| memoizer.make_cache_key(request))
}

/// Per-wrapper options.
///
/// * `timeout` - entry timeout; `None` uses the memoizer's configured default
/// * `make_name` - rewrites the namespace used in result keys; invalidation
///   still goes through the original namespace
/// * `unless` - bypass predicate, checked on every call
///
/// # Examples
///
/// ```
/// use memoizer_core::{MemoizeOptions, Timeout};
///
/// let options = MemoizeOptions::new()
///     .timeout(Timeout::secs(50))
///     .make_name(|name| format!("{}.v2", name))
///     .unless(|| false);
/// assert_eq!(options.timeout, Some(Timeout::secs(50)));
/// ```
#[derive(Clone, Default)]
pub struct MemoizeOptions {
    pub timeout: Option<Timeout>,
    pub make_name: Option<NameFn>,
    pub unless: Option<UnlessFn>,
}

impl MemoizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn make_name<F>(mut self, make_name: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.make_name = Some(Arc::new(make_name));
        self
    }

    pub fn unless<F>(mut self, unless: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.unless = Some(Arc::new(unless));
        self
    }
}

impl fmt::Debug for MemoizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizeOptions")
            .field("timeout", &self.timeout)
            .field("make_name", &self.make_name.is_some())
            .field("unless", &self.unless.is_some())
            .finish()
    }
}

/// Something whose cached results can be invalidated.
///
/// Implemented by [`Memoized`] (the whole function) and [`BoundMethod`] (one
/// receiver's calls).
pub trait MemoizedFn {
    /// Namespace(s) of this function, or of this receiver's calls.
    fn call_identity(&self) -> CallIdentity;

    /// The timeout results and version tokens are currently written with.
    fn cache_timeout(&self) -> Timeout;

    /// The key `call` is cached under right now.
    fn make_cache_key(&self, call: &Call) -> Result<String, Error>;
}

/// A [`MemoizedFn`] that can also be invoked without a receiver at hand, which
/// [`Memoizer::update_memoized`] needs.
pub trait CallThrough: MemoizedFn {
    type Output;
    type Error;

    /// Calls the function, skipping the cache entirely.
    fn call_uncached(&self, call: &Call) -> Result<Self::Output, Self::Error>;
}

/// A memoized function.
///
/// `S` is the receiver type: `()` for free functions and class-level methods,
/// the instance type for instance methods. `R` is the cached result and `E`
/// the function's error type.
///
/// See the [module documentation](self) for the call flow.
pub struct Memoized<S: ?Sized, R, E = Error> {
    memoizer: Memoizer,
    signature: Signature,
    func: MemoizedBody<S, R, E>,
    timeout: RwLock<Timeout>,
    key_builder: RwLock<KeyBuilder>,
    make_name: Option<NameFn>,
    unless: Option<UnlessFn>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<S: ?Sized, R, E> fmt::Debug for Memoized<S, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("signature", &self.signature.to_string())
            .field("timeout", &*self.timeout.read())
            .finish_non_exhaustive()
    }
}

impl<S: ?Sized, R, E> Memoized<S, R, E> {
    pub(crate) fn new(
        memoizer: Memoizer,
        signature: Signature,
        options: MemoizeOptions,
        func: MemoizedBody<S, R, E>,
    ) -> Self {
        let timeout = options.timeout.unwrap_or(memoizer.config().default_timeout);
        Self {
            memoizer,
            signature,
            func,
            timeout: RwLock::new(timeout),
            key_builder: RwLock::new(default_key_builder()),
            make_name: options.make_name,
            unless: options.unless,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memoizer
    }

    /// The original, unwrapped function.
    pub fn uncached(&self) -> &MemoizedBody<S, R, E> {
        &self.func
    }

    pub fn cache_timeout(&self) -> Timeout {
        *self.timeout.read()
    }

    /// Changes the timeout used by subsequent writes.
    pub fn set_cache_timeout(&self, timeout: impl Into<Timeout>) {
        *self.timeout.write() = timeout.into();
    }

    pub fn key_builder(&self) -> KeyBuilder {
        self.key_builder.read().clone()
    }

    /// Replaces the key builder for subsequent calls and invalidations.
    pub fn set_key_builder<F>(&self, builder: F)
    where
        F: Fn(&Memoizer, &KeyRequest<'_>) -> Result<String, Error> + Send + Sync + 'static,
    {
        *self.key_builder.write() = Arc::new(builder);
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn build_key(&self, receiver: Option<&Receiver>, call: &Call) -> Result<String, Error> {
        let builder = self.key_builder();
        let request = KeyRequest::new(&self.signature, receiver, call, self.cache_timeout())
            .with_make_name(self.make_name.as_ref());
        builder(&self.memoizer, &request)
    }
}

impl<S: ?Sized, R, E> Memoized<S, R, E>
where
    E: From<Error>,
{
    fn invoke(&self, this: &S, call: &Call) -> Result<R, E> {
        let bound = self.signature.bind(call).map_err(Error::from)?;
        (self.func)(this, &bound)
    }
}

impl<S: ?Sized, R, E> Memoized<S, R, E>
where
    R: Serialize + DeserializeOwned,
    E: From<Error>,
{
    fn call_with(&self, this: &S, receiver: Option<&Receiver>, call: &Call) -> Result<R, E> {
        if self.unless.as_ref().is_some_and(|unless| unless()) {
            #[cfg(feature = "stats")]
            self.stats.record_bypass();
            return self.invoke(this, call);
        }

        let memoizer = &self.memoizer;
        let lookup = self
            .build_key(receiver, call)
            .and_then(|key| -> Result<(String, Option<R>), Error> {
                let cached = match memoizer.get::<R>(&key) {
                    // Values such as NaN are stored but don't read back as `R`
                    Err(Error::Codec(err)) => {
                        tracing::debug!(key = %key, error = %err, "stored result does not decode");
                        None
                    }
                    other => other?,
                };
                Ok((key, cached))
            });

        let (key, cached) = match memoizer.guard("get", lookup)? {
            Some(found) => found,
            None => return self.invoke(this, call),
        };

        if let Some(value) = cached {
            tracing::trace!(key = %key, "memoize cache hit");
            #[cfg(feature = "stats")]
            self.stats.record_hit();
            return Ok(value);
        }

        tracing::trace!(key = %key, "memoize cache miss");
        #[cfg(feature = "stats")]
        self.stats.record_miss();

        let value = self.invoke(this, call)?;
        memoizer.guard("set", memoizer.set(&key, &value, self.cache_timeout()))?;
        Ok(value)
    }
}

impl<R, E> Memoized<(), R, E>
where
    R: Serialize + DeserializeOwned,
    E: From<Error>,
{
    /// Calls a memoized free function or class-level method.
    pub fn call(&self, call: &Call) -> Result<R, E> {
        self.call_with(&(), None, call)
    }
}

impl<S, R, E> Memoized<S, R, E>
where
    S: CacheableKey + ?Sized,
    R: Serialize + DeserializeOwned,
    E: From<Error>,
{
    /// Calls a memoized instance method on `this`.
    pub fn call_on(&self, this: &S, call: &Call) -> Result<R, E> {
        let receiver = Receiver::of(this);
        self.call_with(this, Some(&receiver), call)
    }
}

impl<S, R, E> Memoized<S, R, E>
where
    S: CacheableKey + ?Sized,
{
    /// Binds the method to a receiver.
    ///
    /// The [`BoundMethod`] calls the method on `this` and invalidates only
    /// `this`'s cached results.
    pub fn bind<'a>(&'a self, this: &'a S) -> BoundMethod<'a, S, R, E> {
        BoundMethod {
            memoized: self,
            this,
            receiver: Receiver::of(this),
        }
    }
}

impl<S: ?Sized, R, E> Memoized<S, R, E> {
    /// The key `call` is cached under, without a receiver.
    pub fn make_cache_key(&self, call: &Call) -> Result<String, Error> {
        self.build_key(None, call)
    }

    /// Invalidates every cached result of this function.
    pub fn delete_memoized(&self) -> Result<(), Error> {
        self.memoizer.delete_memoized(self, &Call::new())
    }
}

impl<S: ?Sized, R, E> MemoizedFn for Memoized<S, R, E> {
    fn call_identity(&self) -> CallIdentity {
        function_namespace(&self.signature, None)
    }

    fn cache_timeout(&self) -> Timeout {
        Memoized::cache_timeout(self)
    }

    fn make_cache_key(&self, call: &Call) -> Result<String, Error> {
        Memoized::make_cache_key(self, call)
    }
}

impl<R, E> CallThrough for Memoized<(), R, E>
where
    E: From<Error>,
{
    type Output = R;
    type Error = E;

    fn call_uncached(&self, call: &Call) -> Result<R, E> {
        self.invoke(&(), call)
    }
}

impl<R, E> Memoized<(), R, E>
where
    E: From<Error>,
{
    /// Binds `call` and runs the function, skipping the cache.
    pub fn call_uncached(&self, call: &Call) -> Result<R, E> {
        self.invoke(&(), call)
    }
}

/// An instance method bound to one receiver.
///
/// # Examples
///
/// ```
/// use memoizer_core::{call, BoundArgs, DefaultCacheableKey, Error, Memoizer, Signature};
///
/// #[derive(Debug)]
/// struct Adder {
///     initial: i64,
/// }
/// impl DefaultCacheableKey for Adder {}
///
/// let memoizer = Memoizer::default();
/// let add = memoizer.memoize_method(
///     Signature::method("shop", "Adder", "add").param("b"),
///     |adder: &Adder, args: &BoundArgs| -> Result<i64, Error> {
///         Ok(adder.initial + args.get::<i64>("b")?)
///     },
/// );
///
/// let one = Adder { initial: 1 };
/// let two = Adder { initial: 2 };
/// assert_eq!(add.bind(&one).call(&call!(5)).unwrap(), 6);
/// assert_eq!(add.bind(&two).call(&call!(5)).unwrap(), 7);
///
/// // only `one`'s results are dropped
/// add.bind(&one).delete_memoized().unwrap();
/// ```
pub struct BoundMethod<'a, S: ?Sized, R, E = Error> {
    memoized: &'a Memoized<S, R, E>,
    this: &'a S,
    receiver: Receiver,
}

impl<S: ?Sized, R, E> fmt::Debug for BoundMethod<'_, S, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("memoized", self.memoized)
            .field("receiver", &self.receiver)
            .finish()
    }
}

impl<'a, S: ?Sized, R, E> BoundMethod<'a, S, R, E> {
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn memoized(&self) -> &'a Memoized<S, R, E> {
        self.memoized
    }

    /// The key `call` on this receiver is cached under.
    pub fn make_cache_key(&self, call: &Call) -> Result<String, Error> {
        self.memoized.build_key(Some(&self.receiver), call)
    }

    /// Invalidates every cached result of this receiver.
    pub fn delete_memoized(&self) -> Result<(), Error> {
        self.memoized.memoizer.delete_memoized(self, &Call::new())
    }
}

impl<S: ?Sized, R, E> BoundMethod<'_, S, R, E>
where
    R: Serialize + DeserializeOwned,
    E: From<Error>,
{
    pub fn call(&self, call: &Call) -> Result<R, E> {
        self.memoized.call_with(self.this, Some(&self.receiver), call)
    }
}

impl<S: ?Sized, R, E> BoundMethod<'_, S, R, E>
where
    E: From<Error>,
{
    pub fn call_uncached(&self, call: &Call) -> Result<R, E> {
        self.memoized.invoke(self.this, call)
    }
}

impl<S: ?Sized, R, E> MemoizedFn for BoundMethod<'_, S, R, E> {
    fn call_identity(&self) -> CallIdentity {
        function_namespace(&self.memoized.signature, Some(&self.receiver))
    }

    fn cache_timeout(&self) -> Timeout {
        self.memoized.cache_timeout()
    }

    fn make_cache_key(&self, call: &Call) -> Result<String, Error> {
        BoundMethod::make_cache_key(self, call)
    }
}

impl<S: ?Sized, R, E> CallThrough for BoundMethod<'_, S, R, E>
where
    E: From<Error>,
{
    type Output = R;
    type Error = E;

    fn call_uncached(&self, call: &Call) -> Result<R, E> {
        BoundMethod::call_uncached(self, call)
    }
}
