//! # Versioned Cache Keys
//!
//! Every namespace owns a random version token stored in the backend under
//! `namespace + "_memver"`. Result keys embed the current token(s), so
//! replacing a token makes every key built from the old one unreachable
//! without touching the result entries themselves. Those entries stay in the
//! backend until their own timeout expires.
//!
//! A call bound to an instance depends on two tokens: the function's and the
//! instance's. Resetting the function token invalidates all instances at once;
//! resetting one instance token leaves the others alone.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{canonicalize, function_namespace, CallIdentity, Error, KeyRequest, Memoizer, Timeout};

/// Suffix appended to a namespace to form its version key.
pub const VERSION_SUFFIX: &str = "_memver";

/// The backend key holding the version token of `namespace`.
///
/// # Examples
///
/// ```
/// use memoizer_core::version_key;
///
/// assert_eq!(version_key("shop.Adder.add"), "shop.Adder.add_memver");
/// ```
pub fn version_key(namespace: &str) -> String {
    format!("{}{}", namespace, VERSION_SUFFIX)
}

fn new_version_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Memoizer {
    /// Returns the version data for `identity`, minting missing tokens.
    ///
    /// Both version keys are fetched in one `get_many`. Tokens that were
    /// absent are created and written back in a single `set_many` with
    /// `timeout`; tokens that already exist are never rewritten. The result is
    /// the function token, followed by the instance token when the identity
    /// has one.
    ///
    /// # Errors
    ///
    /// Backend failures, and version entries that don't decode as strings,
    /// are returned as is. The debug policy is applied by the callers.
    pub fn memoize_version(&self, identity: &CallIdentity, timeout: Timeout) -> Result<String, Error> {
        let mut keys = vec![version_key(&identity.namespace)];
        if let Some(instance) = &identity.instance_namespace {
            keys.push(version_key(instance));
        }

        let lookup: Vec<&str> = keys.iter().map(String::as_str).collect();
        let tokens = self.get_many::<String>(&lookup)?;

        let mut minted = Vec::new();
        let mut version_data = String::new();
        for (key, token) in keys.iter().zip(tokens) {
            let token = match token {
                Some(token) => token,
                None => {
                    let token = new_version_token();
                    minted.push((key.clone(), token.clone()));
                    token
                }
            };
            version_data.push_str(&token);
        }

        if !minted.is_empty() {
            self.set_many(minted, timeout)?;
        }

        Ok(version_data)
    }

    /// Replaces the most specific version token of `identity` with a fresh one.
    ///
    /// For an unbound identity this invalidates every cached result of the
    /// function, for a bound one only the results of that instance.
    pub fn reset_version(&self, identity: &CallIdentity, timeout: Timeout) -> Result<(), Error> {
        let key = version_key(identity.most_specific());
        tracing::debug!(version_key = %key, "resetting memoize version");
        self.set(&key, &new_version_token(), timeout)
    }

    /// Removes the most specific version entry of `identity`.
    ///
    /// The next call mints a fresh token, so the effect on cached results is
    /// the same as [`reset_version`](Self::reset_version).
    pub fn delete_version(&self, identity: &CallIdentity) -> Result<(), Error> {
        let key = version_key(identity.most_specific());
        tracing::debug!(version_key = %key, "deleting memoize version");
        self.delete(&key)
    }

    /// The default key builder.
    ///
    /// The version data is resolved first, from the namespace as derived from
    /// the signature; the `make_name` hook only rewrites the name that goes
    /// into the hash. Invalidation therefore keeps working for renamed
    /// wrappers.
    ///
    /// The key is the hex SHA-256 of `[name, canonical args, residual kwargs]`
    /// as JSON, followed by the version data, behind `"<prefix>:"` when the
    /// configured prefix is non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoizer_core::{call, KeyRequest, Memoizer, Signature, Timeout};
    ///
    /// let memoizer = Memoizer::default();
    /// let sig = Signature::function("shop", "total").param("a").param_with_default("b", 1);
    ///
    /// let positional = call!(5, 1);
    /// let keywords = call!(a = 5);
    /// let key = memoizer.make_cache_key(&KeyRequest::new(&sig, None, &positional, Timeout::Default)).unwrap();
    /// let same = memoizer.make_cache_key(&KeyRequest::new(&sig, None, &keywords, Timeout::Default)).unwrap();
    ///
    /// assert!(key.starts_with("memoize:"));
    /// assert_eq!(key, same);
    /// ```
    pub fn make_cache_key(&self, request: &KeyRequest<'_>) -> Result<String, Error> {
        let identity = function_namespace(request.signature, request.receiver);
        let version_data = self.memoize_version(&identity, request.timeout)?;

        let name = match request.make_name {
            Some(make_name) => make_name(&identity.namespace),
            None => identity.namespace,
        };

        let canonical = canonicalize(request.signature, request.receiver, request.call);
        let payload = serde_json::to_vec(&(&name, &canonical.args, &canonical.kwargs))?;

        let mut key = hex::encode(Sha256::digest(&payload));
        key.push_str(&version_data);

        let prefix = &self.config().cache_prefix;
        if prefix.is_empty() {
            Ok(key)
        } else {
            Ok(format!("{}:{}", prefix, key))
        }
    }
}
