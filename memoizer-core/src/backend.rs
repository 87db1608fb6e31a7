//! # Cache Backends
//!
//! The key-value contract the memoizer writes results and version tokens to.
//!
//! A backend stores opaque byte values under string keys with a per-entry
//! [`Timeout`]. Absence is reported as `None`, which can never collide with a
//! stored value: a memoized function returning `None` is stored as the bytes
//! `null`.
//!
//! Implementations only need the single-key operations; the batch operations
//! fall back to them unless the backend has a cheaper native form.

use std::fmt::Debug;

use crate::{BackendResult, Timeout};

/// A key-value cache with per-entry timeouts.
///
/// All methods take `&self`; implementations are expected to be internally
/// synchronized and atomic per key. No multi-key atomicity is assumed.
pub trait CacheBackend: Debug + Send + Sync {
    /// Fetches the value stored under `key`, `None` if absent or expired.
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<()>;

    /// Stores `value` only if `key` holds no live value.
    ///
    /// Returns `true` if the value was stored.
    fn add(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<bool>;

    /// Removes `key`. Succeeds even if the key was absent.
    fn delete(&self, key: &str) -> BackendResult<()>;

    /// Removes every entry.
    fn clear(&self) -> BackendResult<()>;

    /// Removes several keys.
    fn delete_many(&self, keys: &[&str]) -> BackendResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Fetches several keys at once.
    ///
    /// The result is aligned with `keys`: position `i` holds the value for
    /// `keys[i]`, or `None` if it is missing.
    fn get_many(&self, keys: &[&str]) -> BackendResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Stores several entries under the same timeout.
    fn set_many(&self, entries: Vec<(String, Vec<u8>)>, timeout: Timeout) -> BackendResult<()> {
        for (key, value) in entries {
            self.set(&key, value, timeout)?;
        }
        Ok(())
    }
}
