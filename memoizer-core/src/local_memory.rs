use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::{BackendResult, CacheBackend, CacheEntry, Timeout};

/// Timeout applied to writes made with [`Timeout::Default`].
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(300);

/// A process-local [`CacheBackend`] kept in a `HashMap` behind a `RwLock`.
///
/// This is the backend the default memoizer runs on, and the one tests use.
/// Entries are lazily expired on access.
///
/// # Features
///
/// - **Thread-safe sharing**: `parking_lot::RwLock` lets concurrent readers
///   proceed without blocking each other
/// - **Per-entry timeouts**: each write carries its own [`Timeout`]
/// - **Entry limit**: with `max_entries`, a write of a new key into a full
///   cache first drops expired entries, then a random `1 / cull_frequency`
///   share of the remaining ones (everything if `cull_frequency` is 0)
///
/// # Examples
///
/// ```
/// use memoizer_core::{CacheBackend, LocalMemoryBackend, Timeout};
///
/// let backend = LocalMemoryBackend::new();
/// backend.set("hi", b"hello".to_vec(), Timeout::Default).unwrap();
/// assert_eq!(backend.get("hi").unwrap(), Some(b"hello".to_vec()));
///
/// // `add` never overwrites a live value
/// assert!(!backend.add("hi", b"foobar".to_vec(), Timeout::Default).unwrap());
/// assert_eq!(backend.get("hi").unwrap(), Some(b"hello".to_vec()));
/// ```
#[derive(Debug)]
pub struct LocalMemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_timeout: Duration,
    max_entries: Option<usize>,
    cull_frequency: usize,
}

impl Default for LocalMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalMemoryBackend {
    /// Creates an unbounded backend with a 300 second default timeout.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_timeout: DEFAULT_BACKEND_TIMEOUT,
            max_entries: None,
            cull_frequency: 3,
        }
    }

    /// Sets the timeout used for writes made with [`Timeout::Default`].
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Bounds the number of stored entries.
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Maximum number of entries kept
    /// * `cull_frequency` - When full, `1 / cull_frequency` of the entries are
    ///   dropped. 0 clears the whole cache.
    pub fn with_max_entries(mut self, max_entries: usize, cull_frequency: usize) -> Self {
        self.max_entries = Some(max_entries);
        self.cull_frequency = cull_frequency;
        self
    }

    /// Number of stored entries, including ones that expired but were not yet
    /// reclaimed.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Writes one entry. Returns `false` when a zero timeout dropped it instead.
    fn insert_entry(
        &self,
        entries: &mut HashMap<String, CacheEntry>,
        key: &str,
        value: Vec<u8>,
        timeout: Timeout,
    ) -> bool {
        let ttl = timeout.resolve(self.default_timeout);
        if ttl == Some(Duration::ZERO) {
            entries.remove(key);
            return false;
        }

        if let Some(max) = self.max_entries {
            if !entries.contains_key(key) && entries.len() >= max {
                self.cull(entries);
            }
        }

        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        true
    }

    fn cull(&self, entries: &mut HashMap<String, CacheEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired_at(now));

        let max = self.max_entries.unwrap_or(usize::MAX);
        if entries.len() < max {
            return;
        }

        if self.cull_frequency == 0 {
            entries.clear();
            return;
        }

        let mut keys: Vec<String> = entries.keys().cloned().collect();
        fastrand::shuffle(&mut keys);
        let count = (keys.len() / self.cull_frequency).max(1);
        for key in keys.into_iter().take(count) {
            entries.remove(&key);
        }
    }
}

impl CacheBackend for LocalMemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: reclaim it, unless another writer replaced it in between
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired()) {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<()> {
        let mut entries = self.entries.write();
        self.insert_entry(&mut entries, key, value, timeout);
        Ok(())
    }

    fn add(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<bool> {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| !entry.is_expired()) {
            return Ok(false);
        }
        Ok(self.insert_entry(&mut entries, key, value, timeout))
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> BackendResult<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn delete_many(&self, keys: &[&str]) -> BackendResult<()> {
        let mut entries = self.entries.write();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn set_many(&self, batch: Vec<(String, Vec<u8>)>, timeout: Timeout) -> BackendResult<()> {
        let mut entries = self.entries.write();
        for (key, value) in batch {
            self.insert_entry(&mut entries, &key, value, timeout);
        }
        Ok(())
    }
}
