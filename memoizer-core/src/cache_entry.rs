use std::time::{Duration, Instant};

/// Internal wrapper that tracks when a value was stored and when it expires.
///
/// Used by [`LocalMemoryBackend`](crate::LocalMemoryBackend) to implement
/// per-entry timeouts.
///
/// # Fields
///
/// * `value` - The stored bytes
/// * `inserted_at` - The `Instant` when this entry was written
/// * `expires_at` - The `Instant` after which the entry is dead, `None` for never
///
/// # Examples
///
/// ```
/// use memoizer_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(b"42".to_vec(), Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, b"42");
/// assert!(!entry.is_expired());
///
/// let forever = CacheEntry::new(b"42".to_vec(), None);
/// assert!(forever.expires_at.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub inserted_at: Instant,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Creates a new entry stamped with `Instant::now()`.
    ///
    /// # Arguments
    ///
    /// * `value` - The bytes to store
    /// * `ttl` - How long the entry lives. `None` means it never expires.
    pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let inserted_at = Instant::now();
        Self {
            value,
            inserted_at,
            // A TTL past the end of `Instant` never expires
            expires_at: ttl.and_then(|ttl| inserted_at.checked_add(ttl)),
        }
    }

    /// Returns true if the entry is past its expiry instant.
    ///
    /// An entry created with a zero TTL is expired from the start.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against a fixed instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}
