//! # Configuration
//!
//! Process-level settings for a [`Memoizer`](crate::Memoizer) and the
//! [`Timeout`] type used for every write to a backend.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default key prefix applied to every result key.
pub const DEFAULT_CACHE_PREFIX: &str = "memoize";

/// How long a value written to the backend stays valid.
///
/// # Variants
///
/// * `Default` - Let the backend apply its own default timeout
/// * `Forever` - Never expire
/// * `After` - Expire after the given duration. A zero duration expires the
///   entry immediately, so nothing is effectively stored.
///
/// # Examples
///
/// ```
/// use memoizer_core::Timeout;
/// use std::time::Duration;
///
/// assert_eq!(Timeout::secs(5), Timeout::After(Duration::from_secs(5)));
/// assert_eq!(Timeout::default(), Timeout::Default);
///
/// let parsed: Timeout = serde_json::from_str(r#"{"after": 0.5}"#).unwrap();
/// assert_eq!(parsed, Timeout::millis(500));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    #[default]
    Default,
    Forever,
    After(#[serde(with = "duration_secs")] Duration),
}

impl Timeout {
    /// Expire after `secs` seconds.
    pub fn secs(secs: u64) -> Self {
        Timeout::After(Duration::from_secs(secs))
    }

    /// Expire after `millis` milliseconds.
    pub fn millis(millis: u64) -> Self {
        Timeout::After(Duration::from_millis(millis))
    }

    /// Resolves this timeout against a backend's default.
    ///
    /// # Returns
    ///
    /// * `Some(duration)` - the entry expires after `duration`
    /// * `None` - the entry never expires
    pub fn resolve(self, backend_default: Duration) -> Option<Duration> {
        match self {
            Timeout::Default => Some(backend_default),
            Timeout::Forever => None,
            Timeout::After(duration) => Some(duration),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

/// Seconds as a floating point number, the unit cache timeouts are usually
/// written in.
mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

/// Settings shared by every function memoized through one
/// [`Memoizer`](crate::Memoizer).
///
/// Build it once at process start and hand it to [`Memoizer::new`](crate::Memoizer::new).
///
/// # Fields
///
/// * `cache_prefix` - Prepended to result keys as `"<prefix>:"`. Empty disables it.
/// * `debug` - When `true`, backend failures are returned to the caller.
///   When `false` they are logged and the call degrades to an uncached call.
/// * `default_timeout` - Timeout for wrappers that don't set their own.
///
/// # Examples
///
/// ```
/// use memoizer_core::{MemoizeConfig, Timeout};
///
/// let config: MemoizeConfig = serde_json::from_str(r#"{"debug": true}"#).unwrap();
/// assert!(config.debug);
/// assert_eq!(config.cache_prefix, "memoize");
/// assert_eq!(config.default_timeout, Timeout::Default);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoizeConfig {
    pub cache_prefix: String,
    pub debug: bool,
    pub default_timeout: Timeout,
}

impl Default for MemoizeConfig {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            debug: false,
            default_timeout: Timeout::Default,
        }
    }
}

impl MemoizeConfig {
    /// Builds a config from the defaults, overridden by environment variables.
    ///
    /// * `MEMOIZE_DEBUG` - `1`, `true`, `yes` or `on` (any case) enable debug mode
    /// * `MEMOIZE_CACHE_PREFIX` - replaces the key prefix
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(debug) = env::var("MEMOIZE_DEBUG") {
            config.debug = parse_flag(&debug);
        }
        if let Ok(prefix) = env::var("MEMOIZE_CACHE_PREFIX") {
            config.cache_prefix = prefix;
        }
        config
    }

    /// Sets whether backend errors are returned instead of logged.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the key prefix; an empty prefix disables it.
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Sets the timeout for wrappers that don't choose one.
    pub fn with_default_timeout(mut self, timeout: Timeout) -> Self {
        self.default_timeout = timeout;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
