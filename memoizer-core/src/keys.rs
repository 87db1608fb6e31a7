use std::fmt::Debug;

/// Trait for types that can produce a stable identity key.
///
/// The receiver of a memoized method is partitioned by this key: its method
/// results are cached under an instance namespace derived from it, and
/// invalidating one receiver's cache leaves every other receiver alone.
///
/// Two values returning the same key share one cache partition. That is the
/// intended way to make logically equal objects (say, two handles to the same
/// database row) hit the same entries.
///
/// # Examples
///
/// ```
/// use memoizer_core::CacheableKey;
///
/// struct Account {
///     id: u64,
///     balance: i64,
/// }
///
/// impl CacheableKey for Account {
///     fn to_cache_key(&self) -> String {
///         format!("Account({})", self.id)
///     }
/// }
///
/// let a = Account { id: 7, balance: 10 };
/// let b = Account { id: 7, balance: 99 };
/// assert_eq!(a.to_cache_key(), b.to_cache_key());
/// ```
pub trait CacheableKey {
    fn to_cache_key(&self) -> String;
}

/// Marker trait for types whose `Debug` output is a good enough identity key.
///
/// Implementing it provides [`CacheableKey`] through a blanket impl. Implement
/// `CacheableKey` directly instead when `Debug` includes fields that change
/// over the object's lifetime, but not both.
///
/// ```
/// use memoizer_core::{CacheableKey, DefaultCacheableKey};
///
/// #[derive(Debug)]
/// struct Adder {
///     initial: i64,
/// }
///
/// impl DefaultCacheableKey for Adder {}
///
/// assert_eq!(Adder { initial: 1 }.to_cache_key(), "Adder { initial: 1 }");
/// ```
pub trait DefaultCacheableKey: Debug {}

impl<T> CacheableKey for T
where
    T: DefaultCacheableKey + ?Sized,
{
    fn to_cache_key(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! default_cacheable_key {
    ($($ty:ty),* $(,)?) => {
        $(impl DefaultCacheableKey for $ty {})*
    };
}

default_cacheable_key!(
    bool, char, str, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl DefaultCacheableKey for Point {}

    struct UserId {
        id: u64,
    }

    impl CacheableKey for UserId {
        fn to_cache_key(&self) -> String {
            format!("user:{}", self.id)
        }
    }

    #[test]
    fn test_debug_based_key() {
        let p = Point { x: 1, y: -2 };
        assert_eq!(p.to_cache_key(), "Point { x: 1, y: -2 }");
    }

    #[test]
    fn test_custom_key() {
        assert_eq!(UserId { id: 42 }.to_cache_key(), "user:42");
    }

    #[test]
    fn test_primitive_keys() {
        assert_eq!(7u32.to_cache_key(), "7");
        assert_eq!("abc".to_cache_key(), "\"abc\"");
        assert_eq!(String::from("abc").to_cache_key(), "\"abc\"");
    }
}
