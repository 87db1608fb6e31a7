use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// The raw arguments of one invocation: positional values in order plus
/// keyword values by name.
///
/// A `Call` is what callers hand to a memoized function. It is deliberately
/// untyped; the function's [`Signature`](crate::Signature) decides how the
/// values map onto parameters, both when building the cache key and when the
/// function actually runs.
///
/// Use the [`call!`](crate::call) macro for literals.
///
/// # Examples
///
/// ```
/// use memoizer_core::{call, Call};
///
/// let built = Call::new().arg(5).arg(2).kwarg("c", 1);
/// assert_eq!(built, call!(5, 2, c = 1));
/// assert!(!built.is_empty());
/// assert!(call!().is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing an earlier one with the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Appends a positional argument of any serializable type.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Codec`] if the value cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn try_arg<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, Error> {
        Ok(self.arg(serde_json::to_value(value)?))
    }

    /// Sets a keyword argument of any serializable type.
    ///
    /// # Errors
    ///
    /// Same as [`try_arg`](Self::try_arg).
    pub fn try_kwarg<T: Serialize + ?Sized>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, Error> {
        Ok(self.kwarg(name, serde_json::to_value(value)?))
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    /// True when the call carries no argument at all.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for Call {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
            kwargs: BTreeMap::new(),
        }
    }
}

/// Builds a [`Call`] from positional values and `name = value` keywords.
///
/// ```
/// use memoizer_core::call;
///
/// let c = call!(vec![5, 3, 2], "x", d = vec![3, 3], c = 1);
/// assert_eq!(c.args().len(), 2);
/// assert_eq!(c.kwargs().len(), 2);
/// ```
#[macro_export]
macro_rules! call {
    (@munch $call:expr;) => {
        $call
    };
    (@munch $call:expr; $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::call!(@munch $call.kwarg(stringify!($name), $value); $($($rest)*)?)
    };
    (@munch $call:expr; $value:expr $(, $($rest:tt)*)?) => {
        $crate::call!(@munch $call.arg($value); $($($rest)*)?)
    };
    () => {
        $crate::Call::new()
    };
    ($($rest:tt)+) => {
        $crate::call!(@munch $crate::Call::new(); $($rest)+)
    };
}
