//! # Signatures
//!
//! Rust has no runtime reflection over parameter lists, so every memoized
//! function is registered with an explicit [`Signature`]: where it lives, what
//! its parameters are called, which have defaults, and whether it takes a
//! receiver or variadic arguments.
//!
//! The signature drives two things:
//!
//! - **Key construction** - mapping any positional/keyword mix onto the
//!   declared parameters (see [`canonicalize`](crate::canonicalize))
//! - **Invocation** - strict binding into [`BoundArgs`] right before the
//!   function body runs, which is where arity errors surface

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ArityError, Call, Error};

/// How a function's first parameter binds to an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReceiverKind {
    /// A free function or static method.
    #[default]
    None,
    /// An instance method: the first parameter is `self`.
    Instance,
    /// A class-level method: the first parameter is `cls`.
    Class,
}

/// One declared parameter, optionally with a default value.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Declared shape of a memoized function.
///
/// # Examples
///
/// ```
/// use memoizer_core::{ReceiverKind, Signature};
///
/// // def big_foo(a, b, c=1, *args, **kwargs)
/// let sig = Signature::function("shop.pricing", "big_foo")
///     .param("a")
///     .param("b")
///     .param_with_default("c", 1)
///     .variadic()
///     .variadic_keywords();
/// assert_eq!(sig.qualified_name(), "big_foo");
/// assert_eq!(sig.params().len(), 3);
///
/// // class Adder: def add(self, b)
/// let method = Signature::method("shop.pricing", "Adder", "add").param("b");
/// assert_eq!(method.receiver(), ReceiverKind::Instance);
/// assert_eq!(method.qualified_name(), "Adder.add");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    module: String,
    name: String,
    class: Option<String>,
    receiver: ReceiverKind,
    params: Vec<Param>,
    variadic: bool,
    variadic_keywords: bool,
}

impl Signature {
    /// A free function. Pass `module_path!()` as `module` to get a namespace
    /// that matches the function's real location.
    pub fn function(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            class: None,
            receiver: ReceiverKind::None,
            params: Vec::new(),
            variadic: false,
            variadic_keywords: false,
        }
    }

    /// An instance method of `class`.
    pub fn method(
        module: impl Into<String>,
        class: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::function(module, name)
            .with_class(class)
            .with_receiver(ReceiverKind::Instance)
    }

    /// A class-level method of `class`.
    pub fn class_method(
        module: impl Into<String>,
        class: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::function(module, name)
            .with_class(class)
            .with_receiver(ReceiverKind::Class)
    }

    /// Names the owning class. When unset for an instance method, the class
    /// is taken from the receiver's type when the method is memoized.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_receiver(mut self, receiver: ReceiverKind) -> Self {
        self.receiver = receiver;
        self
    }

    /// Declares a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declares a parameter with a default value.
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Accepts extra positional arguments (`*args`).
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Accepts extra keyword arguments (`**kwargs`).
    pub fn variadic_keywords(mut self) -> Self {
        self.variadic_keywords = true;
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn receiver(&self) -> ReceiverKind {
        self.receiver
    }

    /// Declared fixed parameters, not counting the receiver.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn accepts_variadic_keywords(&self) -> bool {
        self.variadic_keywords
    }

    /// `Class.name` when the class is declared, else the bare name.
    pub fn qualified_name(&self) -> String {
        match &self.class {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }

    /// Binds a call strictly, the way a real invocation does.
    ///
    /// Positional arguments fill parameters left to right, keywords fill the
    /// rest by name, and defaults fill what is left.
    ///
    /// # Errors
    ///
    /// * [`ArityError::TooMany`] - more positionals than parameters, without `*args`
    /// * [`ArityError::Duplicate`] - a parameter given positionally and by keyword
    /// * [`ArityError::UnexpectedKeyword`] - an unknown keyword, without `**kwargs`
    /// * [`ArityError::Missing`] - a required parameter was not supplied
    pub fn bind(&self, call: &Call) -> Result<BoundArgs, ArityError> {
        let positional = call.args();
        let declared = self.params.len();

        if positional.len() > declared && !self.variadic {
            return Err(ArityError::TooMany {
                function: self.qualified_name(),
                expected: declared,
                given: positional.len(),
            });
        }

        let mut keywords = call.kwargs().clone();
        let mut values = Vec::with_capacity(declared);

        for (index, param) in self.params.iter().enumerate() {
            let keyword = keywords.remove(&param.name);
            let value = match (positional.get(index), keyword) {
                (Some(_), Some(_)) => {
                    return Err(ArityError::Duplicate {
                        function: self.qualified_name(),
                        name: param.name.clone(),
                    })
                }
                (Some(value), None) => value.clone(),
                (None, Some(value)) => value,
                (None, None) => match &param.default {
                    Some(default) => default.clone(),
                    None => {
                        return Err(ArityError::Missing {
                            function: self.qualified_name(),
                            name: param.name.clone(),
                        })
                    }
                },
            };
            values.push((param.name.clone(), value));
        }

        if !self.variadic_keywords {
            if let Some(name) = keywords.keys().next() {
                return Err(ArityError::UnexpectedKeyword {
                    function: self.qualified_name(),
                    name: name.clone(),
                });
            }
        }

        Ok(BoundArgs {
            values,
            rest: positional.iter().skip(declared).cloned().collect(),
            extra: keywords,
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.module, self.qualified_name())?;
        let mut parts: Vec<String> = Vec::new();
        match self.receiver {
            ReceiverKind::None => {}
            ReceiverKind::Instance => parts.push("self".to_string()),
            ReceiverKind::Class => parts.push("cls".to_string()),
        }
        for param in &self.params {
            match &param.default {
                Some(default) => parts.push(format!("{}={}", param.name, default)),
                None => parts.push(param.name.clone()),
            }
        }
        if self.variadic {
            parts.push("*args".to_string());
        }
        if self.variadic_keywords {
            parts.push("**kwargs".to_string());
        }
        write!(f, "{})", parts.join(", "))
    }
}

/// A call bound to a signature: every declared parameter has a value.
///
/// This is what the body of a memoized function receives.
///
/// # Examples
///
/// ```
/// use memoizer_core::{call, Signature};
///
/// let sig = Signature::function("m", "f").param("a").param_with_default("b", 10).variadic();
/// let bound = sig.bind(&call!(1, 2, 3, 4)).unwrap();
/// assert_eq!(bound.get::<i64>("a").unwrap(), 1);
/// assert_eq!(bound.get::<i64>("b").unwrap(), 2);
/// assert_eq!(bound.rest::<i64>().unwrap(), vec![3, 4]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
    rest: Vec<Value>,
    extra: BTreeMap<String, Value>,
}

impl BoundArgs {
    /// Raw value of a declared parameter.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Decodes a declared parameter into `T`.
    ///
    /// # Errors
    ///
    /// * [`Error::Argument`] - the value does not decode into `T`; an
    ///   undeclared name is reported the same way, as a `null` that failed
    ///   to decode
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let value = self.value(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|source| Error::Argument {
            name: name.to_string(),
            source,
        })
    }

    /// Positional arguments beyond the declared parameters (`*args`).
    pub fn rest_values(&self) -> &[Value] {
        &self.rest
    }

    /// Decodes every `*args` value into `T`.
    pub fn rest<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.rest
            .iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value.clone()).map_err(|source| Error::Argument {
                    name: format!("*args[{}]", index),
                    source,
                })
            })
            .collect()
    }

    /// Keyword arguments matching no declared parameter (`**kwargs`).
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call;
    use serde_json::json;

    fn abcd() -> Signature {
        Signature::function("tests", "big_foo")
            .param("a")
            .param("b")
            .param_with_default("c", Value::Null)
            .param_with_default("d", Value::Null)
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(abcd().qualified_name(), "big_foo");
        assert_eq!(
            Signature::class_method("tests", "Mock", "big_foo").qualified_name(),
            "Mock.big_foo"
        );
    }

    #[test]
    fn test_bind_positional_and_keyword() {
        let bound = abcd().bind(&call!(1, 2, d = "bar")).unwrap();
        assert_eq!(bound.value("a"), Some(&json!(1)));
        assert_eq!(bound.value("b"), Some(&json!(2)));
        assert_eq!(bound.value("c"), Some(&Value::Null));
        assert_eq!(bound.value("d"), Some(&json!("bar")));
    }

    #[test]
    fn test_bind_missing_argument() {
        let err = abcd().bind(&call!(1)).unwrap_err();
        assert_eq!(
            err,
            ArityError::Missing {
                function: "big_foo".to_string(),
                name: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_bind_duplicate_argument() {
        let err = abcd().bind(&call!(1, 2, a = 3)).unwrap_err();
        assert!(matches!(err, ArityError::Duplicate { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_bind_too_many_positionals() {
        let err = abcd().bind(&call!(1, 2, 3, 4, 5)).unwrap_err();
        assert!(matches!(
            err,
            ArityError::TooMany {
                expected: 4,
                given: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_unexpected_keyword() {
        let err = abcd().bind(&call!(1, 2, z = 0)).unwrap_err();
        assert!(matches!(err, ArityError::UnexpectedKeyword { ref name, .. } if name == "z"));
    }

    #[test]
    fn test_bind_variadics() {
        let sig = Signature::function("tests", "f")
            .param("a")
            .variadic()
            .variadic_keywords();
        let bound = sig.bind(&call!(1, 2, 3, b = 4)).unwrap();
        assert_eq!(bound.get::<i64>("a").unwrap(), 1);
        assert_eq!(bound.rest::<i64>().unwrap(), vec![2, 3]);
        assert_eq!(bound.extra().get("b"), Some(&json!(4)));
    }

    #[test]
    fn test_get_wrong_type() {
        let bound = abcd().bind(&call!("x", 2)).unwrap();
        let err = bound.get::<i64>("a").unwrap_err();
        assert!(matches!(err, Error::Argument { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_get_optional_default() {
        let bound = abcd().bind(&call!(1, 2)).unwrap();
        assert_eq!(bound.get::<Option<String>>("c").unwrap(), None);
    }

    #[test]
    fn test_display() {
        let sig = Signature::method("shop", "Adder", "add")
            .param("b")
            .param_with_default("c", 1)
            .variadic();
        assert_eq!(sig.to_string(), "shop.Adder.add(self, b, c=1, *args)");
    }
}
