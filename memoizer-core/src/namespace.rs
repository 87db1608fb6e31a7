use crate::{CacheableKey, ReceiverKind, Signature};

/// The object an instance-method call is bound to.
///
/// Carries the receiver's short type name (used as the class when the
/// signature doesn't declare one) and its identity key.
///
/// # Examples
///
/// ```
/// use memoizer_core::{DefaultCacheableKey, Receiver};
///
/// #[derive(Debug)]
/// struct Adder {
///     initial: i64,
/// }
/// impl DefaultCacheableKey for Adder {}
///
/// let receiver = Receiver::of(&Adder { initial: 1 });
/// assert_eq!(receiver.type_name(), "Adder");
/// assert_eq!(receiver.identity(), "Adder { initial: 1 }");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Receiver {
    type_name: String,
    identity: String,
}

impl Receiver {
    pub fn new(type_name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identity: identity.into(),
        }
    }

    /// Captures the receiver's type name and identity key.
    pub fn of<S: CacheableKey + ?Sized>(value: &S) -> Self {
        Self::new(short_type_name::<S>(), value.to_cache_key())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<S: ?Sized>() -> String {
    let full = std::any::type_name::<S>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// The resolved identity of a call.
///
/// * `namespace` - identifies the function, independent of arguments
/// * `instance_namespace` - identifies one receiver's calls of that function,
///   present only for calls bound to an instance
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallIdentity {
    pub namespace: String,
    pub instance_namespace: Option<String>,
}

impl CallIdentity {
    /// The namespace whose version a reset or delete acts on: the instance
    /// namespace when bound, else the function namespace.
    pub fn most_specific(&self) -> &str {
        self.instance_namespace.as_deref().unwrap_or(&self.namespace)
    }
}

/// Resolves the namespace(s) of a function call.
///
/// The qualified name is `Class.name` when the signature declares its class,
/// or when a receiver is bound (its type name then stands in for the class);
/// otherwise the bare function name. The namespace is
/// `module + "." + qualified_name`.
///
/// An instance namespace (`namespace + "." + identity`) is added only when the
/// signature takes an instance receiver and one is bound.
///
/// # Examples
///
/// ```
/// use memoizer_core::{function_namespace, Receiver, Signature};
///
/// let sig = Signature::method("shop", "Adder", "add").param("b");
///
/// let unbound = function_namespace(&sig, None);
/// assert_eq!(unbound.namespace, "shop.Adder.add");
/// assert_eq!(unbound.instance_namespace, None);
///
/// let bound = function_namespace(&sig, Some(&Receiver::new("Adder", "Adder(1)")));
/// assert_eq!(bound.instance_namespace.as_deref(), Some("shop.Adder.add.Adder(1)"));
/// ```
pub fn function_namespace(signature: &Signature, receiver: Option<&Receiver>) -> CallIdentity {
    let name = match (signature.class(), receiver) {
        (Some(_), _) => signature.qualified_name(),
        (None, Some(receiver)) => format!("{}.{}", receiver.type_name(), signature.name()),
        (None, None) => signature.name().to_string(),
    };

    let namespace = format!("{}.{}", signature.module(), name);

    let instance_namespace = match (signature.receiver(), receiver) {
        (ReceiverKind::Instance, Some(receiver)) => {
            Some(format!("{}.{}", namespace, receiver.identity()))
        }
        _ => None,
    };

    CallIdentity {
        namespace,
        instance_namespace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultCacheableKey;

    #[derive(Debug)]
    struct Widget<T> {
        id: T,
    }

    impl<T: std::fmt::Debug> DefaultCacheableKey for Widget<T> {}

    #[test]
    fn test_plain_function() {
        let sig = Signature::function("app.utils", "big_foo").param("a");
        let identity = function_namespace(&sig, None);
        assert_eq!(identity.namespace, "app.utils.big_foo");
        assert_eq!(identity.instance_namespace, None);
        assert_eq!(identity.most_specific(), "app.utils.big_foo");
    }

    #[test]
    fn test_distinct_functions_do_not_collide() {
        let f = function_namespace(&Signature::function("app", "f"), None);
        let g = function_namespace(&Signature::function("app", "g"), None);
        let other_module = function_namespace(&Signature::function("lib", "f"), None);
        assert_ne!(f.namespace, g.namespace);
        assert_ne!(f.namespace, other_module.namespace);
    }

    #[test]
    fn test_bound_instance_method() {
        let sig = Signature::method("app", "Adder", "add").param("b");
        let identity = function_namespace(&sig, Some(&Receiver::new("Adder", "Adder(1)")));
        assert_eq!(identity.namespace, "app.Adder.add");
        assert_eq!(
            identity.instance_namespace.as_deref(),
            Some("app.Adder.add.Adder(1)")
        );
        assert_eq!(identity.most_specific(), "app.Adder.add.Adder(1)");
    }

    #[test]
    fn test_class_falls_back_to_receiver_type() {
        let sig = Signature::function("app", "add")
            .with_receiver(ReceiverKind::Instance)
            .param("b");
        let receiver = Receiver::of(&Widget { id: 3u8 });
        assert_eq!(receiver.type_name(), "Widget");

        let identity = function_namespace(&sig, Some(&receiver));
        assert_eq!(identity.namespace, "app.Widget.add");
        assert_eq!(
            identity.instance_namespace.as_deref(),
            Some("app.Widget.add.Widget { id: 3 }")
        );
    }

    #[test]
    fn test_class_method_has_no_instance_namespace() {
        let sig = Signature::class_method("app", "Mock", "big_foo");
        let identity = function_namespace(&sig, Some(&Receiver::new("Mock", "Mock")));
        assert_eq!(identity.namespace, "app.Mock.big_foo");
        assert_eq!(identity.instance_namespace, None);
    }

    #[test]
    fn test_short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<Widget<Vec<u8>>>(), "Widget");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<u64>(), "u64");
    }
}
