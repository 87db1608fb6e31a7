use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{Call, Receiver, ReceiverKind, Signature};

/// Form-independent representation of one call's effective arguments.
///
/// * `args` - one slot per declared parameter (the receiver first, when the
///   signature has one), followed by any surplus positional arguments
/// * `kwargs` - keywords matching no declared parameter, sorted by name
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalArgs {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

/// Maps a call's positional and keyword arguments onto the declared
/// parameters.
///
/// For each slot, in order:
///
/// 1. A receiver slot holds its text form: the identity key of a bound
///    instance, the class path for a class-level method, `null` when no
///    receiver is known
/// 2. A keyword with the parameter's name
/// 3. The next unconsumed positional argument
/// 4. The parameter's declared default
/// 5. `null` - a required argument is missing; the real call will fail, this
///    function never does
///
/// Left-over positionals are appended in call order, left-over keywords form
/// the residual map.
///
/// Calls differing only in positional-vs-keyword form, keyword order or
/// whether a defaulted argument was spelled out canonicalize identically.
///
/// # Examples
///
/// ```
/// use memoizer_core::{call, canonicalize, Signature};
///
/// let sig = Signature::function("m", "f").param("a").param("b").param_with_default("c", 1);
///
/// let positional = canonicalize(&sig, None, &call!(1, 2));
/// let keywords = canonicalize(&sig, None, &call!(b = 2, a = 1, c = 1));
/// assert_eq!(positional, keywords);
/// ```
pub fn canonicalize(signature: &Signature, receiver: Option<&Receiver>, call: &Call) -> CanonicalArgs {
    let positional = call.args();
    let mut kwargs = call.kwargs().clone();
    let mut args = Vec::with_capacity(signature.params().len() + 1);

    match signature.receiver() {
        ReceiverKind::None => {}
        ReceiverKind::Instance => args.push(match receiver {
            Some(receiver) => Value::String(receiver.identity().to_string()),
            None => Value::Null,
        }),
        ReceiverKind::Class => args.push(Value::String(format!(
            "{}.{}",
            signature.module(),
            signature.class().unwrap_or_else(|| signature.name())
        ))),
    }

    let mut consumed = 0;
    for param in signature.params() {
        let value = if let Some(value) = kwargs.remove(&param.name) {
            value
        } else if let Some(value) = positional.get(consumed) {
            consumed += 1;
            value.clone()
        } else if let Some(default) = &param.default {
            default.clone()
        } else {
            Value::Null
        };
        args.push(value);
    }

    // Consistency of the key trumps order: surplus positionals go last
    args.extend(positional.iter().skip(consumed).cloned());

    CanonicalArgs { args, kwargs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call;
    use serde_json::json;

    fn big_foo() -> Signature {
        Signature::function("tests", "big_foo")
            .param("a")
            .param("b")
            .param_with_default("c", Value::Null)
            .param_with_default("d", Value::Null)
    }

    #[test]
    fn test_positional_and_keyword_forms_agree() {
        let expected = vec![json!(1), json!(2), json!("foo"), json!("bar")];
        let sig = big_foo();

        for c in [
            call!(1, 2, "foo", "bar"),
            call!(2, "foo", "bar", a = 1),
            call!(a = 1, b = 2, c = "foo", d = "bar"),
            call!(d = "bar", b = 2, a = 1, c = "foo"),
            call!(1, 2, d = "bar", c = "foo"),
        ] {
            let canonical = canonicalize(&sig, None, &c);
            assert_eq!(canonical.args, expected, "call {:?}", c);
            assert!(canonical.kwargs.is_empty());
        }
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let sig = Signature::function("tests", "f")
            .param("a")
            .param("b")
            .param_with_default("c", 1);
        assert_eq!(
            canonicalize(&sig, None, &call!(1, 2)),
            canonicalize(&sig, None, &call!(1, 2, c = 1))
        );
        assert_eq!(
            canonicalize(&sig, None, &call!(1, 2)),
            canonicalize(&sig, None, &call!(1, 2, 1))
        );
        assert_ne!(
            canonicalize(&sig, None, &call!(1, 2)),
            canonicalize(&sig, None, &call!(2, 1))
        );
    }

    #[test]
    fn test_missing_required_is_null() {
        let canonical = canonicalize(&big_foo(), None, &call!(1));
        assert_eq!(
            canonical.args,
            vec![json!(1), Value::Null, Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_surplus_positionals_are_appended() {
        let sig = Signature::function("tests", "f")
            .param("a")
            .param_with_default("b", 1)
            .variadic();
        let canonical = canonicalize(&sig, None, &call!(1, 3, 4));
        assert_eq!(canonical.args, vec![json!(1), json!(3), json!(4)]);
        assert_ne!(canonical, canonicalize(&sig, None, &call!(1, 3)));
    }

    #[test]
    fn test_residual_keywords_are_order_independent() {
        let sig = Signature::function("tests", "f").param("a").variadic_keywords();
        let first = canonicalize(&sig, None, &call!(1, x = 1, y = 2));
        let second = canonicalize(&sig, None, &call!(1, y = 2, x = 1));
        assert_eq!(first, second);
        assert_eq!(first.kwargs.len(), 2);
        assert_ne!(first, canonicalize(&sig, None, &call!(1, x = 1, y = 3)));
    }

    #[test]
    fn test_instance_receiver_occupies_first_slot() {
        let sig = Signature::method("tests", "Adder", "add").param("b").variadic();
        let receiver = Receiver::new("Adder", "Adder(1)");
        let canonical = canonicalize(&sig, Some(&receiver), &call!(3, 4));
        assert_eq!(canonical.args, vec![json!("Adder(1)"), json!(3), json!(4)]);

        let unbound = canonicalize(&sig, None, &call!(3));
        assert_eq!(unbound.args, vec![Value::Null, json!(3)]);
    }

    #[test]
    fn test_class_receiver_uses_class_path() {
        let sig = Signature::class_method("tests", "Mock", "big_foo")
            .param("a")
            .param("b");
        let canonical = canonicalize(&sig, None, &call!(5, 2));
        assert_eq!(canonical.args, vec![json!("tests.Mock"), json!(5), json!(2)]);
    }
}
