//! Deep structural equality over documents.
//!
//! Arrays compare element by element in order, objects compare by key set
//! regardless of insertion order, and numbers compare by numeric value so
//! that `1` and `1.0` are the same number.

use serde_json::{Number, Value};

/// Deep equality of two documents. Total and side-effect free.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => slices_equal(x, y),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => false,
    }
}

/// Deep equality of two arrays.
pub fn slices_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

/// Equality where `None` stands for a missing key.
///
/// A missing key is only equal to another missing key; in particular it is
/// not equal to `null`.
pub fn optional_values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => values_equal(x, y),
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    let float = |n: &Number| if n.is_f64() { n.as_f64() } else { None };
    match (float(x), float(y)) {
        (None, None) => integers_equal(x, y),
        (Some(a), Some(b)) => a == b,
        (Some(f), None) => float_equals_integer(f, y),
        (None, Some(f)) => float_equals_integer(f, x),
    }
}

fn integers_equal(x: &Number, y: &Number) -> bool {
    match (x.as_i64(), y.as_i64()) {
        (Some(a), Some(b)) => a == b,
        // At least one side is above i64::MAX.
        _ => x.as_u64().is_some() && x.as_u64() == y.as_u64(),
    }
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Exact comparison; `f` must be integral and in range to match.
fn float_equals_integer(f: f64, n: &Number) -> bool {
    if f.fract() != 0.0 {
        return false;
    }
    if let Some(i) = n.as_i64() {
        (-TWO_POW_63..TWO_POW_63).contains(&f) && f as i64 == i
    } else if let Some(u) = n.as_u64() {
        (0.0..2.0 * TWO_POW_63).contains(&f) && f as u64 == u
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert!(values_equal(&json!("a"), &json!("a")));
        assert!(!values_equal(&json!("a"), &json!("b")));
        assert!(values_equal(&json!(true), &json!(true)));
        assert!(values_equal(&json!(null), &json!(null)));
        assert!(!values_equal(&json!(null), &json!(false)));
    }

    #[test]
    fn integers_and_floats_compare_numerically() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!(1.5)));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_equal(&json!(-1), &json!(u64::MAX)));
    }

    #[test]
    fn large_integers_are_not_rounded_through_floats() {
        let exact: Value = serde_json::from_str("9007199254740993").unwrap();
        let rounded: Value = serde_json::from_str("9007199254740992.0").unwrap();
        assert!(!values_equal(&exact, &rounded));

        let exact: Value = serde_json::from_str("9007199254740992").unwrap();
        assert!(values_equal(&exact, &rounded));

        assert!(!values_equal(&json!(u64::MAX), &json!(18_446_744_073_709_551_616.0)));
        assert!(values_equal(&json!(-3), &json!(-3.0)));
    }

    #[test]
    fn mixed_kinds_never_match() {
        assert!(!values_equal(&json!("1"), &json!(1)));
        assert!(!values_equal(&json!([]), &json!({})));
        assert!(!values_equal(&json!(0), &json!(false)));
    }

    #[test]
    fn arrays_are_order_sensitive() {
        assert!(values_equal(&json!([1, [2, 3]]), &json!([1, [2, 3]])));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn objects_ignore_key_order() {
        let a = json!({"a": 1, "b": {"c": [1, 2]}});
        let b = json!({"b": {"c": [1, 2]}, "a": 1});
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn missing_differs_from_null() {
        assert!(optional_values_equal(None, None));
        assert!(!optional_values_equal(None, Some(&json!(null))));
        assert!(optional_values_equal(Some(&json!(null)), Some(&json!(null))));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-c]{0,3}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn equality_is_reflexive(v in arb_value()) {
            prop_assert!(values_equal(&v, &v));
        }

        #[test]
        fn equality_is_symmetric(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(values_equal(&a, &b), values_equal(&b, &a));
        }

        #[test]
        fn agrees_with_serde_for_integer_documents(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(values_equal(&a, &b), a == b);
        }
    }
}
