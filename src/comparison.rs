use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Structural equality. Numbers compare by value, so `1` equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => cmp_numbers(x, y) == Ordering::Equal,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| values_equal(l, r)))
        }
        _ => false,
    }
}

/// Ordering for the relational operators: defined only when both sides are
/// numbers or both are strings.
pub fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Some(cmp_numbers(x, y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A total order over every value, used to sort recipients.
///
/// Variants rank `null < bool < number < string < array < object`. Arrays
/// compare element-wise; objects of equal rank compare equal.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => cmp_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| sort_order(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

// Exact across representations: integers never round-trip through f64.
fn cmp_numbers(a: &Number, b: &Number) -> Ordering {
    match (integer(a), integer(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(x), None) => cmp_integer_float(x, b.as_f64().unwrap_or(0.0)),
        (None, Some(y)) => cmp_integer_float(y, a.as_f64().unwrap_or(0.0)).reverse(),
        (None, None) => {
            let x = a.as_f64().unwrap_or(0.0);
            let y = b.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// Integral part first, then the sign of the fractional part. `as i128`
// saturates, which still orders correctly against any 64-bit integer.
fn cmp_integer_float(i: i128, f: f64) -> Ordering {
    let whole = f.trunc();
    match i.cmp(&(whole as i128)) {
        Ordering::Equal if f > whole => Ordering::Less,
        Ordering::Equal if f < whole => Ordering::Greater,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(values_equal(
            &json!({"a": [1, 2.0], "b": null}),
            &json!({"b": null, "a": [1.0, 2]})
        ));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn ordering_requires_matching_variants() {
        assert_eq!(cmp_values(&json!(70), &json!(69)), Some(Ordering::Greater));
        assert_eq!(cmp_values(&json!(-1), &json!(0.5)), Some(Ordering::Less));
        assert_eq!(cmp_values(&json!("a"), &json!("b")), Some(Ordering::Less));
        assert_eq!(cmp_values(&json!(1), &json!("1")), None);
        assert_eq!(cmp_values(&json!(true), &json!(false)), None);
        assert_eq!(cmp_values(&json!([1]), &json!([1])), None);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let big = json!(u64::MAX);
        let smaller = json!(u64::MAX - 1);
        assert_eq!(cmp_values(&big, &smaller), Some(Ordering::Greater));
        assert_eq!(cmp_values(&big, &json!(-1)), Some(Ordering::Greater));
        assert_eq!(cmp_values(&json!(i64::MIN), &big), Some(Ordering::Less));
    }

    #[test]
    fn integers_and_floats_compare_exactly() {
        let two_53 = 1u64 << 53;
        let above = json!(two_53 + 1);
        let as_float = json!(two_53 as f64);
        let exact = json!(two_53);
        assert_eq!(cmp_values(&above, &as_float), Some(Ordering::Greater));
        assert_eq!(cmp_values(&as_float, &above), Some(Ordering::Less));
        assert_eq!(cmp_values(&as_float, &exact), Some(Ordering::Equal));
        assert_eq!(cmp_values(&above, &exact), Some(Ordering::Greater));
        assert!(!values_equal(&above, &as_float));
        assert!(values_equal(&exact, &as_float));

        assert_eq!(cmp_values(&json!(2), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(cmp_values(&json!(-2), &json!(-2.5)), Some(Ordering::Greater));
        assert_eq!(cmp_values(&json!(-3), &json!(-2.5)), Some(Ordering::Less));
        assert_eq!(cmp_values(&json!(u64::MAX), &json!(1.0e30)), Some(Ordering::Less));
        assert_eq!(cmp_values(&json!(i64::MIN), &json!(-1.0e30)), Some(Ordering::Greater));
    }

    #[test]
    fn sort_order_ranks_variants() {
        assert_eq!(sort_order(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(sort_order(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(sort_order(&json!(9), &json!("0")), Ordering::Less);
        assert_eq!(sort_order(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(sort_order(&json!([1]), &json!([1, 0])), Ordering::Less);
        assert_eq!(sort_order(&json!({"a": 1}), &json!({"b": 2})), Ordering::Equal);
    }
}
