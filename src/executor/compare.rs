//! Value comparison
//!
//! Rules:
//! - numbers compare numerically, whatever their JSON representation
//! - strings compare lexicographically
//! - `false < true`
//! - a string and a number compare numerically if the string parses
//! - anything else is incomparable
//!
//! Nulls are handled by callers: predicates treat them as unknown, sorting
//! places them by null placement.
//!
//! Sorting needs a total order, so it uses [`total_order`] instead: values
//! rank by type first (`bool < number < string < array < object`) and only
//! compare within a type. No coercion happens there.

use std::cmp::Ordering;

use serde_json::Value;

/// Orders two non-null values, `None` if incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(s), Value::Number(n)) => {
            let parsed = s.trim().parse::<f64>().ok()?;
            parsed.partial_cmp(&n.as_f64()?)
        }
        (Value::Number(n), Value::String(s)) => {
            let parsed = s.trim().parse::<f64>().ok()?;
            n.as_f64()?.partial_cmp(&parsed)
        }
        _ => None,
    }
}

fn compare_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Total order over non-null values, used by sorting
pub fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => total_number_order(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

// Float value first, exact integer second: integers too large for an f64
// still order among themselves, and floats sort ahead of equal integers.
fn total_number_order(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    let as_float = |n: &serde_json::Number| n.as_f64().unwrap_or(0.0);
    let as_exact = |n: &serde_json::Number| {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    };
    as_float(x)
        .total_cmp(&as_float(y))
        .then_with(|| as_exact(x).cmp(&as_exact(y)))
}

/// Equality under the comparison rules, falling back to structural equality
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Key under which equal join values hash identically; `None` for null
pub fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        }),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Canonical text of a value, used for distinct counting and grouping.
/// Numbers normalize as in [`join_key`], so `2` and `2.0` are one value.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::Number(_) => join_key(value).unwrap_or_default(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_representations_equal() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert_eq!(compare_values(&json!(1), &json!(1.5)), Some(Ordering::Less));
    }

    #[test]
    fn test_string_number_coercion() {
        assert_eq!(compare_values(&json!("10"), &json!(9)), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("ten"), &json!(9)), None);
    }

    #[test]
    fn test_bool_order() {
        assert_eq!(compare_values(&json!(false), &json!(true)), Some(Ordering::Less));
    }

    #[test]
    fn test_incomparable_falls_back_to_structure() {
        assert!(values_equal(&json!([1, 2]), &json!([1, 2])));
        assert!(!values_equal(&json!(true), &json!("true")));
    }

    #[test]
    fn test_total_order_ranks_types() {
        assert_eq!(total_order(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(total_order(&json!(9), &json!("10")), Ordering::Less);
        assert_eq!(total_order(&json!("10"), &json!("x5")), Ordering::Less);
        assert_eq!(total_order(&json!(9), &json!("x5")), Ordering::Less);
        assert_eq!(total_order(&json!(2), &json!(2.0)), Ordering::Greater);
        assert_eq!(total_order(&json!(1.5), &json!(2)), Ordering::Less);
    }

    #[test]
    fn test_total_order_is_consistent() {
        let values = vec![
            json!(9),
            json!("10"),
            json!("x5"),
            json!(2.0),
            json!(2),
            json!(false),
            json!([1]),
            json!({"a": 1}),
            json!(u64::MAX),
            json!(i64::MIN),
        ];
        for a in &values {
            assert_eq!(total_order(a, a), Ordering::Equal);
            for b in &values {
                assert_eq!(total_order(a, b), total_order(b, a).reverse());
                for c in &values {
                    if total_order(a, b) == Ordering::Less && total_order(b, c) == Ordering::Less {
                        assert_eq!(total_order(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_canonical_normalizes_numbers() {
        assert_eq!(canonical(&json!(2)), canonical(&json!(2.0)));
        assert_eq!(canonical(&json!("2")), "\"2\"");
        assert_ne!(canonical(&json!(2.5)), canonical(&json!(2)));
        assert_eq!(canonical(&json!([1, "a"])), canonical(&json!([1.0, "a"])));
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key(&json!(7)), Some("7".into()));
        assert_eq!(join_key(&json!("7")), Some("7".into()));
        assert_eq!(join_key(&Value::Null), None);
    }
}
