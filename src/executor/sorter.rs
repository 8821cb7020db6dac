//! Tuple ordering
//!
//! Sorts tuples by the plan's ordering expressions. Stable: tuples equal
//! under every expression keep their grouping order. Values of different
//! JSON types order by type, never by coercion.

use std::cmp::Ordering;

use serde_json::Value;

use super::compare::total_order;
use super::result::Tuple;
use crate::planner::Plan;
use crate::sort::{Direction, NullPlacement};

/// Sorts result tuples
pub struct ResultSorter;

impl ResultSorter {
    pub fn sort(tuples: &mut [Tuple], plan: &Plan) {
        let keys: Vec<(usize, Direction, NullPlacement)> = plan
            .ordering
            .exprs()
            .iter()
            .zip(&plan.order_columns)
            .map(|(expr, &index)| (index, expr.direction, expr.nulls))
            .collect();
        if keys.is_empty() {
            return;
        }

        tuples.sort_by(|a, b| {
            for &(index, direction, nulls) in &keys {
                let ordering = Self::compare(a.get(index), b.get(index), direction, nulls);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Final position of `a` relative to `b` under one expression
    fn compare(
        a: Option<&Value>,
        b: Option<&Value>,
        direction: Direction,
        nulls: NullPlacement,
    ) -> Ordering {
        let a = a.filter(|v| !v.is_null());
        let b = b.filter(|v| !v.is_null());
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => nulls.null_vs_value(direction),
            (Some(_), None) => nulls.null_vs_value(direction).reverse(),
            (Some(x), Some(y)) => {
                let natural = total_order(x, y);
                match direction {
                    Direction::Asc => natural,
                    Direction::Desc => natural.reverse(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compare(a: Value, b: Value, direction: Direction, nulls: NullPlacement) -> Ordering {
        ResultSorter::compare(Some(&a), Some(&b), direction, nulls)
    }

    #[test]
    fn test_nulls_first_ascending() {
        assert_eq!(
            compare(Value::Null, json!(1), Direction::Asc, NullPlacement::First),
            Ordering::Less
        );
        assert_eq!(
            compare(json!(1), Value::Null, Direction::Asc, NullPlacement::First),
            Ordering::Greater
        );
    }

    #[test]
    fn test_nulls_last_descending() {
        assert_eq!(
            compare(Value::Null, json!(1), Direction::Desc, NullPlacement::Last),
            Ordering::Greater
        );
    }

    #[test]
    fn test_default_nulls_smallest() {
        assert_eq!(
            compare(Value::Null, json!(1), Direction::Asc, NullPlacement::Default),
            Ordering::Less
        );
        assert_eq!(
            compare(Value::Null, json!(1), Direction::Desc, NullPlacement::Default),
            Ordering::Greater
        );
    }

    #[test]
    fn test_mixed_types_order_by_type() {
        assert_eq!(
            compare(json!(9), json!("10"), Direction::Asc, NullPlacement::Default),
            Ordering::Less
        );
        assert_eq!(
            compare(json!("x5"), json!(9), Direction::Desc, NullPlacement::Default),
            Ordering::Less
        );
    }

    #[test]
    fn test_descending_values() {
        assert_eq!(
            compare(json!("a"), json!("b"), Direction::Desc, NullPlacement::Default),
            Ordering::Greater
        );
    }
}
