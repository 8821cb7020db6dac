//! Aggregate accumulators
//!
//! Accumulators ignore nulls. Partials from independent sub-expressions
//! combine with [`Accumulator::merge`]: counts and sums add, min and max
//! keep the extreme, averages add sum and count, distinct counts union
//! their value sets.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::compare::{canonical, compare_values};
use super::errors::{StorageError, StorageResult};
use crate::model::AggregateFn;

/// Exact integer sum until a float shows up or the sum overflows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn add(self, other: Total) -> Total {
        match (self, other) {
            (Total::Int(a), Total::Int(b)) => match a.checked_add(b) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(a as f64 + b as f64),
            },
            (a, b) => Total::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Total::Int(i) => i as f64,
            Total::Float(f) => f,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Total::Int(i) => json!(i),
            Total::Float(f) => json!(f),
        }
    }
}

fn numeric(value: &Value) -> StorageResult<Total> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Total::Int(i)),
            None => n
                .as_f64()
                .map(Total::Float)
                .ok_or_else(|| StorageError::invalid_data(format!("Number {} out of range", n))),
        },
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Total::Float)
            .map_err(|_| StorageError::invalid_data(format!("'{}' is not numeric", s))),
        other => Err(StorageError::invalid_data(format!("{} is not numeric", other))),
    }
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    Count(u64),
    CountDistinct(BTreeSet<String>),
    Sum(Option<Total>),
    Avg { sum: Option<Total>, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    pub fn new(function: AggregateFn) -> Self {
        match function {
            AggregateFn::Count => Accumulator::Count(0),
            AggregateFn::CountDistinct => Accumulator::CountDistinct(BTreeSet::new()),
            AggregateFn::Sum => Accumulator::Sum(None),
            AggregateFn::Avg => Accumulator::Avg { sum: None, count: 0 },
            AggregateFn::Min => Accumulator::Min(None),
            AggregateFn::Max => Accumulator::Max(None),
        }
    }

    /// Feeds one input; `None` and null are skipped
    pub fn push(&mut self, value: Option<&Value>) -> StorageResult<()> {
        let value = match value {
            None | Some(Value::Null) => return Ok(()),
            Some(v) => v,
        };
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::CountDistinct(seen) => {
                seen.insert(canonical(value));
            }
            Accumulator::Sum(total) => {
                let n = numeric(value)?;
                *total = Some(total.map_or(n, |t| t.add(n)));
            }
            Accumulator::Avg { sum, count } => {
                let n = numeric(value)?;
                *sum = Some(sum.map_or(n, |t| t.add(n)));
                *count += 1;
            }
            Accumulator::Min(current) => keep_extreme(current, value, Ordering::Less),
            Accumulator::Max(current) => keep_extreme(current, value, Ordering::Greater),
        }
        Ok(())
    }

    /// Combines a partial of the same function into this one
    pub fn merge(&mut self, other: &Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += b,
            (Accumulator::CountDistinct(a), Accumulator::CountDistinct(b)) => {
                a.extend(b.iter().cloned())
            }
            (Accumulator::Sum(a), Accumulator::Sum(b)) => *a = merge_totals(*a, *b),
            (
                Accumulator::Avg { sum, count },
                Accumulator::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum = merge_totals(*sum, *other_sum);
                *count += other_count;
            }
            (Accumulator::Min(a), Accumulator::Min(Some(b))) => keep_extreme(a, b, Ordering::Less),
            (Accumulator::Max(a), Accumulator::Max(Some(b))) => {
                keep_extreme(a, b, Ordering::Greater)
            }
            _ => {}
        }
    }

    pub fn finish(&self) -> Value {
        match self {
            Accumulator::Count(n) => json!(n),
            Accumulator::CountDistinct(seen) => json!(seen.len() as u64),
            Accumulator::Sum(total) => total.map_or(Value::Null, Total::to_value),
            Accumulator::Avg { sum, count } => match sum {
                Some(total) if *count > 0 => json!(total.as_f64() / *count as f64),
                _ => Value::Null,
            },
            Accumulator::Min(v) | Accumulator::Max(v) => v.clone().unwrap_or(Value::Null),
        }
    }
}

fn merge_totals(a: Option<Total>, b: Option<Total>) -> Option<Total> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.add(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn keep_extreme(current: &mut Option<Value>, candidate: &Value, wanted: Ordering) {
    let replace = match current {
        None => true,
        Some(existing) => compare_values(candidate, existing) == Some(wanted),
    };
    if replace {
        *current = Some(candidate.clone());
    }
}
