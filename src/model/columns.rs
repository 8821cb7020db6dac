//! Column references used by query models
//!
//! Each column names a catalog prototype by label plus the options of the
//! role it is used in.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sort::{Direction, NullHandling};

/// Semantic role of the entity types a model involves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// Grouping axis
    Axis,
    /// Aggregated measure
    Measure,
    Filter,
}

impl EntityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityRole::Axis => "axis",
            EntityRole::Measure => "measure",
            EntityRole::Filter => "filter",
        }
    }
}

/// Shape of the compiled plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One flat join; all aggregates must share one fan-out key
    Flat,
    /// One sub-expression per fan-out key
    #[default]
    Partitioned,
}

/// Composition of measure relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStyle {
    /// Roots without children are dropped
    Inner,
    /// Roots without children keep a zero/empty aggregate
    #[default]
    Outer,
}

/// Date truncation applied to a projected date column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    ByDay,
    ByMonth,
    ByYear,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::ByDay => "day",
            Bucket::ByMonth => "month",
            Bucket::ByYear => "year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectionColumn {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<Bucket>,
}

impl ProjectionColumn {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bucket: None,
        }
    }

    pub fn bucketed(label: impl Into<String>, bucket: Bucket) -> Self {
        Self {
            label: label.into(),
            bucket: Some(bucket),
        }
    }
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::CountDistinct => "COUNT_DISTINCT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }

    /// Functions that only make sense over numbers
    pub fn requires_numeric(&self) -> bool {
        matches!(self, AggregateFn::Sum | AggregateFn::Avg)
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationColumn {
    pub label: String,
    pub function: AggregateFn,
}

impl AggregationColumn {
    pub fn new(label: impl Into<String>, function: AggregateFn) -> Self {
        Self {
            label: label.into(),
            function,
        }
    }

    /// Output name: `COUNT(TEST_CASE_ID)`
    pub fn output_name(&self) -> String {
        format!("{}({})", self.function.as_str(), self.label)
    }
}

/// Filter operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Between,
    In,
    Like,
    /// Store-specific operation, resolved by name at execution
    Special(String),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Equals => "EQUALS",
            Operation::NotEquals => "NOT_EQUALS",
            Operation::GreaterThan => "GREATER_THAN",
            Operation::GreaterEqual => "GREATER_EQUAL",
            Operation::LessThan => "LESS_THAN",
            Operation::LessEqual => "LESS_EQUAL",
            Operation::Between => "BETWEEN",
            Operation::In => "IN",
            Operation::Like => "LIKE",
            Operation::Special(name) => name,
        }
    }

    /// Whether `count` values are acceptable for an active filter
    pub fn accepts_arity(&self, count: usize) -> bool {
        match self {
            Operation::Between => count == 2,
            Operation::In => count >= 1,
            Operation::Special(_) => true,
            _ => count == 1,
        }
    }

    /// Human-readable arity, for error messages
    pub fn expected_arity(&self) -> &'static str {
        match self {
            Operation::Between => "exactly 2",
            Operation::In => "at least 1",
            Operation::Special(_) => "any number of",
            _ => "exactly 1",
        }
    }

    /// Comparisons that need a total order on the column
    pub fn is_ordered_comparison(&self) -> bool {
        matches!(
            self,
            Operation::GreaterThan
                | Operation::GreaterEqual
                | Operation::LessThan
                | Operation::LessEqual
                | Operation::Between
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterColumn {
    pub label: String,
    pub operation: Operation,
    /// No values means the filter is deactivated
    #[serde(default)]
    pub values: Vec<Value>,
}

impl FilterColumn {
    pub fn new(label: impl Into<String>, operation: Operation, values: Vec<Value>) -> Self {
        Self {
            label: label.into(),
            operation,
            values,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingColumn {
    pub label: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub null_handling: NullHandling,
}

impl OrderingColumn {
    pub fn new(label: impl Into<String>, direction: Direction) -> Self {
        Self {
            label: label.into(),
            direction,
            null_handling: NullHandling::Native,
        }
    }

    pub fn with_null_handling(mut self, null_handling: NullHandling) -> Self {
        self.null_handling = null_handling;
        self
    }
}
