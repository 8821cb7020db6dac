//! Detached relational plan
//!
//! A plan is plain data: it owns everything it needs, holds no reference
//! to the catalog or any backend, and can be shared between threads and
//! run against any number of backends.
//!
//! Evaluation order:
//! 1. Root rows, restricted by the scope filter and the semi-joins
//! 2. Base joins from the root, then base predicates
//! 3. Grouping by the projected columns, local aggregates per group
//! 4. Each sub-expression, per root row, merged into the root's group
//! 5. Ordering, then paging

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{DataKind, EntityId, EntityType, FanOutKey, JoinStep};
use crate::model::{AggregateFn, Bucket, Operation};
use crate::sort::TypedOrdering;

/// Join composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Unmatched rows are dropped
    Inner,
    /// Unmatched rows are kept with the joined alias unbound
    Left,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// `JOIN <step.to> <alias> ON <parent_alias>.<from_field> = <alias>.<to_field>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanJoin {
    pub kind: JoinKind,
    pub parent_alias: String,
    pub alias: String,
    pub step: JoinStep,
}

/// A catalog column bound to a query alias
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub alias: String,
    pub entity: EntityType,
    pub attribute: String,
    pub label: String,
    pub kind: DataKind,
}

impl ColumnRef {
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.alias, self.attribute)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: ColumnRef,
    pub operation: Operation,
    pub values: Vec<Value>,
}

/// `EXISTS` over the path from the root to a fanned-out filtered entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemiJoin {
    pub target: EntityType,
    pub joins: Vec<PlanJoin>,
    pub predicates: Vec<Predicate>,
}

/// One scope partition reachable from the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeBranch {
    pub entity: EntityType,
    pub joins: Vec<PlanJoin>,
    /// Primary key of `entity`
    pub key: ColumnRef,
    pub ids: BTreeSet<EntityId>,
}

/// A root row is in scope if any branch reaches an id in its set.
/// No branches means nothing is in scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub branches: Vec<ScopeBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKey {
    pub output_index: usize,
    pub column: ColumnRef,
    pub bucket: Option<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAggregate {
    pub output_index: usize,
    pub function: AggregateFn,
    pub column: ColumnRef,
}

/// Aggregates sharing one fan-out key, grouped by root primary key and
/// joined back to the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubExpression {
    pub key: FanOutKey,
    /// How the grouped result joins back to the root
    pub join_kind: JoinKind,
    pub joins: Vec<PlanJoin>,
    pub predicates: Vec<Predicate>,
    pub aggregates: Vec<PlanAggregate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Projection,
    Aggregation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    /// Display name: the label for projections, `FN(label)` for aggregations
    pub name: String,
    /// Catalog label
    pub label: String,
    pub kind: OutputKind,
}

/// Compiled, detached query plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub root: EntityType,
    pub root_alias: String,
    /// Primary key of the root
    pub root_key: ColumnRef,
    pub joins: Vec<PlanJoin>,
    pub predicates: Vec<Predicate>,
    /// `None` when the scope is unrestricted
    pub scope: Option<ScopeFilter>,
    pub semi_joins: Vec<SemiJoin>,
    pub group_keys: Vec<GroupKey>,
    pub local_aggregates: Vec<PlanAggregate>,
    pub sub_expressions: Vec<SubExpression>,
    /// Projections first, then aggregations, in model order
    pub outputs: Vec<OutputColumn>,
    pub ordering: TypedOrdering,
    /// Output index of each ordering expression
    pub order_columns: Vec<usize>,
}

impl Plan {
    /// Output column names, in tuple order
    pub fn column_names(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.name.clone()).collect()
    }

    /// True if grouping yields exactly one group
    pub fn is_global(&self) -> bool {
        self.group_keys.is_empty()
    }

    /// Number of independent sub-expressions
    pub fn fan_out_partitions(&self) -> usize {
        self.sub_expressions.len()
    }
}
