//! Plan evaluator
//!
//! Evaluates a compiled plan over in-memory rows.
//!
//! Per root row, in order:
//! 1. Scope filter (any branch) and semi-joins (all)
//! 2. Each fan-out sub-expression, aggregated for this root alone
//! 3. Base joins and base predicates
//! 4. Grouping by projected values, local aggregation, and one merge of
//!    the root's sub-expression partials per group it lands in
//!
//! Groups keep first-appearance order until the final sort.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use super::aggregate::Accumulator;
use super::compare::{canonical, join_key};
use super::errors::{StorageError, StorageResult};
use super::filters::{PredicateFilter, SpecialOperations};
use super::result::Tuple;
use super::sorter::ResultSorter;
use crate::catalog::EntityType;
use crate::model::Bucket;
use crate::planner::{ColumnRef, JoinKind, Plan, PlanJoin, ScopeFilter};

/// One stored row: attribute name to value
pub type Row = Map<String, Value>;

/// Rows per entity type
pub type Tables = HashMap<EntityType, Vec<Row>>;

/// Rows bound to query aliases; an absent alias is unbound
type Binding<'a> = HashMap<&'a str, &'a Row>;

fn value<'a>(binding: &Binding<'a>, column: &ColumnRef) -> Option<&'a Value> {
    binding
        .get(column.alias.as_str())
        .copied()
        .and_then(|row| row.get(&column.attribute))
}

fn all_match(filters: &[PredicateFilter], binding: &Binding<'_>) -> bool {
    filters.iter().all(|f| f.matches(value(binding, f.column())))
}

/// Hash index of child rows by join field
struct JoinIndex<'a> {
    by_field: HashMap<(&'a str, &'a str), HashMap<String, Vec<&'a Row>>>,
}

impl<'a> JoinIndex<'a> {
    fn build(tables: &'a Tables, plan: &'a Plan) -> Self {
        let mut index = Self {
            by_field: HashMap::new(),
        };
        let scope_joins = plan.scope.iter().flat_map(|s| &s.branches).flat_map(|b| &b.joins);
        let semi_joins = plan.semi_joins.iter().flat_map(|s| &s.joins);
        let sub_joins = plan.sub_expressions.iter().flat_map(|s| &s.joins);
        for join in plan.joins.iter().chain(scope_joins).chain(semi_joins).chain(sub_joins) {
            index.add(tables, join);
        }
        index
    }

    fn add(&mut self, tables: &'a Tables, join: &'a PlanJoin) {
        let key = (join.step.to.as_str(), join.step.to_field.as_str());
        if self.by_field.contains_key(&key) {
            return;
        }
        let mut rows: HashMap<String, Vec<&'a Row>> = HashMap::new();
        if let Some(table) = tables.get(&join.step.to) {
            for row in table {
                if let Some(k) = row.get(&join.step.to_field).and_then(join_key) {
                    rows.entry(k).or_default().push(row);
                }
            }
        }
        self.by_field.insert(key, rows);
    }

    fn children(&self, join: &'a PlanJoin, parent: &Row) -> &[&'a Row] {
        let Some(k) = parent.get(&join.step.from_field).and_then(join_key) else {
            return &[];
        };
        self.by_field
            .get(&(join.step.to.as_str(), join.step.to_field.as_str()))
            .and_then(|rows| rows.get(&k))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Applies `joins` in order to every seed binding
    fn expand(&self, seeds: Vec<Binding<'a>>, joins: &'a [PlanJoin]) -> Vec<Binding<'a>> {
        let mut current = seeds;
        for join in joins {
            let mut next = Vec::with_capacity(current.len());
            for binding in current {
                let children = match binding.get(join.parent_alias.as_str()) {
                    Some(parent) => self.children(join, parent),
                    None => &[][..],
                };
                if children.is_empty() {
                    if join.kind == JoinKind::Left {
                        next.push(binding);
                    }
                    continue;
                }
                for child in children {
                    let mut extended = binding.clone();
                    extended.insert(join.alias.as_str(), *child);
                    next.push(extended);
                }
            }
            current = next;
        }
        current
    }
}

struct Group {
    key: Vec<Value>,
    locals: Vec<Accumulator>,
    subs: Vec<Vec<Accumulator>>,
    merged_roots: HashSet<usize>,
}

impl Group {
    fn new(key: Vec<Value>, plan: &Plan) -> Self {
        Self {
            key,
            locals: plan
                .local_aggregates
                .iter()
                .map(|a| Accumulator::new(a.function))
                .collect(),
            subs: plan
                .sub_expressions
                .iter()
                .map(|s| s.aggregates.iter().map(|a| Accumulator::new(a.function)).collect())
                .collect(),
            merged_roots: HashSet::new(),
        }
    }

    fn into_tuple(self, plan: &Plan) -> Tuple {
        let mut tuple = vec![Value::Null; plan.outputs.len()];
        for (group_key, value) in plan.group_keys.iter().zip(self.key) {
            tuple[group_key.output_index] = value;
        }
        for (aggregate, acc) in plan.local_aggregates.iter().zip(&self.locals) {
            tuple[aggregate.output_index] = acc.finish();
        }
        for (sub, accs) in plan.sub_expressions.iter().zip(&self.subs) {
            for (aggregate, acc) in sub.aggregates.iter().zip(accs) {
                tuple[aggregate.output_index] = acc.finish();
            }
        }
        tuple
    }
}

/// Predicates of one plan, prepared once
struct PreparedFilters {
    base: Vec<PredicateFilter>,
    semi_joins: Vec<Vec<PredicateFilter>>,
    sub_expressions: Vec<Vec<PredicateFilter>>,
}

impl PreparedFilters {
    fn prepare(plan: &Plan, specials: &SpecialOperations) -> StorageResult<Self> {
        Ok(Self {
            base: PredicateFilter::prepare_all(&plan.predicates, specials)?,
            semi_joins: plan
                .semi_joins
                .iter()
                .map(|s| PredicateFilter::prepare_all(&s.predicates, specials))
                .collect::<StorageResult<_>>()?,
            sub_expressions: plan
                .sub_expressions
                .iter()
                .map(|s| PredicateFilter::prepare_all(&s.predicates, specials))
                .collect::<StorageResult<_>>()?,
        })
    }
}

/// Evaluates plans over a set of tables
pub struct PlanEvaluator<'s> {
    tables: &'s Tables,
    specials: &'s SpecialOperations,
}

impl<'s> PlanEvaluator<'s> {
    pub fn new(tables: &'s Tables, specials: &'s SpecialOperations) -> Self {
        Self { tables, specials }
    }

    /// Returns every ordered tuple of `plan`, unpaged
    pub fn evaluate<'a>(&'a self, plan: &'a Plan) -> StorageResult<Vec<Tuple>> {
        let filters = PreparedFilters::prepare(plan, self.specials)?;
        let index = JoinIndex::build(self.tables, plan);
        let roots: &'a [Row] = self.tables.get(&plan.root).map_or(&[][..], Vec::as_slice);

        let mut groups: Vec<Group> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        'roots: for (root_index, root_row) in roots.iter().enumerate() {
            let mut seed: Binding<'a> = HashMap::new();
            seed.insert(plan.root_alias.as_str(), root_row);

            if let Some(scope) = &plan.scope {
                if !Self::in_scope(&index, &seed, scope) {
                    continue;
                }
            }
            for (semi, preds) in plan.semi_joins.iter().zip(&filters.semi_joins) {
                let exists = index
                    .expand(vec![seed.clone()], &semi.joins)
                    .iter()
                    .any(|b| all_match(preds, b));
                if !exists {
                    continue 'roots;
                }
            }

            let mut partials = Vec::with_capacity(plan.sub_expressions.len());
            for (sub, preds) in plan.sub_expressions.iter().zip(&filters.sub_expressions) {
                let rows: Vec<Binding<'a>> = index
                    .expand(vec![seed.clone()], &sub.joins)
                    .into_iter()
                    .filter(|b| all_match(preds, b))
                    .collect();
                if rows.is_empty() && sub.join_kind == JoinKind::Inner {
                    continue 'roots;
                }
                let mut accs: Vec<Accumulator> =
                    sub.aggregates.iter().map(|a| Accumulator::new(a.function)).collect();
                for row in &rows {
                    for (aggregate, acc) in sub.aggregates.iter().zip(accs.iter_mut()) {
                        acc.push(value(row, &aggregate.column))?;
                    }
                }
                partials.push(accs);
            }

            for binding in index.expand(vec![seed], &plan.joins) {
                if !all_match(&filters.base, &binding) {
                    continue;
                }
                let key = plan
                    .group_keys
                    .iter()
                    .map(|k| bucket(value(&binding, &k.column), k.bucket))
                    .collect::<StorageResult<Vec<Value>>>()?;
                let slot = *group_index
                    .entry(canonical(&Value::Array(key.clone())))
                    .or_insert_with(|| {
                        groups.push(Group::new(key, plan));
                        groups.len() - 1
                    });
                let group = &mut groups[slot];

                for (aggregate, acc) in plan.local_aggregates.iter().zip(group.locals.iter_mut()) {
                    acc.push(value(&binding, &aggregate.column))?;
                }
                if group.merged_roots.insert(root_index) {
                    for (target, partial) in group.subs.iter_mut().zip(&partials) {
                        for (acc, part) in target.iter_mut().zip(partial) {
                            acc.merge(part);
                        }
                    }
                }
            }
        }

        if groups.is_empty() && plan.is_global() {
            groups.push(Group::new(Vec::new(), plan));
        }

        let mut tuples: Vec<Tuple> = groups.into_iter().map(|g| g.into_tuple(plan)).collect();
        ResultSorter::sort(&mut tuples, plan);
        Ok(tuples)
    }

    fn in_scope<'a>(index: &JoinIndex<'a>, seed: &Binding<'a>, scope: &'a ScopeFilter) -> bool {
        scope.branches.iter().any(|branch| {
            index
                .expand(vec![seed.clone()], &branch.joins)
                .iter()
                .filter_map(|b| value(b, &branch.key))
                .filter_map(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()))
                .any(|id| branch.ids.contains(&id))
        })
    }
}

/// Projected value of a group key, truncated to its date bucket
fn bucket(value: Option<&Value>, bucket: Option<Bucket>) -> StorageResult<Value> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Value::Null),
        Some(v) => v,
    };
    let Some(bucket) = bucket else {
        return Ok(value.clone());
    };
    let text = value
        .as_str()
        .ok_or_else(|| StorageError::invalid_data(format!("{} is not a date", value)))?;
    let date = parse_date(text)
        .ok_or_else(|| StorageError::invalid_data(format!("'{}' is not a date", text)))?;
    let format = match bucket {
        Bucket::ByDay => "%Y-%m-%d",
        Bucket::ByMonth => "%Y-%m",
        Bucket::ByYear => "%Y",
    };
    Ok(Value::String(date.format(format).to_string()))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bucket_formats() {
        let v = json!("2024-03-17T10:20:00Z");
        assert_eq!(bucket(Some(&v), Some(Bucket::ByDay)).unwrap(), json!("2024-03-17"));
        assert_eq!(bucket(Some(&v), Some(Bucket::ByMonth)).unwrap(), json!("2024-03"));
        assert_eq!(bucket(Some(&v), Some(Bucket::ByYear)).unwrap(), json!("2024"));
        let plain = json!("2023-11-02");
        assert_eq!(bucket(Some(&plain), Some(Bucket::ByMonth)).unwrap(), json!("2023-11"));
    }

    #[test]
    fn test_bucket_passes_nulls_and_rejects_garbage() {
        assert_eq!(bucket(None, Some(Bucket::ByDay)).unwrap(), Value::Null);
        assert!(bucket(Some(&json!("soon")), Some(Bucket::ByDay)).is_err());
        assert!(bucket(Some(&json!(20240101)), Some(Bucket::ByDay)).is_err());
    }

    #[test]
    fn test_unbucketed_passthrough() {
        assert_eq!(bucket(Some(&json!("x")), None).unwrap(), json!("x"));
    }
}
