//! Explain plan output
//!
//! Renders a compiled plan as deterministic SQL-like text: the main grouped
//! expression, one joined sub-select per fan-out sub-expression and one
//! `EXISTS` per semi-join.

use std::fmt;

use serde_json::Value;

use super::errors::CompileError;
use super::plan::{
    ColumnRef, GroupKey, Plan, PlanAggregate, PlanJoin, Predicate, ScopeFilter,
    SemiJoin, SubExpression,
};
use crate::model::{AggregateFn, Operation};

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether compilation succeeded
    pub accepted: bool,
    /// Root entity (if accepted)
    pub root: Option<String>,
    /// Output column names (if accepted)
    pub columns: Vec<String>,
    /// Number of independent fan-out sub-expressions
    pub fan_out_partitions: usize,
    /// SQL-like rendering (if accepted)
    pub statement: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            accepted: true,
            root: Some(plan.root.to_string()),
            columns: plan.column_names(),
            fan_out_partitions: plan.fan_out_partitions(),
            statement: Some(render_statement(plan)),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    pub fn from_error(err: &CompileError) -> Self {
        Self {
            accepted: false,
            root: None,
            columns: Vec::new(),
            fan_out_partitions: 0,
            statement: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(root) = &self.root {
                writeln!(f, "Root: {}", root)?;
            }
            writeln!(f, "Columns: {}", self.columns.join(", "))?;
            writeln!(f, "Fan-out partitions: {}", self.fan_out_partitions)?;
            if let Some(statement) = &self.statement {
                writeln!(f, "{}", statement)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

fn render_statement(plan: &Plan) -> String {
    let mut select = Vec::new();
    for key in &plan.group_keys {
        select.push(format!(
            "{} AS \"{}\"",
            render_group_key(key),
            plan.outputs[key.output_index].name
        ));
    }
    for aggregate in &plan.local_aggregates {
        select.push(format!(
            "{} AS \"{}\"",
            render_aggregate(aggregate),
            plan.outputs[aggregate.output_index].name
        ));
    }
    for (n, sub) in plan.sub_expressions.iter().enumerate() {
        for aggregate in &sub.aggregates {
            select.push(format!(
                "{} AS \"{}\"",
                render_merge(aggregate, &format!("f{}", n)),
                plan.outputs[aggregate.output_index].name
            ));
        }
    }

    let mut lines = vec![format!("SELECT {}", select.join(", "))];
    lines.push(format!("FROM {} {}", plan.root, plan.root_alias));
    for join in &plan.joins {
        lines.push(format!("  {}", render_join(join)));
    }
    for (n, sub) in plan.sub_expressions.iter().enumerate() {
        lines.push(format!(
            "  {} ({}) f{} ON {} = f{}.root_id",
            sub.join_kind.as_str(),
            render_sub_expression(plan, sub),
            n,
            plan.root_key.qualified(),
            n
        ));
    }

    let mut conditions: Vec<String> = plan.predicates.iter().map(render_predicate).collect();
    if let Some(scope) = &plan.scope {
        conditions.push(render_scope(plan, scope));
    }
    for semi in &plan.semi_joins {
        conditions.push(render_semi_join(plan, semi));
    }
    if !conditions.is_empty() {
        lines.push(format!("WHERE {}", conditions.join(" AND ")));
    }

    if !plan.group_keys.is_empty() {
        let keys: Vec<String> = plan.group_keys.iter().map(render_group_key).collect();
        lines.push(format!("GROUP BY {}", keys.join(", ")));
    }

    let exprs = plan.ordering.exprs();
    if !exprs.is_empty() {
        let rendered: Vec<String> = exprs.iter().map(|e| e.render()).collect();
        lines.push(format!("ORDER BY {}", rendered.join(", ")));
    }

    lines.join("\n")
}

fn render_join(join: &PlanJoin) -> String {
    format!(
        "{} {} {} ON {}.{} = {}.{}",
        join.kind.as_str(),
        join.step.to,
        join.alias,
        join.parent_alias,
        join.step.from_field,
        join.alias,
        join.step.to_field
    )
}

fn render_group_key(key: &GroupKey) -> String {
    match key.bucket {
        Some(bucket) => format!(
            "DATE_TRUNC('{}', {})",
            bucket.as_str(),
            key.column.qualified()
        ),
        None => key.column.qualified(),
    }
}

fn render_aggregate(aggregate: &PlanAggregate) -> String {
    render_function(aggregate.function, &aggregate.column)
}

fn render_function(function: AggregateFn, column: &ColumnRef) -> String {
    match function {
        AggregateFn::CountDistinct => format!("COUNT(DISTINCT {})", column.qualified()),
        other => format!("{}({})", other.as_str(), column.qualified()),
    }
}

/// Outer combination of one sub-expression partial
fn render_merge(aggregate: &PlanAggregate, from: &str) -> String {
    let partial = format!("{}.a{}", from, aggregate.output_index);
    match aggregate.function {
        AggregateFn::Count | AggregateFn::CountDistinct => {
            format!("COALESCE(SUM({}), 0)", partial)
        }
        AggregateFn::Sum => format!("SUM({})", partial),
        AggregateFn::Avg => format!("AVG({})", partial),
        AggregateFn::Min => format!("MIN({})", partial),
        AggregateFn::Max => format!("MAX({})", partial),
    }
}

fn render_sub_expression(plan: &Plan, sub: &SubExpression) -> String {
    let mut select = vec![format!("{} AS root_id", plan.root_key.qualified())];
    for aggregate in &sub.aggregates {
        select.push(format!(
            "{} AS a{}",
            render_aggregate(aggregate),
            aggregate.output_index
        ));
    }
    let mut out = format!(
        "SELECT {} FROM {} {}",
        select.join(", "),
        plan.root,
        plan.root_alias
    );
    for join in &sub.joins {
        out.push(' ');
        out.push_str(&render_join(join));
    }
    if !sub.predicates.is_empty() {
        let preds: Vec<String> = sub.predicates.iter().map(render_predicate).collect();
        out.push_str(&format!(" WHERE {}", preds.join(" AND ")));
    }
    out.push_str(&format!(" GROUP BY {}", plan.root_key.qualified()));
    out
}

fn render_semi_join(plan: &Plan, semi: &SemiJoin) -> String {
    let preds: Vec<String> = semi.predicates.iter().map(render_predicate).collect();
    format!(
        "EXISTS (SELECT 1 FROM {} WHERE {} AND {})",
        render_exists_source(plan, &semi.joins),
        correlate(plan),
        preds.join(" AND ")
    )
}

fn render_scope(plan: &Plan, scope: &ScopeFilter) -> String {
    if scope.branches.is_empty() {
        return "FALSE".to_string();
    }
    let branches: Vec<String> = scope
        .branches
        .iter()
        .map(|branch| {
            let ids: Vec<String> = branch.ids.iter().map(|id| id.to_string()).collect();
            let membership = format!("{} IN ({})", branch.key.qualified(), ids.join(", "));
            if branch.joins.is_empty() {
                membership
            } else {
                format!(
                    "EXISTS (SELECT 1 FROM {} WHERE {} AND {})",
                    render_exists_source(plan, &branch.joins),
                    correlate(plan),
                    membership
                )
            }
        })
        .collect();
    format!("({})", branches.join(" OR "))
}

/// Correlated copy of the root followed by the path joins
fn render_exists_source(plan: &Plan, joins: &[PlanJoin]) -> String {
    let mut out = format!("{} {}", plan.root, plan.root_alias);
    for join in joins {
        out.push(' ');
        out.push_str(&render_join(join));
    }
    out
}

fn correlate(plan: &Plan) -> String {
    format!("{} = outer.{}", plan.root_key.qualified(), plan.root_key.attribute)
}

fn render_predicate(predicate: &Predicate) -> String {
    let column = predicate.column.qualified();
    let values: Vec<String> = predicate.values.iter().map(render_value).collect();
    let value = |i: usize| values.get(i).map(String::as_str).unwrap_or("NULL");
    match &predicate.operation {
        Operation::Equals => format!("{} = {}", column, value(0)),
        Operation::NotEquals => format!("{} <> {}", column, value(0)),
        Operation::GreaterThan => format!("{} > {}", column, value(0)),
        Operation::GreaterEqual => format!("{} >= {}", column, value(0)),
        Operation::LessThan => format!("{} < {}", column, value(0)),
        Operation::LessEqual => format!("{} <= {}", column, value(0)),
        Operation::Between => format!("{} BETWEEN {} AND {}", column, value(0), value(1)),
        Operation::In => format!("{} IN ({})", column, values.join(", ")),
        Operation::Like => format!("{} LIKE {}", column, value(0)),
        Operation::Special(name) => format!("{}({}, [{}])", name, column, values.join(", ")),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}
