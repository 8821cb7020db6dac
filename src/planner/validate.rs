//! Model validation against the catalog
//!
//! Every column must resolve to a prototype that supports the role it is
//! used in, and whose entity the model involves for that role. Options must
//! fit the column kind. Fails fast on the first violation.

use crate::catalog::{ColumnCatalog, ColumnPrototype, ColumnRole, DataKind, EntityType};
use crate::model::{
    AggregationColumn, EntityRole, FilterColumn, InvolvedEntities, JoinStyle, Operation,
    OrderingColumn, ProjectionColumn, QueryModel, Strategy,
};

use super::errors::{CompileError, CompileResult};

/// A model column with its catalog prototype
#[derive(Debug, Clone)]
pub struct Resolved<'c, C> {
    pub column: C,
    pub prototype: &'c ColumnPrototype,
}

impl<'c, C> Resolved<'c, C> {
    pub fn entity(&self) -> &'c EntityType {
        &self.prototype.entity
    }
}

/// Model whose columns all resolved and passed validation
#[derive(Debug)]
pub struct ValidatedModel<'c> {
    pub strategy: Strategy,
    pub join_style: JoinStyle,
    pub root_entity: Option<EntityType>,
    pub projections: Vec<Resolved<'c, ProjectionColumn>>,
    pub aggregations: Vec<Resolved<'c, AggregationColumn>>,
    /// Active filters only; deactivated ones are validated, then dropped
    pub filters: Vec<Resolved<'c, FilterColumn>>,
    pub orderings: Vec<Resolved<'c, OrderingColumn>>,
}

/// Reads every accessor of `model` once and validates the result
pub fn validate<'c>(catalog: &'c ColumnCatalog, model: &dyn QueryModel) -> CompileResult<ValidatedModel<'c>> {
    let involved = model.involved_entities();
    let projection_columns = model.projection_columns();
    let aggregation_columns = model.aggregation_columns();

    if projection_columns.is_empty() && aggregation_columns.is_empty() {
        return Err(CompileError::query_empty());
    }

    let mut projections = Vec::with_capacity(projection_columns.len());
    for column in projection_columns {
        let prototype = resolve(catalog, &involved, &column.label, ColumnRole::Projection)?;
        if column.bucket.is_some() && prototype.kind != DataKind::Date {
            return Err(CompileError::bucket_invalid(&column.label, prototype.kind));
        }
        projections.push(Resolved { column, prototype });
    }

    let mut aggregations = Vec::with_capacity(aggregation_columns.len());
    for column in aggregation_columns {
        let prototype = resolve(catalog, &involved, &column.label, ColumnRole::Aggregation)?;
        if column.function.requires_numeric() && prototype.kind != DataKind::Numeric {
            return Err(CompileError::aggregate_invalid(
                &column.label,
                column.function,
                prototype.kind,
            ));
        }
        aggregations.push(Resolved { column, prototype });
    }

    let mut filters = Vec::new();
    for column in model.filter_columns() {
        let prototype = resolve(catalog, &involved, &column.label, ColumnRole::Filter)?;
        check_operation(&column, prototype.kind)?;
        if !column.is_active() {
            continue;
        }
        if !column.operation.accepts_arity(column.values.len()) {
            return Err(CompileError::filter_arity(
                &column.label,
                &column.operation,
                column.values.len(),
            ));
        }
        filters.push(Resolved { column, prototype });
    }

    let mut orderings = Vec::new();
    for column in model.ordering_columns() {
        let prototype = resolve(catalog, &involved, &column.label, ColumnRole::Ordering)?;
        let is_output = projections.iter().any(|p| p.column.label == column.label)
            || aggregations.iter().any(|a| a.column.label == column.label);
        if !is_output {
            return Err(CompileError::ordering_invalid(&column.label));
        }
        orderings.push(Resolved { column, prototype });
    }

    Ok(ValidatedModel {
        strategy: model.strategy(),
        join_style: model.join_style(),
        root_entity: model.root_entity(),
        projections,
        aggregations,
        filters,
        orderings,
    })
}

/// Entity roles that admit a column role
fn entity_roles(role: ColumnRole) -> &'static [EntityRole] {
    match role {
        ColumnRole::Projection => &[EntityRole::Axis],
        ColumnRole::Aggregation => &[EntityRole::Measure],
        ColumnRole::Filter => &[EntityRole::Filter],
        ColumnRole::Ordering => &[EntityRole::Axis, EntityRole::Measure],
    }
}

fn resolve<'c>(
    catalog: &'c ColumnCatalog,
    involved: &InvolvedEntities,
    label: &str,
    role: ColumnRole,
) -> CompileResult<&'c ColumnPrototype> {
    let prototype = catalog
        .find_by_label(label)
        .map_err(|_| CompileError::column_unknown(label, role))?;

    if !prototype.supports(role) {
        return Err(CompileError::column_role(label, role, &prototype.entity));
    }

    let declared = entity_roles(role).iter().any(|entity_role| {
        involved
            .get(entity_role)
            .map_or(false, |entities| entities.contains(&prototype.entity))
    });
    if !declared {
        return Err(CompileError::entity_not_involved(label, role, &prototype.entity));
    }

    Ok(prototype)
}

fn check_operation(column: &FilterColumn, kind: DataKind) -> CompileResult<()> {
    let compatible = match &column.operation {
        Operation::Like => matches!(kind, DataKind::Text | DataKind::Enumerated),
        op if op.is_ordered_comparison() => kind.is_ordered(),
        _ => true,
    };
    if compatible {
        Ok(())
    } else {
        Err(CompileError::operation_invalid(
            &column.label,
            &column.operation,
            kind,
        ))
    }
}
