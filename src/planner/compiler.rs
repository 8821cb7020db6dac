//! Query compiler
//!
//! Turns a validated query model and a resolved scope into a detached
//! [`Plan`]. Never touches storage.

use std::collections::BTreeMap;

use crate::catalog::{
    ColumnCatalog, ColumnPrototype, ColumnRole, DataKind, EntityType, FanOutKey, JoinPath, JoinStep,
};
use crate::model::{FilterColumn, JoinStyle, QueryModel, Strategy};
use crate::scope::ResolvedScope;
use crate::sort::{Sort, SortBuilder, SortOrder, TypedOrdering};

use super::errors::{CompileError, CompileResult};
use super::fanout::{choose_root, key_for, partition_aggregates};
use super::plan::{
    ColumnRef, GroupKey, JoinKind, OutputColumn, OutputKind, Plan, PlanAggregate, PlanJoin,
    Predicate, ScopeBranch, ScopeFilter, SemiJoin, SubExpression,
};
use super::validate::{validate, Resolved, ValidatedModel};

/// Join list deduplicated by alias.
///
/// Entity aliases are unique within a plan because the entity graph is a
/// forest: every entity is reached from the root along exactly one path.
/// An inner request upgrades an existing outer join.
#[derive(Debug, Default)]
struct JoinSet {
    joins: Vec<PlanJoin>,
}

impl JoinSet {
    fn add_path(&mut self, path: &JoinPath, kind_of: impl Fn(&JoinStep) -> JoinKind) {
        for step in &path.steps {
            let kind = kind_of(step);
            let alias = step.to.alias();
            match self.joins.iter_mut().find(|j| j.alias == alias) {
                Some(existing) => {
                    if kind == JoinKind::Inner {
                        existing.kind = JoinKind::Inner;
                    }
                }
                None => self.joins.push(PlanJoin {
                    kind,
                    parent_alias: step.from.alias(),
                    alias,
                    step: step.clone(),
                }),
            }
        }
    }

    fn contains(&self, alias: &str) -> bool {
        self.joins.iter().any(|j| j.alias == alias)
    }

    fn into_vec(self) -> Vec<PlanJoin> {
        self.joins
    }
}

fn column_ref(prototype: &ColumnPrototype) -> ColumnRef {
    ColumnRef {
        alias: prototype.entity.alias(),
        entity: prototype.entity.clone(),
        attribute: prototype.attribute.clone(),
        label: prototype.label.clone(),
        kind: prototype.kind,
    }
}

fn predicate(filter: &Resolved<'_, FilterColumn>) -> Predicate {
    Predicate {
        column: column_ref(filter.prototype),
        operation: filter.column.operation.clone(),
        values: filter.column.values.clone(),
    }
}

/// Compiles query models against one catalog
pub struct QueryCompiler<'c> {
    catalog: &'c ColumnCatalog,
}

impl<'c> QueryCompiler<'c> {
    pub fn new(catalog: &'c ColumnCatalog) -> Self {
        Self { catalog }
    }

    /// Compiles `model` under `scope`, appending `paging_sort` after the
    /// model's own ordering columns.
    pub fn compile(
        &self,
        model: &dyn QueryModel,
        scope: &ResolvedScope,
        paging_sort: Option<&Sort>,
    ) -> CompileResult<Plan> {
        let model = validate(self.catalog, model)?;
        let root = choose_root(self.catalog, &model)?;
        let root_alias = root.alias();
        let root_key = self.primary_key_ref(&root);

        let partitions = partition_aggregates(self.catalog, &root, &model)?;

        // Active filters grouped by entity, split by fan-out
        let mut filters_by_entity: BTreeMap<EntityType, Vec<&Resolved<'_, FilterColumn>>> =
            BTreeMap::new();
        for filter in &model.filters {
            filters_by_entity
                .entry(filter.entity().clone())
                .or_default()
                .push(filter);
        }
        let mut fanned_filters: BTreeMap<EntityType, Vec<Predicate>> = BTreeMap::new();
        let mut base_filters: Vec<&Resolved<'_, FilterColumn>> = Vec::new();
        for (entity, filters) in &filters_by_entity {
            let key = key_for(
                self.catalog,
                &root,
                &filters[0].column.label,
                ColumnRole::Filter,
                entity,
            )?;
            if key.is_root() {
                base_filters.extend(filters.iter().copied());
            } else {
                fanned_filters.insert(entity.clone(), filters.iter().map(|f| predicate(f)).collect());
            }
        }

        let mut main = JoinSet::default();
        let mut predicates = Vec::new();

        for projection in &model.projections {
            let path = self.path(&root, projection.entity())?;
            main.add_path(&path, |_| JoinKind::Inner);
        }
        for filter in &base_filters {
            let path = self.path(&root, filter.entity())?;
            main.add_path(&path, |_| JoinKind::Inner);
            predicates.push(predicate(filter));
        }

        let projection_count = model.projections.len();
        let mut local_aggregates = Vec::new();
        let mut sub_expressions = Vec::new();

        for (key, indices) in &partitions {
            let aggregates: Vec<PlanAggregate> = indices
                .iter()
                .map(|&i| {
                    let aggregation = &model.aggregations[i];
                    PlanAggregate {
                        output_index: projection_count + i,
                        function: aggregation.column.function,
                        column: column_ref(aggregation.prototype),
                    }
                })
                .collect();

            if key.is_root() {
                for aggregate in &aggregates {
                    let path = self.path(&root, &aggregate.column.entity)?;
                    main.add_path(&path, |_| JoinKind::Left);
                }
                local_aggregates.extend(aggregates);
            } else if model.strategy == Strategy::Flat {
                // Single fan-out key: aggregate directly over the multiplied rows
                let fan_out_kind = match model.join_style {
                    JoinStyle::Outer => JoinKind::Left,
                    JoinStyle::Inner => JoinKind::Inner,
                };
                for aggregate in &aggregates {
                    let path = self.path(&root, &aggregate.column.entity)?;
                    main.add_path(&path, |step| {
                        if step.fans_out {
                            fan_out_kind
                        } else if fanned_filters.contains_key(&step.to) {
                            JoinKind::Inner
                        } else {
                            JoinKind::Left
                        }
                    });
                }
                self.restrict_by_fanned_filters(&root, &mut main, &mut predicates, &fanned_filters)?;
                local_aggregates.extend(aggregates);
            } else {
                sub_expressions.push(self.sub_expression(
                    &root,
                    key,
                    aggregates,
                    model.join_style,
                    &fanned_filters,
                )?);
            }
        }

        let semi_joins = fanned_filters
            .iter()
            .map(|(entity, preds)| {
                let path = self.path(&root, entity)?;
                let mut joins = JoinSet::default();
                joins.add_path(&path, |_| JoinKind::Inner);
                Ok(SemiJoin {
                    target: entity.clone(),
                    joins: joins.into_vec(),
                    predicates: preds.clone(),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let outputs = Self::outputs(&model);
        let group_keys = model
            .projections
            .iter()
            .enumerate()
            .map(|(i, projection)| GroupKey {
                output_index: i,
                column: column_ref(projection.prototype),
                bucket: projection.column.bucket,
            })
            .collect();

        let (ordering, order_columns) = Self::ordering(&root, &model, &outputs, paging_sort)?;

        Ok(Plan {
            scope: self.scope_filter(&root, scope),
            root,
            root_alias,
            root_key,
            joins: main.into_vec(),
            predicates,
            semi_joins,
            group_keys,
            local_aggregates,
            sub_expressions,
            outputs,
            ordering,
            order_columns,
        })
    }

    fn path(&self, root: &EntityType, target: &EntityType) -> CompileResult<JoinPath> {
        self.catalog.path(root, target).ok_or_else(|| {
            CompileError::unsupported_shape(format!("{} is not related to root {}", target, root))
        })
    }

    fn primary_key_ref(&self, entity: &EntityType) -> ColumnRef {
        let attribute = self.catalog.graph().primary_key(entity.as_str()).to_string();
        ColumnRef {
            alias: entity.alias(),
            entity: entity.clone(),
            label: attribute.clone(),
            attribute,
            kind: DataKind::Id,
        }
    }

    /// Adds the predicates of fanned-out filters whose entity is joined,
    /// upgrading their paths to inner joins
    fn restrict_by_fanned_filters(
        &self,
        root: &EntityType,
        joins: &mut JoinSet,
        predicates: &mut Vec<Predicate>,
        fanned_filters: &BTreeMap<EntityType, Vec<Predicate>>,
    ) -> CompileResult<()> {
        for (entity, preds) in fanned_filters {
            if !joins.contains(&entity.alias()) {
                continue;
            }
            let path = self.path(root, entity)?;
            joins.add_path(&path, |_| JoinKind::Inner);
            predicates.extend(preds.iter().cloned());
        }
        Ok(())
    }

    fn sub_expression(
        &self,
        root: &EntityType,
        key: &FanOutKey,
        aggregates: Vec<PlanAggregate>,
        join_style: JoinStyle,
        fanned_filters: &BTreeMap<EntityType, Vec<Predicate>>,
    ) -> CompileResult<SubExpression> {
        let mut joins = JoinSet::default();
        for aggregate in &aggregates {
            let path = self.path(root, &aggregate.column.entity)?;
            joins.add_path(&path, |step| {
                if step.fans_out {
                    JoinKind::Inner
                } else {
                    JoinKind::Left
                }
            });
        }
        let mut predicates = Vec::new();
        self.restrict_by_fanned_filters(root, &mut joins, &mut predicates, fanned_filters)?;

        Ok(SubExpression {
            key: key.clone(),
            join_kind: match join_style {
                JoinStyle::Outer => JoinKind::Left,
                JoinStyle::Inner => JoinKind::Inner,
            },
            joins: joins.into_vec(),
            predicates,
            aggregates,
        })
    }

    /// One branch per restricted partition reachable from the root
    fn scope_filter(&self, root: &EntityType, scope: &ResolvedScope) -> Option<ScopeFilter> {
        let partitions = match scope {
            ResolvedScope::Unrestricted => return None,
            ResolvedScope::Restricted(partitions) => partitions,
        };
        let branches = partitions
            .iter()
            .filter_map(|(entity, ids)| {
                let path = self.catalog.path(root, entity)?;
                let mut joins = JoinSet::default();
                joins.add_path(&path, |_| JoinKind::Inner);
                Some(ScopeBranch {
                    entity: entity.clone(),
                    joins: joins.into_vec(),
                    key: self.primary_key_ref(entity),
                    ids: ids.clone(),
                })
            })
            .collect();
        Some(ScopeFilter { branches })
    }

    fn outputs(model: &ValidatedModel<'_>) -> Vec<OutputColumn> {
        let projections = model.projections.iter().map(|p| OutputColumn {
            name: p.column.label.clone(),
            label: p.column.label.clone(),
            kind: OutputKind::Projection,
        });
        let aggregations = model.aggregations.iter().map(|a| OutputColumn {
            name: a.column.output_name(),
            label: a.column.label.clone(),
            kind: OutputKind::Aggregation,
        });
        projections.chain(aggregations).collect()
    }

    fn ordering(
        root: &EntityType,
        model: &ValidatedModel<'_>,
        outputs: &[OutputColumn],
        paging_sort: Option<&Sort>,
    ) -> CompileResult<(TypedOrdering, Vec<usize>)> {
        let mut order_columns = Vec::new();
        let mut combined: Vec<SortOrder> = Vec::new();

        for ordering in &model.orderings {
            let index = outputs
                .iter()
                .position(|o| o.label == ordering.column.label)
                .ok_or_else(|| CompileError::ordering_invalid(&ordering.column.label))?;
            order_columns.push(index);
            combined.push(
                SortOrder::new(ordering.column.label.clone(), ordering.column.direction)
                    .with_null_handling(ordering.column.null_handling),
            );
        }

        if let Some(sort) = paging_sort {
            for order in sort.iter() {
                let index = outputs
                    .iter()
                    .position(|o| o.name == order.property)
                    .or_else(|| outputs.iter().position(|o| o.label == order.property))
                    .ok_or_else(|| CompileError::sort_property_unknown(&order.property))?;
                order_columns.push(index);
                combined.push(order.clone());
            }
        }

        let sort: Sort = combined.into_iter().collect();
        Ok((SortBuilder::build(root, &sort), order_columns))
    }
}
