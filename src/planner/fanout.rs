//! Root selection and fan-out partitioning
//!
//! Aggregates whose targets sit behind different one-to-many hops must not
//! share a join: each hop multiplies the rows the other aggregates see.
//! Aggregation columns are therefore partitioned by fan-out key, the
//! ordered list of one-to-many hops between the root and their entity.
//! Siblings at equal depth have different keys and land in different
//! partitions.

use std::collections::BTreeMap;

use crate::catalog::{ColumnCatalog, ColumnRole, EntityType, FanOutKey};
use crate::model::Strategy;

use super::errors::{CompileError, CompileResult};
use super::validate::ValidatedModel;

/// Picks the query root.
///
/// 1. An explicit root wins
/// 2. Otherwise the first projection entity from which every other
///    projection entity is reachable without fan-out
/// 3. Without projections, the entity of the first aggregation
pub fn choose_root(catalog: &ColumnCatalog, model: &ValidatedModel<'_>) -> CompileResult<EntityType> {
    if let Some(root) = &model.root_entity {
        if catalog.entity(root.as_str()).is_none() {
            return Err(CompileError::unsupported_shape(format!(
                "Root entity '{}' is not in the catalog",
                root
            )));
        }
        for projection in &model.projections {
            if !reachable_without_fan_out(catalog, root, projection.entity()) {
                return Err(CompileError::unsupported_column(
                    format!(
                        "Projection '{}' on {} fans out from root {}",
                        projection.column.label,
                        projection.entity(),
                        root
                    ),
                    &projection.column.label,
                    ColumnRole::Projection,
                    projection.entity(),
                ));
            }
        }
        return Ok(root.clone());
    }

    if model.projections.is_empty() {
        return model
            .aggregations
            .first()
            .map(|a| a.entity().clone())
            .ok_or_else(CompileError::query_empty);
    }

    let mut candidates: Vec<&EntityType> = Vec::new();
    for projection in &model.projections {
        if !candidates.contains(&projection.entity()) {
            candidates.push(projection.entity());
        }
    }

    candidates
        .iter()
        .find(|candidate| {
            candidates
                .iter()
                .all(|other| reachable_without_fan_out(catalog, candidate, other))
        })
        .map(|root| (*root).clone())
        .ok_or_else(|| {
            let names: Vec<&str> = candidates.iter().map(|e| e.as_str()).collect();
            CompileError::unsupported_shape(format!(
                "Projected entities [{}] cannot share a root without fan-out",
                names.join(", ")
            ))
        })
}

fn reachable_without_fan_out(catalog: &ColumnCatalog, root: &EntityType, target: &EntityType) -> bool {
    catalog
        .fan_out_key(root, target)
        .map_or(false, |key| key.is_root())
}

/// Fan-out key of an entity seen from the root; disconnected entities
/// cannot be joined at all.
pub fn key_for(
    catalog: &ColumnCatalog,
    root: &EntityType,
    label: &str,
    role: ColumnRole,
    entity: &EntityType,
) -> CompileResult<FanOutKey> {
    catalog.fan_out_key(root, entity).ok_or_else(|| {
        CompileError::unsupported_column(
            format!("{} is not related to root {}", entity, root),
            label,
            role,
            entity,
        )
    })
}

/// Partitions aggregation columns (by index) by fan-out key.
///
/// With `Strategy::Flat` every aggregate must share one key.
pub fn partition_aggregates(
    catalog: &ColumnCatalog,
    root: &EntityType,
    model: &ValidatedModel<'_>,
) -> CompileResult<BTreeMap<FanOutKey, Vec<usize>>> {
    let mut partitions: BTreeMap<FanOutKey, Vec<usize>> = BTreeMap::new();
    for (index, aggregation) in model.aggregations.iter().enumerate() {
        let key = key_for(
            catalog,
            root,
            &aggregation.column.label,
            ColumnRole::Aggregation,
            aggregation.entity(),
        )?;
        partitions.entry(key).or_default().push(index);
    }

    if model.strategy == Strategy::Flat && partitions.len() > 1 {
        let keys: Vec<String> = partitions.keys().map(|k| k.to_string()).collect();
        return Err(CompileError::unsupported_shape(format!(
            "Flat strategy cannot combine aggregates at fan-out keys [{}]",
            keys.join("; ")
        )));
    }

    Ok(partitions)
}
