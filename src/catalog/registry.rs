//! Column prototype registry
//!
//! Built once, then frozen. Every accessor takes `&self` and nothing
//! mutates after `CatalogBuilder::build` returns, so the catalog is shared
//! across threads behind an `Arc` without synchronization.

use std::collections::{BTreeMap, BTreeSet};

use super::errors::{CatalogError, CatalogResult};
use super::graph::{EntityGraph, FanOutKey, JoinPath};
use super::types::{Cardinality, ColumnPrototype, EntityDef, EntityType, Relation};

/// Immutable registry of queryable columns and the entity graph
#[derive(Debug, Clone)]
pub struct ColumnCatalog {
    columns: BTreeMap<String, ColumnPrototype>,
    by_entity: BTreeMap<EntityType, BTreeSet<String>>,
    graph: EntityGraph,
}

impl ColumnCatalog {
    /// Looks a column up by its stable label
    pub fn find_by_label(&self, label: &str) -> CatalogResult<&ColumnPrototype> {
        self.columns
            .get(label)
            .ok_or_else(|| CatalogError::column_not_found(label))
    }

    /// All columns owned by an entity type, ordered by label
    pub fn all_for_entity_type(&self, entity: &str) -> BTreeSet<&ColumnPrototype> {
        self.by_entity
            .get(entity)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|label| self.columns.get(label))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entity(&self, entity: &str) -> Option<&EntityDef> {
        self.graph.entity(entity)
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Unique join path between two entity types
    pub fn path(&self, from: &EntityType, to: &EntityType) -> Option<JoinPath> {
        self.graph.path(from, to)
    }

    /// One-to-many hops between `root` and `target`
    pub fn fan_out_key(&self, root: &EntityType, target: &EntityType) -> Option<FanOutKey> {
        self.graph.fan_out_key(root, target)
    }

    /// All columns, ordered by label
    pub fn columns(&self) -> impl Iterator<Item = &ColumnPrototype> {
        self.columns.values()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Programmatic catalog construction
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entities: Vec<EntityDef>,
    relations: Vec<Relation>,
    columns: Vec<ColumnPrototype>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entity type keyed by `id`
    pub fn entity(self, name: impl Into<EntityType>) -> Self {
        self.entity_def(EntityDef::new(name))
    }

    pub fn entity_def(mut self, def: EntityDef) -> Self {
        self.entities.push(def);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Declares `parent.id = child.foreign_key` with one parent per child
    pub fn one_to_many(
        self,
        parent: impl Into<EntityType>,
        child: impl Into<EntityType>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relation(Relation {
            from: parent.into(),
            from_field: "id".to_string(),
            to: child.into(),
            to_field: foreign_key.into(),
            cardinality: Cardinality::OneToMany,
        })
    }

    pub fn column(mut self, column: ColumnPrototype) -> Self {
        self.columns.push(column);
        self
    }

    /// Validates and freezes the catalog.
    ///
    /// Fails on duplicate labels or entities, columns and relations that
    /// name undefined entities, and relation cycles.
    pub fn build(self) -> CatalogResult<ColumnCatalog> {
        let graph = EntityGraph::build(self.entities, self.relations)?;

        let mut columns = BTreeMap::new();
        let mut by_entity: BTreeMap<EntityType, BTreeSet<String>> = BTreeMap::new();
        for column in self.columns {
            if !graph.contains(column.entity.as_str()) {
                return Err(CatalogError::unknown_entity(
                    column.entity.as_str(),
                    format!("column {}", column.label),
                ));
            }
            if columns.contains_key(&column.label) {
                return Err(CatalogError::duplicate_label(column.label));
            }
            by_entity
                .entry(column.entity.clone())
                .or_default()
                .insert(column.label.clone());
            columns.insert(column.label.clone(), column);
        }

        Ok(ColumnCatalog {
            columns,
            by_entity,
            graph,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{ColumnRole, DataKind};

    fn small_builder() -> CatalogBuilder {
        CatalogBuilder::new()
            .entity("Campaign")
            .entity("Iteration")
            .one_to_many("Campaign", "Iteration", "campaign_id")
            .column(ColumnPrototype::new(
                "CAMPAIGN_ID",
                "Campaign",
                "id",
                DataKind::Id,
                ColumnRole::all(),
            ))
            .column(ColumnPrototype::new(
                "CAMPAIGN_NAME",
                "Campaign",
                "name",
                DataKind::Text,
                [ColumnRole::Projection, ColumnRole::Filter],
            ))
            .column(ColumnPrototype::new(
                "ITERATION_ID",
                "Iteration",
                "id",
                DataKind::Id,
                ColumnRole::all(),
            ))
    }

    #[test]
    fn test_find_by_label() {
        let catalog = small_builder().build().unwrap();
        let column = catalog.find_by_label("CAMPAIGN_NAME").unwrap();
        assert_eq!(column.entity.as_str(), "Campaign");
        assert_eq!(column.attribute, "name");
    }

    #[test]
    fn test_find_unknown_label() {
        let catalog = small_builder().build().unwrap();
        let err = catalog.find_by_label("NOPE").unwrap_err();
        assert_eq!(err.code().code(), "CHART_CATALOG_COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_all_for_entity_type_sorted() {
        let catalog = small_builder().build().unwrap();
        let labels: Vec<&str> = catalog
            .all_for_entity_type("Campaign")
            .into_iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["CAMPAIGN_ID", "CAMPAIGN_NAME"]);
        assert!(catalog.all_for_entity_type("Unknown").is_empty());
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = small_builder()
            .column(ColumnPrototype::new(
                "CAMPAIGN_ID",
                "Iteration",
                "campaign_id",
                DataKind::Id,
                ColumnRole::all(),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err.code().code(), "CHART_CATALOG_DUPLICATE_LABEL");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_column_on_unknown_entity_rejected() {
        let err = small_builder()
            .column(ColumnPrototype::new(
                "ISSUE_ID",
                "Issue",
                "id",
                DataKind::Id,
                ColumnRole::all(),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err.code().code(), "CHART_CATALOG_UNKNOWN_ENTITY");
    }

    #[test]
    fn test_fan_out_key_through_catalog() {
        let catalog = small_builder().build().unwrap();
        let key = catalog
            .fan_out_key(&"Campaign".into(), &"Iteration".into())
            .unwrap();
        assert_eq!(key.depth(), 1);
    }
}
