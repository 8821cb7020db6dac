//! Captured view of a query model
//!
//! Decorated models have no data of their own; a snapshot freezes what
//! their accessors return at one instant so it can be hashed or printed.

use serde::{Deserialize, Serialize};

use super::columns::{
    AggregationColumn, FilterColumn, JoinStyle, OrderingColumn, ProjectionColumn, Strategy,
};
use super::query::{InvolvedEntities, QueryModel};
use crate::catalog::EntityType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub strategy: Strategy,
    pub join_style: JoinStyle,
    pub root_entity: Option<EntityType>,
    pub involved_entities: InvolvedEntities,
    pub projections: Vec<ProjectionColumn>,
    pub aggregations: Vec<AggregationColumn>,
    pub filters: Vec<FilterColumn>,
    pub orderings: Vec<OrderingColumn>,
}

impl ModelSnapshot {
    pub fn capture(model: &dyn QueryModel) -> Self {
        Self {
            strategy: model.strategy(),
            join_style: model.join_style(),
            root_entity: model.root_entity(),
            involved_entities: model.involved_entities(),
            projections: model.projection_columns(),
            aggregations: model.aggregation_columns(),
            filters: model.filter_columns(),
            orderings: model.ordering_columns(),
        }
    }
}

/// A snapshot is itself a model: compiling it compiles exactly what was captured
impl QueryModel for ModelSnapshot {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn join_style(&self) -> JoinStyle {
        self.join_style
    }

    fn root_entity(&self) -> Option<EntityType> {
        self.root_entity.clone()
    }

    fn involved_entities(&self) -> InvolvedEntities {
        self.involved_entities.clone()
    }

    fn projection_columns(&self) -> Vec<ProjectionColumn> {
        self.projections.clone()
    }

    fn aggregation_columns(&self) -> Vec<AggregationColumn> {
        self.aggregations.clone()
    }

    fn filter_columns(&self) -> Vec<FilterColumn> {
        self.filters.clone()
    }

    fn ordering_columns(&self) -> Vec<OrderingColumn> {
        self.orderings.clone()
    }
}
