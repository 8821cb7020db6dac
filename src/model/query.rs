//! Query model capability and its concrete definition

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns::{
    AggregateFn, AggregationColumn, Bucket, EntityRole, FilterColumn, JoinStyle, Operation,
    OrderingColumn, ProjectionColumn, Strategy,
};
use crate::catalog::EntityType;
use crate::sort::{Direction, NullHandling};

/// Entity types participating in each semantic role
pub type InvolvedEntities = BTreeMap<EntityRole, BTreeSet<EntityType>>;

/// Read-only description of one analytical query.
///
/// Every accessor returns an owned, freshly computed view. Implementations
/// must not cache merged views: wrappers recompute on each call so changes
/// in a wrapped model are always visible.
pub trait QueryModel: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn join_style(&self) -> JoinStyle;

    /// Explicit query root, if the model pins one
    fn root_entity(&self) -> Option<EntityType>;

    fn involved_entities(&self) -> InvolvedEntities;

    fn projection_columns(&self) -> Vec<ProjectionColumn>;

    fn aggregation_columns(&self) -> Vec<AggregationColumn>;

    fn filter_columns(&self) -> Vec<FilterColumn>;

    fn ordering_columns(&self) -> Vec<OrderingColumn>;
}

macro_rules! delegate_query_model {
    ($($wrapper:ty),*) => {$(
        impl<M: QueryModel + ?Sized> QueryModel for $wrapper {
            fn strategy(&self) -> Strategy {
                (**self).strategy()
            }
            fn join_style(&self) -> JoinStyle {
                (**self).join_style()
            }
            fn root_entity(&self) -> Option<EntityType> {
                (**self).root_entity()
            }
            fn involved_entities(&self) -> InvolvedEntities {
                (**self).involved_entities()
            }
            fn projection_columns(&self) -> Vec<ProjectionColumn> {
                (**self).projection_columns()
            }
            fn aggregation_columns(&self) -> Vec<AggregationColumn> {
                (**self).aggregation_columns()
            }
            fn filter_columns(&self) -> Vec<FilterColumn> {
                (**self).filter_columns()
            }
            fn ordering_columns(&self) -> Vec<OrderingColumn> {
                (**self).ordering_columns()
            }
        }
    )*};
}

delegate_query_model!(Arc<M>, Box<M>, &M);

/// Concrete, immutable query model
///
/// Built with [`QueryDefinition::builder`] or deserialized from a stored
/// chart definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Identifier of the persisted chart definition, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition_id: Option<String>,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default)]
    join_style: JoinStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root_entity: Option<EntityType>,
    #[serde(default)]
    involved_entities: InvolvedEntities,
    #[serde(default)]
    projections: Vec<ProjectionColumn>,
    #[serde(default)]
    aggregations: Vec<AggregationColumn>,
    #[serde(default)]
    filters: Vec<FilterColumn>,
    #[serde(default)]
    orderings: Vec<OrderingColumn>,
}

impl QueryDefinition {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn definition_id(&self) -> Option<&str> {
        self.definition_id.as_deref()
    }
}

impl QueryModel for QueryDefinition {
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

/// Builder for [`QueryDefinition`]
#[derive(Debug, Default)]
pub struct QueryBuilder {
    definition: QueryDefinition,
}

impl QueryBuilder {
    pub fn definition_id(mut self, id: impl Into<String>) -> Self {
        self.definition.definition_id = Some(id.into());
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.definition.strategy = strategy;
        self
    }

    pub fn join_style(mut self, join_style: JoinStyle) -> Self {
        self.definition.join_style = join_style;
        self
    }

    pub fn root(mut self, entity: impl Into<EntityType>) -> Self {
        self.definition.root_entity = Some(entity.into());
        self
    }

    /// Declares an entity type for a role
    pub fn involve(mut self, role: EntityRole, entity: impl Into<EntityType>) -> Self {
        self.definition
            .involved_entities
            .entry(role)
            .or_default()
            .insert(entity.into());
        self
    }

    pub fn project(mut self, label: impl Into<String>) -> Self {
        self.definition.projections.push(ProjectionColumn::new(label));
        self
    }

    pub fn project_bucketed(mut self, label: impl Into<String>, bucket: Bucket) -> Self {
        self.definition
            .projections
            .push(ProjectionColumn::bucketed(label, bucket));
        self
    }

    pub fn aggregate(mut self, label: impl Into<String>, function: AggregateFn) -> Self {
        self.definition
            .aggregations
            .push(AggregationColumn::new(label, function));
        self
    }

    pub fn filter(mut self, label: impl Into<String>, operation: Operation, values: Vec<Value>) -> Self {
        self.definition
            .filters
            .push(FilterColumn::new(label, operation, values));
        self
    }

    pub fn order(mut self, label: impl Into<String>, direction: Direction) -> Self {
        self.definition
            .orderings
            .push(OrderingColumn::new(label, direction));
        self
    }

    pub fn order_nulls(
        mut self,
        label: impl Into<String>,
        direction: Direction,
        null_handling: NullHandling,
    ) -> Self {
        self.definition
            .orderings
            .push(OrderingColumn::new(label, direction).with_null_handling(null_handling));
        self
    }

    pub fn build(self) -> QueryDefinition {
        self.definition
    }
}
