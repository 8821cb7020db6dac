//! Query model
//!
//! Declarative description of one analytical query: which columns to
//! project, aggregate, filter and order by, the entity types involved per
//! role, the join style and the plan strategy.

mod columns;
mod configured;
mod query;
mod snapshot;

pub use columns::{
    AggregateFn, AggregationColumn, Bucket, EntityRole, FilterColumn, JoinStyle, Operation,
    OrderingColumn, ProjectionColumn, Strategy,
};
pub use configured::{ConfiguredQuery, Paging};
pub use query::{InvolvedEntities, QueryBuilder, QueryDefinition, QueryModel};
pub use snapshot::ModelSnapshot;
