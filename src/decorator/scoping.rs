//! Generic scope decorator
//!
//! Wraps a query model and appends one mandatory filter, chosen by a
//! scoping rule from the workspace the query runs in.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{ColumnCatalog, EntityType};
use crate::model::{
    AggregationColumn, EntityRole, FilterColumn, InvolvedEntities, JoinStyle, Operation,
    OrderingColumn, ProjectionColumn, QueryModel, Strategy,
};
use crate::observability::{log_event_with_fields, Event};

/// Workspace a chart or report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    Requirement,
    TestCase,
    Campaign,
    CustomReport,
    Home,
    Automation,
}

/// Which column a decorator filters on, and how
pub trait ScopingRule {
    /// Scoping value supplied at construction
    type Value: Clone + Send + Sync;

    /// Catalog label filtered in a workspace; `None` for unmapped workspaces
    fn column_label(workspace: WorkspaceKind) -> Option<&'static str>;

    fn operation() -> Operation;

    fn values(value: &Self::Value) -> Vec<Value>;
}

/// Query model wrapper adding one synthesized filter column
///
/// Delegates every accessor to the wrapped model except `filter_columns`
/// and `involved_entities`, which are recomputed on every call.
pub struct ScopeDecorator<M, R: ScopingRule> {
    base: M,
    catalog: Arc<ColumnCatalog>,
    value: R::Value,
    workspace: WorkspaceKind,
    rule: PhantomData<fn() -> R>,
}

impl<M: QueryModel, R: ScopingRule> ScopeDecorator<M, R> {
    /// Wraps `base`. A scoping value that yields no filter values (an empty
    /// project list) adds no filter: the decorated model reads exactly like
    /// the base one. This is logged as `SCOPING_FILTER_SKIPPED`.
    pub fn new(base: M, catalog: Arc<ColumnCatalog>, value: R::Value, workspace: WorkspaceKind) -> Self {
        if R::values(&value).is_empty() {
            if let Some(label) = R::column_label(workspace) {
                log_event_with_fields(Event::ScopingFilterSkipped, &[("label", label)]);
            }
        }
        Self {
            base,
            catalog,
            value,
            workspace,
            rule: PhantomData,
        }
    }

    pub fn base(&self) -> &M {
        &self.base
    }

    pub fn workspace(&self) -> WorkspaceKind {
        self.workspace
    }

    /// The filter this decorator contributes and the entity it filters
    fn synthesized(&self) -> Option<(FilterColumn, EntityType)> {
        let label = R::column_label(self.workspace)?;
        let prototype = self.catalog.find_by_label(label).ok()?;
        let values = R::values(&self.value);
        if values.is_empty() {
            return None;
        }
        Some((
            FilterColumn::new(label, R::operation(), values),
            prototype.entity.clone(),
        ))
    }
}

impl<M: QueryModel, R: ScopingRule> QueryModel for ScopeDecorator<M, R> {
    fn strategy(&self) -> Strategy {
        self.base.strategy()
    }

    fn join_style(&self) -> JoinStyle {
        self.base.join_style()
    }

    fn root_entity(&self) -> Option<EntityType> {
        self.base.root_entity()
    }

    fn involved_entities(&self) -> InvolvedEntities {
        let mut involved = self.base.involved_entities();
        if let Some((_, entity)) = self.synthesized() {
            involved.entry(EntityRole::Filter).or_default().insert(entity);
        }
        involved
    }

    fn projection_columns(&self) -> Vec<ProjectionColumn> {
        self.base.projection_columns()
    }

    fn aggregation_columns(&self) -> Vec<AggregationColumn> {
        self.base.aggregation_columns()
    }

    fn filter_columns(&self) -> Vec<FilterColumn> {
        let mut filters = self.base.filter_columns();
        if let Some((filter, _)) = self.synthesized() {
            filters.push(filter);
        }
        filters
    }

    fn ordering_columns(&self) -> Vec<OrderingColumn> {
        self.base.ordering_columns()
    }
}
