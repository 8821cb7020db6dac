//! Chart engine facade
//!
//! Wires the catalog, scope resolver, compiler, optional plan cache and a
//! storage backend.
//!
//! # Request flow
//!
//! 1. Resolve the scope (every request, cached plan or not)
//! 2. Compile, or reuse a cached plan for the same model, scope and sort
//! 3. Run the plan on the backend for the requested page
//! 4. Cap the page at the configured maximum size
//!
//! Compile errors are rejections and never reach the backend. Storage
//! errors are passed through unchanged; the engine does not retry.

use std::fs;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{builtin, CatalogError, CatalogLoader, ColumnCatalog};
use crate::config::{ConfigError, EngineConfig};
use crate::executor::{MemoryStore, ResultSet, StorageBackend, StorageError};
use crate::model::{ConfiguredQuery, ModelSnapshot};
use crate::observability::{
    log_event_with_fields, Event, Logger, MetricsRegistry, ObservationScope,
};
use crate::planner::{
    CompileError, CompileErrorKind, CompileResult, ExplainPlan, Plan, PlanCache, PlanFingerprint,
    QueryCompiler,
};
use crate::scope::{
    AclGrants, AclRegistry, EntityDirectory, PermissionOracle, ResolvedScope, ScopeResolver,
};

/// Any failure surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Invalid model: unknown column, wrong role, bad arity, ...
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Compile(e) if e.kind() == CompileErrorKind::Configuration)
    }

    pub fn is_unsupported_shape(&self) -> bool {
        matches!(self, EngineError::Compile(e) if e.is_unsupported_shape())
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }

    /// Backend's own retry classification; false for everything else
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(e) if e.is_retryable())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Compiles and runs configured queries
pub struct ChartEngine {
    catalog: Arc<ColumnCatalog>,
    resolver: ScopeResolver,
    backend: Arc<dyn StorageBackend>,
    cache: Option<PlanCache>,
    metrics: Arc<MetricsRegistry>,
    max_page_size: usize,
}

impl ChartEngine {
    pub fn new(
        catalog: Arc<ColumnCatalog>,
        directory: Arc<dyn EntityDirectory>,
        oracle: Arc<dyn PermissionOracle>,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            catalog,
            resolver: ScopeResolver::new(directory, oracle).with_metrics(Arc::clone(&metrics)),
            backend,
            cache: None,
            metrics,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Enables the plan cache; capacity 0 disables it
    pub fn with_plan_cache(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| PlanCache::new(capacity));
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Builds an engine over an in-memory store from a configuration.
    ///
    /// The store serves as both backend and entity directory; the ACL file,
    /// if any, feeds an [`AclRegistry`] that is returned for later refreshes.
    pub fn from_config(config: &EngineConfig) -> EngineResult<(Self, Arc<AclRegistry>)> {
        Logger::set_min_severity(config.log_level);

        let catalog = match &config.catalog_path {
            Some(path) => CatalogLoader::load(path)?,
            None => builtin::test_management()?,
        };
        let store = match &config.data_path {
            Some(path) => MemoryStore::load(path)?,
            None => MemoryStore::new(),
        };
        let grants = match &config.acl_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str::<AclGrants>(&content).map_err(ConfigError::from)?
            }
            None => AclGrants::new(),
        };

        let store = Arc::new(store);
        let acl = Arc::new(AclRegistry::new(grants));
        let engine = Self::new(
            Arc::new(catalog),
            store.clone(),
            acl.clone(),
            store,
        )
        .with_plan_cache(config.plan_cache_capacity)
        .with_max_page_size(config.max_page_size);
        Ok((engine, acl))
    }

    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn plan_cache(&self) -> Option<&PlanCache> {
        self.cache.as_ref()
    }

    pub fn resolve_scope(&self, query: &ConfiguredQuery) -> ResolvedScope {
        self.resolver.resolve(query.scope(), &query.caller)
    }

    /// Compiles a query without touching the backend
    pub fn prepare(&self, query: &ConfiguredQuery) -> EngineResult<Arc<Plan>> {
        let execution_id = Uuid::new_v4().to_string();
        let scope = self.resolve_scope(query);
        Ok(self.compile(query, &scope, &execution_id)?)
    }

    /// Accepted plan or rejection, rendered for humans
    pub fn explain(&self, query: &ConfiguredQuery) -> ExplainPlan {
        let execution_id = Uuid::new_v4().to_string();
        let scope = self.resolve_scope(query);
        match self.compile(query, &scope, &execution_id) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        }
    }

    /// Compiles and runs a query, returning the requested page
    pub fn execute(&self, query: &ConfiguredQuery) -> EngineResult<ResultSet> {
        let execution_id = Uuid::new_v4().to_string();
        let scope = self.resolve_scope(query);
        let plan = self.compile(query, &scope, &execution_id)?;

        let obs = ObservationScope::with_fields(
            Event::QueryExecute,
            &[
                ("execution_id", execution_id.as_str()),
                ("root", plan.root.as_str()),
            ],
        );
        match plan.attach(self.backend.as_ref()).fetch(query.paging.as_ref()) {
            Ok(mut result) => {
                if query.paging.is_some() {
                    self.cap_page(&mut result);
                }
                self.metrics.increment_queries_executed();
                self.metrics.add_tuples_returned(result.len() as u64);
                let tuples = result.len().to_string();
                obs.complete_with_fields(&[("tuples", tuples.as_str())]);
                Ok(result)
            }
            Err(err) => {
                self.metrics.increment_queries_failed();
                let retryable = err.is_retryable().to_string();
                log_event_with_fields(
                    Event::QueryFailed,
                    &[
                        ("execution_id", execution_id.as_str()),
                        ("code", err.code().code()),
                        ("retryable", retryable.as_str()),
                    ],
                );
                obs.fail(err.code().code(), err.message());
                Err(err.into())
            }
        }
    }

    /// The page offset follows the requested size; only the tuple count is capped
    fn cap_page(&self, result: &mut ResultSet) {
        result.tuples.truncate(self.max_page_size);
    }

    fn compile(
        &self,
        query: &ConfiguredQuery,
        scope: &ResolvedScope,
        execution_id: &str,
    ) -> CompileResult<Arc<Plan>> {
        // Read the model once; the cache key and the plan come from the same view
        let snapshot = ModelSnapshot::capture(query.model.as_ref());
        let fingerprint = self
            .cache
            .as_ref()
            .and_then(|_| PlanFingerprint::compute(&snapshot, scope, query.paging_sort()).ok());

        if let (Some(cache), Some(key)) = (&self.cache, &fingerprint) {
            if let Some(plan) = cache.get(key) {
                self.metrics.increment_plan_cache_hits();
                log_event_with_fields(
                    Event::PlanCacheHit,
                    &[("execution_id", execution_id), ("fingerprint", key.as_str())],
                );
                return Ok(plan);
            }
            self.metrics.increment_plan_cache_misses();
        }

        let obs = ObservationScope::with_fields(Event::QueryPrepare, &[("execution_id", execution_id)]);
        let compiled = QueryCompiler::new(&self.catalog).compile(
            &snapshot,
            scope,
            query.paging_sort(),
        );
        match compiled {
            Ok(plan) => {
                self.metrics.increment_queries_prepared();
                let plan = Arc::new(plan);
                if let (Some(cache), Some(key)) = (&self.cache, fingerprint) {
                    cache.insert(key, Arc::clone(&plan));
                }
                obs.complete_with_fields(&[("root", plan.root.as_str())]);
                Ok(plan)
            }
            Err(err) => {
                self.metrics.increment_queries_rejected();
                log_event_with_fields(
                    Event::QueryRejected,
                    &[
                        ("execution_id", execution_id),
                        ("code", err.code().code()),
                        ("label", err.label().unwrap_or("")),
                    ],
                );
                obs.fail(err.code().code(), err.message());
                Err(err)
            }
        }
    }
}
