//! Storage backend seam
//!
//! A plan is detached from any backend. Binding happens at execution time,
//! so one plan can run against several backends.

use std::sync::Arc;

use super::errors::StorageResult;
use super::result::ResultSet;
use crate::model::Paging;
use crate::planner::Plan;

/// Read-only relational store able to run compiled plans
pub trait StorageBackend: Send + Sync {
    /// Runs `plan`, returning the requested page of its ordered tuples
    fn run(&self, plan: &Plan, paging: Option<&Paging>) -> StorageResult<ResultSet>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn run(&self, plan: &Plan, paging: Option<&Paging>) -> StorageResult<ResultSet> {
        (**self).run(plan, paging)
    }
}

/// A plan bound to one backend
pub struct BoundPlan<'a> {
    plan: &'a Plan,
    backend: &'a dyn StorageBackend,
}

impl<'a> BoundPlan<'a> {
    pub fn plan(&self) -> &Plan {
        self.plan
    }

    pub fn fetch(&self, paging: Option<&Paging>) -> StorageResult<ResultSet> {
        self.backend.run(self.plan, paging)
    }
}

impl Plan {
    /// Binds this plan to a backend for execution
    pub fn attach<'a>(&'a self, backend: &'a dyn StorageBackend) -> BoundPlan<'a> {
        BoundPlan {
            plan: self,
            backend,
        }
    }
}
