//! Query compiler
//!
//! Compiles a configured query model into a detached relational plan.
//!
//! # Pipeline
//!
//! 1. Validate every column against the catalog
//! 2. Choose the root entity
//! 3. Partition aggregates by fan-out key
//! 4. Build joins, predicates, semi-joins and the scope filter
//! 5. Resolve ordering against the output columns
//!
//! Compilation is pure: same model, scope and sort give an equal plan.

mod cache;
mod compiler;
mod errors;
mod explain;
mod fanout;
mod plan;
mod validate;

pub use cache::{PlanCache, PlanFingerprint};
pub use compiler::QueryCompiler;
pub use errors::{CompileError, CompileErrorCode, CompileErrorKind, CompileResult, Severity};
pub use explain::ExplainPlan;
pub use plan::{
    ColumnRef, GroupKey, JoinKind, OutputColumn, OutputKind, Plan, PlanAggregate, PlanJoin,
    Predicate, ScopeBranch, ScopeFilter, SemiJoin, SubExpression,
};
pub use validate::{validate, Resolved, ValidatedModel};
