//! Scope-aware query model decorators
//!
//! A decorator wraps a query model and injects one mandatory filter
//! (milestone equality, project membership) without touching the wrapped
//! model. Decorators nest: each layer contributes its own filter at read
//! time. An unmapped workspace or an empty project list adds nothing and
//! is not an error.

mod rules;
mod scoping;

pub use rules::{MilestoneDecorator, MilestoneRule, ProjectDecorator, ProjectRule};
pub use scoping::{ScopeDecorator, ScopingRule, WorkspaceKind};
