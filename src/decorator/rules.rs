//! Milestone and project scoping rules

use serde_json::Value;

use super::scoping::{ScopeDecorator, ScopingRule, WorkspaceKind};
use crate::catalog::EntityId;
use crate::model::Operation;

/// Restricts a query to one milestone
pub struct MilestoneRule;

impl ScopingRule for MilestoneRule {
    type Value = EntityId;

    fn column_label(workspace: WorkspaceKind) -> Option<&'static str> {
        match workspace {
            WorkspaceKind::Requirement => Some("REQUIREMENT_VERSION_MILESTONE_ID"),
            WorkspaceKind::TestCase => Some("TEST_CASE_MILESTONE_ID"),
            WorkspaceKind::Campaign => Some("CAMPAIGN_MILESTONE_ID"),
            _ => None,
        }
    }

    fn operation() -> Operation {
        Operation::Equals
    }

    fn values(milestone_id: &EntityId) -> Vec<Value> {
        vec![Value::from(*milestone_id)]
    }
}

/// Restricts a query to a set of projects
pub struct ProjectRule;

impl ScopingRule for ProjectRule {
    type Value = Vec<EntityId>;

    fn column_label(workspace: WorkspaceKind) -> Option<&'static str> {
        match workspace {
            WorkspaceKind::Requirement => Some("REQUIREMENT_PROJECT_ID"),
            WorkspaceKind::TestCase => Some("TEST_CASE_PROJECT_ID"),
            WorkspaceKind::Campaign => Some("CAMPAIGN_PROJECT_ID"),
            _ => None,
        }
    }

    fn operation() -> Operation {
        Operation::In
    }

    fn values(project_ids: &Vec<EntityId>) -> Vec<Value> {
        project_ids.iter().map(|id| Value::from(*id)).collect()
    }
}

/// Adds `milestone = <id>` on the workspace's milestone column
pub type MilestoneDecorator<M> = ScopeDecorator<M, MilestoneRule>;

/// Adds `project IN (<ids>)` on the workspace's project column
pub type ProjectDecorator<M> = ScopeDecorator<M, ProjectRule>;
