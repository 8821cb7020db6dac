//! Built-in test management catalog
//!
//! Entity tree:
//!
//! ```text
//! Requirement ─< RequirementVersion ─< Coverage >─ TestCase ─< TestPlanItem >─ Iteration >─ Campaign
//!                                                                   │
//!                                                                   └─< Execution ─< Issue
//! ```

use super::registry::{CatalogBuilder, ColumnCatalog};
use super::errors::CatalogResult;
use super::types::{ColumnPrototype, ColumnRole, DataKind};

/// Roles for descriptive columns: not meaningful to aggregate
const DESCRIPTIVE: [ColumnRole; 3] = [
    ColumnRole::Projection,
    ColumnRole::Filter,
    ColumnRole::Ordering,
];

fn column(label: &str, entity: &str, attribute: &str, kind: DataKind) -> ColumnPrototype {
    ColumnPrototype::new(label, entity, attribute, kind, ColumnRole::all())
}

fn descriptive(label: &str, entity: &str, attribute: &str, kind: DataKind) -> ColumnPrototype {
    ColumnPrototype::new(label, entity, attribute, kind, DESCRIPTIVE)
}

/// Default domain catalog
pub fn test_management() -> CatalogResult<ColumnCatalog> {
    CatalogBuilder::new()
        .entity("Requirement")
        .entity("RequirementVersion")
        .entity("Coverage")
        .entity("TestCase")
        .entity("Campaign")
        .entity("Iteration")
        .entity("TestPlanItem")
        .entity("Execution")
        .entity("Issue")
        .one_to_many("Requirement", "RequirementVersion", "requirement_id")
        .one_to_many("RequirementVersion", "Coverage", "requirement_version_id")
        .one_to_many("TestCase", "Coverage", "test_case_id")
        .one_to_many("TestCase", "TestPlanItem", "test_case_id")
        .one_to_many("Campaign", "Iteration", "campaign_id")
        .one_to_many("Iteration", "TestPlanItem", "iteration_id")
        .one_to_many("TestPlanItem", "Execution", "item_id")
        .one_to_many("Execution", "Issue", "execution_id")
        // Requirement
        .column(column("REQUIREMENT_ID", "Requirement", "id", DataKind::Id))
        .column(column("REQUIREMENT_PROJECT_ID", "Requirement", "project_id", DataKind::Id))
        .column(column("REQUIREMENT_CRITICALITY", "Requirement", "criticality", DataKind::Enumerated))
        // RequirementVersion
        .column(column("REQUIREMENT_VERSION_ID", "RequirementVersion", "id", DataKind::Id))
        .column(descriptive("REQUIREMENT_VERSION_NAME", "RequirementVersion", "name", DataKind::Text))
        .column(column("REQUIREMENT_VERSION_STATUS", "RequirementVersion", "status", DataKind::Enumerated))
        .column(column("REQUIREMENT_VERSION_MILESTONE_ID", "RequirementVersion", "milestone_id", DataKind::Id))
        .column(column("REQUIREMENT_VERSION_CREATED_ON", "RequirementVersion", "created_on", DataKind::Date))
        // Coverage
        .column(column("COVERAGE_ID", "Coverage", "id", DataKind::Id))
        // TestCase
        .column(column("TEST_CASE_ID", "TestCase", "id", DataKind::Id))
        .column(descriptive("TEST_CASE_NAME", "TestCase", "name", DataKind::Text))
        .column(column("TEST_CASE_IMPORTANCE", "TestCase", "importance", DataKind::Enumerated))
        .column(column("TEST_CASE_STATUS", "TestCase", "status", DataKind::Enumerated))
        .column(column("TEST_CASE_PROJECT_ID", "TestCase", "project_id", DataKind::Id))
        .column(column("TEST_CASE_MILESTONE_ID", "TestCase", "milestone_id", DataKind::Id))
        .column(column("TEST_CASE_CREATED_ON", "TestCase", "created_on", DataKind::Date))
        // Campaign
        .column(column("CAMPAIGN_ID", "Campaign", "id", DataKind::Id))
        .column(descriptive("CAMPAIGN_NAME", "Campaign", "name", DataKind::Text))
        .column(column("CAMPAIGN_PROJECT_ID", "Campaign", "project_id", DataKind::Id))
        .column(column("CAMPAIGN_MILESTONE_ID", "Campaign", "milestone_id", DataKind::Id))
        .column(column("CAMPAIGN_SCHEDULED_START", "Campaign", "scheduled_start", DataKind::Date))
        // Iteration
        .column(column("ITERATION_ID", "Iteration", "id", DataKind::Id))
        .column(descriptive("ITERATION_NAME", "Iteration", "name", DataKind::Text))
        // TestPlanItem
        .column(column("ITEM_ID", "TestPlanItem", "id", DataKind::Id))
        .column(column("ITEM_STATUS", "TestPlanItem", "status", DataKind::Enumerated))
        // Execution
        .column(column("EXECUTION_ID", "Execution", "id", DataKind::Id))
        .column(column("EXECUTION_STATUS", "Execution", "status", DataKind::Enumerated))
        .column(column("EXECUTION_LAST_EXECUTED_ON", "Execution", "last_executed_on", DataKind::Date))
        .column(column("EXECUTION_DURATION", "Execution", "duration", DataKind::Numeric))
        .column(column("EXECUTION_SUCCESSFUL", "Execution", "successful", DataKind::Boolean))
        // Issue
        .column(column("ISSUE_ID", "Issue", "id", DataKind::Id))
        .column(descriptive("ISSUE_REMOTE_KEY", "Issue", "remote_key", DataKind::Text))
        .build()
}
