//! Shared fixtures for integration tests
//!
//! A small test management dataset over the built-in catalog:
//!
//! - TestCase 1 `login`: 3 coverages, 2 plan items
//! - TestCase 2 `logout`: nothing attached
//! - TestCase 3 `search`: 1 coverage, 1 plan item
//! - TestCase 4 `export`: nothing attached, null status
//! - Campaign 1 `alpha` / Iteration 1: items 1 and 3, executions 1-3, issue 1
//! - Campaign 2 `beta` / Iteration 2: item 2, no executions
//! - Folder 1 holds TestCase 1, TestCase 2 and Folder 2; Folder 2 holds
//!   TestCase 3 and Folder 1 again

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use chartquery::catalog::{builtin, ColumnCatalog};
use chartquery::engine::ChartEngine;
use chartquery::executor::{MemoryStore, StorageBackend};
use chartquery::scope::{AclGrants, AclRegistry, EntityReference, PermissionOracle};

pub fn catalog() -> Arc<ColumnCatalog> {
    Arc::new(builtin::test_management().expect("builtin catalog"))
}

fn insert_all(store: &mut MemoryStore, entity: &str, rows: Vec<Value>) {
    for row in rows {
        store.insert(entity, row).expect("fixture row");
    }
}

pub fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    insert_all(
        &mut store,
        "Requirement",
        vec![json!({"id": 1, "project_id": 1, "criticality": "MAJOR"})],
    );
    insert_all(
        &mut store,
        "RequirementVersion",
        vec![
            json!({"id": 1, "requirement_id": 1, "name": "v1", "status": "APPROVED", "milestone_id": 10}),
            json!({"id": 2, "requirement_id": 1, "name": "v2", "status": "WORK_IN_PROGRESS"}),
        ],
    );
    insert_all(
        &mut store,
        "TestCase",
        vec![
            json!({"id": 1, "name": "login", "status": "APPROVED", "importance": "HIGH",
                   "project_id": 1, "milestone_id": 10, "created_on": "2024-01-15"}),
            json!({"id": 2, "name": "logout", "status": "UNDER_REVIEW", "importance": "LOW",
                   "project_id": 1, "milestone_id": null, "created_on": "2024-02-03"}),
            json!({"id": 3, "name": "search", "status": "APPROVED", "importance": "MEDIUM",
                   "project_id": 2, "milestone_id": 10, "created_on": "2024-02-20"}),
            json!({"id": 4, "name": "export", "status": null, "importance": "LOW",
                   "project_id": 2, "created_on": "2024-03-01"}),
        ],
    );
    insert_all(
        &mut store,
        "Coverage",
        vec![
            json!({"id": 1, "test_case_id": 1, "requirement_version_id": 1}),
            json!({"id": 2, "test_case_id": 1, "requirement_version_id": 1}),
            json!({"id": 3, "test_case_id": 1, "requirement_version_id": 2}),
            json!({"id": 4, "test_case_id": 3, "requirement_version_id": 2}),
        ],
    );
    insert_all(
        &mut store,
        "Campaign",
        vec![
            json!({"id": 1, "name": "alpha", "project_id": 1, "milestone_id": 10,
                   "scheduled_start": "2024-03-01"}),
            json!({"id": 2, "name": "beta", "project_id": 2, "milestone_id": 11}),
        ],
    );
    insert_all(
        &mut store,
        "Iteration",
        vec![
            json!({"id": 1, "campaign_id": 1, "name": "sprint 1"}),
            json!({"id": 2, "campaign_id": 2, "name": "sprint 2"}),
        ],
    );
    insert_all(
        &mut store,
        "TestPlanItem",
        vec![
            json!({"id": 1, "test_case_id": 1, "iteration_id": 1, "status": "DONE"}),
            json!({"id": 2, "test_case_id": 1, "iteration_id": 2, "status": "READY"}),
            json!({"id": 3, "test_case_id": 3, "iteration_id": 1, "status": "DONE"}),
        ],
    );
    insert_all(
        &mut store,
        "Execution",
        vec![
            json!({"id": 1, "item_id": 1, "status": "SUCCESS", "duration": 10, "successful": true,
                   "last_executed_on": "2024-03-02T10:00:00Z"}),
            json!({"id": 2, "item_id": 1, "status": "FAILURE", "duration": 20, "successful": false,
                   "last_executed_on": "2024-03-05"}),
            json!({"id": 3, "item_id": 3, "status": "SUCCESS", "duration": 5, "successful": true,
                   "last_executed_on": "2024-04-01"}),
        ],
    );
    insert_all(
        &mut store,
        "Issue",
        vec![json!({"id": 1, "execution_id": 2, "remote_key": "BUG-1"})],
    );

    store.add_container(
        EntityReference::new("Folder", 1),
        vec![
            EntityReference::new("TestCase", 1),
            EntityReference::new("TestCase", 2),
            EntityReference::new("Folder", 2),
        ],
    );
    store.add_container(
        EntityReference::new("Folder", 2),
        vec![
            EntityReference::new("TestCase", 3),
            EntityReference::new("Folder", 1),
        ],
    );
    store
}

/// Engine over the fixture store, with no grants at all
pub fn engine() -> ChartEngine {
    engine_with_oracle(Arc::new(AclRegistry::new(AclGrants::new())))
}

pub fn engine_with_oracle(oracle: Arc<dyn PermissionOracle>) -> ChartEngine {
    let store = Arc::new(store());
    ChartEngine::new(catalog(), store.clone(), oracle, store)
}

pub fn engine_with_backend(backend: Arc<dyn StorageBackend>) -> ChartEngine {
    ChartEngine::new(
        catalog(),
        Arc::new(store()),
        Arc::new(AclRegistry::new(AclGrants::new())),
        backend,
    )
}
