//! Query Semantics Tests
//!
//! Tests for filters, decorators, ordering and paging through the engine:
//! - Empty filters are neutral
//! - Decorators add their filter without touching the wrapped model
//! - Null handling in orderings
//! - Paging boundaries yield empty pages, not errors

mod fixtures;

use std::sync::Arc;

use serde_json::{json, Value};

use chartquery::decorator::{MilestoneDecorator, ProjectDecorator, WorkspaceKind};
use chartquery::executor::{MemoryStore, StorageErrorCode};
use chartquery::engine::EngineError;
use chartquery::model::{
    AggregateFn, ConfiguredQuery, EntityRole, Operation, Paging, QueryBuilder, QueryDefinition,
    QueryModel,
};
use chartquery::sort::{Direction, NullHandling, Sort, SortOrder};

// =============================================================================
// Helper Functions
// =============================================================================

fn test_cases() -> QueryBuilder {
    QueryDefinition::builder()
        .involve(EntityRole::Axis, "TestCase")
        .involve(EntityRole::Filter, "TestCase")
        .project("TEST_CASE_NAME")
}

fn run(model: impl QueryModel + 'static) -> Vec<Vec<Value>> {
    fixtures::engine()
        .execute(&ConfiguredQuery::new(model))
        .expect("query runs")
        .tuples
}

fn first_column(tuples: Vec<Vec<Value>>) -> Vec<Value> {
    tuples.into_iter().map(|t| t[0].clone()).collect()
}

fn names(model: impl QueryModel + 'static) -> Vec<Value> {
    first_column(run(model))
}

// =============================================================================
// Filters
// =============================================================================

/// A filter with no values behaves as if it were absent.
#[test]
fn test_empty_filter_neutrality() {
    let plain = run(test_cases().order("TEST_CASE_NAME", Direction::Asc).build());
    let filtered = run(
        test_cases()
            .filter("TEST_CASE_STATUS", Operation::In, Vec::new())
            .filter("TEST_CASE_IMPORTANCE", Operation::Equals, Vec::new())
            .order("TEST_CASE_NAME", Direction::Asc)
            .build(),
    );
    assert_eq!(plain, filtered);
    assert_eq!(plain.len(), 4);
}

#[test]
fn test_like_filter() {
    let model = test_cases()
        .filter("TEST_CASE_NAME", Operation::Like, vec![json!("log%")])
        .order("TEST_CASE_NAME", Direction::Asc)
        .build();
    assert_eq!(names(model), vec![json!("login"), json!("logout")]);
}

/// Nulls never match, not even NOT_EQUALS.
#[test]
fn test_not_equals_skips_nulls() {
    let model = test_cases()
        .filter("TEST_CASE_STATUS", Operation::NotEquals, vec![json!("APPROVED")])
        .build();
    assert_eq!(names(model), vec![json!("logout")]);
}

#[test]
fn test_between_filter() {
    let model = QueryDefinition::builder()
        .involve(EntityRole::Measure, "Execution")
        .involve(EntityRole::Filter, "Execution")
        .aggregate("EXECUTION_ID", AggregateFn::Count)
        .filter(
            "EXECUTION_DURATION",
            Operation::Between,
            vec![json!(5), json!(10)],
        )
        .build();
    assert_eq!(run(model), vec![vec![json!(2)]]);
}

#[test]
fn test_special_operation_passes_through() {
    let model = test_cases()
        .filter(
            "TEST_CASE_NAME",
            Operation::Special("MATCHES".into()),
            vec![json!("^s")],
        )
        .build();
    assert_eq!(names(model), vec![json!("search")]);
}

#[test]
fn test_unknown_special_operation_is_storage_error() {
    let model = test_cases()
        .filter(
            "TEST_CASE_NAME",
            Operation::Special("SOUNDS_LIKE".into()),
            vec![json!("lodgin")],
        )
        .build();
    let err = fixtures::engine()
        .execute(&ConfiguredQuery::new(model))
        .unwrap_err();
    assert!(!err.is_retryable());
    match err {
        EngineError::Storage(inner) => {
            assert_eq!(inner.code(), StorageErrorCode::UnsupportedOperation)
        }
        other => panic!("expected storage error, got {}", other),
    }
}

/// A filter on a fanned-out entity keeps roots having a matching child and
/// restricts the aggregate over that branch.
#[test]
fn test_fanned_filter_restricts_roots_and_aggregates() {
    let model = QueryDefinition::builder()
        .involve(EntityRole::Axis, "TestCase")
        .involve(EntityRole::Measure, "Execution")
        .involve(EntityRole::Filter, "Execution")
        .project("TEST_CASE_NAME")
        .aggregate("EXECUTION_ID", AggregateFn::Count)
        .filter("EXECUTION_STATUS", Operation::Equals, vec![json!("FAILURE")])
        .build();
    assert_eq!(run(model), vec![vec![json!("login"), json!(1)]]);
}

// =============================================================================
// Decorators
// =============================================================================

#[test]
fn test_milestone_decorator() {
    let model = test_cases().order("TEST_CASE_NAME", Direction::Asc).build();
    let decorated =
        MilestoneDecorator::new(model, fixtures::catalog(), 10, WorkspaceKind::TestCase);
    assert_eq!(names(decorated), vec![json!("login"), json!("search")]);
}

#[test]
fn test_nested_decorators() {
    let catalog = fixtures::catalog();
    let model = test_cases().order("TEST_CASE_NAME", Direction::Asc).build();
    let milestone = MilestoneDecorator::new(model, catalog.clone(), 10, WorkspaceKind::TestCase);
    let project = ProjectDecorator::new(milestone, catalog, vec![2], WorkspaceKind::TestCase);
    assert_eq!(names(project), vec![json!("search")]);
}

#[test]
fn test_unmapped_workspace_changes_nothing() {
    let model = test_cases().order("TEST_CASE_NAME", Direction::Asc).build();
    let plain = run(model.clone());
    let decorated =
        MilestoneDecorator::new(model, fixtures::catalog(), 10, WorkspaceKind::Home);
    assert_eq!(run(decorated), plain);
}

// =============================================================================
// Ordering
// =============================================================================

fn with_status(nulls: NullHandling, direction: Direction) -> Vec<Value> {
    let model = test_cases()
        .project("TEST_CASE_STATUS")
        .order_nulls("TEST_CASE_STATUS", direction, nulls)
        .order("TEST_CASE_NAME", Direction::Asc)
        .build();
    run(model).into_iter().map(|t| t[1].clone()).collect()
}

#[test]
fn test_nulls_first_ascending() {
    let statuses = with_status(NullHandling::NullsFirst, Direction::Asc);
    assert_eq!(
        statuses,
        vec![Value::Null, json!("APPROVED"), json!("APPROVED"), json!("UNDER_REVIEW")]
    );
}

#[test]
fn test_nulls_last_ascending() {
    let statuses = with_status(NullHandling::NullsLast, Direction::Asc);
    assert_eq!(statuses.last(), Some(&Value::Null));
}

#[test]
fn test_native_nulls_are_smallest() {
    assert_eq!(with_status(NullHandling::Native, Direction::Asc)[0], Value::Null);
    assert_eq!(
        with_status(NullHandling::Native, Direction::Desc).last(),
        Some(&Value::Null)
    );
}

/// Names mixing numbers, numeric strings and text still sort: numbers
/// first in numeric order, then strings in lexicographic order.
#[test]
fn test_sort_mixed_value_types() {
    let mut store = MemoryStore::new();
    for i in 0..300 {
        let name = match i % 3 {
            0 => json!(i),
            1 => json!(i.to_string()),
            _ => json!(format!("x{}", i)),
        };
        store
            .insert("TestCase", json!({"id": i + 1, "name": name}))
            .unwrap();
    }
    let engine = fixtures::engine_with_backend(Arc::new(store));
    let model = QueryDefinition::builder()
        .involve(EntityRole::Axis, "TestCase")
        .project("TEST_CASE_NAME")
        .order("TEST_CASE_NAME", Direction::Asc)
        .build();

    let names = first_column(engine.execute(&ConfiguredQuery::new(model)).unwrap().tuples);
    assert_eq!(names.len(), 300);

    let numbers: Vec<u64> = names.iter().filter_map(Value::as_u64).collect();
    assert_eq!(numbers.len(), 100);
    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    assert!(names[..100].iter().all(Value::is_number));

    let strings: Vec<&str> = names[100..].iter().filter_map(Value::as_str).collect();
    assert_eq!(strings.len(), 200);
    assert!(strings.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_paging_sort_follows_model_ordering() {
    let model = test_cases().build();
    let paging = Paging::new(0, 10).with_sort(Sort::by(SortOrder::new(
        "TEST_CASE_NAME",
        Direction::Desc,
    )));
    let result = fixtures::engine()
        .execute(&ConfiguredQuery::new(model).with_paging(paging))
        .unwrap();
    assert_eq!(
        first_column(result.tuples),
        vec![json!("search"), json!("logout"), json!("login"), json!("export")]
    );
}

#[test]
fn test_unknown_paging_sort_property_rejected() {
    let paging = Paging::new(0, 10).with_sort(Sort::by(SortOrder::new("nope", Direction::Asc)));
    let err = fixtures::engine()
        .execute(&ConfiguredQuery::new(test_cases().build()).with_paging(paging))
        .unwrap_err();
    assert!(err.is_configuration());
}

// =============================================================================
// Paging
// =============================================================================

fn page(page: usize, size: usize) -> Vec<Value> {
    let query = ConfiguredQuery::new(test_cases().order("TEST_CASE_NAME", Direction::Asc).build())
        .with_paging(Paging::new(page, size));
    first_column(fixtures::engine().execute(&query).unwrap().tuples)
}

#[test]
fn test_paging_boundaries() {
    assert!(page(0, 0).is_empty());
    assert!(page(2, 2).is_empty());
    assert!(page(usize::MAX, 3).is_empty());
    assert_eq!(page(1, 3), vec![json!("search")]);
    assert_eq!(page(0, 2), vec![json!("export"), json!("login")]);
}

/// A page larger than the engine maximum keeps its offset and is cut short.
#[test]
fn test_capped_page_keeps_offset() {
    let engine = fixtures::engine().with_max_page_size(2);
    let page = |page: usize, size: usize| {
        let query = ConfiguredQuery::new(test_cases().order("TEST_CASE_NAME", Direction::Asc).build())
            .with_paging(Paging::new(page, size));
        first_column(engine.execute(&query).unwrap().tuples)
    };
    assert_eq!(page(1, 3), vec![json!("search")]);
    assert_eq!(page(0, 3), vec![json!("export"), json!("login")]);
}
