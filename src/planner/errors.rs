//! Compile error types
//!
//! Error codes:
//! - CHART_COLUMN_UNKNOWN (REJECT)
//! - CHART_COLUMN_ROLE (REJECT)
//! - CHART_ENTITY_NOT_INVOLVED (REJECT)
//! - CHART_FILTER_ARITY (REJECT)
//! - CHART_OPERATION_INVALID (REJECT)
//! - CHART_AGGREGATE_INVALID (REJECT)
//! - CHART_BUCKET_INVALID (REJECT)
//! - CHART_ORDERING_INVALID (REJECT)
//! - CHART_SORT_PROPERTY_UNKNOWN (REJECT)
//! - CHART_QUERY_EMPTY (REJECT)
//! - CHART_SHAPE_UNSUPPORTED (REJECT)
//!
//! All compile errors are detected before any storage access and are never
//! retried.

use std::fmt;

use crate::catalog::{ColumnRole, DataKind, EntityType};
use crate::model::{AggregateFn, Operation};

/// Severity levels for compile errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// What kind of mistake the caller made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The model references columns or combinations the catalog forbids
    Configuration,
    /// The model is valid but cannot be expressed as a single plan
    UnsupportedShape,
}

/// Compile error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorCode {
    /// Label not found in the catalog
    ColumnUnknown,
    /// Column not allowed in the role it is used in
    ColumnRole,
    /// Column's entity not declared for the role
    EntityNotInvolved,
    /// Wrong number of filter values
    FilterArity,
    /// Filter operation incompatible with the column kind
    OperationInvalid,
    /// Aggregate incompatible with the column kind
    AggregateInvalid,
    /// Date bucket on a non-date column
    BucketInvalid,
    /// Ordering column names no output column
    OrderingInvalid,
    /// Paging sort property names no output column
    SortPropertyUnknown,
    /// Neither projections nor aggregations
    QueryEmpty,
    /// Combination cannot be expressed as one plan
    ShapeUnsupported,
}

impl CompileErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorCode::ColumnUnknown => "CHART_COLUMN_UNKNOWN",
            CompileErrorCode::ColumnRole => "CHART_COLUMN_ROLE",
            CompileErrorCode::EntityNotInvolved => "CHART_ENTITY_NOT_INVOLVED",
            CompileErrorCode::FilterArity => "CHART_FILTER_ARITY",
            CompileErrorCode::OperationInvalid => "CHART_OPERATION_INVALID",
            CompileErrorCode::AggregateInvalid => "CHART_AGGREGATE_INVALID",
            CompileErrorCode::BucketInvalid => "CHART_BUCKET_INVALID",
            CompileErrorCode::OrderingInvalid => "CHART_ORDERING_INVALID",
            CompileErrorCode::SortPropertyUnknown => "CHART_SORT_PROPERTY_UNKNOWN",
            CompileErrorCode::QueryEmpty => "CHART_QUERY_EMPTY",
            CompileErrorCode::ShapeUnsupported => "CHART_SHAPE_UNSUPPORTED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }

    pub fn kind(&self) -> CompileErrorKind {
        match self {
            CompileErrorCode::ShapeUnsupported => CompileErrorKind::UnsupportedShape,
            _ => CompileErrorKind::Configuration,
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Compile error with the offending column, role and entity
#[derive(Debug, Clone)]
pub struct CompileError {
    code: CompileErrorCode,
    message: String,
    label: Option<String>,
    role: Option<ColumnRole>,
    entity: Option<EntityType>,
}

impl CompileError {
    fn new(code: CompileErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            label: None,
            role: None,
            entity: None,
        }
    }

    fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = Some(role);
        self
    }

    fn with_entity(mut self, entity: EntityType) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn column_unknown(label: &str, role: ColumnRole) -> Self {
        Self::new(
            CompileErrorCode::ColumnUnknown,
            format!("Column '{}' used as {} is not in the catalog", label, role),
        )
        .with_label(label)
        .with_role(role)
    }

    pub fn column_role(label: &str, role: ColumnRole, entity: &EntityType) -> Self {
        Self::new(
            CompileErrorCode::ColumnRole,
            format!("Column '{}' of {} cannot be used as {}", label, entity, role),
        )
        .with_label(label)
        .with_role(role)
        .with_entity(entity.clone())
    }

    pub fn entity_not_involved(label: &str, role: ColumnRole, entity: &EntityType) -> Self {
        Self::new(
            CompileErrorCode::EntityNotInvolved,
            format!(
                "Column '{}' used as {} belongs to {}, which the query does not involve for that role",
                label, role, entity
            ),
        )
        .with_label(label)
        .with_role(role)
        .with_entity(entity.clone())
    }

    pub fn filter_arity(label: &str, operation: &Operation, got: usize) -> Self {
        Self::new(
            CompileErrorCode::FilterArity,
            format!(
                "Filter '{}' with {} takes {} value(s), got {}",
                label,
                operation,
                operation.expected_arity(),
                got
            ),
        )
        .with_label(label)
        .with_role(ColumnRole::Filter)
    }

    pub fn operation_invalid(label: &str, operation: &Operation, kind: DataKind) -> Self {
        Self::new(
            CompileErrorCode::OperationInvalid,
            format!(
                "Filter '{}' cannot apply {} to a {} column",
                label,
                operation,
                kind.as_str()
            ),
        )
        .with_label(label)
        .with_role(ColumnRole::Filter)
    }

    pub fn aggregate_invalid(label: &str, function: AggregateFn, kind: DataKind) -> Self {
        Self::new(
            CompileErrorCode::AggregateInvalid,
            format!(
                "Aggregation '{}' cannot apply {} to a {} column",
                label,
                function,
                kind.as_str()
            ),
        )
        .with_label(label)
        .with_role(ColumnRole::Aggregation)
    }

    pub fn bucket_invalid(label: &str, kind: DataKind) -> Self {
        Self::new(
            CompileErrorCode::BucketInvalid,
            format!(
                "Projection '{}' is a {} column and cannot be bucketed by date",
                label,
                kind.as_str()
            ),
        )
        .with_label(label)
        .with_role(ColumnRole::Projection)
    }

    pub fn ordering_invalid(label: &str) -> Self {
        Self::new(
            CompileErrorCode::OrderingInvalid,
            format!("Ordering column '{}' is neither projected nor aggregated", label),
        )
        .with_label(label)
        .with_role(ColumnRole::Ordering)
    }

    pub fn sort_property_unknown(property: &str) -> Self {
        Self::new(
            CompileErrorCode::SortPropertyUnknown,
            format!("Sort property '{}' names no output column", property),
        )
        .with_label(property)
        .with_role(ColumnRole::Ordering)
    }

    pub fn query_empty() -> Self {
        Self::new(
            CompileErrorCode::QueryEmpty,
            "Query has neither projection nor aggregation columns".into(),
        )
    }

    pub fn unsupported_shape(reason: impl Into<String>) -> Self {
        Self::new(CompileErrorCode::ShapeUnsupported, reason.into())
    }

    /// Unsupported shape blamed on one column
    pub fn unsupported_column(
        reason: impl Into<String>,
        label: &str,
        role: ColumnRole,
        entity: &EntityType,
    ) -> Self {
        Self::unsupported_shape(reason)
            .with_label(label)
            .with_role(role)
            .with_entity(entity.clone())
    }

    pub fn code(&self) -> CompileErrorCode {
        self.code
    }

    pub fn kind(&self) -> CompileErrorKind {
        self.code.kind()
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Offending column label, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn role(&self) -> Option<ColumnRole> {
        self.role
    }

    pub fn entity(&self) -> Option<&EntityType> {
        self.entity.as_ref()
    }

    pub fn is_unsupported_shape(&self) -> bool {
        self.kind() == CompileErrorKind::UnsupportedShape
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CompileErrorCode::ColumnUnknown.code(), "CHART_COLUMN_UNKNOWN");
        assert_eq!(CompileErrorCode::QueryEmpty.code(), "CHART_QUERY_EMPTY");
        assert_eq!(CompileErrorCode::ShapeUnsupported.code(), "CHART_SHAPE_UNSUPPORTED");
    }

    #[test]
    fn test_kind_split() {
        assert_eq!(
            CompileErrorCode::FilterArity.kind(),
            CompileErrorKind::Configuration
        );
        assert!(CompileError::unsupported_shape("nope").is_unsupported_shape());
    }

    #[test]
    fn test_context_carried() {
        let err = CompileError::entity_not_involved(
            "EXECUTION_ID",
            ColumnRole::Aggregation,
            &"Execution".into(),
        );
        assert_eq!(err.label(), Some("EXECUTION_ID"));
        assert_eq!(err.role(), Some(ColumnRole::Aggregation));
        assert_eq!(err.entity().map(|e| e.as_str()), Some("Execution"));
    }

    #[test]
    fn test_error_display() {
        let err = CompileError::filter_arity("CAMPAIGN_ID", &Operation::Between, 1);
        let display = format!("{}", err);
        assert!(display.contains("[REJECT] CHART_FILTER_ARITY"));
        assert!(display.contains("exactly 2"));
    }
}
