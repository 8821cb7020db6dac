//! Catalog error types
//!
//! Error codes:
//! - CHART_CATALOG_DUPLICATE_LABEL (FATAL)
//! - CHART_CATALOG_DUPLICATE_ENTITY (FATAL)
//! - CHART_CATALOG_UNKNOWN_ENTITY (FATAL)
//! - CHART_CATALOG_RELATION_CYCLE (FATAL)
//! - CHART_CATALOG_MALFORMED (FATAL)
//! - CHART_CATALOG_COLUMN_NOT_FOUND (REJECT)

use std::fmt;

/// Severity levels for catalog errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Lookup rejected, catalog intact
    Reject,
    /// Catalog cannot be loaded, startup must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Catalog error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    /// Two columns share a label
    DuplicateLabel,
    /// Two entity definitions share a name
    DuplicateEntity,
    /// A column or relation names an entity that is not defined
    UnknownEntity,
    /// Relations form a cycle, paths between entities are ambiguous
    RelationCycle,
    /// Catalog file unreadable or invalid JSON
    Malformed,
    /// Lookup of a label that is not registered
    ColumnNotFound,
}

impl CatalogErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CatalogErrorCode::DuplicateLabel => "CHART_CATALOG_DUPLICATE_LABEL",
            CatalogErrorCode::DuplicateEntity => "CHART_CATALOG_DUPLICATE_ENTITY",
            CatalogErrorCode::UnknownEntity => "CHART_CATALOG_UNKNOWN_ENTITY",
            CatalogErrorCode::RelationCycle => "CHART_CATALOG_RELATION_CYCLE",
            CatalogErrorCode::Malformed => "CHART_CATALOG_MALFORMED",
            CatalogErrorCode::ColumnNotFound => "CHART_CATALOG_COLUMN_NOT_FOUND",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            CatalogErrorCode::ColumnNotFound => Severity::Reject,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for CatalogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Catalog error with context
#[derive(Debug, Clone)]
pub struct CatalogError {
    code: CatalogErrorCode,
    message: String,
    /// Offending label or entity name
    subject: Option<String>,
}

impl CatalogError {
    pub fn duplicate_label(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            code: CatalogErrorCode::DuplicateLabel,
            message: format!("Column label '{}' is registered twice", label),
            subject: Some(label),
        }
    }

    pub fn duplicate_entity(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: CatalogErrorCode::DuplicateEntity,
            message: format!("Entity '{}' is defined twice", entity),
            subject: Some(entity),
        }
    }

    pub fn unknown_entity(entity: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: CatalogErrorCode::UnknownEntity,
            message: format!(
                "Entity '{}' referenced by {} is not defined",
                entity,
                referenced_by.into()
            ),
            subject: Some(entity),
        }
    }

    pub fn relation_cycle(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            code: CatalogErrorCode::RelationCycle,
            message: format!(
                "Relation {} -> {} closes a cycle in the entity graph",
                from, to
            ),
            subject: Some(format!("{}->{}", from, to)),
        }
    }

    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            code: CatalogErrorCode::Malformed,
            message: format!("Catalog '{}' is malformed: {}", source, reason.into()),
            subject: Some(source),
        }
    }

    pub fn column_not_found(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            code: CatalogErrorCode::ColumnNotFound,
            message: format!("No column prototype labelled '{}'", label),
            subject: Some(label),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CatalogErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns whether startup must stop
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending label or entity name
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl fmt::Display for CatalogError {
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

impl std::error::Error for CatalogError {}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
