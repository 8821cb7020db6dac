//! Storage error types
//!
//! Error codes:
//! - CHART_STORAGE_UNAVAILABLE (ERROR, retryable)
//! - CHART_STORAGE_TIMEOUT (ERROR, retryable)
//! - CHART_STORAGE_UNSUPPORTED_OPERATION (ERROR)
//! - CHART_STORAGE_INVALID_DATA (ERROR)
//!
//! Retryability is the backend's classification. The engine reports it
//! and never retries on its own.

use std::fmt;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the engine is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Storage error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Backend cannot be reached or read
    Unavailable,
    /// Backend did not answer in time
    Timeout,
    /// Plan uses an operation the backend does not know
    UnsupportedOperation,
    /// Stored data does not fit the plan (bad date, non-numeric sum input, ...)
    InvalidData,
}

impl StorageErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::Unavailable => "CHART_STORAGE_UNAVAILABLE",
            StorageErrorCode::Timeout => "CHART_STORAGE_TIMEOUT",
            StorageErrorCode::UnsupportedOperation => "CHART_STORAGE_UNSUPPORTED_OPERATION",
            StorageErrorCode::InvalidData => "CHART_STORAGE_INVALID_DATA",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with the backend's retry classification
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    retryable: bool,
}

impl StorageError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::Unavailable,
            message: reason.into(),
            retryable: true,
        }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::Timeout,
            message: reason.into(),
            retryable: true,
        }
    }

    pub fn unsupported_operation(name: &str) -> Self {
        Self {
            code: StorageErrorCode::UnsupportedOperation,
            message: format!("Operation '{}' is not supported by this backend", name),
            retryable: false,
        }
    }

    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::InvalidData,
            message: reason.into(),
            retryable: false,
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the backend considers a retry worthwhile
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for StorageError {
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

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
