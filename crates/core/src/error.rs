//! Data-access error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationResult;

/// Result type used across the data-access layer.
pub type DataResult<T> = Result<T, DataError>;

/// Raised when pending changes fail validation at save time.
///
/// Carries a summary message plus every individual failure, so hosts can render all of
/// them at once.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ModelValidationError {
    message: String,
    errors: Vec<ValidationResult>,
}

impl ModelValidationError {
    pub fn new(message: impl Into<String>, errors: Vec<ValidationResult>) -> Self {
        Self {
            message: message.into(),
            errors,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &[ValidationResult] {
        &self.errors
    }
}

/// Data-access error.
///
/// Equality, hashing and validation never produce errors; these come from storage
/// containers, context construction and saving.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Pending changes failed validation.
    #[error(transparent)]
    Validation(#[from] ModelValidationError),

    /// A requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stale version or a vanished row was detected while saving.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// A request-scoped container was used without a request scope.
    #[error("no request scope available for {0}")]
    NoRequestScope(&'static str),

    /// An include path does not name a navigation of the entity.
    #[error("unknown include path '{path}' for {entity}")]
    UnknownInclude { entity: &'static str, path: String },

    /// A data context could not be constructed.
    #[error("failed to construct data context: {0}")]
    Construction(String),

    /// Internal storage failure (poisoned lock, type confusion).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DataError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
