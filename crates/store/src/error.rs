//! Unified error handling for the entity store.

use std::fmt;

use thiserror::Error;

use crate::db::{BackendError, Collection};

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Input field name, as the presentation layer spells it.
    pub field: &'static str,
    pub message: String,
}

/// Every problem found while validating one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether `field` was rejected.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field was rejected.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

/// Error returned by every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document addressed by a read-before-write check does not exist.
    #[error("{collection} document {id} not found")]
    NotFound { collection: Collection, id: String },

    /// Caller input failed validation; nothing was sent to storage.
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// The storage engine could not be reached.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    /// A storage read, write or batch commit failed. Nothing was applied.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Data in storage does not decode into the expected entity.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    pub(crate) fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Whether the error reports a missing document.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(message) => Self::StoreUnavailable(message),
            other => Self::OperationFailed(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}
