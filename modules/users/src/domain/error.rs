use std::time::Duration;

use super::repo::RepositoryError;

/// Domain-layer errors for user operations.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{detail}")]
    Validation { detail: String },

    #[error("user not found: {id}")]
    NotFound { id: String },

    #[error("{detail}")]
    Store { detail: String },

    #[error("{operation} did not complete within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl DomainError {
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

impl From<RepositoryError> for DomainError {
    fn from(e: RepositoryError) -> Self {
        Self::Store {
            detail: e.to_string(),
        }
    }
}
