// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::nlp::NlpError;
use crate::domain::polyline::PolylineError;
use crate::domain::repository::RepositoryError;

/// Errors surfaced by the application services.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator failure: {message}")]
    CollaboratorFailure { message: String, retryable: bool },

    #[error("Persistence conflict: {0}")]
    PersistenceConflict(String),
}

impl ProgressError {
    pub fn collaborator(message: impl Into<String>, retryable: bool) -> Self {
        ProgressError::CollaboratorFailure {
            message: message.into(),
            retryable,
        }
    }

    /// Whether the caller may re-issue the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProgressError::CollaboratorFailure { retryable, .. } => *retryable,
            ProgressError::PersistenceConflict(_) => true,
            ProgressError::InvalidInput(_) | ProgressError::NotFound(_) => false,
        }
    }
}

impl From<PolylineError> for ProgressError {
    fn from(err: PolylineError) -> Self {
        ProgressError::InvalidInput(err.to_string())
    }
}

impl From<NlpError> for ProgressError {
    fn from(err: NlpError) -> Self {
        let retryable = err.is_retryable();
        ProgressError::CollaboratorFailure {
            message: err.to_string(),
            retryable,
        }
    }
}

impl From<RepositoryError> for ProgressError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ProgressError::NotFound(what),
            RepositoryError::Conflict { .. } => ProgressError::PersistenceConflict(err.to_string()),
            RepositoryError::Database(_) => ProgressError::collaborator(err.to_string(), true),
            RepositoryError::Serialization(_) | RepositoryError::Unknown(_) => {
                ProgressError::collaborator(err.to_string(), false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: ProgressError = PolylineError::LengthMismatch { expected: 3, actual: 2 }.into();
        assert!(matches!(err, ProgressError::InvalidInput(_)));
        assert!(!err.is_retryable());

        let err: ProgressError = NlpError::Timeout(30).into();
        assert!(err.is_retryable());

        let err: ProgressError = RepositoryError::Conflict {
            entity: "enrollment".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(err, ProgressError::PersistenceConflict(_)));
        assert!(err.is_retryable());

        let err: ProgressError = RepositoryError::NotFound("enrollment".into()).into();
        assert!(matches!(err, ProgressError::NotFound(_)));
    }
}
