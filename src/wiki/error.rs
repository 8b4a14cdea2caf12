//! Page store error types.

use thiserror::Error;

use crate::storage::StorageError;
use crate::wiki::name::InvalidTitle;

/// Result type for page operations.
pub type WikiResult<T> = Result<T, WikiError>;

/// Errors returned by page operations.
#[derive(Debug, Error)]
pub enum WikiError {
    /// Title collides with a control keyword.
    #[error("'{0}' is a reserved page name")]
    ReservedName(String),

    /// A page with this title already exists.
    #[error("page already exists: {0}")]
    AlreadyExists(String),

    /// No page or file matches.
    #[error("page not found: {0}")]
    NotFound(String),

    /// Title is empty or cannot be stored.
    #[error("invalid title: {0}")]
    InvalidTitle(#[from] InvalidTitle),

    /// The branch moved underneath a writer that bypassed the wiki lock.
    #[error("concurrent modification of branch {0}")]
    ConcurrencyConflict(String),

    /// The repository itself failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),
}

impl From<StorageError> for WikiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConcurrentModification { branch } => WikiError::ConcurrencyConflict(branch),
            other => WikiError::StorageFailure(other),
        }
    }
}

impl WikiError {
    /// check if this error means the page or file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, WikiError::NotFound(_))
    }

    /// check if this error is a clash with existing state
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            WikiError::AlreadyExists(_) | WikiError::ConcurrencyConflict(_)
        )
    }

    /// errors caused by what the caller asked for, as opposed to the repository
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            WikiError::StorageFailure(_) | WikiError::ConcurrencyConflict(_)
        )
    }
}
