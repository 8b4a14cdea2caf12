//! Storage layer error types
//!
//! All errors that can occur while talking to the git repository are
//! defined here. We use `thiserror` for ergonomic error definition.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::InvalidBranchName;

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// repo is not initialized
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// the commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// the tree entry has an unexpected type
    #[error("unexpected entry type at {path}: expected {expected}, found {found}")]
    UnexpectedEntryType {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// a path that cannot be stored as a tree entry
    #[error("invalid tree path: '{0}'")]
    InvalidPath(String),

    /// the configured branch name is not usable
    #[error(transparent)]
    InvalidBranch(#[from] InvalidBranchName),

    /// branch pointer moved between reading head and publishing a commit
    #[error("concurrent modification: branch {branch} was updated by another writer")]
    ConcurrentModification { branch: String },

    /// internal error that shouldn't happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::CommitNotFound(_) | StorageError::NotInitialized(_) => true,
            StorageError::Git(e) => e.code() == git2::ErrorCode::NotFound,
            _ => false,
        }
    }

    /// check if this error is a conflict between writers
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::ConcurrentModification { .. })
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
