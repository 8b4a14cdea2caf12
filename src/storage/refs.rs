//! Branch pointer management.
//!
//! A wiki tracks a single branch. This module resolves that branch to its
//! head commit and moves it forward. Moving is a compare-and-swap at the
//! ref level: the pointer only changes if it still names the commit the
//! new one was built on, so a half-applied publish can never be observed.

use git2::{ErrorCode, Repository};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchName, CommitId};

/// Manages the wiki's branch reference.
pub struct RefManager;

impl RefManager {
    /// Resolve a branch to its current commit.
    ///
    /// Returns `None` for an unborn branch (a wiki with no revisions yet).
    pub fn head_commit(repo: &Repository, branch: &BranchName) -> StorageResult<Option<CommitId>> {
        let reference = match repo.find_reference(&branch.as_ref_path()) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Git(e)),
        };

        let commit = reference.peel_to_commit()?;
        Ok(Some(CommitId::new(commit.id())))
    }

    /// Point `branch` at `target`, but only if it still points at `expected`.
    ///
    /// `expected == None` means the branch must not exist yet.
    pub fn advance_branch(
        repo: &Repository,
        branch: &BranchName,
        expected: Option<CommitId>,
        target: CommitId,
    ) -> StorageResult<()> {
        let refname = branch.as_ref_path();
        let log_message = format!("wiki: advance {} to {}", branch, target.short());

        let result = match expected {
            Some(current) => repo
                .reference_matching(&refname, target.raw(), true, current.raw(), &log_message)
                .map(|_| ()),
            None => repo
                .reference(&refname, target.raw(), false, &log_message)
                .map(|_| ()),
        };

        result.map_err(|e| match e.code() {
            ErrorCode::Modified | ErrorCode::Exists | ErrorCode::Locked => {
                StorageError::ConcurrentModification {
                    branch: branch.to_string(),
                }
            }
            _ => StorageError::Git(e),
        })
    }

    /// Make HEAD a symbolic ref to `branch` (used when initializing a wiki).
    pub fn point_head_at(repo: &Repository, branch: &BranchName) -> StorageResult<()> {
        repo.set_head(&branch.as_ref_path())?;
        Ok(())
    }
}
