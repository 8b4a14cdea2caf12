//! Core Git repository wrapper.
//!
//! This is the central component of the storage layer. It wraps
//! `git2::Repository` with thread-safe access and provides the handful of
//! operations a wiki needs: read the head snapshot, and publish a new
//! snapshot as one commit on the wiki's branch.
//!
//! All other storage modules use this for Git access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::{ErrorCode, Repository, RepositoryInitOptions};
use parking_lot::Mutex;

use crate::storage::blob;
use crate::storage::commit::{self, CommitBuilder, CommitInfo};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::refs::RefManager;
use crate::storage::tree::{TreeHandle, TreeMutator};
use crate::storage::types::{Author, BlobId, BranchName, CommitId};

/// The handle to one wiki's repository.
///
/// Clone this to share across threads - it uses Arc internally. Opening
/// the same path twice yields two handles with the same `lock_key`.
#[derive(Clone)]
pub struct WikiRepository {
    inner: Arc<WikiRepositoryInner>,
}

struct WikiRepositoryInner {
    repo: Mutex<Repository>,
    path: PathBuf,
    /// canonical git directory, identifies the wiki across handles
    lock_key: PathBuf,
    branch: BranchName,
}

impl WikiRepository {
    /// Open an existing repository tracking the default branch.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_on_branch(path, BranchName::default())
    }

    /// Open an existing repository tracking `branch`.
    pub fn open_on_branch(path: impl AsRef<Path>, branch: BranchName) -> StorageResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => StorageError::NotInitialized(path.to_path_buf()),
            _ => StorageError::Git(e),
        })?;
        Ok(Self::wrap(repo, path, branch))
    }

    /// Initialize a new bare repository whose HEAD names `branch`.
    ///
    /// No commit is created; the wiki starts with an unborn branch.
    pub fn init(path: impl AsRef<Path>, branch: BranchName) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head(branch.as_str());
        let repo = Repository::init_opts(path, &opts)?;
        RefManager::point_head_at(&repo, &branch)?;
        Ok(Self::wrap(repo, path, branch))
    }

    /// Open or initialize a repository.
    ///
    /// Only a missing repository is initialized; a repository that exists
    /// but cannot be opened is an error.
    pub fn open_or_init(path: impl AsRef<Path>, branch: BranchName) -> StorageResult<Self> {
        let path = path.as_ref();
        match Repository::open(path) {
            Ok(repo) => Ok(Self::wrap(repo, path, branch)),
            Err(e) if e.code() == ErrorCode::NotFound => Self::init(path, branch),
            Err(e) => Err(StorageError::Git(e)),
        }
    }

    fn wrap(repo: Repository, path: &Path, branch: BranchName) -> Self {
        let git_dir = repo.path().to_path_buf();
        let lock_key = std::fs::canonicalize(&git_dir).unwrap_or(git_dir);
        Self {
            inner: Arc::new(WikiRepositoryInner {
                repo: Mutex::new(repo),
                path: path.to_path_buf(),
                lock_key,
                branch,
            }),
        }
    }

    /// Get the repository path as it was opened.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The identity used to serialize writers of this wiki.
    pub fn lock_key(&self) -> &Path {
        &self.inner.lock_key
    }

    /// The branch holding the wiki's history.
    pub fn branch(&self) -> &BranchName {
        &self.inner.branch
    }

    /// Execute a function with access to the repository.
    ///
    /// The handle serializes access to the underlying `git2` object only;
    /// it says nothing about which head the caller reads.
    pub fn with_repo<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Repository) -> Result<T, E>,
    {
        let repo = self.inner.repo.lock();
        f(&repo)
    }

    // ==================== Reads ====================

    /// Get the current head commit of the wiki branch, if any.
    pub fn head(&self) -> StorageResult<Option<CommitId>> {
        self.with_repo(|repo| RefManager::head_commit(repo, &self.inner.branch))
    }

    /// Get information about a commit.
    pub fn get_commit(&self, id: CommitId) -> StorageResult<CommitInfo> {
        self.with_repo(|repo| commit::get_commit(repo, id))
    }

    /// Read a blob's bytes.
    pub fn read_blob(&self, id: BlobId) -> StorageResult<Vec<u8>> {
        self.with_repo(|repo| blob::read_blob(repo, id))
    }

    /// Run `f` against the head snapshot (`None` while the branch is unborn).
    pub fn with_head_tree<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Repository, Option<CommitId>, Option<&TreeHandle<'_>>) -> Result<T, E>,
        E: From<StorageError>,
    {
        self.with_repo(|repo| {
            let head = RefManager::head_commit(repo, &self.inner.branch)?;
            let tree = match head {
                Some(id) => Some(commit::get_tree_at_commit(repo, id)?),
                None => None,
            };
            f(repo, head, tree.as_ref())
        })
    }

    /// Commits that changed `path`, newest first.
    pub fn history_for_path(&self, path: &str, limit: Option<usize>) -> StorageResult<Vec<CommitInfo>> {
        self.with_repo(|repo| match RefManager::head_commit(repo, &self.inner.branch)? {
            Some(head) => commit::history_for_path(repo, head, path, limit),
            None => Ok(Vec::new()),
        })
    }

    // ==================== Writes ====================

    /// Build a new snapshot from the current head and publish it as one commit.
    ///
    /// `stage` sees the head snapshot and records its changes on the
    /// mutator; returning an error aborts before anything is written to
    /// the branch. The branch moves with a compare-and-swap against the
    /// head that was read, so the commit is either fully published or not
    /// reachable at all.
    pub fn commit_changes<F, E>(&self, author: &Author, message: &str, stage: F) -> Result<CommitId, E>
    where
        F: for<'r> FnOnce(&'r Repository, Option<&TreeHandle<'r>>, &mut TreeMutator<'r>) -> Result<(), E>,
        E: From<StorageError>,
    {
        self.with_repo(|repo| {
            let branch = &self.inner.branch;
            let head = RefManager::head_commit(repo, branch)?;
            let tree = match head {
                Some(id) => Some(commit::get_tree_at_commit(repo, id)?),
                None => None,
            };

            let mut mutator = TreeMutator::new(repo, tree.as_ref());
            stage(repo, tree.as_ref(), &mut mutator)?;
            let tree_id = mutator.write()?;

            let commit_id = CommitBuilder::new(repo)
                .tree(tree_id)
                .parent(head)
                .message(message)
                .author(author.clone())
                .commit()?;

            RefManager::advance_branch(repo, branch, head, commit_id)?;
            Ok(commit_id)
        })
    }
}

impl std::fmt::Debug for WikiRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikiRepository")
            .field("path", &self.inner.path)
            .field("branch", &self.inner.branch)
            .finish()
    }
}
