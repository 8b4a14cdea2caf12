//! Commit creation and history traversal
//!
//! commits are the atomic units of change in Git. In a wiki:
//! - each page mutation creates exactly one commit
//! - the commit's author is the acting user
//! - the history of a page is the commits that touched its file
//!
//! this module handles commit creation and history walking. Moving the
//! branch pointer is left to `refs`, so a commit that is never published
//! stays unreachable.

use chrono::{DateTime, TimeZone, Utc};
use git2::{Repository, Revwalk, Sort};
use serde::Serialize;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::tree::TreeHandle;
use crate::storage::types::{Author, BlobId, CommitId, TreeId};

/// information about a commit
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub id: CommitId,
    #[serde(skip)]
    pub tree_id: TreeId,
    pub parent_ids: Vec<CommitId>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// create CommitInfo from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        let time = commit.time();
        let timestamp = Utc
            .timestamp_opt(time.seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: CommitId::new(commit.id()),
            tree_id: TreeId::new(commit.tree_id()),
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("unknown@unknown").to_string(),
            timestamp,
        }
    }

    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<CommitId> {
        self.parent_ids.first().copied()
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// builder for creating commits with a fluent interface
pub struct CommitBuilder<'a> {
    repo: &'a Repository,
    tree_id: Option<TreeId>,
    parent: Option<CommitId>,
    message: String,
    author: Author,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            tree_id: None,
            parent: None,
            message: String::new(),
            author: Author::system(),
        }
    }

    /// set the tree for this commit
    pub fn tree(mut self, tree_id: TreeId) -> Self {
        self.tree_id = Some(tree_id);
        self
    }

    /// set the parent commit; `None` makes a root commit
    pub fn parent(mut self, parent: Option<CommitId>) -> Self {
        self.parent = parent;
        self
    }

    /// set the commit message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// set the author (also used as committer)
    pub fn author(mut self, author: Author) -> Self {
        self.author = author;
        self
    }

    /// create the commit object and return its ID
    ///
    /// no ref is touched here.
    pub fn commit(self) -> StorageResult<CommitId> {
        let tree_id = self
            .tree_id
            .ok_or_else(|| StorageError::Internal("commit requires a tree".to_string()))?;

        let tree = self.repo.find_tree(tree_id.raw())?;
        let sig = self.author.to_git2_signature()?;

        let parent = match self.parent {
            Some(id) => Some(
                self.repo
                    .find_commit(id.raw())
                    .map_err(|_| StorageError::CommitNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(None, &sig, &sig, &self.message, &tree, &parents)?;

        Ok(CommitId::new(oid))
    }
}

/// get information about a commit
pub fn get_commit(repo: &Repository, id: CommitId) -> StorageResult<CommitInfo> {
    let commit = repo
        .find_commit(id.raw())
        .map_err(|_| StorageError::CommitNotFound(id.to_string()))?;

    Ok(CommitInfo::from_git2(&commit))
}

/// get the tree snapshot at a specific commit
pub fn get_tree_at_commit(repo: &Repository, commit_id: CommitId) -> StorageResult<TreeHandle<'_>> {
    let commit = repo
        .find_commit(commit_id.raw())
        .map_err(|_| StorageError::CommitNotFound(commit_id.to_string()))?;

    let tree = commit.tree()?;
    Ok(TreeHandle::new(tree))
}

/// iterate over commit history starting from a commit
pub struct HistoryIterator<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
}

impl<'repo> HistoryIterator<'repo> {
    /// create a new history iterator
    pub fn new(repo: &'repo Repository, start: CommitId) -> StorageResult<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(start.raw())?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;

        Ok(Self { repo, revwalk })
    }
}

impl<'repo> Iterator for HistoryIterator<'repo> {
    type Item = StorageResult<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.revwalk.next()? {
            Ok(oid) => match self.repo.find_commit(oid) {
                Ok(commit) => Some(Ok(CommitInfo::from_git2(&commit))),
                Err(e) => Some(Err(StorageError::Git(e))),
            },
            Err(e) => Some(Err(StorageError::Git(e))),
        }
    }
}

/// get history for a commit
pub fn history(repo: &Repository, start: CommitId) -> StorageResult<HistoryIterator<'_>> {
    HistoryIterator::new(repo, start)
}

/// commits reachable from `start` that changed the file at `path`, newest first
///
/// a commit counts when the blob at `path` differs from its first
/// parent's (including appearing or disappearing).
pub fn history_for_path(
    repo: &Repository,
    start: CommitId,
    path: &str,
    limit: Option<usize>,
) -> StorageResult<Vec<CommitInfo>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut touched = Vec::new();

    for info in history(repo, start)? {
        if touched.len() >= limit {
            break;
        }
        let info = info?;
        let current = blob_at_commit(repo, info.id, path)?;
        let previous = match info.first_parent() {
            Some(parent) => blob_at_commit(repo, parent, path)?,
            None => None,
        };
        if current != previous {
            touched.push(info);
        }
    }

    Ok(touched)
}

fn blob_at_commit(repo: &Repository, id: CommitId, path: &str) -> StorageResult<Option<BlobId>> {
    let tree = get_tree_at_commit(repo, id)?;
    Ok(tree.blob_at(path))
}

/// default message formatting for page mutations
pub struct CommitMessage;

impl CommitMessage {
    /// message for a newly added page
    pub fn create(title: &str) -> String {
        format!("Add page '{}'", title)
    }

    /// message for a content change
    pub fn update(title: &str) -> String {
        format!("Update page '{}'", title)
    }

    /// message for a title change
    pub fn rename(from: &str, to: &str) -> String {
        format!("Rename page '{}' to '{}'", from, to)
    }

    /// message for a removed page
    pub fn delete(title: &str) -> String {
        format!("Delete page '{}'", title)
    }

    /// the caller's message when it has any content, otherwise `fallback`
    pub fn or_default(message: Option<&str>, fallback: impl FnOnce() -> String) -> String {
        match message.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => fallback(),
        }
    }
}
