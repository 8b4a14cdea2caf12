//! tree operations for page storage.
//!
//! in Git, a tree is a directory. In a wiki:
//! - the root tree holds page files (`*.md`) and auxiliary assets
//! - nested pages (`Guides/Install`) live in subdirectories
//! - a directory exists only while something is stored beneath it
//!
//! this module provides safe abstractions over Git's tree manipulation,
//! which is notoriously fiddly to get right once paths nest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use git2::{FileMode, ObjectType, Repository, Tree, TreeWalkMode, TreeWalkResult};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BlobId, TreeId};

/// A read only handle to a git tree at a specific commit
///
/// think of it as a snapshot - it won't change even if new commits are made.
#[derive(Debug)]
pub struct TreeHandle<'repo> {
    tree: Tree<'repo>,
}

/// a file found while walking a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// slash-separated path relative to the root tree
    pub path: String,
    pub id: BlobId,
}

impl<'repo> TreeHandle<'repo> {
    /// create a TreeHandle from a git2::Tree
    pub(crate) fn new(tree: Tree<'repo>) -> Self {
        Self { tree }
    }

    /// get the tree ID
    pub fn id(&self) -> TreeId {
        TreeId::new(self.tree.id())
    }

    /// get the underlying git2::Tree (for internal use)
    pub(crate) fn inner(&self) -> &Tree<'repo> {
        &self.tree
    }

    /// true when the snapshot holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// look up the blob stored at `path`
    ///
    /// directories, submodules and missing paths all yield `None`.
    pub fn blob_at(&self, path: &str) -> Option<BlobId> {
        if split_path(path).is_err() {
            return None;
        }
        let entry = self.tree.get_path(Path::new(path)).ok()?;
        match entry.kind() {
            Some(ObjectType::Blob) => Some(BlobId::new(entry.id())),
            _ => None,
        }
    }

    /// check if a file exists at `path`
    pub fn contains_blob(&self, path: &str) -> bool {
        self.blob_at(path).is_some()
    }

    /// every file in the tree, depth first, in git's entry order
    pub fn blobs(&self) -> StorageResult<Vec<BlobEntry>> {
        let mut entries = Vec::new();
        self.tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                // names that are not valid UTF-8 cannot be pages or assets we serve
                if let Some(name) = entry.name() {
                    entries.push(BlobEntry {
                        path: format!("{}{}", root, name),
                        id: BlobId::new(entry.id()),
                    });
                }
            }
            TreeWalkResult::Ok
        })?;
        Ok(entries)
    }
}

/// a staged change at one path component
#[derive(Debug)]
enum Staged {
    Blob(BlobId),
    Remove,
    Dir(BTreeMap<String, Staged>),
}

/// a mutable tree builder for making changes
///
/// this adds up changes and produces a new root tree when it's final.
/// the original tree is not modified, so a failed write leaves nothing
/// reachable.
///
/// # Usage Pattern
///
/// ```ignore
/// let mut mutator = TreeMutator::from_tree(repo, &tree);
/// mutator.remove("Home.md")?;
/// mutator.upsert_blob("Guides/Install.md", blob_id)?;
/// let new_tree_id = mutator.write()?;
/// ```
pub struct TreeMutator<'repo> {
    repo: &'repo Repository,
    /// the root tree we're modifying (None for an unborn branch)
    base: Option<Tree<'repo>>,
    staged: BTreeMap<String, Staged>,
}

impl<'repo> TreeMutator<'repo> {
    /// create a new TreeMutator from an existing tree
    pub fn from_tree(repo: &'repo Repository, tree: &TreeHandle<'repo>) -> Self {
        Self {
            repo,
            base: Some(tree.inner().clone()),
            staged: BTreeMap::new(),
        }
    }

    /// create a new TreeMutator for an empty tree
    pub fn empty(repo: &'repo Repository) -> Self {
        Self {
            repo,
            base: None,
            staged: BTreeMap::new(),
        }
    }

    /// start from `tree` when there is one, otherwise from nothing
    pub fn new(repo: &'repo Repository, tree: Option<&TreeHandle<'repo>>) -> Self {
        match tree {
            Some(tree) => Self::from_tree(repo, tree),
            None => Self::empty(repo),
        }
    }

    /// insert or replace the file at `path`, creating directories as needed
    pub fn upsert_blob(&mut self, path: &str, blob_id: BlobId) -> StorageResult<()> {
        self.stage(path, Staged::Blob(blob_id))
    }

    /// remove the file at `path`; directories left empty are pruned on write
    pub fn remove(&mut self, path: &str) -> StorageResult<()> {
        self.stage(path, Staged::Remove)
    }

    fn stage(&mut self, path: &str, leaf: Staged) -> StorageResult<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;

        let mut level = &mut self.staged;
        for segment in parents {
            let node = level
                .entry((*segment).to_string())
                .or_insert_with(|| Staged::Dir(BTreeMap::new()));
            if !matches!(node, Staged::Dir(_)) {
                *node = Staged::Dir(BTreeMap::new());
            }
            level = match node {
                Staged::Dir(children) => children,
                _ => return Err(StorageError::Internal("staged directory vanished".to_string())),
            };
        }
        level.insert((*last).to_string(), leaf);
        Ok(())
    }

    /// write all changes and return the new root tree ID
    ///
    /// an empty result is still a valid root tree.
    pub fn write(self) -> StorageResult<TreeId> {
        let root = write_level(self.repo, self.base.as_ref(), self.staged, "")?;
        let root = match root {
            Some(oid) => oid,
            None => self.repo.treebuilder(None)?.write()?,
        };
        Ok(TreeId::new(root))
    }
}

/// rebuild one directory level; returns None when the level ends up empty
fn write_level(
    repo: &Repository,
    base: Option<&Tree<'_>>,
    changes: BTreeMap<String, Staged>,
    prefix: &str,
) -> StorageResult<Option<git2::Oid>> {
    let mut builder = repo.treebuilder(base)?;

    for (name, change) in changes {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        let existing = builder.get(name.as_str())?.map(|entry| (entry.id(), entry.kind()));

        match change {
            Staged::Blob(blob_id) => {
                if let Some((_, Some(ObjectType::Tree))) = existing {
                    return Err(StorageError::UnexpectedEntryType {
                        path: PathBuf::from(path),
                        expected: "blob (file)".to_string(),
                        found: "tree (directory)".to_string(),
                    });
                }
                builder.insert(name.as_str(), blob_id.raw(), FileMode::Blob.into())?;
            }
            Staged::Remove => {
                if existing.is_some() {
                    builder.remove(name.as_str())?;
                }
            }
            Staged::Dir(children) => {
                let subtree = match existing {
                    Some((id, Some(ObjectType::Tree))) => Some(repo.find_tree(id)?),
                    Some((_, kind)) => {
                        return Err(StorageError::UnexpectedEntryType {
                            path: PathBuf::from(path),
                            expected: "tree (directory)".to_string(),
                            found: format!("{:?}", kind),
                        })
                    }
                    None => None,
                };
                match write_level(repo, subtree.as_ref(), children, &path)? {
                    Some(oid) => {
                        builder.insert(name.as_str(), oid, FileMode::Tree.into())?;
                    }
                    None => {
                        if existing.is_some() {
                            builder.remove(name.as_str())?;
                        }
                    }
                }
            }
        }
    }

    if builder.len() == 0 {
        return Ok(None);
    }
    Ok(Some(builder.write()?))
}

/// split a slash-separated tree path, rejecting components git cannot store
pub(crate) fn split_path(path: &str) -> StorageResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').collect();
    let valid = !path.is_empty()
        && segments
            .iter()
            .all(|s| !s.is_empty() && *s != "." && *s != ".." && !s.contains('\0'));
    if !valid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
