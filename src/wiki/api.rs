//! Wiki API - high-level interface over one page repository.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::storage::{Author, BranchName, CommitId, CommitInfo, StorageError, WikiRepository};
use crate::wiki::error::{WikiError, WikiResult};
use crate::wiki::index::PageIndex;
use crate::wiki::lock::WikiLocks;
use crate::wiki::page::{Page, PageChange, PageMeta, PageSlice, Pagination};
use crate::wiki::raw::{RawContent, RawContentResolver};
use crate::wiki::store::{PageStore, ReservedNames};

/// Wiki configuration options.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    /// Path to the bare repository.
    pub path: PathBuf,
    /// Branch that holds the pages.
    pub branch: String,
    /// Create an empty repository if none exists.
    pub create_if_missing: bool,
    /// Titles reserved in addition to the built-in control names.
    pub reserved_names: Vec<String>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wiki.git"),
            branch: BranchName::DEFAULT.to_string(),
            create_if_missing: true,
            reserved_names: Vec::new(),
        }
    }
}

impl WikiConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the page branch.
    pub fn branch(mut self, name: impl Into<String>) -> Self {
        self.branch = name.into();
        self
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Reserve one more title.
    pub fn reserved_name(mut self, name: impl Into<String>) -> Self {
        self.reserved_names.push(name.into());
        self
    }

    /// Open the wiki this configuration describes.
    pub fn open(self) -> WikiResult<Wiki> {
        Wiki::open_with_config(self)
    }
}

/// The main wiki handle.
///
/// Cheap to clone; clones share the repository handle and the writer
/// locks, so they may be moved to other threads freely.
#[derive(Clone)]
pub struct Wiki {
    config: WikiConfig,
    store: PageStore,
}

impl Wiki {
    /// Open or create a wiki at the given path.
    pub fn open(path: impl AsRef<Path>) -> WikiResult<Self> {
        Self::open_with_config(WikiConfig::new(path.as_ref()))
    }

    /// Open or create a wiki with custom configuration.
    pub fn open_with_config(config: WikiConfig) -> WikiResult<Self> {
        let branch = BranchName::new(config.branch.as_str()).map_err(StorageError::from)?;
        let repo = if config.create_if_missing {
            WikiRepository::open_or_init(&config.path, branch)?
        } else {
            WikiRepository::open_on_branch(&config.path, branch)?
        };
        info!("opened wiki {} on branch {}", repo.path().display(), repo.branch());

        let store = PageStore::new(repo)
            .with_reserved_names(ReservedNames::with_extra(&config.reserved_names));
        Ok(Self { config, store })
    }

    /// Wrap an already opened repository with default settings.
    pub fn from_repository(repo: WikiRepository) -> Self {
        let config = WikiConfig {
            path: repo.path().to_path_buf(),
            branch: repo.branch().as_str().to_string(),
            ..Default::default()
        };
        Self {
            config,
            store: PageStore::new(repo),
        }
    }

    /// Use a separate writer lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: WikiLocks) -> Self {
        self.store = self.store.with_locks(locks);
        self
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn repository(&self) -> &WikiRepository {
        self.store.repo()
    }

    /// Head revision, `None` while the wiki has no commits.
    pub fn head(&self) -> WikiResult<Option<CommitId>> {
        Ok(self.store.repo().head()?)
    }

    // ==================== Pages ====================

    pub fn create_page(
        &self,
        title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        self.store.create_page(title, content, message, author)
    }

    pub fn update_page(
        &self,
        title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        self.store.update_page(title, content, message, author)
    }

    pub fn rename_page(
        &self,
        old_title: &str,
        new_title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        self.store.rename_page(old_title, new_title, content, message, author)
    }

    pub fn delete_page(&self, title: &str, message: Option<&str>, author: &Author) -> WikiResult<CommitId> {
        self.store.delete_page(title, message, author)
    }

    pub fn read_page(&self, title: &str) -> WikiResult<Page> {
        self.store.read_page(title)
    }

    pub fn page_history(&self, title: &str, limit: Option<usize>) -> WikiResult<Vec<CommitInfo>> {
        self.store.page_history(title, limit)
    }

    /// Whether a page with this title exists at the head.
    pub fn page_exists(&self, title: &str) -> WikiResult<bool> {
        match self.store.read_page(title) {
            Ok(_) => Ok(true),
            Err(WikiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ==================== Listing ====================

    pub fn list_pages(&self) -> WikiResult<Vec<PageMeta>> {
        let pages = PageIndex::list_pages(self.store.repo())?;
        debug!("listed {} pages", pages.len());
        Ok(pages)
    }

    pub fn list_page_slice(&self, pagination: Pagination) -> WikiResult<PageSlice<PageMeta>> {
        PageIndex::list_page_slice(self.store.repo(), pagination)
    }

    // ==================== Raw files ====================

    pub fn resolve_raw(&self, path: &str) -> WikiResult<RawContent> {
        RawContentResolver::resolve_raw(self.store.repo(), path)
    }
}

impl std::fmt::Debug for Wiki {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wiki")
            .field("path", &self.config.path)
            .field("branch", &self.config.branch)
            .finish()
    }
}
