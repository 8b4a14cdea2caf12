//! Page value types shared by the store, index and CLI.

use serde::Serialize;

use crate::storage::{BlobId, CommitId, CommitInfo};
use crate::wiki::name::Encoding;

/// Listing entry for one page at the current head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// display title
    pub name: String,
    /// path of the page file relative to the wiki root
    pub filename: String,
    /// content at the head; read lazily through the repository
    pub blob_id: BlobId,
    pub encoding: Encoding,
}

impl PageMeta {
    /// the page everything else sorts after
    pub const HOME: &'static str = "Home";

    pub fn is_home(&self) -> bool {
        self.name == Self::HOME
    }

    /// stored under a legacy file name that the next write will replace
    pub fn is_legacy(&self) -> bool {
        self.encoding == Encoding::Legacy
    }
}

/// A page with its content.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub meta: PageMeta,
    #[serde(skip)]
    pub content: Vec<u8>,
    /// the commit that last changed the page file
    pub revision: Option<CommitInfo>,
}

impl Page {
    /// content as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Outcome of a create, update or rename.
#[derive(Debug, Clone, Serialize)]
pub struct PageChange {
    pub page: PageMeta,
    pub commit: CommitId,
}

/// 1-based page window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// cut the window out of `items`
    pub fn apply<T>(&self, items: Vec<T>) -> PageSlice<T> {
        let total = items.len();
        let start = (self.page - 1).saturating_mul(self.per_page);
        let items = items.into_iter().skip(start).take(self.per_page).collect();
        PageSlice {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 50)
    }
}

/// One window of an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl<T> PageSlice<T> {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}
