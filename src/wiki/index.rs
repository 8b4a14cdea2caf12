//! Page listing at the current head.
//!
//! Listing never takes the writer lock: it reads one committed snapshot,
//! which cannot change underneath it. Nothing is cached; every call walks
//! the head tree afresh.

use std::cmp::Ordering;

use log::debug;

use crate::storage::{StorageResult, TreeHandle, WikiRepository};
use crate::wiki::error::WikiResult;
use crate::wiki::name::{Encoding, NameCodec};
use crate::wiki::page::{PageMeta, PageSlice, Pagination};

/// Lists and looks up pages in a snapshot.
pub struct PageIndex;

impl PageIndex {
    /// All pages at the head, `Home` first, then by file name ignoring case.
    ///
    /// A wiki without revisions yields an empty list.
    pub fn list_pages(repo: &WikiRepository) -> WikiResult<Vec<PageMeta>> {
        repo.with_head_tree(|_, _, tree| -> WikiResult<Vec<PageMeta>> {
            let mut pages = match tree {
                Some(tree) => Self::collect(tree)?,
                None => Vec::new(),
            };
            Self::sort(&mut pages);
            Ok(pages)
        })
    }

    /// One window of `list_pages`.
    pub fn list_page_slice(
        repo: &WikiRepository,
        pagination: Pagination,
    ) -> WikiResult<PageSlice<PageMeta>> {
        Ok(pagination.apply(Self::list_pages(repo)?))
    }

    /// Every page file in `tree`, unordered.
    ///
    /// Files that are not pages (images and other assets) and names that
    /// decode under no scheme are skipped.
    pub fn collect(tree: &TreeHandle<'_>) -> StorageResult<Vec<PageMeta>> {
        let mut pages = Vec::new();
        for entry in tree.blobs()? {
            if !NameCodec::is_page_file(&entry.path) {
                continue;
            }
            match NameCodec::decode(&entry.path) {
                Some(decoded) => {
                    if decoded.encoding == Encoding::Legacy {
                        debug!("legacy page file {} reads as '{}'", entry.path, decoded.title);
                    }
                    pages.push(PageMeta {
                        name: decoded.title,
                        filename: entry.path,
                        blob_id: entry.id,
                        encoding: decoded.encoding,
                    });
                }
                None => debug!("skipping undecodable page file {}", entry.path),
            }
        }
        Ok(pages)
    }

    /// Order pages: `Home` first, then case-insensitively by file name.
    pub fn sort(pages: &mut [PageMeta]) {
        pages.sort_by(Self::compare);
    }

    fn compare(a: &PageMeta, b: &PageMeta) -> Ordering {
        b.is_home()
            .cmp(&a.is_home())
            .then_with(|| a.filename.to_lowercase().cmp(&b.filename.to_lowercase()))
            .then_with(|| a.filename.cmp(&b.filename))
    }

    /// Every file in `tree` that reads as `title`, the current encoding first.
    ///
    /// More than one match means legacy copies exist alongside each other.
    pub fn find(tree: &TreeHandle<'_>, title: &str) -> StorageResult<Vec<PageMeta>> {
        let mut matches: Vec<PageMeta> = Self::collect(tree)?
            .into_iter()
            .filter(|page| page.name == title)
            .collect();
        matches.sort_by_key(|page| page.encoding != Encoding::Current);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{write_blob, Author, BranchName};
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, WikiRepository) {
        let dir = TempDir::new().unwrap();
        let repo = WikiRepository::init(dir.path(), BranchName::default()).unwrap();
        if !files.is_empty() {
            repo.commit_changes(&Author::system(), "fixture", |git, _, mutator| {
                for file in files {
                    let id = write_blob(git, file.as_bytes())?;
                    mutator.upsert_blob(file, id)?;
                }
                Ok::<_, crate::storage::StorageError>(())
            })
            .unwrap();
        }
        (dir, repo)
    }

    fn names(pages: &[PageMeta]) -> Vec<&str> {
        pages.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_empty_wiki_lists_nothing() {
        let (_dir, repo) = setup(&[]);
        assert!(PageIndex::list_pages(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_listing_skips_assets_and_decodes_legacy() {
        let (_dir, repo) = setup(&[
            "Home.md",
            "Page-With-Image.md",
            "Page-With-Spaced-Name.md",
            "Unescaped File.md",
            "jpeg.jpg",
            "images/jpeg.jpg",
        ]);
        let pages = PageIndex::list_pages(&repo).unwrap();
        assert_eq!(
            names(&pages),
            vec!["Home", "Page With Image", "Page With Spaced Name", "Unescaped File"]
        );
        assert!(pages[3].is_legacy());
        assert!(!pages[0].is_legacy());
    }

    #[test]
    fn test_home_first_then_case_insensitive() {
        let (_dir, repo) = setup(&["alpha.md", "Zeta.md", "Beta.md", "Home.md", "Guides/install.md"]);
        let pages = PageIndex::list_pages(&repo).unwrap();
        assert_eq!(
            names(&pages),
            vec!["Home", "alpha", "Beta", "Guides/install", "Zeta"]
        );
    }

    #[test]
    fn test_find_prefers_current_encoding() {
        let (_dir, repo) = setup(&["Unescaped File.md", "Unescaped-File.md", "Other.md"]);
        let found = repo
            .with_head_tree(|_, _, tree| PageIndex::find(tree.unwrap(), "Unescaped File"))
            .unwrap();
        let files: Vec<&str> = found.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(files, vec!["Unescaped-File.md", "Unescaped File.md"]);
    }

    #[test]
    fn test_slice() {
        let (_dir, repo) = setup(&["Home.md", "a.md", "b.md", "c.md"]);
        let slice = PageIndex::list_page_slice(&repo, Pagination::new(2, 2)).unwrap();
        assert_eq!(names(&slice.items), vec!["b", "c"]);
        assert_eq!(slice.total, 4);
    }
}
