//! Page mutations as single commits.
//!
//! Every mutation runs under the wiki's writer lock, from reading the head
//! to moving the branch, and produces exactly one commit. Renames and
//! legacy-name migrations are staged as one tree change, so no
//! intermediate state is ever published.

use log::{debug, info};

use crate::storage::{
    read_blob, write_blob, Author, BlobId, CommitId, CommitInfo, CommitMessage, WikiRepository,
};
use crate::wiki::error::{WikiError, WikiResult};
use crate::wiki::index::PageIndex;
use crate::wiki::lock::WikiLocks;
use crate::wiki::name::{Encoding, NameCodec};
use crate::wiki::page::{Page, PageChange, PageMeta};

/// titles that collide with wiki control actions
pub const RESERVED_NAMES: &[&str] = &[
    "_pages", "_new", "_edit", "_delete", "_revision", "_history", "raw",
];

/// The set of titles a page may not take.
///
/// Matching is case-insensitive on the first path segment, so `raw/x`
/// is as reserved as `raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedNames(Vec<String>);

impl ReservedNames {
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Self::default();
        for name in extra {
            let name = name.as_ref().trim().to_lowercase();
            if !name.is_empty() && !names.0.contains(&name) {
                names.0.push(name);
            }
        }
        names
    }

    /// check a normalized title
    pub fn is_reserved(&self, title: &str) -> bool {
        let first = title.split('/').next().unwrap_or(title).to_lowercase();
        self.0.iter().any(|name| *name == first)
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self(RESERVED_NAMES.iter().map(|name| name.to_string()).collect())
    }
}

/// Create, update, rename and delete pages of one wiki.
#[derive(Clone)]
pub struct PageStore {
    repo: WikiRepository,
    locks: WikiLocks,
    reserved: ReservedNames,
}

impl PageStore {
    /// A store sharing the process-wide writer locks.
    pub fn new(repo: WikiRepository) -> Self {
        Self {
            repo,
            locks: WikiLocks::global().clone(),
            reserved: ReservedNames::default(),
        }
    }

    /// Use a separate lock registry.
    pub fn with_locks(mut self, locks: WikiLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_reserved_names(mut self, reserved: ReservedNames) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn repo(&self) -> &WikiRepository {
        &self.repo
    }

    pub fn reserved_names(&self) -> &ReservedNames {
        &self.reserved
    }

    // ==================== Mutations ====================

    /// Add a page; fails if any file already reads as this title.
    pub fn create_page(
        &self,
        title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        let title = NameCodec::normalize(title)?;
        self.check_reserved(&title)?;
        let filename = NameCodec::encode(&title)?;
        let message = CommitMessage::or_default(message, || CommitMessage::create(&title));
        let blob_id = self.store_content(content)?;

        let commit = self.locked(|| {
            self.repo
                .commit_changes(author, &message, |_, tree, mutator| -> WikiResult<()> {
                    if let Some(tree) = tree {
                        if !PageIndex::find(tree, &title)?.is_empty() {
                            return Err(WikiError::AlreadyExists(title.clone()));
                        }
                    }
                    mutator.upsert_blob(&filename, blob_id)?;
                    Ok(())
                })
        })?;

        info!("created page '{}' as {} in {}", title, filename, commit.short());
        Ok(Self::change(title, filename, blob_id, commit))
    }

    /// Replace the content of an existing page.
    pub fn update_page(
        &self,
        title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        self.rename_page(title, title, content, message, author)
    }

    /// Change a page's title and content in one commit.
    ///
    /// With equal titles this is a plain update. Either way every file
    /// that read as the old title is replaced by one file under the
    /// current encoding of the new title.
    pub fn rename_page(
        &self,
        old_title: &str,
        new_title: &str,
        content: &[u8],
        message: Option<&str>,
        author: &Author,
    ) -> WikiResult<PageChange> {
        let old_title = NameCodec::normalize(old_title)?;
        let new_title = NameCodec::normalize(new_title)?;
        let renamed = old_title != new_title;
        if renamed {
            self.check_reserved(&new_title)?;
        }
        let filename = NameCodec::encode(&new_title)?;
        let message = CommitMessage::or_default(message, || {
            if renamed {
                CommitMessage::rename(&old_title, &new_title)
            } else {
                CommitMessage::update(&old_title)
            }
        });
        let blob_id = self.store_content(content)?;

        let commit = self.locked(|| {
            self.repo
                .commit_changes(author, &message, |_, tree, mutator| -> WikiResult<()> {
                    let tree = tree.ok_or_else(|| WikiError::NotFound(old_title.clone()))?;
                    let existing = PageIndex::find(tree, &old_title)?;
                    if existing.is_empty() {
                        return Err(WikiError::NotFound(old_title.clone()));
                    }
                    if renamed && !PageIndex::find(tree, &new_title)?.is_empty() {
                        return Err(WikiError::AlreadyExists(new_title.clone()));
                    }

                    for page in existing.iter().filter(|page| page.filename != filename) {
                        debug!("removing {} in favour of {}", page.filename, filename);
                        mutator.remove(&page.filename)?;
                    }
                    mutator.upsert_blob(&filename, blob_id)?;
                    Ok(())
                })
        })?;

        if renamed {
            info!("renamed page '{}' to '{}' in {}", old_title, new_title, commit.short());
        } else {
            info!("updated page '{}' in {}", new_title, commit.short());
        }
        Ok(Self::change(new_title, filename, blob_id, commit))
    }

    /// Remove a page. Deleting the last page leaves an empty, valid tree.
    pub fn delete_page(&self, title: &str, message: Option<&str>, author: &Author) -> WikiResult<CommitId> {
        let title = NameCodec::normalize(title)?;
        let message = CommitMessage::or_default(message, || CommitMessage::delete(&title));

        let commit = self.locked(|| {
            self.repo
                .commit_changes(author, &message, |_, tree, mutator| -> WikiResult<()> {
                    let tree = tree.ok_or_else(|| WikiError::NotFound(title.clone()))?;
                    let existing = PageIndex::find(tree, &title)?;
                    if existing.is_empty() {
                        return Err(WikiError::NotFound(title.clone()));
                    }
                    for page in &existing {
                        mutator.remove(&page.filename)?;
                    }
                    Ok(())
                })
        })?;

        info!("deleted page '{}' in {}", title, commit.short());
        Ok(commit)
    }

    // ==================== Reads ====================

    /// A page's content and the revision that last changed it.
    pub fn read_page(&self, title: &str) -> WikiResult<Page> {
        let title = NameCodec::normalize(title)?;
        let (meta, content) = self.repo.with_head_tree(|git, _, tree| -> WikiResult<_> {
            let tree = tree.ok_or_else(|| WikiError::NotFound(title.clone()))?;
            let meta = PageIndex::find(tree, &title)?
                .into_iter()
                .next()
                .ok_or_else(|| WikiError::NotFound(title.clone()))?;
            let content = read_blob(git, meta.blob_id)?;
            Ok((meta, content))
        })?;

        let revision = self.repo.history_for_path(&meta.filename, Some(1))?.into_iter().next();
        Ok(Page {
            meta,
            content,
            revision,
        })
    }

    /// Revisions of a page's file, newest first.
    pub fn page_history(&self, title: &str, limit: Option<usize>) -> WikiResult<Vec<CommitInfo>> {
        let page = self.read_page(title)?;
        Ok(self.repo.history_for_path(&page.meta.filename, limit)?)
    }

    // ==================== Helpers ====================

    fn check_reserved(&self, title: &str) -> WikiResult<()> {
        if self.reserved.is_reserved(title) {
            debug!("rejecting reserved title '{}'", title);
            return Err(WikiError::ReservedName(title.to_string()));
        }
        Ok(())
    }

    /// blobs are written before taking the lock; unreferenced ones are harmless
    fn store_content(&self, content: &[u8]) -> WikiResult<BlobId> {
        Ok(self.repo.with_repo(|git| write_blob(git, content))?)
    }

    fn locked<T>(&self, f: impl FnOnce() -> WikiResult<T>) -> WikiResult<T> {
        self.locks.with_lock(self.repo.lock_key(), f)
    }

    fn change(title: String, filename: String, blob_id: BlobId, commit: CommitId) -> PageChange {
        PageChange {
            page: PageMeta {
                name: title,
                filename,
                blob_id,
                encoding: Encoding::Current,
            },
            commit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BranchName;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PageStore) {
        let dir = TempDir::new().unwrap();
        let repo = WikiRepository::init(dir.path(), BranchName::default()).unwrap();
        (dir, PageStore::new(repo).with_locks(WikiLocks::new()))
    }

    fn author() -> Author {
        Author::new("user2", "user2@example.com")
    }

    fn titles(store: &PageStore) -> Vec<String> {
        PageIndex::list_pages(store.repo())
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn test_reserved_names() {
        let reserved = ReservedNames::default();
        assert!(reserved.is_reserved("_edit"));
        assert!(reserved.is_reserved("RAW"));
        assert!(reserved.is_reserved("raw/jpeg.jpg"));
        assert!(!reserved.is_reserved("Raw Data"));
        assert!(!reserved.is_reserved("Guides/_edit"));

        let extended = ReservedNames::with_extra(["Admin "]);
        assert!(extended.is_reserved("admin"));
        assert!(extended.is_reserved("_pages"));
    }

    #[test]
    fn test_create_and_read() {
        let (_dir, store) = setup();
        let change = store.create_page("New page", b"hello", Some("first"), &author()).unwrap();
        assert_eq!(change.page.filename, "New-page.md");

        let page = store.read_page("New page").unwrap();
        assert_eq!(page.content, b"hello");
        let revision = page.revision.unwrap();
        assert_eq!(revision.id, change.commit);
        assert_eq!(revision.message, "first");
        assert_eq!(revision.author_name, "user2");
    }

    #[test]
    fn test_create_duplicate_fails() {
        let (_dir, store) = setup();
        store.create_page("Home", b"a", None, &author()).unwrap();
        let result = store.create_page("  Home ", b"b", None, &author());
        assert!(matches!(result, Err(WikiError::AlreadyExists(ref t)) if t == "Home"));
    }

    #[test]
    fn test_create_reserved_fails_without_commit() {
        let (_dir, store) = setup();
        let result = store.create_page("_edit", b"x", None, &author());
        assert!(matches!(result, Err(WikiError::ReservedName(_))));
        assert_eq!(store.repo().head().unwrap(), None);
    }

    #[test]
    fn test_create_empty_title_fails() {
        let (_dir, store) = setup();
        let result = store.create_page("   ", b"x", None, &author());
        assert!(matches!(result, Err(WikiError::InvalidTitle(_))));
    }

    #[test]
    fn test_default_messages() {
        let (_dir, store) = setup();
        let created = store.create_page("Home", b"a", None, &author()).unwrap();
        let renamed = store.rename_page("Home", "Start", b"a", Some(" "), &author()).unwrap();
        let deleted = store.delete_page("Start", None, &author()).unwrap();

        let repo = store.repo();
        assert_eq!(repo.get_commit(created.commit).unwrap().message, "Add page 'Home'");
        assert_eq!(
            repo.get_commit(renamed.commit).unwrap().message,
            "Rename page 'Home' to 'Start'"
        );
        assert_eq!(repo.get_commit(deleted).unwrap().message, "Delete page 'Start'");
    }

    #[test]
    fn test_update_missing_fails() {
        let (_dir, store) = setup();
        let result = store.update_page("Nope", b"x", None, &author());
        assert!(matches!(result, Err(WikiError::NotFound(_))));

        store.create_page("Home", b"a", None, &author()).unwrap();
        let result = store.update_page("Nope", b"x", None, &author());
        assert!(matches!(result, Err(WikiError::NotFound(_))));
    }

    #[test]
    fn test_update_changes_content() {
        let (_dir, store) = setup();
        store.create_page("Home", b"v1", None, &author()).unwrap();
        store.update_page("Home", b"v2", None, &author()).unwrap();
        assert_eq!(store.read_page("Home").unwrap().content, b"v2");
        assert_eq!(store.page_history("Home", None).unwrap().len(), 2);
    }

    #[test]
    fn test_rename_to_nested_title() {
        let (_dir, store) = setup();
        store.create_page("Home", b"old", None, &author()).unwrap();
        let change = store
            .rename_page("Home", "New/<page>", b"new", None, &author())
            .unwrap();
        assert_eq!(change.page.filename, "New/%3Cpage%3E.md");

        assert_eq!(titles(&store), vec!["New/<page>".to_string()]);
        assert_eq!(store.read_page("New/<page>").unwrap().content, b"new");
        assert!(matches!(store.read_page("Home"), Err(WikiError::NotFound(_))));
    }

    #[test]
    fn test_rename_onto_existing_fails() {
        let (_dir, store) = setup();
        store.create_page("Home", b"a", None, &author()).unwrap();
        store.create_page("Other", b"b", None, &author()).unwrap();
        let head = store.repo().head().unwrap();

        let result = store.rename_page("Home", "Other", b"a", None, &author());
        assert!(matches!(result, Err(WikiError::AlreadyExists(_))));
        let result = store.rename_page("Home", "_new", b"a", None, &author());
        assert!(matches!(result, Err(WikiError::ReservedName(_))));
        assert_eq!(store.repo().head().unwrap(), head);
    }

    #[test]
    fn test_delete_last_page_leaves_empty_wiki() {
        let (_dir, store) = setup();
        store.create_page("Home", b"a", None, &author()).unwrap();
        store.delete_page("Home", None, &author()).unwrap();
        assert!(titles(&store).is_empty());
        assert!(matches!(
            store.delete_page("Home", None, &author()),
            Err(WikiError::NotFound(_))
        ));
    }

    #[test]
    fn test_page_beside_directory_named_like_it() {
        let (_dir, store) = setup();
        store.create_page("x", b"file", None, &author()).unwrap();
        store.create_page("x.md/y", b"nested", None, &author()).unwrap();
        let mut listed = titles(&store);
        listed.sort();
        assert_eq!(listed, vec!["x".to_string(), "x.md/y".to_string()]);

        let (_dir, store) = setup();
        store.create_page("x.md/y", b"nested", None, &author()).unwrap();
        store.create_page("x", b"file", None, &author()).unwrap();
        assert_eq!(store.read_page("x").unwrap().content, b"file");
        assert_eq!(store.read_page("x.md/y").unwrap().content, b"nested");
    }

    #[test]
    fn test_symbol_title() {
        let (_dir, store) = setup();
        store.create_page("&&&&", b"amp", None, &author()).unwrap();
        assert_eq!(titles(&store), vec!["&&&&".to_string()]);
        assert_eq!(store.read_page("&&&&").unwrap().content, b"amp");
    }
}
