//! storage layer for gitwiki
//!
//! this module is the repository primitive the wiki is built on. The
//! page layer above uses this API and never touches git2 directly.
//!
//! # Architecture
//!
//! ```text
//!  WikiRepository  ── one Mutex<git2::Repository> per handle
//!     │
//!     ├─ refs     branch head, compare-and-swap advance
//!     ├─ commit   commit builder, history walks, messages
//!     ├─ tree     head snapshot reads, staged tree edits
//!     └─ blob     page and asset bytes
//! ```
//!
//! A write reads the head, stages edits on a `TreeMutator`, writes the
//! new tree and commit, then moves the branch only if it still points at
//! the head that was read.
//!
//! # Usage
//!
//! ```ignore
//! use gitwiki::storage::{Author, BranchName, WikiRepository};
//!
//! let repo = WikiRepository::open_or_init("./wiki.git", BranchName::default())?;
//! let head = repo.commit_changes(&Author::system(), "Add page", |git, _, mutator| {
//!     let id = gitwiki::storage::write_blob(git, b"hello")?;
//!     mutator.upsert_blob("Home.md", id)
//! })?;
//! ```

mod blob;
mod commit;
mod error;
mod refs;
mod repository;
mod tree;
mod types;

// Re-export public API
pub use blob::{read_blob, write_blob};
pub use commit::{CommitInfo, CommitMessage};
pub use error::{StorageError, StorageResult};
pub use repository::WikiRepository;
pub use tree::{BlobEntry, TreeHandle, TreeMutator};
pub use types::{Author, BlobId, BranchName, CommitId, InvalidBranchName, TreeId};
