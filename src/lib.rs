//! GitWiki - a Git-backed wiki page store
//!
//! Every page is a Markdown file in a bare Git repository, every edit is a
//! commit, and the wiki's entire history is the branch's history. Titles
//! map to file names through a reversible encoding, and file names written
//! by older encodings are still read and migrated on the next write.
//!
//! # Example
//!
//! ```no_run
//! use gitwiki::storage::Author;
//! use gitwiki::wiki::Wiki;
//!
//! let wiki = Wiki::open("./wiki.git").unwrap();
//! let author = Author::new("Alice", "alice@example.com");
//! wiki.create_page("Home", b"# Welcome", None, &author).unwrap();
//! for page in wiki.list_pages().unwrap() {
//!     println!("{} -> {}", page.name, page.filename);
//! }
//! ```

pub mod logger;
pub mod storage;
pub mod wiki;
