//! Wiki layer - pages on top of the Git storage layer.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                    Wiki                     │
//! ├──────────────┬──────────────┬───────────────┤
//! │  PageStore   │  PageIndex   │ RawResolver   │
//! │ (mutations)  │  (listing)   │ (raw files)   │
//! ├──────────────┴──────────────┴───────────────┤
//! │      NameCodec  (titles <-> file names)     │
//! ├─────────────────────────────────────────────┤
//! │   WikiLocks  +  WikiRepository (storage)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Reads go straight to the head snapshot. Writes take the per-wiki
//! writer lock and publish exactly one commit each.

mod api;
mod error;
mod index;
mod lock;
mod name;
mod page;
mod raw;
mod store;

pub use api::{Wiki, WikiConfig};
pub use error::{WikiError, WikiResult};
pub use index::PageIndex;
pub use lock::WikiLocks;
pub use name::{DecodedName, Encoding, InvalidTitle, NameCodec, PAGE_SUFFIX};
pub use page::{Page, PageChange, PageMeta, PageSlice, Pagination};
pub use raw::{RawContent, RawContentResolver, TEXT_PLAIN};
pub use store::{PageStore, ReservedNames, RESERVED_NAMES};
