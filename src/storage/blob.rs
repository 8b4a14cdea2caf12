//! Blob operations for page storage.
//!
//! Page bodies and auxiliary assets are stored verbatim, one blob per
//! file. Nothing is wrapped or re-encoded on the way in or out.

use crate::storage::error::StorageResult;
use crate::storage::types::BlobId;

/// write raw bytes as a blob to the repository
///
/// returns the blob ID (SHA-1 hash of the content)
pub fn write_blob(repo: &git2::Repository, content: &[u8]) -> StorageResult<BlobId> {
    let oid = repo.blob(content)?;
    Ok(BlobId::new(oid))
}

/// read a blob's content from the repository
pub fn read_blob(repo: &git2::Repository, blob_id: BlobId) -> StorageResult<Vec<u8>> {
    let blob = repo.find_blob(blob_id.raw())?;
    Ok(blob.content().to_vec())
}
