//! Raw file delivery.
//!
//! A raw path is looked up in this order, against the head snapshot:
//! 1. the literal repository path (`images/jpeg.jpg`)
//! 2. the percent-decoded path (`Unescaped%20File.md`)
//! 3. a page title, with or without the `.md` suffix (`Page With Spaced Name`)
//! 4. a page sub-URL, with or without the suffix (`Page-With-Spaced-Name`)
//!
//! Markup is never rendered here: anything that is not a known binary
//! type is served as UTF-8 plain text.

use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::storage::{read_blob, BlobEntry, StorageResult, TreeHandle, WikiRepository};
use crate::wiki::error::{WikiError, WikiResult};
use crate::wiki::index::PageIndex;
use crate::wiki::name::{NameCodec, PAGE_SUFFIX};

/// content type for everything without a recognized binary extension
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// extensions served with their own media type
const BINARY_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("avif", "image/avif"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

/// A resolved file ready to be served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawContent {
    /// repository path the request resolved to
    pub path: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

/// Maps raw request paths to stored files.
pub struct RawContentResolver;

impl RawContentResolver {
    /// Resolve `path` at the head and read the file it names.
    pub fn resolve_raw(repo: &WikiRepository, path: &str) -> WikiResult<RawContent> {
        repo.with_head_tree(|git, _, tree| -> WikiResult<RawContent> {
            let entry = match tree {
                Some(tree) => Self::locate(tree, path)?,
                None => None,
            };
            let entry = entry.ok_or_else(|| WikiError::NotFound(path.to_string()))?;
            debug!("raw path '{}' resolved to {}", path, entry.path);

            let content = read_blob(git, entry.id)?;
            Ok(RawContent {
                content_type: Self::content_type(&entry.path),
                path: entry.path,
                content,
            })
        })
    }

    /// Find the file `path` refers to in `tree`.
    pub fn locate(tree: &TreeHandle<'_>, path: &str) -> StorageResult<Option<BlobEntry>> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Ok(None);
        }

        if let Some(id) = tree.blob_at(path) {
            return Ok(Some(BlobEntry { path: path.to_string(), id }));
        }

        if let Some(unescaped) = percent_decode(path).filter(|u| u != path) {
            if let Some(id) = tree.blob_at(&unescaped) {
                return Ok(Some(BlobEntry { path: unescaped, id }));
            }
        }

        let stem = path.strip_suffix(PAGE_SUFFIX).unwrap_or(path);
        let mut titles = Vec::new();
        if let Ok(title) = NameCodec::normalize(stem) {
            titles.push(title);
        }
        if let Some(title) = NameCodec::from_sub_url(stem) {
            if !titles.contains(&title) {
                titles.push(title);
            }
        }

        // cheap lookups under the current encoding before scanning the tree
        for title in &titles {
            if let Ok(filename) = NameCodec::encode(title) {
                if let Some(id) = tree.blob_at(&filename) {
                    return Ok(Some(BlobEntry { path: filename, id }));
                }
            }
        }

        let pages = PageIndex::collect(tree)?;
        for title in &titles {
            let found = pages
                .iter()
                .filter(|page| &page.name == title)
                .min_by_key(|page| page.is_legacy());
            if let Some(page) = found {
                return Ok(Some(BlobEntry {
                    path: page.filename.clone(),
                    id: page.blob_id,
                }));
            }
        }

        Ok(None)
    }

    /// Media type for a stored file, chosen by extension only.
    pub fn content_type(path: &str) -> &'static str {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        extension
            .and_then(|ext| {
                BINARY_TYPES
                    .iter()
                    .find(|(known, _)| *known == ext)
                    .map(|(_, mime)| *mime)
            })
            .unwrap_or(TEXT_PLAIN)
    }
}

/// `%XX` escapes decoded; malformed escapes are kept as they are
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escape = bytes.get(i + 1..i + 3).filter(|hex| {
            bytes[i] == b'%' && hex.iter().all(u8::is_ascii_hexdigit)
        });
        if let Some(hex) = escape {
            let byte = std::str::from_utf8(hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = byte {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}
