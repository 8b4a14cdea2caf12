//! Page title <-> file name mapping.
//!
//! A title is split on `/` into path segments (nested pages live in
//! directories). Each segment is encoded on its own:
//!
//! | title text            | file name text |
//! |-----------------------|----------------|
//! | `A-Z a-z 0-9 _ . ~`   | unchanged      |
//! | space                 | `-`            |
//! | `-`                   | `%2D`          |
//! | leading `.`           | `%2E`          |
//! | any other byte        | `%XX`          |
//!
//! A directory segment ending in `.md` has that dot escaped too (`x%2Emd`),
//! so no directory can take the name of a page file.
//!
//! and the last segment gets the `.md` suffix, so `Page With Spaced Name`
//! is stored as `Page-With-Spaced-Name.md` and `New/<page>` as
//! `New/%3Cpage%3E.md`.
//!
//! Older wikis wrote spaces as `-` without escaping literal hyphens, and
//! some files were committed with raw, unescaped names. Decoding tries the
//! current scheme first and falls back to the lenient legacy reading, so
//! both kinds of file list under the right title.

use std::fmt;

use serde::Serialize;

/// suffix carried by every page file
pub const PAGE_SUFFIX: &str = ".md";

/// longest encoded segment git and common filesystems accept
const MAX_SEGMENT_LEN: usize = 255;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// which encoding a file name was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// exactly what `NameCodec::encode` produces today
    Current,
    /// readable, but rewritten to the current form on the next write
    Legacy,
}

/// a page file name mapped back to its title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub title: String,
    pub encoding: Encoding,
}

/// reasons a title cannot name a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTitle {
    Empty,
    InvalidCharacter { char: char, position: usize },
    TooLong(usize),
}

impl fmt::Display for InvalidTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "title cannot be empty"),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character {:?} at position {}", char, position)
            }
            Self::TooLong(len) => {
                write!(f, "title segment too long: {} bytes once encoded", len)
            }
        }
    }
}

impl std::error::Error for InvalidTitle {}

/// One way of reading a single encoded path segment.
trait DecodeStrategy: Sync {
    fn encoding(&self) -> Encoding;

    fn decode_segment(&self, segment: &str) -> Option<String>;

    /// whether `title` read back from `stem` is acceptable for this strategy
    fn accepts(&self, _stem: &str, _title: &str) -> bool {
        true
    }
}

struct CurrentScheme;

impl DecodeStrategy for CurrentScheme {
    fn encoding(&self) -> Encoding {
        Encoding::Current
    }

    fn decode_segment(&self, segment: &str) -> Option<String> {
        let bytes = segment.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'-' => out.push(b' '),
                b'%' => {
                    let hi = hex_value(*bytes.get(i + 1)?)?;
                    let lo = hex_value(*bytes.get(i + 2)?)?;
                    out.push(hi << 4 | lo);
                    i += 2;
                }
                b'.' if i == 0 => return None,
                b if is_literal(b) => out.push(b),
                _ => return None,
            }
            i += 1;
        }
        String::from_utf8(out).ok()
    }

    /// only canonical names count as current; anything else gets migrated
    fn accepts(&self, stem: &str, title: &str) -> bool {
        encode_title(title).map(|encoded| encoded == stem).unwrap_or(false)
    }
}

struct LegacyScheme;

impl DecodeStrategy for LegacyScheme {
    fn encoding(&self) -> Encoding {
        Encoding::Legacy
    }

    fn decode_segment(&self, segment: &str) -> Option<String> {
        let bytes = segment.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            let escaped = match (bytes[i], bytes.get(i + 1), bytes.get(i + 2)) {
                (b'%', Some(&hi), Some(&lo)) => hex_value(hi).zip(hex_value(lo)),
                _ => None,
            };
            match escaped {
                Some((hi, lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                None => {
                    out.push(if bytes[i] == b'-' { b' ' } else { bytes[i] });
                    i += 1;
                }
            }
        }
        String::from_utf8(out).ok()
    }
}

/// tried in order; new schemes go in front
static DECODERS: [&dyn DecodeStrategy; 2] = [&CurrentScheme, &LegacyScheme];

/// Bidirectional mapping between page titles and stored file names.
pub struct NameCodec;

impl NameCodec {
    /// Canonical form of a title.
    ///
    /// Whitespace runs collapse to one space, each `/` segment is trimmed
    /// and empty segments are dropped.
    pub fn normalize(title: &str) -> Result<String, InvalidTitle> {
        let segments: Vec<String> = title
            .split('/')
            .map(|raw| raw.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(InvalidTitle::Empty);
        }

        let title = segments.join("/");
        if let Some((position, c)) = title.chars().enumerate().find(|(_, c)| c.is_control()) {
            return Err(InvalidTitle::InvalidCharacter { char: c, position });
        }
        Ok(title)
    }

    /// File name (path relative to the wiki root) for `title`.
    pub fn encode(title: &str) -> Result<String, InvalidTitle> {
        let title = Self::normalize(title)?;
        Ok(format!("{}{}", encode_title(&title)?, PAGE_SUFFIX))
    }

    /// Title stored under `path`, or `None` if `path` is not a page file.
    pub fn decode(path: &str) -> Option<DecodedName> {
        let stem = path.strip_suffix(PAGE_SUFFIX)?;
        Self::decode_stem(stem)
    }

    /// Link-safe form of a title, e.g. for `/wiki/<sub-url>`.
    pub fn to_sub_url(title: &str) -> Result<String, InvalidTitle> {
        let title = Self::normalize(title)?;
        encode_title(&title)
    }

    /// Title named by a sub-URL; accepts both current and legacy forms.
    pub fn from_sub_url(sub_url: &str) -> Option<String> {
        Self::decode_stem(sub_url).map(|decoded| decoded.title)
    }

    /// true when `path` is a page file rather than an auxiliary asset
    pub fn is_page_file(path: &str) -> bool {
        path.ends_with(PAGE_SUFFIX)
    }

    fn decode_stem(stem: &str) -> Option<DecodedName> {
        let segments: Vec<&str> = stem.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        DECODERS.iter().find_map(|decoder| {
            let parts = segments
                .iter()
                .map(|segment| decoder.decode_segment(segment).filter(|part| !part.contains('/')))
                .collect::<Option<Vec<_>>>()?;
            let title = Self::normalize(&parts.join("/")).ok()?;
            if !decoder.accepts(stem, &title) {
                return None;
            }
            Some(DecodedName {
                title,
                encoding: decoder.encoding(),
            })
        })
    }
}

/// encode an already normalized title, without the suffix
fn encode_title(title: &str) -> Result<String, InvalidTitle> {
    let count = title.split('/').count();
    let segments = title
        .split('/')
        .enumerate()
        .map(|(i, segment)| encode_segment(segment, i + 1 == count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

fn encode_segment(segment: &str, last: bool) -> Result<String, InvalidTitle> {
    let mut out = String::with_capacity(segment.len());
    for (i, byte) in segment.bytes().enumerate() {
        match byte {
            b' ' => out.push('-'),
            b'.' if i == 0 => push_escaped(&mut out, byte),
            b if is_literal(b) => out.push(b as char),
            _ => push_escaped(&mut out, byte),
        }
    }

    // a directory named like a page file would clash with that page
    if !last {
        if let Some(stem) = out.strip_suffix(PAGE_SUFFIX) {
            let mut escaped = stem.to_string();
            push_escaped(&mut escaped, b'.');
            escaped.push_str(&PAGE_SUFFIX[1..]);
            out = escaped;
        }
    }

    let limit = if last {
        MAX_SEGMENT_LEN - PAGE_SUFFIX.len()
    } else {
        MAX_SEGMENT_LEN
    };
    if out.len() > limit {
        return Err(InvalidTitle::TooLong(out.len()));
    }
    Ok(out)
}

fn is_literal(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'~')
}

fn push_escaped(out: &mut String, byte: u8) {
    out.push('%');
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(title: &str) -> DecodedName {
        DecodedName {
            title: title.to_string(),
            encoding: Encoding::Current,
        }
    }

    fn legacy(title: &str) -> DecodedName {
        DecodedName {
            title: title.to_string(),
            encoding: Encoding::Legacy,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(NameCodec::normalize("  Home ").unwrap(), "Home");
        assert_eq!(NameCodec::normalize("a \t  b").unwrap(), "a b");
        assert_eq!(NameCodec::normalize("/Guides / Install/").unwrap(), "Guides/Install");
        assert_eq!(NameCodec::normalize("   "), Err(InvalidTitle::Empty));
        assert_eq!(NameCodec::normalize("//"), Err(InvalidTitle::Empty));
        assert!(matches!(
            NameCodec::normalize("bad\u{0}name"),
            Err(InvalidTitle::InvalidCharacter { char: '\u{0}', position: 3 })
        ));
    }

    #[test]
    fn test_encode() {
        assert_eq!(NameCodec::encode("Home").unwrap(), "Home.md");
        assert_eq!(
            NameCodec::encode("Page With Spaced Name").unwrap(),
            "Page-With-Spaced-Name.md"
        );
        assert_eq!(NameCodec::encode("New/<page>").unwrap(), "New/%3Cpage%3E.md");
        assert_eq!(NameCodec::encode("well-known").unwrap(), "well%2Dknown.md");
        assert_eq!(NameCodec::encode(".git").unwrap(), "%2Egit.md");
        assert_eq!(NameCodec::encode("100%").unwrap(), "100%25.md");
        assert_eq!(NameCodec::encode("Café").unwrap(), "Caf%C3%A9.md");
    }

    #[test]
    fn test_directory_named_like_page_file() {
        assert_eq!(NameCodec::encode("x.md/y").unwrap(), "x%2Emd/y.md");
        assert_eq!(NameCodec::encode("a.md/b.md/c").unwrap(), "a%2Emd/b%2Emd/c.md");
        assert_eq!(NameCodec::encode("notes/x.md").unwrap(), "notes/x.md.md");
        assert_eq!(NameCodec::decode("x%2Emd/y.md"), Some(current("x.md/y")));
        // the unescaped directory still reads, but only as legacy
        assert_eq!(NameCodec::decode("x.md/y.md"), Some(legacy("x.md/y")));
    }

    #[test]
    fn test_symbol_only_title() {
        let encoded = NameCodec::encode("&&&&").unwrap();
        assert_eq!(encoded, "%26%26%26%26.md");
        assert_eq!(NameCodec::decode(&encoded), Some(current("&&&&")));
        assert_ne!(NameCodec::encode("&&&").unwrap(), encoded);
    }

    #[test]
    fn test_decode_current() {
        assert_eq!(NameCodec::decode("Home.md"), Some(current("Home")));
        assert_eq!(
            NameCodec::decode("Page-With-Spaced-Name.md"),
            Some(current("Page With Spaced Name"))
        );
        assert_eq!(NameCodec::decode("New/%3Cpage%3E.md"), Some(current("New/<page>")));
        assert_eq!(NameCodec::decode("well%2Dknown.md"), Some(current("well-known")));
    }

    #[test]
    fn test_decode_legacy() {
        assert_eq!(NameCodec::decode("Unescaped File.md"), Some(legacy("Unescaped File")));
        assert_eq!(NameCodec::decode("50%off.md"), Some(legacy("50%off")));
        // lowercase escapes are readable but not canonical
        assert_eq!(NameCodec::decode("%3cb%3e.md"), Some(legacy("<b>")));
        assert_eq!(NameCodec::decode("a--b.md"), Some(legacy("a b")));
    }

    #[test]
    fn test_decode_non_pages() {
        assert_eq!(NameCodec::decode("jpeg.jpg"), None);
        assert_eq!(NameCodec::decode("images/jpeg.jpg"), None);
        assert_eq!(NameCodec::decode(".md"), None);
        assert_eq!(NameCodec::decode("dir//x.md"), None);
        assert_eq!(NameCodec::decode("%2F.md"), None);
        assert_eq!(NameCodec::decode("%FF.md"), None);
    }

    #[test]
    fn test_too_long() {
        let title = "x".repeat(300);
        assert!(matches!(NameCodec::encode(&title), Err(InvalidTitle::TooLong(300))));
    }

    #[test]
    fn test_sub_url() {
        assert_eq!(
            NameCodec::to_sub_url("Page With Spaced Name").unwrap(),
            "Page-With-Spaced-Name"
        );
        assert_eq!(
            NameCodec::from_sub_url("Page-With-Spaced-Name").as_deref(),
            Some("Page With Spaced Name")
        );
        assert_eq!(NameCodec::from_sub_url("New/%3Cpage%3E").as_deref(), Some("New/<page>"));
    }

    #[test]
    fn test_is_page_file() {
        assert!(NameCodec::is_page_file("Home.md"));
        assert!(!NameCodec::is_page_file("images/jpeg.jpg"));
    }
}
