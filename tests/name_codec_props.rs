//! Property-based tests for the title <-> file name mapping.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated titles.

use proptest::prelude::*;

use gitwiki::wiki::{Encoding, NameCodec, PAGE_SUFFIX};

/// Characters a title may contain, weighted towards the awkward ones.
fn title_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just(' '),
        Just('-'),
        Just('.'),
        Just('_'),
        Just('~'),
        Just('%'),
        Just('&'),
        Just('<'),
        Just('>'),
        Just('?'),
        Just('#'),
        Just('\t'),
        Just('é'),
        Just('ß'),
        Just('日'),
        Just('\u{a0}'),
    ]
}

fn segment() -> impl Strategy<Value = String> {
    prop::collection::vec(title_char(), 0..24).prop_map(|chars| chars.into_iter().collect())
}

/// Titles that normalize successfully; up to three `/`-separated segments.
fn title() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4)
        .prop_map(|segments| segments.join("/"))
        .prop_filter("must normalize", |t| NameCodec::normalize(t).is_ok())
}

proptest! {
    #[test]
    fn decode_inverts_encode(t in title()) {
        let encoded = NameCodec::encode(&t).unwrap();
        let decoded = NameCodec::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.title, NameCodec::normalize(&t).unwrap());
        prop_assert_eq!(decoded.encoding, Encoding::Current);
    }

    #[test]
    fn distinct_titles_never_collide(a in title(), b in title()) {
        let (na, nb) = (NameCodec::normalize(&a).unwrap(), NameCodec::normalize(&b).unwrap());
        let (ea, eb) = (NameCodec::encode(&a).unwrap(), NameCodec::encode(&b).unwrap());
        prop_assert_eq!(na == nb, ea == eb);
    }

    #[test]
    fn encoded_names_are_plain_paths(t in title()) {
        let encoded = NameCodec::encode(&t).unwrap();
        prop_assert!(encoded.ends_with(PAGE_SUFFIX));
        let parts: Vec<&str> = encoded.split('/').collect();
        for (i, part) in parts.iter().enumerate() {
            if i + 1 < parts.len() {
                prop_assert!(!part.ends_with(PAGE_SUFFIX));
            }
            prop_assert!(!part.is_empty());
            prop_assert!(!part.starts_with('.'));
            prop_assert!(part.bytes().all(|b| b.is_ascii_graphic()));
        }
    }

    #[test]
    fn normalize_is_idempotent(t in title()) {
        let once = NameCodec::normalize(&t).unwrap();
        prop_assert_eq!(NameCodec::normalize(&once).unwrap(), once.clone());
    }

    #[test]
    fn sub_url_round_trips(t in title()) {
        let sub_url = NameCodec::to_sub_url(&t).unwrap();
        prop_assert_eq!(NameCodec::from_sub_url(&sub_url), Some(NameCodec::normalize(&t).unwrap()));
    }
}
