//! Concurrent writers on one wiki.

use std::sync::{Arc, Barrier};
use std::thread;

use gitwiki::storage::Author;
use gitwiki::wiki::{Wiki, WikiError};
use tempfile::TempDir;

const WRITERS: usize = 8;

fn run_writers<T, F>(wiki: &Wiki, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(Wiki, usize) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(WRITERS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let wiki = wiki.clone();
            let barrier = barrier.clone();
            let f = f.clone();
            thread::spawn(move || {
                barrier.wait();
                f(wiki, n)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn distinct_titles_are_never_lost() {
    let dir = TempDir::new().unwrap();
    let wiki = Wiki::open(dir.path()).unwrap();

    let results = run_writers(&wiki, |wiki, n| {
        let author = Author::new(format!("writer{}", n), "writer@example.com");
        wiki.create_page(&format!("Page {}", n), b"content", None, &author)
    });
    assert!(results.iter().all(Result::is_ok));

    let pages = wiki.list_pages().unwrap();
    assert_eq!(pages.len(), WRITERS);
    for n in 0..WRITERS {
        let title = format!("Page {}", n);
        assert!(pages.iter().any(|p| p.name == title), "missing {}", title);
    }
}

#[test]
fn same_title_has_exactly_one_winner() {
    let dir = TempDir::new().unwrap();
    let wiki = Wiki::open(dir.path()).unwrap();

    let results = run_writers(&wiki, |wiki, n| {
        wiki.create_page("Contested", format!("writer {}", n).as_bytes(), None, &Author::system())
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(WikiError::AlreadyExists(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, WRITERS - 1);
    assert_eq!(wiki.list_pages().unwrap().len(), 1);
}

#[test]
fn handles_opened_separately_share_the_lock() {
    let dir = TempDir::new().unwrap();
    let first = Wiki::open(dir.path()).unwrap();

    let path = dir.path().to_path_buf();
    let results = run_writers(&first, move |_, n| {
        let wiki = Wiki::open(&path).unwrap();
        wiki.create_page(&format!("Separate {}", n), b"x", None, &Author::system())
    });
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(first.list_pages().unwrap().len(), WRITERS);
}

#[test]
fn readers_see_whole_commits() {
    let dir = TempDir::new().unwrap();
    let wiki = Wiki::open(dir.path()).unwrap();
    wiki.create_page("Home", b"start", None, &Author::system()).unwrap();

    let writer = {
        let wiki = wiki.clone();
        thread::spawn(move || {
            for n in 0..20 {
                let from = if n == 0 { "Home".to_string() } else { format!("Moved {}", n - 1) };
                wiki.rename_page(&from, &format!("Moved {}", n), b"moving", None, &Author::system())
                    .unwrap();
            }
        })
    };

    for _ in 0..50 {
        // a rename never shows both names, nor neither
        assert_eq!(wiki.list_pages().unwrap().len(), 1);
    }
    writer.join().unwrap();
    assert_eq!(wiki.list_pages().unwrap()[0].name, "Moved 19");
}
