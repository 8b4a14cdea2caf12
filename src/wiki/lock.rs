//! Per-wiki writer locks.
//!
//! Writers of the same wiki are serialized from reading the head until the
//! branch has moved; writers of different wikis never wait on each other.
//! Locks are created on first use and kept for the life of the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::debug;
use parking_lot::Mutex;

/// Keyed mutual-exclusion registry, one lock per repository identity.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
#[derive(Clone, Default)]
pub struct WikiLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl WikiLocks {
    /// Create an empty registry, independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry every store uses unless told otherwise.
    pub fn global() -> &'static WikiLocks {
        static LOCKS: OnceLock<WikiLocks> = OnceLock::new();
        LOCKS.get_or_init(WikiLocks::new)
    }

    fn handle(&self, key: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock();
        locks
            .entry(key.to_path_buf())
            .or_insert_with(|| {
                debug!("creating writer lock for {}", key.display());
                Arc::new(Mutex::new(()))
            })
            .clone()
    }

    /// Run `f` while holding the lock for `key`, blocking until it is free.
    pub fn with_lock<T>(&self, key: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.handle(key);
        let _guard = lock.lock();
        f()
    }

    /// Like `with_lock`, but gives up immediately if another writer holds it.
    pub fn try_with_lock<T>(&self, key: &Path, f: impl FnOnce() -> T) -> Option<T> {
        let lock = self.handle(key);
        let _guard = lock.try_lock()?;
        Some(f())
    }

    /// Number of wikis that have been locked at least once.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = WikiLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                thread::spawn(move || {
                    locks.with_lock(Path::new("/wiki/a"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_different_keys_do_not_block() {
        let locks = WikiLocks::new();
        locks.with_lock(Path::new("/wiki/a"), || {
            let other = locks.clone();
            let done = thread::spawn(move || other.with_lock(Path::new("/wiki/b"), || true));
            assert!(done.join().unwrap());
        });
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_try_with_lock_when_held() {
        let locks = WikiLocks::new();
        locks.with_lock(Path::new("/wiki/a"), || {
            let other = locks.clone();
            let attempt = thread::spawn(move || other.try_with_lock(Path::new("/wiki/a"), || ()));
            assert!(attempt.join().unwrap().is_none());
        });
        assert!(locks.try_with_lock(Path::new("/wiki/a"), || ()).is_some());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(WikiLocks::global(), WikiLocks::global()));
    }
}
