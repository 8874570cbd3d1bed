//! Per-artifact-path mutual exclusion for fetches.
//!
//! Two runs resolving the same media share one destination path. Holding the
//! path's guard across cache check and fetch means a duplicate request waits
//! for the first fetch and then sees a cache hit instead of racing it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Registry of async locks keyed by artifact path.
///
/// Cheap to clone; clones share the same registry. Entries are removed when
/// the last guard for a path is released and nobody else is waiting.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    // Arc values let a waiter release the shard lock before awaiting the mutex.
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Exclusive hold on one artifact path; released on drop.
#[derive(Debug)]
pub struct PathGuard {
    path: PathBuf,
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PathLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other run holds `path`, then holds it.
    pub async fn acquire(&self, path: &Path) -> PathGuard {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        trace!(path = %path.display(), "waiting for artifact lock");
        let guard = mutex.lock_owned().await;
        PathGuard {
            path: path.to_path_buf(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Number of paths currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        // Release first, then drop the entry when only the registry references it.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.path, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_path_is_serialized() {
        let locks = PathLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(Path::new("/srv/music/a.m4a")).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task join");
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 0, "entries must be cleaned up");
    }

    #[tokio::test]
    async fn test_distinct_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.acquire(Path::new("/srv/music/a.m4a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(Path::new("/srv/music/b.m4a")),
        )
        .await;
        assert!(b.is_ok(), "different path must not wait");
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = PathLocks::new();
        {
            let _guard = locks.acquire(Path::new("/srv/music/a.m4a")).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
