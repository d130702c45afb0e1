//! In-memory page cache keyed by [`QueryKey`].
//!
//! Entries go stale after a time-to-live or when invalidated. Invalidation only
//! marks entries; the data stays readable as placeholder until replaced.

use std::collections::HashMap;
use std::time::Duration;

use ld_core::{LeadsPage, QueryKey};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct QueryCache {
    inner: Mutex<Inner>,
    stale_time: Duration,
}

struct Inner {
    entries: HashMap<QueryKey, CacheEntry>,
}

struct CacheEntry {
    page: LeadsPage,
    updated_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(page: LeadsPage) -> Self {
        Self {
            page,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
            }),
            stale_time,
        }
    }

    /// Cached page for `key`, fresh or not.
    pub async fn get(&self, key: &QueryKey) -> Option<LeadsPage> {
        let inner = self.inner.lock().await;
        inner.entries.get(key).map(|e| e.page.clone())
    }

    /// Cached page for `key` only if it is still fresh.
    pub async fn get_fresh(&self, key: &QueryKey) -> Option<LeadsPage> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .filter(|e| self.is_entry_fresh(e))
            .map(|e| e.page.clone())
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let inner = self.inner.lock().await;
        inner
            .entries
            .get(key)
            .map(|e| !self.is_entry_fresh(e))
            .unwrap_or(true)
    }

    pub async fn put(&self, key: QueryKey, page: LeadsPage) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(key, CacheEntry::new(page));
    }

    /// Store a fetched page unless its request was cancelled in the meantime.
    ///
    /// The token is checked under the cache lock so a concurrent optimistic
    /// patch either sees this write or supersedes it, never both.
    pub async fn put_unless_cancelled(
        &self,
        key: QueryKey,
        page: LeadsPage,
        token: &CancellationToken,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            debug!(key = %key, "Dropping response of cancelled fetch");
            return false;
        }
        inner.entries.insert(key, CacheEntry::new(page));
        true
    }

    /// Mutate the cached page for `key` in place.
    ///
    /// Returns `false` when nothing is cached for `key`. Freshness is untouched.
    pub async fn patch<F>(&self, key: &QueryKey, f: F) -> bool
    where
        F: FnOnce(&mut LeadsPage),
    {
        let mut inner = self.inner.lock().await;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                f(&mut entry.page);
                true
            }
            None => false,
        }
    }

    /// Mutate every cached page; returns how many pages `f` reported as changed.
    pub async fn patch_all<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&mut LeadsPage) -> bool,
    {
        let mut inner = self.inner.lock().await;
        inner
            .entries
            .values_mut()
            .map(|entry| f(&mut entry.page))
            .filter(|changed| *changed)
            .count()
    }

    /// Put back a snapshot taken with [`QueryCache::get`].
    ///
    /// `None` removes the entry, restoring the "nothing cached" state.
    pub async fn restore(&self, key: &QueryKey, snapshot: Option<LeadsPage>) {
        let mut inner = self.inner.lock().await;
        match snapshot {
            Some(page) => match inner.entries.get_mut(key) {
                Some(entry) => entry.page = page,
                None => {
                    inner.entries.insert(key.clone(), CacheEntry::new(page));
                }
            },
            None => {
                inner.entries.remove(key);
            }
        }
    }

    pub async fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Mark every entry whose key starts with `prefix` as stale.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let mut count = 0usize;
        for (key, entry) in inner.entries.iter_mut() {
            if key.has_prefix(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!(prefix, count, "Invalidated cached pages");
        count
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    fn is_entry_fresh(&self, entry: &CacheEntry) -> bool {
        !entry.invalidated && entry.updated_at.elapsed() < self.stale_time
    }
}
