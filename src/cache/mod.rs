//! Conversation Cache Store
//!
//! Information Hiding:
//! - Recency bookkeeping (`lru::LruCache`) hidden behind get/set/delete
//! - Locking hidden inside the cloneable `CacheStore` handle
//! - One store per process, injected into every engine that should share it

use crate::core::{Cursor, UnifiedMessage};
use lru::LruCache;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

/// Cached page state for one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Oldest to newest, unique by id
    pub messages: Vec<UnifiedMessage>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
    pub updated_at: SystemTime,
}

impl CacheEntry {
    pub fn new(messages: Vec<UnifiedMessage>, next_cursor: Option<Cursor>, has_more: bool) -> Self {
        Self {
            messages,
            next_cursor,
            has_more,
            updated_at: SystemTime::now(),
        }
    }
}

/// Least-recently-used map from conversation key to [`CacheEntry`].
///
/// Capacity is enforced per `set` call rather than by the underlying
/// `LruCache`, so engines with different `cache_size` options can share it.
#[derive(Debug)]
pub struct LruStore {
    entries: LruCache<String, CacheEntry>,
}

impl Default for LruStore {
    fn default() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }
}

impl LruStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` and mark it most recently used
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Insert or overwrite `key`, then evict the least recently used keys
    /// until at most `max_size` remain.
    ///
    /// Returns the evicted keys, oldest first.
    pub fn set(&mut self, key: &str, entry: CacheEntry, max_size: usize) -> Vec<String> {
        self.entries.put(key.to_string(), entry);

        let mut evicted = Vec::new();
        while self.entries.len() > max_size {
            let Some((oldest, _)) = self.entries.pop_lru() else {
                break;
            };
            tracing::debug!("[CacheStore] Evicted conversation '{}'", oldest);
            evicted.push(oldest);
        }
        evicted
    }

    /// Remove `key`; no-op when absent
    pub fn delete(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.pop(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shared handle to a process-wide [`LruStore`].
///
/// Cloning the handle shares the underlying store. Every method locks for
/// the duration of one synchronous call only.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    inner: Arc<Mutex<LruStore>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, entry: CacheEntry, max_size: usize) -> Vec<String> {
        self.lock().set(key, entry, max_size)
    }

    pub fn delete(&self, key: &str) {
        if self.lock().delete(key).is_some() {
            tracing::debug!("[CacheStore] Deleted conversation '{}'", key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruStore> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
