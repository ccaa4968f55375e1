//! In-memory object cache using moka

use crate::app_cache::AppCache;
use crate::item::CacheItem;
use moka::sync::Cache;
use std::time::Duration;

/// Default number of items per cache region
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Concurrent in-memory cache
///
/// Items are handed out by reference; wrap in
/// [`DeepCloneAppCache`](crate::DeepCloneAppCache) to isolate callers.
#[derive(Debug, Clone)]
pub struct ObjectCacheAppCache {
    inner: Cache<String, CacheItem>,
}

impl ObjectCacheAppCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_str().to_owned())
            .collect()
    }
}

impl Default for ObjectCacheAppCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AppCache for ObjectCacheAppCache {
    fn get(&self, key: &str) -> Option<CacheItem> {
        self.inner.get(key)
    }

    fn get_or_insert_with(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Option<CacheItem>,
    ) -> Option<CacheItem> {
        self.inner.optionally_get_with(key.to_owned(), factory)
    }

    fn insert(&self, key: &str, item: CacheItem) {
        self.inner.insert(key.to_owned(), item);
    }

    fn search_by_key(&self, prefix: &str) -> Vec<CacheItem> {
        self.keys_with_prefix(prefix)
            .iter()
            .filter_map(|key| self.inner.get(key.as_str()))
            .collect()
    }

    fn remove(&self, key: &str) {
        self.inner.invalidate(key);
    }

    fn clear_by_key(&self, prefix: &str) {
        for key in self.keys_with_prefix(prefix) {
            self.inner.invalidate(key.as_str());
        }
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }

    fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}
