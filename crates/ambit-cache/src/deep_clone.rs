//! Deep-cloning cache decorator
//!
//! Values are copied on the way in and on the way out, so a caller that
//! mutates what it got back never touches the cached copy.

use crate::app_cache::AppCache;
use crate::item::CacheItem;
use std::sync::Arc;

/// Decorator copying values across the cache boundary
#[derive(Debug, Clone)]
pub struct DeepCloneAppCache {
    inner: Arc<dyn AppCache>,
}

impl DeepCloneAppCache {
    /// Wrap cache
    #[inline]
    #[must_use]
    pub fn new(inner: Arc<dyn AppCache>) -> Self {
        Self { inner }
    }

    /// Wrapped cache
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn AppCache> {
        &self.inner
    }
}

impl AppCache for DeepCloneAppCache {
    fn get(&self, key: &str) -> Option<CacheItem> {
        self.inner.get(key).map(|item| item.deep_clone())
    }

    fn get_or_insert_with(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Option<CacheItem>,
    ) -> Option<CacheItem> {
        self.inner
            .get_or_insert_with(key, &mut || factory().map(|item| item.deep_clone()))
            .map(|item| item.deep_clone())
    }

    fn insert(&self, key: &str, item: CacheItem) {
        self.inner.insert(key, item.deep_clone());
    }

    fn search_by_key(&self, prefix: &str) -> Vec<CacheItem> {
        self.inner
            .search_by_key(prefix)
            .iter()
            .map(CacheItem::deep_clone)
            .collect()
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    fn clear_by_key(&self, prefix: &str) {
        self.inner.clear_by_key(prefix);
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
