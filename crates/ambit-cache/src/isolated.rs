//! One cache region per entity type
//!
//! Regions are created on first use by the configured factory and live as
//! long as the [`IsolatedCaches`] container.

use crate::app_cache::AppCache;
use crate::deep_clone::DeepCloneAppCache;
use crate::object_cache::{ObjectCacheAppCache, DEFAULT_CAPACITY};
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Builds the cache region for an entity type
pub type CacheFactory = Arc<dyn Fn(TypeId) -> Arc<dyn AppCache> + Send + Sync>;

/// Cache regions keyed by entity type
pub struct IsolatedCaches {
    caches: DashMap<TypeId, Arc<dyn AppCache>>,
    factory: CacheFactory,
}

impl IsolatedCaches {
    /// Create container with a custom region factory
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(TypeId) -> Arc<dyn AppCache> + Send + Sync + 'static,
    {
        Self {
            caches: DashMap::new(),
            factory: Arc::new(factory),
        }
    }

    /// Create container whose regions deep-clone over an object cache
    #[must_use]
    pub fn deep_cloning(capacity: u64) -> Self {
        Self::new(move |_| {
            Arc::new(DeepCloneAppCache::new(Arc::new(ObjectCacheAppCache::new(
                capacity,
            )))) as Arc<dyn AppCache>
        })
    }

    /// Region for `T`, created on first use
    #[inline]
    #[must_use]
    pub fn get_or_create<T: 'static>(&self) -> Arc<dyn AppCache> {
        self.get_or_create_for(TypeId::of::<T>())
    }

    /// Region for a type id, created on first use
    #[must_use]
    pub fn get_or_create_for(&self, type_id: TypeId) -> Arc<dyn AppCache> {
        let region = self
            .caches
            .entry(type_id)
            .or_insert_with(|| {
                tracing::trace!(?type_id, "creating isolated cache region");
                (self.factory)(type_id)
            });
        Arc::clone(&*region)
    }

    /// Region for `T` if it exists
    #[inline]
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Arc<dyn AppCache>> {
        self.caches
            .get(&TypeId::of::<T>())
            .map(|region| Arc::clone(&*region))
    }

    /// Empty the region for `T`, if any
    pub fn clear_cache<T: 'static>(&self) {
        if let Some(region) = self.get::<T>() {
            region.clear();
        }
    }

    /// Empty every region
    pub fn clear_all_caches(&self) {
        for region in &self.caches {
            region.value().clear();
        }
    }

    /// Number of regions created
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Whether no region was created yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

impl Default for IsolatedCaches {
    fn default() -> Self {
        Self::deep_cloning(DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for IsolatedCaches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolatedCaches")
            .field("regions", &self.caches.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_cache::AppCacheExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Document {
        name: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Media {
        path: String,
    }

    #[test]
    fn region_is_created_once_per_type() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let caches = IsolatedCaches::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(ObjectCacheAppCache::new(10)) as Arc<dyn AppCache>
        });

        let a = caches.get_or_create::<Document>();
        let b = caches.get_or_create::<Document>();
        let _ = caches.get_or_create::<Media>();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(caches.len(), 2);
    }

    #[test]
    fn regions_are_isolated_by_type() {
        let caches = IsolatedCaches::default();
        caches
            .get_or_create::<Document>()
            .insert_as("1", Document { name: "home".into() });

        assert!(caches.get_or_create::<Media>().get("1").is_none());
    }

    #[test]
    fn get_does_not_create() {
        let caches = IsolatedCaches::default();
        assert!(caches.get::<Document>().is_none());
        assert!(caches.is_empty());
    }

    #[test]
    fn clear_cache_only_touches_one_region() {
        let caches = IsolatedCaches::default();
        caches
            .get_or_create::<Document>()
            .insert_as("1", Document { name: "home".into() });
        caches
            .get_or_create::<Media>()
            .insert_as("1", Media { path: "/a.png".into() });

        caches.clear_cache::<Document>();

        assert!(caches.get_or_create::<Document>().get("1").is_none());
        assert!(caches.get_or_create::<Media>().get("1").is_some());

        caches.clear_all_caches();
        assert!(caches.get_or_create::<Media>().get("1").is_none());
    }

    #[test]
    fn default_regions_deep_clone() {
        let caches = IsolatedCaches::default();
        let region = caches.get_or_create::<Document>();
        region.insert_as("1", Document { name: "home".into() });

        let a = region.get("1").unwrap();
        let b = region.get("1").unwrap();
        assert!(!a.ptr_eq(&b));
    }
}
