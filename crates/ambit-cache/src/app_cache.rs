//! Cache abstraction shared by every cache region

use crate::error::{CacheError, CacheResult};
use crate::item::CacheItem;
use std::any::{type_name, Any};
use std::fmt::Debug;

/// String-keyed object cache
pub trait AppCache: Send + Sync + Debug {
    /// Item stored under `key`
    fn get(&self, key: &str) -> Option<CacheItem>;

    /// Item stored under `key`, computing and storing it when absent
    ///
    /// A factory returning `None` stores nothing.
    fn get_or_insert_with(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Option<CacheItem>,
    ) -> Option<CacheItem>;

    /// Store item, replacing any previous one
    fn insert(&self, key: &str, item: CacheItem);

    /// Items whose key starts with `prefix`
    fn search_by_key(&self, prefix: &str) -> Vec<CacheItem>;

    /// Remove one key
    fn remove(&self, key: &str);

    /// Remove every key starting with `prefix`
    fn clear_by_key(&self, prefix: &str);

    /// Remove everything
    fn clear(&self);

    /// Number of stored items
    fn entry_count(&self) -> u64;
}

/// Typed helpers over [`AppCache`]
pub trait AppCacheExt: AppCache {
    /// Copy of the value under `key` if it is a `T`
    fn get_as<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|item| item.downcast_ref::<T>().cloned())
    }

    /// Copy of the value under `key`, failing when it holds another type
    ///
    /// # Errors
    /// `CacheError::TypeMismatch` when the stored value is not a `T`.
    fn try_get_as<T: Any + Clone>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(item) => item
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| CacheError::type_mismatch(key, type_name::<T>(), item.type_name())),
        }
    }

    /// Store a cloneable value
    fn insert_as<T: Any + Send + Sync + Clone>(&self, key: &str, value: T) {
        self.insert(key, CacheItem::new(value));
    }

    /// Copy of the value under `key`, computing it when absent
    fn get_or_insert_as<T, F>(&self, key: &str, factory: F) -> Option<T>
    where
        T: Any + Send + Sync + Clone,
        F: FnOnce() -> T,
    {
        let mut factory = Some(factory);
        self.get_or_insert_with(key, &mut || factory.take().map(|f| CacheItem::new(f())))
            .and_then(|item| item.downcast_ref::<T>().cloned())
    }
}

impl<C: AppCache + ?Sized> AppCacheExt for C {}
