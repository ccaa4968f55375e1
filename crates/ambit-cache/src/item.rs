//! Type-erased cache values

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

type ErasedValue = Arc<dyn Any + Send + Sync>;
type Cloner = fn(&(dyn Any + Send + Sync)) -> Option<ErasedValue>;

/// A cached value
///
/// Items built with [`CacheItem::new`] know how to produce an independent
/// copy of themselves; items built with [`CacheItem::shared`] are always
/// handed out by reference.
#[derive(Clone)]
pub struct CacheItem {
    value: ErasedValue,
    cloner: Option<Cloner>,
    type_name: &'static str,
}

fn clone_value<T: Any + Send + Sync + Clone>(value: &(dyn Any + Send + Sync)) -> Option<ErasedValue> {
    value
        .downcast_ref::<T>()
        .map(|typed| Arc::new(typed.clone()) as ErasedValue)
}

impl CacheItem {
    /// Wrap a cloneable value
    #[must_use]
    pub fn new<T: Any + Send + Sync + Clone>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            cloner: Some(clone_value::<T>),
            type_name: type_name::<T>(),
        }
    }

    /// Wrap a value that is shared rather than copied
    #[must_use]
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            cloner: None,
            type_name: type_name::<T>(),
        }
    }

    /// Borrow the value as `T`
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    /// Whether the value is a `T`
    #[inline]
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        (*self.value).is::<T>()
    }

    /// Rust type name of the stored value
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether [`CacheItem::deep_clone`] produces an independent copy
    #[inline]
    #[must_use]
    pub fn is_deep_cloneable(&self) -> bool {
        self.cloner.is_some()
    }

    /// Independent copy of the value, or the same value if it is shared-only
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let value = self
            .cloner
            .and_then(|cloner| cloner(self.value.as_ref()))
            .unwrap_or_else(|| Arc::clone(&self.value));
        Self {
            value,
            cloner: self.cloner,
            type_name: self.type_name,
        }
    }

    /// Whether both items point at the same allocation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.value).cast::<()>() == Arc::as_ptr(&other.value).cast::<()>()
    }
}

impl fmt::Debug for CacheItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem")
            .field("type", &self.type_name)
            .field("deep_cloneable", &self.is_deep_cloneable())
            .finish()
    }
}
