//! Ambit Cache
//!
//! Cache regions isolated to a scope tree.
//!
//! # Core Concepts
//!
//! - [`AppCache`]: string-keyed object cache
//! - [`ObjectCacheAppCache`]: moka-backed in-memory cache
//! - [`DeepCloneAppCache`]: decorator copying values across the cache boundary
//! - [`IsolatedCaches`]: one region per entity type, created on demand
//! - [`RepositoryCacheMode`]: how repositories use caches within a scope
//!
//! # Architecture
//!
//! ```text
//! IsolatedCaches ── TypeId ──▶ DeepCloneAppCache ──▶ ObjectCacheAppCache (moka)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod app_cache;
pub mod deep_clone;
pub mod error;
pub mod isolated;
pub mod item;
pub mod mode;
pub mod object_cache;

pub use app_cache::{AppCache, AppCacheExt};
pub use deep_clone::DeepCloneAppCache;
pub use error::{CacheError, CacheResult};
pub use isolated::{CacheFactory, IsolatedCaches};
pub use item::CacheItem;
pub use mode::RepositoryCacheMode;
pub use object_cache::{ObjectCacheAppCache, DEFAULT_CAPACITY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
