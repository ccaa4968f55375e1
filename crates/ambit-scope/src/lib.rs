//! Ambit Scope
//!
//! Nested unit-of-work scopes. A scope tree coordinates locking, deferred
//! notifications, isolated caches and shadowed file-system writes for one
//! logical operation and everything it calls.
//!
//! # Core Concepts
//!
//! - [`ScopeProvider`]: creates scopes, tracks the ambient scope per thread
//! - [`CoreScope`]: one unit of work; root or child of the ambient scope
//! - [`Completion`]: tri-state outcome, ratcheted to failure by children
//! - [`ScopeOptions`] / [`ScopeSettings`]: per-scope and provider configuration
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── ScopeProvider ────────────────────────┐
//! │  ambient stacks (per thread)   lock factory   file systems    │
//! └───────────────┬───────────────────────────────────────────────┘
//!                 │ create_scope
//!                 ▼
//!   root ──────── LockingMechanism ───▶ distributed lock backend
//!    │  ├──────── ScopedNotificationPublisher ───▶ EventAggregator
//!    │  ├──────── IsolatedCaches (deep cloning)
//!    │  └──────── ShadowSession ───▶ FileSystems
//!    └── child ── forwards everything to root
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ambit_scope::{ScopeOptions, ScopeProvider, ScopeSettings};
//! use ambit_locking::LockId;
//!
//! let provider = ScopeProvider::in_memory(ScopeSettings::default());
//!
//! let scope = provider.create_scope(ScopeOptions::new())?;
//! scope.eager_write_lock(&[LockId::CONTENT_TREE])?;
//! save_document(&provider)?; // opens and completes a child scope
//! scope.complete()?;
//! let committed = scope.dispose()?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod completion;
pub mod error;
pub mod options;
pub mod provider;
pub mod scope;
pub mod settings;

pub use completion::Completion;
pub use error::{ScopeError, ScopeResult};
pub use options::ScopeOptions;
pub use provider::{ScopeProvider, ScopeProviderBuilder};
pub use scope::CoreScope;
pub use settings::{ScopeSettings, DEFAULT_READ_LOCK_TIMEOUT_MS, DEFAULT_WRITE_LOCK_TIMEOUT_MS};

pub use ambit_cache::RepositoryCacheMode;
pub use ambit_locking::{InstanceId, LockId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
