//! Ambit Locking
//!
//! Lock coordination for a tree of nested scopes.
//!
//! # Core Concepts
//!
//! - [`LockId`]: lock-space identifier
//! - [`InstanceId`]: attribution key, one per scope
//! - [`DistributedLockingMechanism`]: backend handing out read/write locks
//! - [`InMemoryDistributedLockingMechanism`]: process-local backend
//! - [`LockingMechanism`]: the single lock handle shared by a scope tree
//!
//! # Example
//!
//! ```rust,ignore
//! use ambit_locking::{InMemoryDistributedLockingMechanism, InstanceId, LockId, LockingMechanism};
//! use std::sync::Arc;
//!
//! let locks = LockingMechanism::with_mechanism(Arc::new(InMemoryDistributedLockingMechanism::new()));
//! let scope = InstanceId::new();
//!
//! locks.eager_write_lock(scope, &[LockId::CONTENT_TREE], None)?;
//! // ...
//! locks.clear_locks(scope);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod locking;
pub mod mechanism;
pub mod types;

pub use error::{LockError, LockResult};
pub use locking::{LockRequest, LockingMechanism};
pub use mechanism::{
    DistributedLock, DistributedLockingMechanism, DistributedLockingMechanismFactory,
    InMemoryDistributedLockingMechanism, SharedMechanismFactory, DEFAULT_READ_LOCK_TIMEOUT,
    DEFAULT_WRITE_LOCK_TIMEOUT,
};
pub use types::{InstanceId, LockId, LockKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
