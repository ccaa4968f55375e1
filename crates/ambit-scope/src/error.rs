//! Error types for scopes
//!
//! Nesting violations are programming errors and always surface as
//! [`ScopeError`]. A scope that simply never completed is not an error: it
//! is recorded as failure and propagated to the ancestors.
//!
//! Disposing a scope that still has a live child is reported on the parent
//! as [`ScopeError::LiveDescendants`]. Should the parent be torn down anyway,
//! the orphaned child later gets [`ScopeError::AncestorDisposed`].

use ambit_fs::FsError;
use ambit_locking::{InstanceId, LockError};
use ambit_notify::NotifyError;

/// Main scope error type
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// Operation on a scope that was already disposed
    #[error("scope {instance_id} is already disposed")]
    Disposed {
        /// Offending scope
        instance_id: InstanceId,
    },

    /// Disposal while child scopes are still live
    ///
    /// Raised on the scope being disposed, before anything is torn down. It is
    /// the ancestor-side error for out-of-order disposal: the live children
    /// would otherwise be left with a disposed ancestor.
    #[error("scope {instance_id} cannot be disposed while {live} child scope(s) are live")]
    LiveDescendants {
        /// Offending scope
        instance_id: InstanceId,
        /// Number of live children
        live: usize,
    },

    /// An ancestor was torn down before this scope
    #[error("scope {instance_id} has an ancestor that is already disposed")]
    AncestorDisposed {
        /// Offending scope
        instance_id: InstanceId,
    },

    /// Disposal of a scope that is not the ambient one
    #[error("scope {instance_id} is not the ambient scope")]
    NotAmbient {
        /// Offending scope
        instance_id: InstanceId,
    },

    /// Shadowing requested but the provider has no file systems
    #[error("no file systems configured, cannot shadow")]
    ShadowUnavailable,

    /// Lock acquisition failed
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Shadow session failed
    #[error("file system error: {0}")]
    FileSystem(#[from] FsError),

    /// Notification publishing failed
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Invalid settings
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScopeError {
    /// Whether the error is a nesting-contract violation by the caller
    #[inline]
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::Disposed { .. }
                | Self::LiveDescendants { .. }
                | Self::AncestorDisposed { .. }
                | Self::NotAmbient { .. }
        )
    }

    /// Whether the error is a lock timeout
    #[inline]
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Lock(error) if error.is_timeout())
    }
}

/// Result type alias for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ambit_locking::{LockId, LockKind};
    use std::time::Duration;

    #[test]
    fn lock_timeouts_are_distinguished() {
        let timeout: ScopeError =
            LockError::timeout(LockId::CONTENT_TREE, LockKind::Write, Duration::from_millis(5)).into();
        let denied: ScopeError = LockError::denied(LockId::CONTENT_TREE, LockKind::Write, "read only").into();

        assert!(timeout.is_lock_timeout());
        assert!(!denied.is_lock_timeout());
        assert!(!timeout.is_misuse());
    }

    #[test]
    fn nesting_violations_are_misuse() {
        let instance_id = InstanceId::new();
        assert!(ScopeError::Disposed { instance_id }.is_misuse());
        assert!(ScopeError::LiveDescendants { instance_id, live: 1 }.is_misuse());
        assert!(!ScopeError::ShadowUnavailable.is_misuse());
    }
}
