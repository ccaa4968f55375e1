//! Error types for lock coordination
//!
//! Timeouts are kept apart from denials so callers can tell contention
//! from refusal.

use crate::types::{LockId, LockKind};
use std::time::Duration;

/// Lock acquisition and bookkeeping errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// Lock could not be obtained before the timeout elapsed
    #[error("timed out after {timeout:?} waiting for {kind} lock on {lock_id}")]
    Timeout {
        lock_id: LockId,
        kind: LockKind,
        timeout: Duration,
    },

    /// Backend refused the lock
    #[error("{kind} lock on {lock_id} denied: {reason}")]
    Denied {
        lock_id: LockId,
        kind: LockKind,
        reason: String,
    },

    /// Write requested on a lock space this tree only holds for reading
    #[error("cannot upgrade read lock on {lock_id} to a write lock")]
    Upgrade { lock_id: LockId },

    /// Backend is disabled or unreachable
    #[error("distributed locking is unavailable")]
    Unavailable,

    /// Locking mechanism already released its tree
    #[error("locking mechanism is disposed")]
    Disposed,
}

impl LockError {
    /// Create timeout error
    pub fn timeout(lock_id: LockId, kind: LockKind, timeout: Duration) -> Self {
        Self::Timeout {
            lock_id,
            kind,
            timeout,
        }
    }

    /// Create denied error
    pub fn denied(lock_id: LockId, kind: LockKind, reason: impl Into<String>) -> Self {
        Self::Denied {
            lock_id,
            kind,
            reason: reason.into(),
        }
    }

    /// Check if error is a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for lock operations
pub type LockResult<T> = Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = LockError::timeout(LockId::CONTENT_TREE, LockKind::Write, Duration::from_secs(5));
        assert_eq!(
            err.to_string(),
            "timed out after 5s waiting for write lock on #-333"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn denied_is_not_timeout() {
        let err = LockError::denied(LockId::MEDIA_TREE, LockKind::Read, "deadlock victim");
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("deadlock victim"));
    }
}
