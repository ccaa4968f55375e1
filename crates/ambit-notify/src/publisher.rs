//! Scope-bound notification publisher
//!
//! Cancelable notifications are dispatched immediately so handlers can veto
//! the operation. Everything else waits for the owning scope tree to exit
//! and is only dispatched when the tree completed.

use crate::aggregator::EventAggregator;
use crate::error::{NotifyError, NotifyResult};
use crate::notification::Notification;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Publisher shared by every scope of a tree
pub struct ScopedNotificationPublisher {
    aggregator: Arc<dyn EventAggregator>,
    deferred: Mutex<Vec<Arc<dyn Notification>>>,
    suppressed: AtomicBool,
}

impl ScopedNotificationPublisher {
    /// Create publisher over an aggregator
    #[must_use]
    pub fn new(aggregator: Arc<dyn EventAggregator>) -> Self {
        Self {
            aggregator,
            deferred: Mutex::new(Vec::new()),
            suppressed: AtomicBool::new(false),
        }
    }

    /// Dispatch now; `true` when a handler cancelled
    ///
    /// Suppressed publishers dispatch nothing and report `false`.
    pub fn publish_cancelable(&self, notification: &dyn Notification) -> bool {
        if self.is_suppressed() {
            return false;
        }
        self.aggregator.publish_cancelable(notification)
    }

    /// Queue until the scope tree exits
    pub fn publish<N: Notification>(&self, notification: N) {
        self.publish_shared(Arc::new(notification));
    }

    /// Queue an already shared notification
    pub fn publish_shared(&self, notification: Arc<dyn Notification>) {
        if self.is_suppressed() {
            return;
        }
        self.deferred.lock().push(notification);
    }

    /// Flush the queue when `completed`, discard it otherwise
    ///
    /// Returns the number of notifications dispatched.
    pub fn scope_exit(&self, completed: bool) -> usize {
        let queued = std::mem::take(&mut *self.deferred.lock());
        if !completed {
            if !queued.is_empty() {
                tracing::debug!(discarded = queued.len(), "scope not completed, dropping notifications");
            }
            return 0;
        }
        for notification in &queued {
            self.aggregator.publish(notification.as_ref());
        }
        queued.len()
    }

    /// Stop queueing and dispatching until the guard is dropped
    ///
    /// # Errors
    /// `NotifyError::AlreadySuppressed` if a guard is already alive.
    pub fn suppress(&self) -> NotifyResult<NotificationSuppression<'_>> {
        if self.suppressed.swap(true, Ordering::SeqCst) {
            return Err(NotifyError::AlreadySuppressed);
        }
        Ok(NotificationSuppression { publisher: self })
    }

    /// Whether a suppression guard is alive
    #[inline]
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Notifications waiting for scope exit
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.deferred.lock().len()
    }
}

impl fmt::Debug for ScopedNotificationPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedNotificationPublisher")
            .field("pending", &self.pending())
            .field("suppressed", &self.is_suppressed())
            .finish_non_exhaustive()
    }
}

/// Suppression guard; publishing resumes when dropped
#[derive(Debug)]
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct NotificationSuppression<'a> {
    publisher: &'a ScopedNotificationPublisher,
}

impl Drop for NotificationSuppression<'_> {
    fn drop(&mut self) {
        self.publisher.suppressed.store(false, Ordering::SeqCst);
    }
}
