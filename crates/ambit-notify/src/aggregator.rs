//! Event aggregation: dispatch of notifications to handlers

use crate::notification::Notification;
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Receives every published notification
pub trait NotificationHandler: Send + Sync {
    /// Handle one notification
    fn handle(&self, notification: &dyn Notification);
}

/// Dispatches notifications to handlers
pub trait EventAggregator: Send + Sync {
    /// Dispatch to every handler
    fn publish(&self, notification: &dyn Notification);

    /// Dispatch and report whether any handler cancelled
    fn publish_cancelable(&self, notification: &dyn Notification) -> bool {
        self.publish(notification);
        notification.is_cancelled()
    }
}

/// Handler invoked only for notifications of type `N`
pub struct TypedHandler<N, F> {
    callback: F,
    _marker: PhantomData<fn(&N)>,
}

impl<N, F> TypedHandler<N, F>
where
    N: Notification,
    F: Fn(&N) + Send + Sync,
{
    /// Wrap callback
    #[inline]
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _marker: PhantomData,
        }
    }
}

impl<N, F> NotificationHandler for TypedHandler<N, F>
where
    N: Notification,
    F: Fn(&N) + Send + Sync,
{
    fn handle(&self, notification: &dyn Notification) {
        if let Some(typed) = notification.as_any().downcast_ref::<N>() {
            (self.callback)(typed);
        }
    }
}

/// Aggregator dispatching synchronously, in subscription order
#[derive(Default)]
pub struct InMemoryEventAggregator {
    handlers: RwLock<Vec<Arc<dyn NotificationHandler>>>,
}

impl InMemoryEventAggregator {
    /// Create aggregator without handlers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register handler
    pub fn subscribe(&self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.write().push(handler);
    }

    /// Register callback for notifications of type `N`
    pub fn on<N, F>(&self, callback: F)
    where
        N: Notification,
        F: Fn(&N) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(TypedHandler::new(callback)));
    }

    /// Number of registered handlers
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl fmt::Debug for InMemoryEventAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEventAggregator")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl EventAggregator for InMemoryEventAggregator {
    fn publish(&self, notification: &dyn Notification) {
        // Handlers may subscribe while being dispatched to
        let handlers = self.handlers.read().clone();
        tracing::trace!(?notification, handlers = handlers.len(), "publishing notification");
        for handler in handlers {
            handler.handle(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::CancelState;
    use parking_lot::Mutex;
    use std::any::Any;

    #[derive(Debug)]
    struct Published(&'static str);

    impl Notification for Published {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Default)]
    struct Deleting {
        cancel: CancelState,
    }

    impl Notification for Deleting {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn cancel_state(&self) -> Option<&CancelState> {
            Some(&self.cancel)
        }
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let aggregator = InMemoryEventAggregator::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            aggregator.on(move |n: &Published| seen.lock().push((tag, n.0)));
        }

        aggregator.publish(&Published("home"));
        assert_eq!(*seen.lock(), vec![("first", "home"), ("second", "home")]);
    }

    #[test]
    fn typed_handler_ignores_other_types() {
        let aggregator = InMemoryEventAggregator::new();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        aggregator.on(move |_: &Deleting| *counter.lock() += 1);

        aggregator.publish(&Published("home"));
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn cancelable_reports_veto() {
        let aggregator = InMemoryEventAggregator::new();
        aggregator.on(|n: &Deleting| n.cancel.cancel_operation("in use"));

        assert!(aggregator.publish_cancelable(&Deleting::default()));
        assert!(!aggregator.publish_cancelable(&Published("x")));
    }
}
