//! Deferred notifications flushed when the scope tree completes
//!
use ambit_notify::{CancelState, EventAggregator, InMemoryEventAggregator, Notification};
use ambit_scope::{ScopeError, ScopeOptions, ScopeProvider};
use ambit_test_utils::{provider_with_fixtures, TestNotification};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ContentDeleting {
    cancel: CancelState,
}

impl Notification for ContentDeleting {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn cancel_state(&self) -> Option<&CancelState> {
        Some(&self.cancel)
    }
}

#[test]
fn notifications_wait_for_root_completion() -> anyhow::Result<()> {
    let (provider, _fs, aggregator) = provider_with_fixtures();

    let root = provider.create_scope(ScopeOptions::new())?;
    let child = provider.create_scope(ScopeOptions::new())?;
    child.notifications()?.publish(TestNotification("saved"));
    child.complete()?;
    child.dispose()?;
    assert!(aggregator.published().is_empty());

    root.notifications()?.publish(TestNotification("published"));
    root.complete()?;
    root.dispose()?;

    assert_eq!(aggregator.published(), vec!["saved", "published"]);
    Ok(())
}

#[test]
fn failed_tree_drops_notifications() -> anyhow::Result<()> {
    let (provider, _fs, aggregator) = provider_with_fixtures();

    let root = provider.create_scope(ScopeOptions::new())?;
    let child = provider.create_scope(ScopeOptions::new())?;
    child.notifications()?.publish(TestNotification("saved"));
    child.dispose()?;
    root.complete()?;
    root.dispose()?;

    assert!(aggregator.published().is_empty());
    Ok(())
}

#[test]
fn cancelable_notifications_dispatch_immediately() -> anyhow::Result<()> {
    let (provider, _fs, aggregator) = provider_with_fixtures();
    let scope = provider.create_scope(ScopeOptions::new())?;

    let deleting = ContentDeleting::default();
    assert!(!scope.notifications()?.publish_cancelable(&deleting));
    assert_eq!(aggregator.published().len(), 1);

    scope.dispose()?;
    Ok(())
}

#[test]
fn suppression_is_not_reentrant() -> anyhow::Result<()> {
    let (provider, _fs, aggregator) = provider_with_fixtures();
    let scope = provider.create_scope(ScopeOptions::new())?;
    let publisher = scope.notifications()?;

    let guard = publisher.suppress()?;
    publisher.publish(TestNotification("hidden"));
    let err: ScopeError = publisher.suppress().unwrap_err().into();
    assert!(matches!(err, ScopeError::Notify(_)));
    drop(guard);

    publisher.publish(TestNotification("visible"));
    scope.complete()?;
    scope.dispose()?;

    assert_eq!(aggregator.published(), vec!["visible"]);
    Ok(())
}

#[test]
fn handlers_open_fresh_trees_while_the_root_flushes() -> anyhow::Result<()> {
    let aggregator = Arc::new(InMemoryEventAggregator::new());
    let shared: Arc<dyn EventAggregator> = Arc::<InMemoryEventAggregator>::clone(&aggregator);
    let provider = ScopeProvider::builder().with_event_aggregator(shared).build();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handler_depths = Arc::new(Mutex::new(Vec::new()));

    {
        let provider = provider.clone();
        let seen = Arc::clone(&seen);
        let handler_depths = Arc::clone(&handler_depths);
        aggregator.on(move |notification: &TestNotification| {
            seen.lock().push(notification.0);
            if notification.0 != "saved" {
                return;
            }
            let scope = provider.create_scope(ScopeOptions::new()).unwrap();
            handler_depths.lock().push(scope.depth());
            scope.notifications().unwrap().publish(TestNotification("follow-up"));
            scope.complete().unwrap();
            assert!(scope.dispose().unwrap());
        });
    }

    let root = provider.create_scope(ScopeOptions::new())?;
    root.notifications()?.publish(TestNotification("saved"));
    root.complete()?;
    assert!(root.dispose()?);

    assert_eq!(*handler_depths.lock(), vec![0]);
    assert_eq!(*seen.lock(), vec!["saved", "follow-up"]);
    assert_eq!(provider.ambient_depth(), 0);
    Ok(())
}
