//! Scopes and the scope tree
//!
//! Every scope is a node holding a strong reference to its parent. The root
//! owns what the whole tree shares: the lock handle, the notification
//! publisher, the isolated caches and the optional shadow session. Children
//! never create their own; they forward to the root.
//!
//! ```text
//!   root ── locks, notifications, isolated caches, shadow
//!    ▲
//!    ├── child (depth 1) ── forwards to root
//!    │     ▲
//!    │     └── grandchild (depth 2)
//!    └── child (depth 1)
//! ```
//!
//! Disposal runs innermost first. A child that did not complete fails its
//! parent, and that failure climbs to the root, whose final outcome decides
//! whether the shadowed writes and deferred notifications are committed.

use crate::completion::Completion;
use crate::error::{ScopeError, ScopeResult};
use crate::options::ScopeOptions;
use crate::provider::ScopeProvider;
use crate::settings::ScopeSettings;
use ambit_cache::{IsolatedCaches, RepositoryCacheMode};
use ambit_fs::{Completable, ShadowSession};
use ambit_locking::{InstanceId, LockId, LockingMechanism};
use ambit_notify::{EventAggregator, ScopedNotificationPublisher};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Resources shared by a whole tree, held by its root
struct TreeResources {
    aggregator: Arc<dyn EventAggregator>,
    default_cache_mode: RepositoryCacheMode,
    cache_capacity: u64,
    notifications: OnceCell<Arc<ScopedNotificationPublisher>>,
    caches: OnceCell<Arc<IsolatedCaches>>,
    shadow: Mutex<Option<ShadowSession>>,
}

impl TreeResources {
    /// Settle the shadow and the deferred notifications
    fn finish(&self, completed: bool) -> ScopeResult<()> {
        let session = self.shadow.lock().take();
        let shadowed = match session {
            Some(mut session) => {
                if completed {
                    session.complete();
                }
                session.dispose()
            }
            None => Ok(()),
        };

        if let Some(publisher) = self.notifications.get() {
            let published = publisher.scope_exit(completed && shadowed.is_ok());
            tracing::trace!(published, "deferred notifications settled");
        }
        shadowed.map_err(ScopeError::from)
    }
}

enum Link {
    Root(TreeResources),
    Child(Arc<ScopeNode>),
}

#[derive(Debug, Default)]
struct NodeState {
    completion: Completion,
    disposed: bool,
    live_children: usize,
}

/// One unit of work in a scope tree
pub(crate) struct ScopeNode {
    instance_id: InstanceId,
    created_thread_id: ThreadId,
    depth: usize,
    cache_mode: Option<RepositoryCacheMode>,
    auto_complete: bool,
    locks: Arc<LockingMechanism>,
    link: Link,
    state: Mutex<NodeState>,
}

impl ScopeNode {
    pub(crate) fn root(
        options: ScopeOptions,
        locks: Arc<LockingMechanism>,
        aggregator: Arc<dyn EventAggregator>,
        settings: &ScopeSettings,
        shadow: Option<ShadowSession>,
    ) -> Self {
        Self {
            instance_id: InstanceId::new(),
            created_thread_id: thread::current().id(),
            depth: 0,
            cache_mode: options.cache_mode,
            auto_complete: options.auto_complete,
            locks,
            link: Link::Root(TreeResources {
                aggregator,
                default_cache_mode: settings.default_cache_mode,
                cache_capacity: settings.isolated_cache_capacity,
                notifications: OnceCell::new(),
                caches: OnceCell::new(),
                shadow: Mutex::new(shadow),
            }),
            state: Mutex::new(NodeState::default()),
        }
    }

    pub(crate) fn child(parent: Arc<ScopeNode>, options: ScopeOptions) -> Self {
        parent.state.lock().live_children += 1;
        Self {
            instance_id: InstanceId::new(),
            created_thread_id: thread::current().id(),
            depth: parent.depth + 1,
            cache_mode: options.cache_mode,
            auto_complete: options.auto_complete,
            locks: Arc::clone(&parent.locks),
            link: Link::Child(parent),
            state: Mutex::new(NodeState::default()),
        }
    }

    #[inline]
    pub(crate) fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    #[inline]
    pub(crate) fn created_thread_id(&self) -> ThreadId {
        self.created_thread_id
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    fn parent(&self) -> Option<&Arc<ScopeNode>> {
        match &self.link {
            Link::Root(_) => None,
            Link::Child(parent) => Some(parent),
        }
    }

    fn tree(&self) -> &TreeResources {
        match &self.link {
            Link::Root(tree) => tree,
            Link::Child(parent) => parent.tree(),
        }
    }

    pub(crate) fn cache_mode(&self) -> RepositoryCacheMode {
        match (self.cache_mode, &self.link) {
            (Some(mode), _) => mode,
            (None, Link::Child(parent)) => parent.cache_mode(),
            (None, Link::Root(tree)) => tree.default_cache_mode,
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    fn ensure_not_disposed(&self) -> ScopeResult<()> {
        if self.is_disposed() {
            return Err(ScopeError::Disposed {
                instance_id: self.instance_id,
            });
        }
        self.ensure_ancestors_live()
    }

    fn ensure_ancestors_live(&self) -> ScopeResult<()> {
        let mut ancestor = self.parent();
        while let Some(node) = ancestor {
            if node.is_disposed() {
                return Err(ScopeError::AncestorDisposed {
                    instance_id: self.instance_id,
                });
            }
            ancestor = node.parent();
        }
        Ok(())
    }

    fn child_disposed(&self, child: InstanceId, outcome: Completion) {
        let mut state = self.state.lock();
        state.live_children = state.live_children.saturating_sub(1);
        if state.completion.absorb_child(outcome) {
            tracing::warn!(
                instance_id = %self.instance_id,
                %child,
                %outcome,
                "child scope did not complete, parent scope fails"
            );
        }
    }
}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeNode")
            .field("instance_id", &self.instance_id)
            .field("depth", &self.depth)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// A unit of work
///
/// Created by [`ScopeProvider::create_scope`]. Must be disposed innermost
/// first; dropping an undisposed scope disposes it.
pub struct CoreScope {
    provider: ScopeProvider,
    node: Arc<ScopeNode>,
}

impl CoreScope {
    pub(crate) fn new(provider: ScopeProvider, node: Arc<ScopeNode>) -> Self {
        Self { provider, node }
    }

    /// Lock attribution key
    #[inline]
    #[must_use]
    pub fn instance_id(&self) -> InstanceId {
        self.node.instance_id
    }

    /// Thread that created the scope, for diagnostics
    #[inline]
    #[must_use]
    pub fn created_thread_id(&self) -> ThreadId {
        self.node.created_thread_id
    }

    /// Number of ancestors
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    /// Whether this scope started its tree
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.node.parent().is_none()
    }

    /// Instance id of the parent scope
    #[must_use]
    pub fn parent_instance_id(&self) -> Option<InstanceId> {
        self.node.parent().map(|parent| parent.instance_id)
    }

    /// Mark the unit of work successful
    ///
    /// Only the first call records anything. Returns `false` if a child
    /// already failed this scope.
    ///
    /// # Errors
    /// `ScopeError::Disposed` after disposal.
    pub fn complete(&self) -> ScopeResult<bool> {
        self.node.ensure_not_disposed()?;
        Ok(self.node.state.lock().completion.complete())
    }

    /// Current completion state
    #[must_use]
    pub fn completion(&self) -> Completion {
        self.node.state.lock().completion
    }

    /// `None` until completed or failed
    #[must_use]
    pub fn completed(&self) -> Option<bool> {
        self.completion().as_option()
    }

    /// Whether the scope was disposed
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.node.is_disposed()
    }

    /// Resolved cache mode: own override, else nearest ancestor's, else the
    /// provider default
    #[must_use]
    pub fn cache_mode(&self) -> RepositoryCacheMode {
        self.node.cache_mode()
    }

    /// Isolated caches of the tree, created on first use
    ///
    /// # Errors
    /// `ScopeError::Disposed` or `ScopeError::AncestorDisposed`.
    pub fn isolated_caches(&self) -> ScopeResult<Arc<IsolatedCaches>> {
        self.node.ensure_not_disposed()?;
        let tree = self.node.tree();
        let caches = tree
            .caches
            .get_or_init(|| Arc::new(IsolatedCaches::deep_cloning(tree.cache_capacity)));
        Ok(Arc::clone(caches))
    }

    /// Notification publisher of the tree, created on first use
    ///
    /// # Errors
    /// `ScopeError::Disposed` or `ScopeError::AncestorDisposed`.
    pub fn notifications(&self) -> ScopeResult<Arc<ScopedNotificationPublisher>> {
        self.node.ensure_not_disposed()?;
        let tree = self.node.tree();
        let publisher = tree.notifications.get_or_init(|| {
            Arc::new(ScopedNotificationPublisher::new(Arc::clone(&tree.aggregator)))
        });
        Ok(Arc::clone(publisher))
    }

    /// Lock handle of the tree
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &Arc<LockingMechanism> {
        &self.node.locks
    }

    /// Queue read locks until [`CoreScope::ensure_locks`]
    ///
    /// # Errors
    /// Disposal errors.
    pub fn read_lock(&self, lock_ids: &[LockId]) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self.node.locks.read_lock(self.node.instance_id, lock_ids, None)?)
    }

    /// Queue write locks until [`CoreScope::ensure_locks`]
    ///
    /// # Errors
    /// Disposal errors.
    pub fn write_lock(&self, lock_ids: &[LockId]) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self.node.locks.write_lock(self.node.instance_id, lock_ids, None)?)
    }

    /// Queues a **read** lock with a timeout
    ///
    /// Crossed with [`CoreScope::read_lock_with_timeout`]: existing callers
    /// rely on this overload taking a read lock. Use
    /// [`CoreScope::eager_write_lock_with_timeout`] for a real write lock.
    ///
    /// # Errors
    /// Disposal errors.
    pub fn write_lock_with_timeout(&self, timeout: Duration, lock_id: LockId) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .read_lock(self.node.instance_id, &[lock_id], Some(timeout))?)
    }

    /// Queues a **write** lock with a timeout
    ///
    /// Crossed with [`CoreScope::write_lock_with_timeout`].
    ///
    /// # Errors
    /// Disposal errors.
    pub fn read_lock_with_timeout(&self, timeout: Duration, lock_id: LockId) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .write_lock(self.node.instance_id, &[lock_id], Some(timeout))?)
    }

    /// Acquire read locks now
    ///
    /// # Errors
    /// Disposal errors, `LockError::Timeout` when contended.
    pub fn eager_read_lock(&self, lock_ids: &[LockId]) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .eager_read_lock(self.node.instance_id, lock_ids, None)?)
    }

    /// Acquire write locks now
    ///
    /// # Errors
    /// Disposal errors, `LockError::Timeout` when contended,
    /// `LockError::Upgrade` when the tree holds a read lock.
    pub fn eager_write_lock(&self, lock_ids: &[LockId]) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .eager_write_lock(self.node.instance_id, lock_ids, None)?)
    }

    /// Acquire a read lock now, waiting at most `timeout`
    ///
    /// # Errors
    /// As [`CoreScope::eager_read_lock`].
    pub fn eager_read_lock_with_timeout(&self, timeout: Duration, lock_id: LockId) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .eager_read_lock(self.node.instance_id, &[lock_id], Some(timeout))?)
    }

    /// Acquire a write lock now, waiting at most `timeout`
    ///
    /// # Errors
    /// As [`CoreScope::eager_write_lock`].
    pub fn eager_write_lock_with_timeout(&self, timeout: Duration, lock_id: LockId) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self
            .node
            .locks
            .eager_write_lock(self.node.instance_id, &[lock_id], Some(timeout))?)
    }

    /// Acquire every queued lock of the tree
    ///
    /// # Errors
    /// Disposal errors, the first failing lock's error.
    pub fn ensure_locks(&self) -> ScopeResult<()> {
        self.node.ensure_not_disposed()?;
        Ok(self.node.locks.ensure_locks()?)
    }

    /// End the unit of work
    ///
    /// Children report their outcome to the parent. The root releases the
    /// tree's locks and leaves the ambient context before it settles the
    /// shadow session and flushes deferred notifications, so handlers that
    /// open scopes start a fresh tree. Returns the scope's final outcome.
    ///
    /// # Errors
    /// Nesting violations, checked in this order: `Disposed`,
    /// `LiveDescendants`, `AncestorDisposed`, `NotAmbient`. Nothing is torn
    /// down when one is raised. A failing shadow commit is reported after
    /// the scope is fully disposed.
    pub fn dispose(&self) -> ScopeResult<bool> {
        let node = &self.node;
        {
            let state = node.state.lock();
            if state.disposed {
                return Err(ScopeError::Disposed {
                    instance_id: node.instance_id,
                });
            }
            if state.live_children > 0 {
                return Err(ScopeError::LiveDescendants {
                    instance_id: node.instance_id,
                    live: state.live_children,
                });
            }
        }
        node.ensure_ancestors_live()?;
        if !self.provider.is_ambient(node) {
            return Err(ScopeError::NotAmbient {
                instance_id: node.instance_id,
            });
        }

        let completion = {
            let mut state = node.state.lock();
            if node.auto_complete {
                state.completion.complete();
            }
            state.completion
        };

        if let Link::Child(parent) = &node.link {
            parent.child_disposed(node.instance_id, completion);
        }
        self.release(node);
        node.state.lock().disposed = true;

        tracing::debug!(
            instance_id = %node.instance_id,
            depth = node.depth,
            %completion,
            "scope disposed"
        );

        // Handlers run by the flush must see this tree as gone.
        if let Link::Root(tree) = &node.link {
            tree.finish(completion.is_completed())?;
        }
        Ok(completion.is_completed())
    }

    fn release(&self, node: &Arc<ScopeNode>) {
        node.locks.clear_locks(node.instance_id);
        if node.parent().is_none() {
            node.locks.dispose();
        }
        self.provider.remove_ambient(node);
    }

    /// Tear down after a failed disposal on drop
    ///
    /// The scope counts as failed. Live descendants will find a disposed
    /// ancestor when they are disposed.
    fn abandon(&self) {
        let node = &self.node;
        {
            let mut state = node.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
        }

        if let Link::Child(parent) = &node.link {
            parent.child_disposed(node.instance_id, Completion::Failed);
        }
        self.release(node);

        if let Link::Root(tree) = &node.link {
            if let Err(error) = tree.finish(false) {
                tracing::error!(instance_id = %node.instance_id, %error, "failed to discard shadow");
            }
        }
    }
}

impl fmt::Debug for CoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreScope")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl Drop for CoreScope {
    fn drop(&mut self) {
        if self.node.is_disposed() {
            return;
        }
        if let Err(error) = self.dispose() {
            tracing::error!(
                instance_id = %self.node.instance_id,
                %error,
                "dropped scope failed to dispose"
            );
            self.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider() -> ScopeProvider {
        ScopeProvider::in_memory(ScopeSettings::default())
    }

    #[test]
    fn depth_counts_ancestors() {
        let provider = provider();
        let root = provider.create_scope(ScopeOptions::new()).unwrap();
        let child = provider.create_scope(ScopeOptions::new()).unwrap();
        let grandchild = provider.create_scope(ScopeOptions::new()).unwrap();

        assert_eq!(
            [root.depth(), child.depth(), grandchild.depth()],
            [0, 1, 2]
        );
        assert!(root.is_root());
        assert_eq!(grandchild.parent_instance_id(), Some(child.instance_id()));
    }

    #[test]
    fn tree_shares_one_lock_handle() {
        let provider = provider();
        let root = provider.create_scope(ScopeOptions::new()).unwrap();
        let child = provider.create_scope(ScopeOptions::new()).unwrap();

        assert!(Arc::ptr_eq(root.locks(), child.locks()));
    }

    #[test]
    fn complete_twice_keeps_first_outcome() {
        let provider = provider();
        let scope = provider.create_scope(ScopeOptions::new()).unwrap();

        assert_eq!(scope.completed(), None);
        assert!(scope.complete().unwrap());
        assert!(scope.complete().unwrap());
        assert_eq!(scope.completion(), Completion::Completed);
    }

    #[test]
    fn uncompleted_root_fails() {
        let provider = provider();
        let scope = provider.create_scope(ScopeOptions::new()).unwrap();
        assert!(!scope.dispose().unwrap());
    }

    #[test]
    fn auto_complete_completes_on_disposal() {
        let provider = provider();
        let scope = provider
            .create_scope(ScopeOptions::new().with_auto_complete(true))
            .unwrap();
        assert!(scope.dispose().unwrap());
    }

    #[test]
    fn auto_complete_cannot_undo_child_failure() {
        let provider = provider();
        let root = provider
            .create_scope(ScopeOptions::new().with_auto_complete(true))
            .unwrap();
        provider.create_scope(ScopeOptions::new()).unwrap().dispose().unwrap();

        assert!(!root.dispose().unwrap());
    }

    #[test]
    fn operations_after_dispose_fail() {
        let provider = provider();
        let scope = provider.create_scope(ScopeOptions::new()).unwrap();
        scope.dispose().unwrap();

        assert!(matches!(scope.complete(), Err(ScopeError::Disposed { .. })));
        assert!(matches!(scope.notifications(), Err(ScopeError::Disposed { .. })));
        assert!(matches!(scope.read_lock(&[LockId::DOMAINS]), Err(ScopeError::Disposed { .. })));
        assert!(matches!(scope.dispose(), Err(ScopeError::Disposed { .. })));
    }

    #[test]
    fn parent_cannot_dispose_before_child() {
        let provider = provider();
        let root = provider.create_scope(ScopeOptions::new()).unwrap();
        let child = provider.create_scope(ScopeOptions::new()).unwrap();

        let err = root.dispose().unwrap_err();
        assert!(matches!(err, ScopeError::LiveDescendants { live: 1, .. }));
        assert!(!root.is_disposed());

        child.complete().unwrap();
        child.dispose().unwrap();
        root.complete().unwrap();
        assert!(root.dispose().unwrap());
    }

    #[test]
    fn dropped_parent_leaves_child_with_disposed_ancestor() {
        let provider = provider();
        let root = provider.create_scope(ScopeOptions::new()).unwrap();
        let child = provider.create_scope(ScopeOptions::new()).unwrap();

        drop(root);

        let err = child.complete().unwrap_err();
        assert!(matches!(err, ScopeError::AncestorDisposed { .. }));
        assert!(matches!(child.dispose(), Err(ScopeError::AncestorDisposed { .. })));

        drop(child);
        assert_eq!(provider.ambient_depth(), 0);
    }

    #[test]
    fn dropping_an_undisposed_scope_disposes_it() {
        let provider = provider();
        {
            let _root = provider.create_scope(ScopeOptions::new()).unwrap();
            let _child = provider.create_scope(ScopeOptions::new()).unwrap();
        }
        assert_eq!(provider.ambient_depth(), 0);
    }
}
