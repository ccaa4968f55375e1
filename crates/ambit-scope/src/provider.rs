//! Scope creation and the ambient scope context
//!
//! The provider keeps one stack of live scopes per creating thread. A new
//! scope attaches to the top of the calling thread's stack as its child, or
//! starts a fresh tree when the stack is empty. Disposal pops it again.

use crate::error::{ScopeError, ScopeResult};
use crate::options::ScopeOptions;
use crate::scope::{CoreScope, ScopeNode};
use crate::settings::ScopeSettings;
use ambit_fs::FileSystems;
use ambit_locking::{
    DistributedLockingMechanismFactory, InMemoryDistributedLockingMechanism, InstanceId,
    LockingMechanism, SharedMechanismFactory,
};
use ambit_notify::{EventAggregator, InMemoryEventAggregator};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

struct ProviderInner {
    lock_factory: Arc<dyn DistributedLockingMechanismFactory>,
    file_systems: Option<FileSystems>,
    aggregator: Arc<dyn EventAggregator>,
    settings: ScopeSettings,
    ambient: DashMap<ThreadId, Vec<Arc<ScopeNode>>>,
}

/// Creates scopes and tracks which one is ambient
#[derive(Clone)]
pub struct ScopeProvider {
    inner: Arc<ProviderInner>,
}

impl ScopeProvider {
    /// Start building a provider
    #[inline]
    #[must_use]
    pub fn builder() -> ScopeProviderBuilder {
        ScopeProviderBuilder::default()
    }

    /// Provider with in-memory locking and notifications, no file systems
    #[must_use]
    pub fn in_memory(settings: ScopeSettings) -> Self {
        Self::builder().with_settings(settings).build()
    }

    /// Open a scope
    ///
    /// Becomes a child of the ambient scope if there is one, a new root
    /// otherwise. Shadowing is only honored on roots.
    ///
    /// # Errors
    /// `ScopeError::ShadowUnavailable` or `ScopeError::FileSystem` when a
    /// root cannot start shadowing.
    pub fn create_scope(&self, options: ScopeOptions) -> ScopeResult<CoreScope> {
        let node = match self.current() {
            Some(parent) => {
                if options.shadow_file_systems {
                    tracing::trace!(parent = %parent.instance_id(), "ignoring shadow request on child scope");
                }
                ScopeNode::child(parent, options)
            }
            None => {
                let shadow = if options.shadow_file_systems {
                    let file_systems = self
                        .inner
                        .file_systems
                        .as_ref()
                        .ok_or(ScopeError::ShadowUnavailable)?;
                    Some(file_systems.shadow()?)
                } else {
                    None
                };
                let locks = Arc::new(LockingMechanism::new(self.inner.lock_factory.as_ref()));
                ScopeNode::root(
                    options,
                    locks,
                    Arc::clone(&self.inner.aggregator),
                    &self.inner.settings,
                    shadow,
                )
            }
        };

        let node = Arc::new(node);
        self.inner
            .ambient
            .entry(node.created_thread_id())
            .or_default()
            .push(Arc::clone(&node));
        tracing::debug!(
            instance_id = %node.instance_id(),
            depth = node.depth(),
            cache_mode = %node.cache_mode(),
            "scope created"
        );

        Ok(CoreScope::new(self.clone(), node))
    }

    /// Instance id of the calling thread's ambient scope
    #[must_use]
    pub fn ambient_scope_id(&self) -> Option<InstanceId> {
        self.current().map(|node| node.instance_id())
    }

    /// Number of live scopes on the calling thread
    #[must_use]
    pub fn ambient_depth(&self) -> usize {
        self.inner
            .ambient
            .get(&thread::current().id())
            .map_or(0, |stack| stack.len())
    }

    /// Provider settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ScopeSettings {
        &self.inner.settings
    }

    /// File systems shadowed by root scopes, if configured
    #[inline]
    #[must_use]
    pub fn file_systems(&self) -> Option<&FileSystems> {
        self.inner.file_systems.as_ref()
    }

    fn current(&self) -> Option<Arc<ScopeNode>> {
        self.inner
            .ambient
            .get(&thread::current().id())
            .and_then(|stack| stack.last().cloned())
    }

    pub(crate) fn is_ambient(&self, node: &Arc<ScopeNode>) -> bool {
        self.inner
            .ambient
            .get(&node.created_thread_id())
            .and_then(|stack| stack.last().map(|top| Arc::ptr_eq(top, node)))
            .unwrap_or(false)
    }

    pub(crate) fn remove_ambient(&self, node: &Arc<ScopeNode>) {
        let thread = node.created_thread_id();
        if let Some(mut stack) = self.inner.ambient.get_mut(&thread) {
            stack.retain(|live| !Arc::ptr_eq(live, node));
        }
        self.inner.ambient.remove_if(&thread, |_, stack| stack.is_empty());
    }

    #[cfg(test)]
    pub(crate) fn push_ambient(&self, node: Arc<ScopeNode>) {
        self.inner
            .ambient
            .entry(node.created_thread_id())
            .or_default()
            .push(node);
    }
}

impl fmt::Debug for ScopeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeProvider")
            .field("settings", &self.inner.settings)
            .field("file_systems", &self.inner.file_systems)
            .field("threads", &self.inner.ambient.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScopeProvider`]
#[derive(Default)]
pub struct ScopeProviderBuilder {
    lock_factory: Option<Arc<dyn DistributedLockingMechanismFactory>>,
    file_systems: Option<FileSystems>,
    aggregator: Option<Arc<dyn EventAggregator>>,
    settings: ScopeSettings,
}

impl ScopeProviderBuilder {
    /// Use a specific locking backend
    #[must_use]
    pub fn with_lock_factory(mut self, factory: Arc<dyn DistributedLockingMechanismFactory>) -> Self {
        self.lock_factory = Some(factory);
        self
    }

    /// File systems roots may shadow
    #[must_use]
    pub fn with_file_systems(mut self, file_systems: FileSystems) -> Self {
        self.file_systems = Some(file_systems);
        self
    }

    /// Aggregator deferred notifications are flushed to
    #[must_use]
    pub fn with_event_aggregator(mut self, aggregator: Arc<dyn EventAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Provider settings
    #[must_use]
    pub fn with_settings(mut self, settings: ScopeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build provider
    ///
    /// Without a lock factory an in-memory backend using the configured
    /// timeouts is created; without an aggregator notifications go nowhere.
    #[must_use]
    pub fn build(self) -> ScopeProvider {
        let settings = self.settings;
        let lock_factory = self.lock_factory.unwrap_or_else(|| {
            let backend = InMemoryDistributedLockingMechanism::with_timeouts(
                settings.read_lock_timeout(),
                settings.write_lock_timeout(),
            );
            Arc::new(SharedMechanismFactory::new(Arc::new(backend)))
                as Arc<dyn DistributedLockingMechanismFactory>
        });
        let aggregator = self
            .aggregator
            .unwrap_or_else(|| Arc::new(InMemoryEventAggregator::new()) as Arc<dyn EventAggregator>);

        ScopeProvider {
            inner: Arc::new(ProviderInner {
                lock_factory,
                file_systems: self.file_systems,
                aggregator,
                settings,
                ambient: DashMap::new(),
            }),
        }
    }
}

impl fmt::Debug for ScopeProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeProviderBuilder")
            .field("file_systems", &self.file_systems)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
