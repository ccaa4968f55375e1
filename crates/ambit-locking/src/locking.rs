//! Per-tree lock bookkeeping
//!
//! One [`LockingMechanism`] exists per scope tree. Every request carries the
//! [`InstanceId`] of the scope that made it, and counts are kept per
//! instance so clearing one scope never drops a lock another live scope of
//! the same tree still relies on.
//!
//! ```text
//! scope ──read_lock──▶ queue ──ensure_locks──▶ obtain ──▶ backend
//! scope ──eager_*────────────────────────────▶ obtain ──▶ backend
//! ```

use crate::error::{LockError, LockResult};
use crate::mechanism::{DistributedLock, DistributedLockingMechanism, DistributedLockingMechanismFactory};
use crate::types::{InstanceId, LockId, LockKind};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A deferred lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    /// Lock space
    pub lock_id: LockId,
    /// Requested mode
    pub kind: LockKind,
    /// Timeout, backend default when `None`
    pub timeout: Option<Duration>,
}

#[derive(Default)]
struct LockTable {
    /// Deferred requests in arrival order
    queued: Vec<(InstanceId, LockRequest)>,
    /// instance -> lock space -> number of requests
    counts: HashMap<InstanceId, HashMap<LockId, usize>>,
    /// Backend locks held on behalf of the whole tree
    held: HashMap<LockId, Box<dyn DistributedLock>>,
    disposed: bool,
}

impl LockTable {
    fn is_referenced(&self, lock_id: LockId) -> bool {
        self.counts.values().any(|owned| owned.contains_key(&lock_id))
    }
}

/// Lock handle shared by every scope of a tree
pub struct LockingMechanism {
    mechanism: Arc<dyn DistributedLockingMechanism>,
    table: Mutex<LockTable>,
}

impl LockingMechanism {
    /// Create handle for a new tree
    #[must_use]
    pub fn new(factory: &dyn DistributedLockingMechanismFactory) -> Self {
        Self::with_mechanism(factory.mechanism())
    }

    /// Create handle over an explicit backend
    #[must_use]
    pub fn with_mechanism(mechanism: Arc<dyn DistributedLockingMechanism>) -> Self {
        Self {
            mechanism,
            table: Mutex::new(LockTable::default()),
        }
    }

    /// Queue read locks, acquired on the next [`LockingMechanism::ensure_locks`]
    ///
    /// # Errors
    /// `LockError::Disposed` once the tree is released.
    pub fn read_lock(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        self.enqueue(instance, lock_ids, LockKind::Read, timeout)
    }

    /// Queue write locks, acquired on the next [`LockingMechanism::ensure_locks`]
    ///
    /// # Errors
    /// `LockError::Disposed` once the tree is released.
    pub fn write_lock(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        self.enqueue(instance, lock_ids, LockKind::Write, timeout)
    }

    /// Acquire read locks now
    ///
    /// Stops at the first failure; locks obtained before it stay attributed
    /// to `instance`.
    ///
    /// # Errors
    /// Backend errors, `LockError::Disposed` once the tree is released.
    pub fn eager_read_lock(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        self.obtain_all(instance, lock_ids, LockKind::Read, timeout)
    }

    /// Acquire write locks now
    ///
    /// # Errors
    /// Backend errors, `LockError::Upgrade` when the tree only holds a read
    /// lock on one of the spaces, `LockError::Disposed` once released.
    pub fn eager_write_lock(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        self.obtain_all(instance, lock_ids, LockKind::Write, timeout)
    }

    /// Acquire every queued request in arrival order
    ///
    /// The queue is consumed even when a request fails.
    ///
    /// # Errors
    /// The first failing request's error.
    pub fn ensure_locks(&self) -> LockResult<()> {
        let mut table = self.table.lock();
        if table.disposed {
            return Err(LockError::Disposed);
        }

        let pending: SmallVec<[(InstanceId, LockRequest); 8]> = table.queued.drain(..).collect();
        for (instance, request) in pending {
            self.obtain(&mut table, instance, request)?;
        }
        Ok(())
    }

    /// Drop every entry attributed to `instance`
    ///
    /// Backend locks no other instance references are released. No-op for
    /// an instance that never locked, and after disposal.
    pub fn clear_locks(&self, instance: InstanceId) {
        let mut table = self.table.lock();
        table.queued.retain(|(owner, _)| *owner != instance);

        let Some(owned) = table.counts.remove(&instance) else {
            return;
        };
        for lock_id in owned.into_keys() {
            if table.is_referenced(lock_id) {
                continue;
            }
            if let Some(lock) = table.held.remove(&lock_id) {
                tracing::trace!(%instance, %lock_id, kind = %lock.kind(), "releasing lock");
            }
        }
    }

    /// Release everything the tree holds; later requests fail
    pub fn dispose(&self) {
        let mut table = self.table.lock();
        if table.disposed {
            return;
        }
        table.queued.clear();
        table.counts.clear();
        let released = table.held.len();
        table.held.clear();
        table.disposed = true;
        tracing::trace!(released, "locking mechanism disposed");
    }

    /// Requests `instance` holds on `lock_id`
    #[must_use]
    pub fn lock_count(&self, instance: InstanceId, lock_id: LockId) -> usize {
        self.table
            .lock()
            .counts
            .get(&instance)
            .and_then(|owned| owned.get(&lock_id))
            .copied()
            .unwrap_or(0)
    }

    /// Mode the tree currently holds `lock_id` in
    #[must_use]
    pub fn held_kind(&self, lock_id: LockId) -> Option<LockKind> {
        self.table.lock().held.get(&lock_id).map(|lock| lock.kind())
    }

    /// Requests waiting for [`LockingMechanism::ensure_locks`]
    #[must_use]
    pub fn queued(&self) -> Vec<(InstanceId, LockRequest)> {
        self.table.lock().queued.clone()
    }

    /// Whether the tree was released
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.table.lock().disposed
    }

    fn enqueue(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        kind: LockKind,
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        let mut table = self.table.lock();
        if table.disposed {
            return Err(LockError::Disposed);
        }
        table.queued.extend(lock_ids.iter().map(|&lock_id| {
            (
                instance,
                LockRequest {
                    lock_id,
                    kind,
                    timeout,
                },
            )
        }));
        Ok(())
    }

    fn obtain_all(
        &self,
        instance: InstanceId,
        lock_ids: &[LockId],
        kind: LockKind,
        timeout: Option<Duration>,
    ) -> LockResult<()> {
        let mut table = self.table.lock();
        if table.disposed {
            return Err(LockError::Disposed);
        }
        for &lock_id in lock_ids {
            self.obtain(
                &mut table,
                instance,
                LockRequest {
                    lock_id,
                    kind,
                    timeout,
                },
            )?;
        }
        Ok(())
    }

    // The table stays locked while the backend blocks: a tree is driven by
    // one logical call chain.
    fn obtain(
        &self,
        table: &mut LockTable,
        instance: InstanceId,
        request: LockRequest,
    ) -> LockResult<()> {
        let LockRequest {
            lock_id,
            kind,
            timeout,
        } = request;

        match table.held.get(&lock_id).map(|lock| lock.kind()) {
            Some(held) if held.satisfies(kind) => {
                tracing::trace!(%instance, %lock_id, %kind, "lock reentered");
            }
            Some(_) => return Err(LockError::Upgrade { lock_id }),
            None => {
                let lock = match kind {
                    LockKind::Read => self.mechanism.read_lock(lock_id, timeout)?,
                    LockKind::Write => self.mechanism.write_lock(lock_id, timeout)?,
                };
                tracing::trace!(%instance, %lock_id, %kind, "lock acquired");
                table.held.insert(lock_id, lock);
            }
        }

        *table
            .counts
            .entry(instance)
            .or_default()
            .entry(lock_id)
            .or_default() += 1;
        Ok(())
    }
}

impl fmt::Debug for LockingMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock();
        f.debug_struct("LockingMechanism")
            .field("queued", &table.queued.len())
            .field("instances", &table.counts.len())
            .field("held", &table.held.len())
            .field("disposed", &table.disposed)
            .finish_non_exhaustive()
    }
}

impl Drop for LockingMechanism {
    fn drop(&mut self) {
        self.dispose();
    }
}
