//! Distributed locking backends
//!
//! A backend hands out [`DistributedLock`] guards; dropping a guard releases
//! the lock. [`InMemoryDistributedLockingMechanism`] is the process-local
//! backend: one reader/writer lock per [`LockId`].

use crate::error::{LockError, LockResult};
use crate::types::{LockId, LockKind};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default read-lock timeout
pub const DEFAULT_READ_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Default write-lock timeout
pub const DEFAULT_WRITE_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// An acquired backend lock, released on drop
pub trait DistributedLock: Send + Sync + fmt::Debug {
    /// Locked space
    fn lock_id(&self) -> LockId;

    /// Mode the lock was taken in
    fn kind(&self) -> LockKind;
}

/// Backend capable of acquiring read and write locks
///
/// A `None` timeout means the backend's configured default.
#[cfg_attr(test, mockall::automock)]
pub trait DistributedLockingMechanism: Send + Sync {
    /// Whether the backend can hand out locks at all
    fn enabled(&self) -> bool;

    /// Acquire a shared lock
    ///
    /// # Errors
    /// `LockError::Timeout` when contended past the timeout, any other
    /// variant when the backend refuses.
    fn read_lock(
        &self,
        lock_id: LockId,
        timeout: Option<Duration>,
    ) -> LockResult<Box<dyn DistributedLock>>;

    /// Acquire an exclusive lock
    ///
    /// # Errors
    /// Same as [`DistributedLockingMechanism::read_lock`].
    fn write_lock(
        &self,
        lock_id: LockId,
        timeout: Option<Duration>,
    ) -> LockResult<Box<dyn DistributedLock>>;
}

/// Produces the backend a new scope tree locks through
pub trait DistributedLockingMechanismFactory: Send + Sync {
    /// Backend instance
    fn mechanism(&self) -> Arc<dyn DistributedLockingMechanism>;
}

/// Factory returning one shared backend
#[derive(Clone)]
pub struct SharedMechanismFactory {
    mechanism: Arc<dyn DistributedLockingMechanism>,
}

impl SharedMechanismFactory {
    /// Wrap backend
    #[inline]
    #[must_use]
    pub fn new(mechanism: Arc<dyn DistributedLockingMechanism>) -> Self {
        Self { mechanism }
    }
}

impl fmt::Debug for SharedMechanismFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMechanismFactory")
            .field("enabled", &self.mechanism.enabled())
            .finish()
    }
}

impl DistributedLockingMechanismFactory for SharedMechanismFactory {
    fn mechanism(&self) -> Arc<dyn DistributedLockingMechanism> {
        Arc::clone(&self.mechanism)
    }
}

#[derive(Debug, Default)]
struct SlotState {
    readers: usize,
    writer: bool,
}

impl SlotState {
    fn admits(&self, kind: LockKind) -> bool {
        match kind {
            LockKind::Read => !self.writer,
            LockKind::Write => !self.writer && self.readers == 0,
        }
    }

    fn take(&mut self, kind: LockKind) {
        match kind {
            LockKind::Read => self.readers += 1,
            LockKind::Write => self.writer = true,
        }
    }

    fn give_back(&mut self, kind: LockKind) {
        match kind {
            LockKind::Read => self.readers = self.readers.saturating_sub(1),
            LockKind::Write => self.writer = false,
        }
    }
}

#[derive(Debug, Default)]
struct LockSlot {
    state: Mutex<SlotState>,
    released: Condvar,
}

/// Process-local reader/writer locks keyed by [`LockId`]
#[derive(Debug)]
pub struct InMemoryDistributedLockingMechanism {
    slots: DashMap<LockId, Arc<LockSlot>>,
    read_timeout: Duration,
    write_timeout: Duration,
    enabled: bool,
}

impl InMemoryDistributedLockingMechanism {
    /// Create backend with default timeouts
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_READ_LOCK_TIMEOUT, DEFAULT_WRITE_LOCK_TIMEOUT)
    }

    /// Create backend with explicit default timeouts
    #[must_use]
    pub fn with_timeouts(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            read_timeout,
            write_timeout,
            enabled: true,
        }
    }

    /// Create a backend that refuses every request
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Number of lock spaces ever touched
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Current holders of a lock space: (readers, writer)
    #[must_use]
    pub fn holders(&self, lock_id: LockId) -> (usize, bool) {
        self.slots.get(&lock_id).map_or((0, false), |slot| {
            let state = slot.state.lock();
            (state.readers, state.writer)
        })
    }

    fn slot(&self, lock_id: LockId) -> Arc<LockSlot> {
        Arc::clone(&*self.slots.entry(lock_id).or_default())
    }

    fn acquire(
        &self,
        lock_id: LockId,
        kind: LockKind,
        timeout: Option<Duration>,
    ) -> LockResult<Box<dyn DistributedLock>> {
        if !self.enabled {
            return Err(LockError::Unavailable);
        }

        let timeout = timeout.unwrap_or(match kind {
            LockKind::Read => self.read_timeout,
            LockKind::Write => self.write_timeout,
        });
        let slot = self.slot(lock_id);
        // Unrepresentable deadlines wait forever
        let deadline = Instant::now().checked_add(timeout);

        let mut state = slot.state.lock();
        loop {
            if state.admits(kind) {
                break;
            }
            match deadline {
                Some(deadline) => {
                    if slot.released.wait_until(&mut state, deadline).timed_out() && !state.admits(kind) {
                        return Err(LockError::timeout(lock_id, kind, timeout));
                    }
                }
                None => slot.released.wait(&mut state),
            }
        }
        state.take(kind);
        drop(state);

        tracing::trace!(%lock_id, %kind, "backend lock acquired");
        Ok(Box::new(InMemoryLock {
            lock_id,
            kind,
            slot,
        }))
    }
}

impl Default for InMemoryDistributedLockingMechanism {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributedLockingMechanism for InMemoryDistributedLockingMechanism {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn read_lock(
        &self,
        lock_id: LockId,
        timeout: Option<Duration>,
    ) -> LockResult<Box<dyn DistributedLock>> {
        self.acquire(lock_id, LockKind::Read, timeout)
    }

    fn write_lock(
        &self,
        lock_id: LockId,
        timeout: Option<Duration>,
    ) -> LockResult<Box<dyn DistributedLock>> {
        self.acquire(lock_id, LockKind::Write, timeout)
    }
}

struct InMemoryLock {
    lock_id: LockId,
    kind: LockKind,
    slot: Arc<LockSlot>,
}

impl fmt::Debug for InMemoryLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLock")
            .field("lock_id", &self.lock_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DistributedLock for InMemoryLock {
    fn lock_id(&self) -> LockId {
        self.lock_id
    }

    fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for InMemoryLock {
    fn drop(&mut self) {
        self.slot.state.lock().give_back(self.kind);
        self.slot.released.notify_all();
        tracing::trace!(lock_id = %self.lock_id, kind = %self.kind, "backend lock released");
    }
}
