//! Identifiers shared by every lock operation

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lock-space identifier
///
/// Negative values are reserved for the well-known lock spaces below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(pub i32);

impl LockId {
    /// Server registrations
    pub const SERVERS: Self = Self(-331);
    /// Content type definitions
    pub const CONTENT_TYPES: Self = Self(-332);
    /// Document tree
    pub const CONTENT_TREE: Self = Self(-333);
    /// Media tree
    pub const MEDIA_TREE: Self = Self(-334);
    /// Member tree
    pub const MEMBER_TREE: Self = Self(-335);
    /// Media type definitions
    pub const MEDIA_TYPES: Self = Self(-336);
    /// Member type definitions
    pub const MEMBER_TYPES: Self = Self(-337);
    /// Domain assignments
    pub const DOMAINS: Self = Self(-338);
    /// Key/value store
    pub const KEY_VALUES: Self = Self(-339);
    /// Languages
    pub const LANGUAGES: Self = Self(-340);
    /// Scheduled publishing runs
    pub const SCHEDULED_PUBLISHING: Self = Self(-341);
    /// Main application domain election
    pub const MAIN_DOM: Self = Self(-1000);

    /// Create lock id from raw value
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for LockId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attribution key for lock entries: one per scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate a new process-unique id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    /// Shared
    Read,
    /// Exclusive
    Write,
}

impl LockKind {
    /// Whether a lock held in this mode satisfies a request for `requested`
    #[inline]
    #[must_use]
    pub fn satisfies(self, requested: LockKind) -> bool {
        matches!(
            (self, requested),
            (LockKind::Write, _) | (LockKind::Read, LockKind::Read)
        )
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => f.write_str("read"),
            LockKind::Write => f.write_str("write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_id_display() {
        assert_eq!(LockId::CONTENT_TREE.to_string(), "#-333");
        assert_eq!(LockId::from(7).get(), 7);
    }

    #[test]
    fn instance_ids_are_unique() {
        assert_ne!(InstanceId::new(), InstanceId::new());
    }

    #[test]
    fn write_satisfies_read_but_not_reverse() {
        assert!(LockKind::Write.satisfies(LockKind::Read));
        assert!(LockKind::Write.satisfies(LockKind::Write));
        assert!(LockKind::Read.satisfies(LockKind::Read));
        assert!(!LockKind::Read.satisfies(LockKind::Write));
    }
}
