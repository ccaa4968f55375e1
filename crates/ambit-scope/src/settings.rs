//! Scope provider settings

use crate::error::{ScopeError, ScopeResult};
use ambit_cache::{RepositoryCacheMode, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default read lock timeout in milliseconds
pub const DEFAULT_READ_LOCK_TIMEOUT_MS: u64 = 60_000;

/// Default write lock timeout in milliseconds
pub const DEFAULT_WRITE_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Settings shared by every scope a provider creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSettings {
    /// Cache mode for trees where no scope overrides it
    pub default_cache_mode: RepositoryCacheMode,
    /// Read lock timeout of the in-memory backend
    pub read_lock_timeout_ms: u64,
    /// Write lock timeout of the in-memory backend
    pub write_lock_timeout_ms: u64,
    /// Entries per isolated cache region
    pub isolated_cache_capacity: u64,
}

impl ScopeSettings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML, missing keys keep their defaults
    ///
    /// # Errors
    /// `ScopeError::Config` on malformed input.
    pub fn from_toml_str(input: &str) -> ScopeResult<Self> {
        toml::from_str(input).map_err(|e| ScopeError::Config(e.to_string()))
    }

    /// Parse JSON, missing keys keep their defaults
    ///
    /// # Errors
    /// `ScopeError::Config` on malformed input.
    pub fn from_json_str(input: &str) -> ScopeResult<Self> {
        serde_json::from_str(input).map_err(|e| ScopeError::Config(e.to_string()))
    }

    /// Set default cache mode
    #[must_use]
    pub fn with_default_cache_mode(mut self, mode: RepositoryCacheMode) -> Self {
        self.default_cache_mode = mode;
        self
    }

    /// Set read lock timeout
    #[must_use]
    pub fn with_read_lock_timeout(mut self, timeout: Duration) -> Self {
        self.read_lock_timeout_ms = millis(timeout);
        self
    }

    /// Set write lock timeout
    #[must_use]
    pub fn with_write_lock_timeout(mut self, timeout: Duration) -> Self {
        self.write_lock_timeout_ms = millis(timeout);
        self
    }

    /// Set isolated cache region capacity
    #[must_use]
    pub fn with_isolated_cache_capacity(mut self, capacity: u64) -> Self {
        self.isolated_cache_capacity = capacity;
        self
    }

    /// Read lock timeout
    #[inline]
    #[must_use]
    pub fn read_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.read_lock_timeout_ms)
    }

    /// Write lock timeout
    #[inline]
    #[must_use]
    pub fn write_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.write_lock_timeout_ms)
    }
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            default_cache_mode: RepositoryCacheMode::Default,
            read_lock_timeout_ms: DEFAULT_READ_LOCK_TIMEOUT_MS,
            write_lock_timeout_ms: DEFAULT_WRITE_LOCK_TIMEOUT_MS,
            isolated_cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
