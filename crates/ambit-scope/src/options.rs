//! Per-scope creation options

use ambit_cache::RepositoryCacheMode;

/// Options for [`crate::ScopeProvider::create_scope`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Cache mode override; inherited from the parent when `None`
    pub cache_mode: Option<RepositoryCacheMode>,
    /// Buffer file-system writes until the tree completes. Root only.
    pub shadow_file_systems: bool,
    /// Complete the scope on disposal if it was not completed explicitly
    pub auto_complete: bool,
}

impl ScopeOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override cache mode
    #[must_use]
    pub fn with_cache_mode(mut self, mode: RepositoryCacheMode) -> Self {
        self.cache_mode = Some(mode);
        self
    }

    /// Request shadowed file systems
    #[must_use]
    pub fn with_shadow_file_systems(mut self, shadow: bool) -> Self {
        self.shadow_file_systems = shadow;
        self
    }

    /// Complete on disposal
    #[must_use]
    pub fn with_auto_complete(mut self, auto_complete: bool) -> Self {
        self.auto_complete = auto_complete;
        self
    }
}
