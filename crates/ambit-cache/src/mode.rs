//! Repository cache mode

use serde::{Deserialize, Serialize};
use std::fmt;

/// How repositories consult and populate caches inside a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryCacheMode {
    /// Read and write the global caches
    #[default]
    Default,
    /// Read and write the scope tree's isolated caches
    Scoped,
    /// Bypass caching
    Disabled,
}

impl RepositoryCacheMode {
    /// Whether any cache is consulted
    #[inline]
    #[must_use]
    pub fn uses_cache(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for RepositoryCacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Scoped => f.write_str("scoped"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&RepositoryCacheMode::Scoped).unwrap();
        assert_eq!(json, "\"scoped\"");

        let mode: RepositoryCacheMode = serde_json::from_str("\"disabled\"").unwrap();
        assert_eq!(mode, RepositoryCacheMode::Disabled);
        assert!(!mode.uses_cache());
    }

    #[test]
    fn default_mode() {
        assert_eq!(RepositoryCacheMode::default(), RepositoryCacheMode::Default);
    }
}
