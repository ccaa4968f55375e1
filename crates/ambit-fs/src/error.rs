//! Error types for file-system access

use std::path::PathBuf;

/// Errors raised by file systems and shadow sessions
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path is absolute or climbs out of the root
    #[error("path {path:?} is outside the file system root")]
    OutsideRoot {
        /// Offending path
        path: PathBuf,
    },

    /// A shadow session is already open
    #[error("file system is already shadowed")]
    AlreadyShadowing,

    /// File does not exist
    #[error("file {path:?} not found")]
    NotFound {
        /// Missing path
        path: PathBuf,
    },

    /// File exists and overwrite was not requested
    #[error("file {path:?} already exists")]
    AlreadyExists {
        /// Existing path
        path: PathBuf,
    },

    /// Underlying I/O failure
    #[error("i/o error on {path:?}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the file is missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for file-system operations
pub type FsResult<T> = Result<T, FsError>;
