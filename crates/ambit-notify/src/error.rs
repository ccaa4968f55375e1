//! Error types for notification publishing

/// Errors raised by the scoped publisher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Suppression requested while already suppressed
    #[error("notifications are already suppressed")]
    AlreadySuppressed,
}

/// Result type alias for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;
