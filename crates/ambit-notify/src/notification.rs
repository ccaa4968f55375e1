//! Notifications and cancellation state

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A domain notification
pub trait Notification: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting in handlers
    fn as_any(&self) -> &dyn Any;

    /// Cancellation state, for notifications that can veto an operation
    fn cancel_state(&self) -> Option<&CancelState> {
        None
    }

    /// Whether a handler cancelled this notification
    fn is_cancelled(&self) -> bool {
        self.cancel_state().is_some_and(CancelState::is_cancelled)
    }
}

/// Severity of a message attached during handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Informational
    Info,
    /// Something the caller should look at
    Warning,
    /// Operation cannot proceed
    Error,
}

/// Message attached by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    /// Severity
    pub kind: MessageKind,
    /// Text
    pub text: String,
}

/// Cancellation flag plus messages, embedded in cancelable notifications
#[derive(Debug, Default)]
pub struct CancelState {
    cancelled: AtomicBool,
    messages: Mutex<Vec<EventMessage>>,
}

impl CancelState {
    /// Create uncancelled state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Veto the operation, recording why
    pub fn cancel_operation(&self, reason: impl Into<String>) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.add_message(MessageKind::Error, reason);
    }

    /// Attach a message without cancelling
    pub fn add_message(&self, kind: MessageKind, text: impl Into<String>) {
        self.messages.lock().push(EventMessage {
            kind,
            text: text.into(),
        });
    }

    /// Whether the operation was vetoed
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Messages attached so far
    #[must_use]
    pub fn messages(&self) -> Vec<EventMessage> {
        self.messages.lock().clone()
    }
}
