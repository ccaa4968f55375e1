//! Ambit Notify
//!
//! Notifications raised inside a scope tree.
//!
//! # Core Concepts
//!
//! - [`Notification`]: a domain event, optionally cancelable via [`CancelState`]
//! - [`EventAggregator`]: dispatches notifications to handlers
//! - [`ScopedNotificationPublisher`]: defers plain notifications until the
//!   scope tree exits and drops them if it did not complete
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────── scope tree ────────────────┐
//! │  publish_cancelable ──────────┐            │
//! │  publish ──► deferred queue   │            │
//! │                  │            ▼            │
//! │   scope_exit(completed) ──► EventAggregator ──► handlers
//! └────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ambit_notify::{InMemoryEventAggregator, ScopedNotificationPublisher};
//! use std::sync::Arc;
//!
//! let aggregator = Arc::new(InMemoryEventAggregator::new());
//! aggregator.on(|saved: &ContentSaved| println!("{saved:?}"));
//!
//! let publisher = ScopedNotificationPublisher::new(aggregator);
//! publisher.publish(ContentSaved { id: 42 });
//! publisher.scope_exit(true); // handlers run now
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregator;
pub mod error;
pub mod notification;
pub mod publisher;

pub use aggregator::{EventAggregator, InMemoryEventAggregator, NotificationHandler, TypedHandler};
pub use error::{NotifyError, NotifyResult};
pub use notification::{CancelState, EventMessage, MessageKind, Notification};
pub use publisher::{NotificationSuppression, ScopedNotificationPublisher};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
