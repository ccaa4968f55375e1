//! Completion state of a scope
//!
//! ```text
//!           complete()
//!   Unset ─────────────▶ Completed
//!     │                     │
//!     └──── child failed ───┴──▶ Failed   (terminal)
//! ```

use std::fmt;

/// Tri-state completion flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Completion {
    /// `complete` was never called
    #[default]
    Unset,
    /// Completed, no child failure seen
    Completed,
    /// A child did not complete
    Failed,
}

impl Completion {
    /// Record completion; returns the resulting outcome
    ///
    /// Only `Unset` moves, so repeated calls return the first outcome.
    pub fn complete(&mut self) -> bool {
        if *self == Self::Unset {
            *self = Self::Completed;
        }
        self.is_completed()
    }

    /// Fold in the outcome a disposed child reported
    ///
    /// Anything but `Completed` fails this state for good. Returns whether
    /// the state changed.
    pub fn absorb_child(&mut self, child: Self) -> bool {
        if child == Self::Completed || *self == Self::Failed {
            return false;
        }
        *self = Self::Failed;
        true
    }

    /// Whether the outcome is success
    #[inline]
    #[must_use]
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }

    /// `None` while unset
    #[inline]
    #[must_use]
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Completed => Some(true),
            Self::Failed => Some(false),
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
