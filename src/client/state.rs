//! Connection state tracking.
//!
//! [`ConnectionState`] is what observers see. [`Link`] is where the client
//! keeps its handle: a tagged slot that is either empty or holds exactly
//! one live connection.

// ============================================================================
// Imports
// ============================================================================

use std::mem;
use std::time::Instant;

use crate::error::{Error, Result};

// ============================================================================
// ConnectionState
// ============================================================================

/// Observable lifecycle state of a [`Client`](crate::Client).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, nothing in progress.
    Disconnected,
    /// A `connect()` call is in flight.
    Connecting,
    /// Connection established.
    Connected {
        /// When the connection was established.
        since: Instant,
    },
    /// A reconnect attempt is in flight.
    Reconnecting {
        /// Current attempt number, starting at 1.
        attempt: u32,
    },
    /// Every reconnect attempt failed.
    Failed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Check if reconnection gave up.
    #[inline]
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}

// ============================================================================
// Link
// ============================================================================

/// Slot holding zero or one transport handle.
#[derive(Debug)]
pub(crate) enum Link<H> {
    Disconnected,
    Connected(H),
}

impl<H> Link<H> {
    /// Borrows the live handle, or fails with [`Error::NotConnected`].
    #[inline]
    pub(crate) fn handle_mut(&mut self) -> Result<&mut H> {
        match self {
            Self::Connected(handle) => Ok(handle),
            Self::Disconnected => Err(Error::NotConnected),
        }
    }

    /// Empties the slot and returns what it held.
    #[inline]
    pub(crate) fn take(&mut self) -> Option<H> {
        match mem::replace(self, Self::Disconnected) {
            Self::Connected(handle) => Some(handle),
            Self::Disconnected => None,
        }
    }

    /// Stores a new handle. The slot must already be empty.
    #[inline]
    pub(crate) fn install(&mut self, handle: H) {
        debug_assert!(
            matches!(self, Self::Disconnected),
            "previous handle must be released before installing a new one"
        );
        *self = Self::Connected(handle);
    }

    #[inline]
    pub(crate) const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
