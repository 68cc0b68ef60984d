//! Client configuration.
//!
//! [`ClientConfig`] is fixed once built. Use [`ClientConfig::builder()`]
//! to construct one.
//!
//! # Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | `handshake_timeout` | 10000 ms |
//! | `max_size` | 4096 bytes |
//! | `buffer_size` | 1024 bytes |
//! | `max_retries` | 10 |
//! | `reconnect_delay` | 1000 ms |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::builder::ClientBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Default upper bound for the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default maximum frame size in bytes.
pub const DEFAULT_MAX_SIZE: usize = 4096;

/// Default read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of reconnect attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default wait before the second reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// ClientConfig
// ============================================================================

/// Immutable settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub(super) url: String,
    pub(super) handshake_timeout: Duration,
    pub(super) max_size: usize,
    pub(super) buffer_size: usize,
    pub(super) max_retries: u32,
    pub(super) reconnect_delay: Duration,
}

impl ClientConfig {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upper bound for the WebSocket upgrade.
    #[inline]
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Largest accepted frame in bytes.
    #[inline]
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Read buffer size in bytes.
    #[inline]
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of attempts a reconnect makes before giving up.
    #[inline]
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before the second reconnect attempt. Doubles after each wait.
    #[inline]
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
}
