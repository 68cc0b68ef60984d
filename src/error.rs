//! Error types for ws-tether.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_tether::{Client, Result};
//!
//! async fn example(client: &mut Client) -> Result<()> {
//!     client.connect().await?;
//!     client.write("hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Parse`] |
//! | Transport | [`Error::Transport`], [`Error::Io`], [`Error::WebSocket`] |
//! | Handshake | [`Error::Handshake`], [`Error::HandshakeTimeout`] |
//! | I/O | [`Error::ReadTimeout`], [`Error::NotConnected`] |
//! | Lifecycle | [`Error::ReconnectionExhausted`], [`Error::ReconnectCancelled`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL could not be turned into connection parameters.
    ///
    /// Returned when the URL is malformed or has no host.
    #[error("Invalid URL '{url}': {message}")]
    Parse {
        /// The URL that failed to resolve.
        url: String,
        /// Why it failed.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Socket or TLS failure reported by the transport.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// WebSocket upgrade was rejected.
    #[error("Handshake failed: {message}")]
    Handshake {
        /// Description of the handshake failure.
        message: String,
    },

    /// WebSocket upgrade did not complete in time.
    #[error("Handshake timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// No message arrived within the configured read timeout.
    #[error("Read timeout after {timeout_ms}ms")]
    ReadTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Operation requires a live connection but none exists.
    ///
    /// Returned by every I/O operation invoked before a successful connect
    /// or after close/teardown.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Every reconnect attempt failed.
    ///
    /// The connection stays down until the caller reconnects again.
    #[error("Reconnection exhausted after {attempts} attempts")]
    ReconnectionExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Reconnect loop was cancelled by the caller.
    #[error("Reconnect cancelled")]
    ReconnectCancelled,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a URL parse error.
    #[inline]
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn handshake_timeout(timeout_ms: u64) -> Self {
        Self::HandshakeTimeout { timeout_ms }
    }

    /// Creates a read timeout error.
    #[inline]
    pub fn read_timeout(timeout_ms: u64) -> Self {
        Self::ReadTimeout { timeout_ms }
    }

    /// Creates a reconnection exhausted error.
    #[inline]
    pub fn reconnection_exhausted(attempts: u32) -> Self {
        Self::ReconnectionExhausted { attempts }
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
#[inline]
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::ReadTimeout { .. }
        )
    }

    /// Returns `true` if this error came from establishing or using the socket.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Handshake { .. }
                | Self::HandshakeTimeout { .. }
                | Self::Io(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if calling [`reconnect`](crate::Client::reconnect) may help.
    ///
    /// Configuration and parse errors never recover by retrying, and an
    /// exhausted reconnect is left to the caller.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_connection_error() || matches!(self, Self::NotConnected)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("ws://", "empty host");
        assert_eq!(err.to_string(), "Invalid URL 'ws://': empty host");
    }

    #[test]
    fn test_exhausted_display() {
        let err = Error::reconnection_exhausted(3);
        assert_eq!(err.to_string(), "Reconnection exhausted after 3 attempts");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::handshake_timeout(10_000).is_timeout());
        assert!(Error::read_timeout(500).is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::transport("reset").is_connection_error());
        assert!(Error::handshake("403").is_connection_error());
        assert!(Error::handshake_timeout(1).is_connection_error());
        assert!(!Error::config("bad").is_connection_error());
        assert!(!Error::read_timeout(1).is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::transport("reset").is_recoverable());
        assert!(Error::NotConnected.is_recoverable());
        assert!(!Error::parse("x", "y").is_recoverable());
        assert!(!Error::reconnection_exhausted(10).is_recoverable());
        assert!(!Error::ReconnectCancelled.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(250)), 250);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);

        let err = Error::read_timeout(saturating_millis(Duration::MAX));
        assert!(matches!(err, Error::ReadTimeout { timeout_ms: u64::MAX }));
    }

    #[test]
    fn test_from_ws_error() {
        let err: Error = WsError::ConnectionClosed.into();
        assert!(matches!(err, Error::WebSocket(_)));
    }
}
