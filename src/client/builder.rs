//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring [`ClientConfig`] and [`Client`]
//! instances. The builder also deserializes with serde, so it can be
//! embedded in an application's own configuration file.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ws_tether::ClientConfig;
//!
//! # fn example() -> ws_tether::Result<()> {
//! let config = ClientConfig::builder()
//!     .url("wss://example.com/feed")
//!     .handshake_timeout(Duration::from_secs(5))
//!     .max_retries(3)
//!     .build()?;
//! assert_eq!(config.max_retries(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

use super::config::{
    ClientConfig, DEFAULT_BUFFER_SIZE, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_RETRIES,
    DEFAULT_MAX_SIZE, DEFAULT_RECONNECT_DELAY,
};
use super::core::Client;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for [`ClientConfig`].
///
/// Durations deserialize from milliseconds under `*_ms` keys:
///
/// ```json
/// { "url": "wss://example.com/feed", "handshake_timeout_ms": 5000, "max_retries": 3 }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientBuilder {
    /// Target URL.
    url: Option<String>,
    /// Upgrade timeout.
    #[serde(rename = "handshake_timeout_ms", deserialize_with = "millis")]
    handshake_timeout: Option<Duration>,
    /// Maximum frame size in bytes.
    max_size: Option<usize>,
    /// Read buffer size in bytes.
    buffer_size: Option<usize>,
    /// Reconnect attempt bound.
    max_retries: Option<u32>,
    /// Base backoff delay.
    #[serde(rename = "reconnect_delay_ms", deserialize_with = "millis")]
    reconnect_delay: Option<Duration>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the upper bound for the WebSocket upgrade.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Sets the largest accepted frame in bytes.
    #[inline]
    #[must_use]
    pub fn max_size(mut self, bytes: usize) -> Self {
        self.max_size = Some(bytes);
        self
    }

    /// Sets the read buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = Some(bytes);
        self
    }

    /// Sets how many attempts a reconnect makes before giving up.
    #[inline]
    #[must_use]
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = Some(attempts);
        self
    }

    /// Sets the wait before the second reconnect attempt.
    ///
    /// Each later wait doubles the previous one, without a ceiling.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// The URL itself is resolved on every connect, not here.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing or empty
    /// - [`Error::Config`] if `max_size`, `buffer_size` or `max_retries` is zero
    pub fn build(self) -> Result<ClientConfig> {
        let url = self.validate_url()?;

        let max_size = non_zero(self.max_size.unwrap_or(DEFAULT_MAX_SIZE), "max_size")?;
        let buffer_size = non_zero(self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE), "buffer_size")?;
        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(Error::config("max_retries must be at least 1"));
        }

        Ok(ClientConfig {
            url,
            handshake_timeout: self.handshake_timeout.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
            max_size,
            buffer_size,
            max_retries,
            reconnect_delay: self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY),
        })
    }

    /// Builds a [`Client`] on the default transport.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_client(self) -> Result<Client> {
        Ok(Client::new(self.build()?))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the URL configuration.
    fn validate_url(&self) -> Result<String> {
        let url = self.url.clone().ok_or_else(|| {
            Error::config(
                "URL is required. Use .url() to set it.\n\
                 Example: ClientConfig::builder().url(\"wss://example.com/feed\")",
            )
        })?;

        if url.trim().is_empty() {
            return Err(Error::config("URL must not be empty"));
        }

        Ok(url)
    }
}

fn non_zero(value: usize, name: &str) -> Result<usize> {
    if value == 0 {
        return Err(Error::config(format!("{name} must be greater than zero")));
    }
    Ok(value)
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

// ============================================================================
// Tests
// ============================================================================
