//! URL to connection parameter translation.
//!
//! Turns a WebSocket URL into the `(host, port, path, tls)` tuple the
//! transport needs. Resolution is recomputed on every connect attempt, so
//! nothing here holds state.
//!
//! # Port Defaults
//!
//! | Scheme | TLS | Default port |
//! |--------|-----|--------------|
//! | `wss`, `https` | yes | 443 |
//! | anything else | no | 80 |
//!
//! An explicit port always wins over the default.
//!
//! # Example
//!
//! ```
//! use ws_tether::params::resolve;
//!
//! let params = resolve("wss://example.com/feed?depth=10").unwrap();
//! assert_eq!(params.host, "example.com");
//! assert_eq!(params.port, 443);
//! assert_eq!(params.path, "/feed?depth=10");
//! assert!(params.tls);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::{Host, Url};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default port for plain connections.
pub const DEFAULT_PLAIN_PORT: u16 = 80;

/// Default port for TLS connections.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Schemes that select TLS.
const SECURE_SCHEMES: &[&str] = &["wss", "https"];

// ============================================================================
// ConnectionParams
// ============================================================================

/// Where and how to open a WebSocket connection.
///
/// Derived from the configured URL by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Host name or IP literal (IPv6 without brackets). Never empty.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Request target for the handshake, including any query string.
    pub path: String,
    /// Whether the connection is wrapped in TLS.
    pub tls: bool,
}

impl ConnectionParams {
    /// Returns the port implied by the TLS flag alone.
    #[inline]
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        if self.tls {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PLAIN_PORT
        }
    }

    /// Returns the value for the `Host` header.
    ///
    /// IPv6 literals are bracketed; the port is appended only when it
    /// differs from the scheme default.
    #[must_use]
    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        if self.port == self.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// Returns the full `ws://` or `wss://` URI used for the upgrade request.
    #[must_use]
    pub fn request_uri(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://{}{}", self.host_header(), self.path)
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request_uri())
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves a URL into [`ConnectionParams`].
///
/// # Errors
///
/// Returns [`Error::Parse`] if the URL is malformed or its host is absent
/// or empty.
pub fn resolve(url: &str) -> Result<ConnectionParams> {
    let parsed = Url::parse(url).map_err(|e| Error::parse(url, e.to_string()))?;

    let host = match parsed.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_owned(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(Error::parse(url, "missing host")),
    };

    let tls = SECURE_SCHEMES.contains(&parsed.scheme());
    let port = parsed.port().unwrap_or(if tls {
        DEFAULT_TLS_PORT
    } else {
        DEFAULT_PLAIN_PORT
    });

    let mut path = match parsed.path() {
        "" => "/".to_owned(),
        p => p.to_owned(),
    };
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(ConnectionParams {
        host,
        port,
        path,
        tls,
    })
}

// ============================================================================
// Tests
// ============================================================================
