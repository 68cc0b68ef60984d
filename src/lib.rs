//! ws-tether - Lifecycle manager for one persistent WebSocket connection.
//!
//! Turns a URL and a few tuning parameters into an established connection
//! and keeps it alive across transient failures with bounded,
//! exponentially backed-off reconnection.
//!
//! # Architecture
//!
//! - [`params`] resolves a URL into host, port, path and TLS mode
//! - [`Client`] owns at most one live connection and the reconnect loop
//! - [`transport`] is the seam to the WebSocket implementation; the
//!   default is built on `tokio-tungstenite`
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_tether::{Client, ClientConfig, CloseOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::builder()
//!         .url("wss://example.com/feed")
//!         .max_retries(5)
//!         .build()?;
//!
//!     let mut client = Client::new(config);
//!     client.connect().await?;
//!     client.write("hello").await?;
//!
//!     match client.read().await {
//!         Ok(Some(message)) => println!("{:?}", message.as_text()),
//!         Ok(None) => println!("server closed the connection"),
//!         Err(e) if e.is_recoverable() => client.reconnect().await?,
//!         Err(e) => return Err(e),
//!     }
//!
//!     client.close(CloseOptions::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], configuration and connection state |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`params`] | URL to connection parameter resolution |
//! | [`transport`] | Transport traits and the `tokio-tungstenite` implementation |

// ============================================================================
// Modules
// ============================================================================

/// Connection lifecycle management.
///
/// Use [`ClientConfig::builder()`] to configure a [`Client`].
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// URL to connection parameter resolution.
pub mod params;

/// WebSocket transport layer.
///
/// Traits the client drives, plus the default implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientConfig, ConnectionState};

// Error types
pub use error::{Error, Result};

// Parameter types
pub use params::{ConnectionParams, resolve};

// Transport types
pub use transport::{CloseOptions, Message, Transport, TransportHandle, TungsteniteTransport};

// Cancellation for reconnect loops
pub use tokio_util::sync::CancellationToken;
