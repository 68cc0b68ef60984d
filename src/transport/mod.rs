//! WebSocket transport layer.
//!
//! The client never touches sockets directly. It talks to a [`Transport`]
//! that opens a socket and performs the upgrade, yielding a
//! [`TransportHandle`] for message I/O.
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::connect` - Open a socket to the resolved host and port
//! 2. `Transport::handshake` - Upgrade the socket to WebSocket
//! 3. `TransportHandle` - Read, write and close
//! 4. `Drop` - Release the socket unconditionally
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connector` | [`TungsteniteTransport`] built on `tokio-tungstenite` |
//! | `message` | Messages and option types passed through the traits |

// ============================================================================
// Submodules
// ============================================================================

/// Transport implementation on top of `tokio-tungstenite`.
pub mod connector;

/// Message and option types.
pub mod message;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::params::ConnectionParams;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::{TcpSocket, TungsteniteTransport, WsConnection};
pub use message::{CloseOptions, HandshakeRequest, Message, SocketOptions};

// ============================================================================
// Traits
// ============================================================================

/// Opens and upgrades connections.
///
/// Connecting and handshaking are separate steps so the client can apply
/// the handshake timeout and headers independently of socket setup.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A connected socket that has not been upgraded yet.
    type Socket: Send;

    /// A live, upgraded connection.
    type Handle: TransportHandle;

    /// Opens a socket to `params.host:params.port`.
    async fn connect(
        &self,
        params: &ConnectionParams,
        options: &SocketOptions,
    ) -> Result<Self::Socket>;

    /// Performs the WebSocket upgrade on `socket`.
    async fn handshake(
        &self,
        socket: Self::Socket,
        request: &HandshakeRequest,
    ) -> Result<Self::Handle>;
}

/// A live connection.
///
/// Dropping the handle releases the underlying socket without a close
/// handshake.
#[async_trait]
pub trait TransportHandle: Send {
    /// Sends an application message.
    async fn write(&mut self, message: Message) -> Result<()>;

    /// Sends a pong control frame.
    async fn write_pong(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Waits for the next application message.
    ///
    /// Returns `None` when the peer shut the connection down cleanly.
    async fn read(&mut self) -> Result<Option<Message>>;

    /// Bounds subsequent [`read`](Self::read) calls. `None` waits forever.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Hands a message back once the caller is finished with it.
    fn done(&mut self, message: Message) {
        drop(message);
    }

    /// Performs the close handshake.
    async fn close(&mut self, options: CloseOptions) -> Result<()>;
}
