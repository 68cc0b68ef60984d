//! Connection lifecycle manager.
//!
//! [`Client`] owns the configuration and at most one live transport
//! handle. It turns the configured URL into a connection, delegates
//! message I/O to the handle, and rebuilds the connection with bounded
//! exponential backoff when asked to.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect──► Connecting ──ok──► Connected
//!      ▲                        │                  │
//!      └─────────err────────────┘        reconnect │ close / teardown
//!                                                  ▼
//!                      Failed ◄──exhausted── Reconnecting ──ok──► Connected
//! ```
//!
//! # Handle Replacement
//!
//! The old handle is always released (close attempted, errors ignored,
//! then dropped) before a new connection is opened, so two live handles
//! never coexist.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result, saturating_millis};
use crate::params::resolve;
use crate::transport::{
    CloseOptions, HandshakeRequest, Message, SocketOptions, Transport, TransportHandle,
    TungsteniteTransport,
};

use super::backoff::Backoff;
use super::config::ClientConfig;
use super::state::{ConnectionState, Link};

// ============================================================================
// Client
// ============================================================================

/// Manages one persistent WebSocket connection.
///
/// Operations take `&mut self`, so the caller serializes them. Wrap the
/// client in a `tokio::sync::Mutex` to share it between tasks.
///
/// Dropping the client releases the handle without a close handshake.
///
/// # Example
///
/// ```no_run
/// use ws_tether::{Client, ClientConfig, Result};
///
/// # async fn example() -> Result<()> {
/// let config = ClientConfig::builder()
///     .url("wss://example.com/feed")
///     .max_retries(5)
///     .build()?;
///
/// let mut client = Client::new(config);
/// client.connect().await?;
/// client.write(r#"{"op":"subscribe"}"#).await?;
///
/// loop {
///     let message = client.next_message().await?;
///     println!("{:?}", message.as_text());
///     client.done(message);
/// }
/// # }
/// ```
pub struct Client<T: Transport = TungsteniteTransport> {
    /// Immutable settings.
    config: ClientConfig,
    /// Opens and upgrades connections.
    transport: T,
    /// The live handle, if any.
    link: Link<T::Handle>,
    /// Read timeout requested by the caller, reapplied after reconnects.
    read_timeout: Option<Duration>,
    /// Publishes state changes.
    state_tx: watch::Sender<ConnectionState>,
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a client on the `tokio-tungstenite` transport.
    ///
    /// Does not connect; call [`connect`](Self::connect).
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, TungsteniteTransport::new())
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client on a custom transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            config,
            transport,
            link: Link::Disconnected,
            read_timeout: None,
            state_tx,
        }
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl<T: Transport> Client<T> {
    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Returns `true` if a live handle is held.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Subscribe to connection state changes.
    ///
    /// Useful for re-sending subscriptions after a reconnect.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}

// ============================================================================
// Client - Connection Lifecycle
// ============================================================================

impl<T: Transport> Client<T> {
    /// Establishes the connection.
    ///
    /// Any existing connection is released first. No retry happens here;
    /// use [`reconnect`](Self::reconnect) for that.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the URL does not resolve
    /// - [`Error::Transport`] / [`Error::Io`] if the socket cannot be opened
    /// - [`Error::Handshake`] / [`Error::HandshakeTimeout`] if the upgrade fails
    pub async fn connect(&mut self) -> Result<()> {
        self.release().await;
        self.set_state(ConnectionState::Connecting);

        match self.establish().await {
            Ok(handle) => {
                self.install(handle);
                Ok(())
            }
            Err(e) => {
                debug!(url = %self.config.url(), error = %e, "Connect failed");
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Rebuilds the connection with exponential backoff.
    ///
    /// Makes up to `max_retries` attempts. The first attempt starts
    /// immediately; each later one waits the reconnect delay, doubled after
    /// every wait (0, d, 2d, 4d, ...). Per-attempt failures are logged and
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReconnectionExhausted`] if every attempt fails. The
    /// state is then [`ConnectionState::Failed`] and no handle is held.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.reconnect_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`reconnect`](Self::reconnect), but stops when `cancel` fires.
    ///
    /// Cancellation is observed during backoff waits and in-flight attempts.
    ///
    /// # Errors
    ///
    /// - [`Error::ReconnectCancelled`] if `cancel` fired; state is
    ///   [`ConnectionState::Disconnected`]
    /// - [`Error::ReconnectionExhausted`] if every attempt fails
    pub async fn reconnect_with_cancel(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.release().await;

        let max_retries = self.config.max_retries();
        let mut backoff = Backoff::new(self.config.reconnect_delay());

        for attempt in 1..=max_retries {
            if attempt > 1 {
                let delay = backoff.next_delay();
                debug!(attempt, delay_ms = saturating_millis(delay), "Backing off before reconnect");

                let waited = tokio::select! {
                    biased;
                    () = cancel.cancelled() => false,
                    () = sleep(delay) => true,
                };
                if !waited {
                    return Err(self.cancelled(attempt));
                }
            }

            self.set_state(ConnectionState::Reconnecting { attempt });

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                outcome = self.establish() => Some(outcome),
            };

            match outcome {
                None => return Err(self.cancelled(attempt)),
                Some(Ok(handle)) => {
                    info!(attempt, "Reconnected");
                    self.install(handle);
                    return Ok(());
                }
                Some(Err(e)) => {
                    warn!(attempt, max_retries, error = %e, "Reconnect attempt failed");
                }
            }
        }

        error!(attempts = max_retries, url = %self.config.url(), "Reconnection exhausted");
        self.set_state(ConnectionState::Failed);
        Err(Error::reconnection_exhausted(max_retries))
    }

    /// Gracefully closes the connection and releases the handle.
    ///
    /// The handle is released even if the close handshake fails.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - Any error from the close handshake
    pub async fn close(&mut self, options: CloseOptions) -> Result<()> {
        let mut handle = self.link.take().ok_or(Error::NotConnected)?;
        let result = handle.close(options).await;
        drop(handle);

        self.set_state(ConnectionState::Disconnected);
        debug!(ok = result.is_ok(), "Connection closed");
        result
    }

    /// Releases the handle, if any, without a close handshake.
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        if self.link.take().is_some() {
            debug!("Connection handle released");
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

// ============================================================================
// Client - Message I/O
// ============================================================================

impl<T: Transport> Client<T> {
    /// Sends an application message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - Any transport write error, unchanged
    pub async fn write(&mut self, message: impl Into<Message>) -> Result<()> {
        let message = message.into();
        trace!(len = message.len(), text = message.is_text(), "Writing message");
        self.link.handle_mut()?.write(message).await
    }

    /// Sends a pong control frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - Any transport write error, unchanged
    pub async fn write_pong(&mut self, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.link.handle_mut()?.write_pong(payload.into()).await
    }

    /// Waits for the next application message.
    ///
    /// Returns `None` when the peer shut the connection down cleanly.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    /// - [`Error::ReadTimeout`] if a read timeout is set and expires
    /// - Any other transport read error, unchanged
    pub async fn read(&mut self) -> Result<Option<Message>> {
        self.link.handle_mut()?.read().await
    }

    /// Bounds subsequent reads.
    ///
    /// The timeout is also reapplied to connections established later by
    /// [`reconnect`](Self::reconnect).
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no connection
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.link.handle_mut()?.set_read_timeout(Some(timeout))?;
        self.read_timeout = Some(timeout);
        Ok(())
    }

    /// Hands a message back to the transport once processed.
    ///
    /// Never fails. Without a connection the message is simply dropped.
    pub fn done(&mut self, message: Message) {
        if let Ok(handle) = self.link.handle_mut() {
            handle.done(message);
        }
    }

    /// Reads the next message, reconnecting when the connection drops.
    ///
    /// A clean close from the peer or a transport error triggers
    /// [`reconnect`](Self::reconnect), after which reading resumes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if never connected or closed by the caller
    /// - [`Error::ReadTimeout`] when a read timeout expires
    /// - [`Error::ReconnectionExhausted`] if recovery fails
    pub async fn next_message(&mut self) -> Result<Message> {
        loop {
            let reason = match self.read().await {
                Ok(Some(message)) => return Ok(message),
                Ok(None) => "closed by peer".to_owned(),
                Err(e) if e.is_timeout() || matches!(e, Error::NotConnected) => return Err(e),
                Err(e) => e.to_string(),
            };

            warn!(%reason, "Connection lost, reconnecting");
            self.reconnect().await?;
        }
    }
}

// ============================================================================
// Client - Internals
// ============================================================================

impl<T: Transport> Client<T> {
    /// Resolves the URL, opens the socket and performs the upgrade.
    async fn establish(&self) -> Result<T::Handle> {
        let params = resolve(self.config.url())?;
        let options = SocketOptions {
            tls: params.tls,
            max_frame_size: self.config.max_size(),
            read_buffer_size: self.config.buffer_size(),
        };

        debug!(%params, "Opening connection");
        let socket = self.transport.connect(&params, &options).await?;

        let request = HandshakeRequest::new(params.path.clone(), self.config.handshake_timeout())
            .with_header("Host", params.host_header());
        self.transport.handshake(socket, &request).await
    }

    /// Stores a fresh handle and marks the client connected.
    fn install(&mut self, mut handle: T::Handle) {
        if let Some(limit) = self.read_timeout
            && let Err(e) = handle.set_read_timeout(Some(limit))
        {
            warn!(error = %e, "Failed to reapply read timeout");
        }

        self.link.install(handle);
        self.set_state(ConnectionState::Connected {
            since: Instant::now(),
        });
        info!(url = %self.config.url(), "WebSocket connection established");
    }

    /// Closes and drops the current handle, ignoring every error.
    async fn release(&mut self) {
        let Some(mut handle) = self.link.take() else {
            return;
        };

        match timeout(self.config.handshake_timeout(), handle.close(CloseOptions::new())).await {
            Ok(Ok(())) => debug!("Previous connection closed"),
            Ok(Err(e)) => debug!(error = %e, "Ignoring close error on previous connection"),
            Err(_) => debug!("Ignoring close timeout on previous connection"),
        }
        drop(handle);

        self.set_state(ConnectionState::Disconnected);
    }

    fn cancelled(&self, attempt: u32) -> Error {
        debug!(attempt, "Reconnect cancelled");
        self.set_state(ConnectionState::Disconnected);
        Error::ReconnectCancelled
    }
}

// ============================================================================
// Tests
// ============================================================================
