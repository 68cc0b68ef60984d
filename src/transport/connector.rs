//! Transport implementation on top of `tokio-tungstenite`.
//!
//! [`TungsteniteTransport`] opens a TCP socket and upgrades it, optionally
//! through rustls. The resulting [`WsConnection`] hides control frames
//! from the caller: pings are answered by tungstenite, pongs are skipped,
//! and a close frame ends the stream.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, client_async_tls_with_config};
use tracing::{debug, trace};

use crate::error::{Error, Result, saturating_millis};
use crate::params::ConnectionParams;

use super::message::{CloseOptions, HandshakeRequest, Message, SocketOptions};
use super::{Transport, TransportHandle};

// ============================================================================
// Constants
// ============================================================================

/// Bound for sending our close frame and, separately, for the peer's acknowledgement.
const CLOSE_ACK_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TLS
// ============================================================================

static INIT_CRYPTO: Once = Once::new();

/// Installs ring as the process-wide rustls crypto provider.
///
/// Does nothing if the application already installed a provider.
fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("Keeping the rustls crypto provider installed by the application");
        }
    });
}

// ============================================================================
// TungsteniteTransport
// ============================================================================

/// [`Transport`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    /// Creates a new transport.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// A TCP socket waiting for its WebSocket upgrade.
#[derive(Debug)]
pub struct TcpSocket {
    stream: TcpStream,
    params: ConnectionParams,
    options: SocketOptions,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    type Socket = TcpSocket;
    type Handle = WsConnection;

    async fn connect(
        &self,
        params: &ConnectionParams,
        options: &SocketOptions,
    ) -> Result<TcpSocket> {
        let stream = TcpStream::connect((params.host.as_str(), params.port))
            .await
            .map_err(|e| {
                Error::transport(format!("connect to {}:{} failed: {e}", params.host, params.port))
            })?;
        stream.set_nodelay(true)?;

        debug!(host = %params.host, port = params.port, tls = options.tls, "TCP connection opened");

        Ok(TcpSocket {
            stream,
            params: params.clone(),
            options: *options,
        })
    }

    async fn handshake(
        &self,
        socket: TcpSocket,
        request: &HandshakeRequest,
    ) -> Result<WsConnection> {
        let TcpSocket {
            stream,
            params,
            options,
        } = socket;

        let target = ConnectionParams {
            path: request.path.clone(),
            ..params
        };
        let mut upgrade_request = target.request_uri().into_client_request()?;
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::handshake(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::handshake(format!("invalid header value '{value}': {e}")))?;
            upgrade_request.headers_mut().insert(name, value);
        }

        let config = WebSocketConfig::default()
            .read_buffer_size(options.read_buffer_size)
            .max_frame_size(Some(options.max_frame_size))
            .max_message_size(Some(options.max_frame_size));

        // `None` lets tokio-tungstenite pick rustls for wss.
        let connector = if options.tls {
            init_crypto();
            None
        } else {
            Some(Connector::Plain)
        };

        let upgrade = client_async_tls_with_config(upgrade_request, stream, Some(config), connector);
        let (ws_stream, response) = timeout(request.timeout, upgrade)
            .await
            .map_err(|_| Error::handshake_timeout(saturating_millis(request.timeout)))?
            .map_err(classify_handshake_error)?;

        debug!(
            uri = %target,
            status = %response.status(),
            "WebSocket handshake completed"
        );

        Ok(WsConnection {
            stream: ws_stream,
            read_timeout: None,
        })
    }
}

/// Splits handshake failures into socket-level and protocol-level errors.
fn classify_handshake_error(error: WsError) -> Error {
    match error {
        WsError::Io(e) => Error::Io(e),
        WsError::Tls(e) => Error::transport(format!("TLS negotiation failed: {e}")),
        other => Error::handshake(other.to_string()),
    }
}

// ============================================================================
// WsConnection
// ============================================================================

/// A live WebSocket connection produced by [`TungsteniteTransport`].
pub struct WsConnection {
    stream: WsStream,
    read_timeout: Option<Duration>,
}

impl WsConnection {
    /// Pulls frames until an application message or end of stream.
    async fn next_message(stream: &mut WsStream) -> Result<Option<Message>> {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    trace!(len = text.len(), "Text message received");
                    return Ok(Some(Message::Text(text.as_str().to_owned())));
                }

                Some(Ok(WsMessage::Binary(data))) => {
                    trace!(len = data.len(), "Binary message received");
                    return Ok(Some(Message::Binary(data.to_vec())));
                }

                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    return Ok(None);
                }

                // Pings are answered by tungstenite on the next I/O call.
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}

                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    debug!("WebSocket stream ended");
                    return Ok(None);
                }

                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl TransportHandle for WsConnection {
    async fn write(&mut self, message: Message) -> Result<()> {
        let frame = match message {
            Message::Text(text) => WsMessage::Text(text.into()),
            Message::Binary(data) => WsMessage::Binary(data.into()),
        };
        self.stream.send(frame).await?;
        Ok(())
    }

    async fn write_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.stream.send(WsMessage::Pong(payload.into())).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Message>> {
        match self.read_timeout {
            Some(limit) => timeout(limit, Self::next_message(&mut self.stream))
                .await
                .map_err(|_| Error::read_timeout(saturating_millis(limit)))?,
            None => Self::next_message(&mut self.stream).await,
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn done(&mut self, message: Message) {
        trace!(len = message.len(), "Message released");
    }

    async fn close(&mut self, options: CloseOptions) -> Result<()> {
        let frame = options.effective_code().map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: options.reason.clone().unwrap_or_default().into(),
        });

        timeout(CLOSE_ACK_TIMEOUT, self.stream.close(frame))
            .await
            .map_err(|_| Error::transport("timed out sending close frame"))??;

        // Drain until the peer echoes the close frame or the stream ends.
        let drain = async { while let Some(Ok(_)) = self.stream.next().await {} };
        if timeout(CLOSE_ACK_TIMEOUT, drain).await.is_err() {
            debug!("Peer did not acknowledge close in time");
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    use crate::params::resolve;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn options() -> SocketOptions {
        SocketOptions {
            tls: false,
            max_frame_size: 4096,
            read_buffer_size: 1024,
        }
    }

    /// Spawns a one-shot echo server and reports the upgrade's path and Host header.
    async fn spawn_echo_server() -> (u16, oneshot::Receiver<(String, Option<String>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let (seen_tx, seen_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let callback = move |request: &Request,
                                 response: Response|
                  -> std::result::Result<Response, ErrorResponse> {
                let host = request
                    .headers()
                    .get("host")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                let _ = seen_tx.send((request.uri().to_string(), host));
                Ok(response)
            };
            let mut ws = accept_hdr_async(stream, callback).await.expect("upgrade");

            while let Some(Ok(message)) = ws.next().await {
                if (message.is_text() || message.is_binary()) && ws.send(message).await.is_err() {
                    break;
                }
            }
        });

        (port, seen_rx)
    }

    async fn open(url: &str) -> Result<WsConnection> {
        let transport = TungsteniteTransport::new();
        let params = resolve(url)?;
        let socket = transport.connect(&params, &options()).await?;
        let request = HandshakeRequest::new(params.path.clone(), TEST_TIMEOUT)
            .with_header("Host", params.host_header());
        transport.handshake(socket, &request).await
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let (port, seen) = spawn_echo_server().await;
        let mut connection = open(&format!("ws://127.0.0.1:{port}/echo?x=1"))
            .await
            .expect("connect");

        let (path, host) = seen.await.expect("server saw request");
        assert_eq!(path, "/echo?x=1");
        assert_eq!(host, Some(format!("127.0.0.1:{port}")));

        connection.write(Message::from("hello")).await.expect("write");
        let reply = connection.read().await.expect("read");
        assert_eq!(reply, Some(Message::Text("hello".into())));

        connection
            .write(Message::from(vec![1u8, 2, 3]))
            .await
            .expect("write");
        let reply = connection.read().await.expect("read");
        assert_eq!(reply, Some(Message::Binary(vec![1, 2, 3])));
    }

    #[tokio::test]
    async fn test_close_handshake() {
        let (port, _seen) = spawn_echo_server().await;
        let mut connection = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .expect("connect");

        connection
            .close(CloseOptions::new().with_reason("done"))
            .await
            .expect("close");
    }

    #[tokio::test]
    async fn test_read_returns_none_when_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            ws.close(None).await.expect("close");
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut connection = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .expect("connect");
        let message = connection.read().await.expect("read");
        assert_eq!(message, None);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (port, _seen) = spawn_echo_server().await;
        let mut connection = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .expect("connect");

        connection
            .set_read_timeout(Some(Duration::from_millis(100)))
            .expect("set timeout");
        let err = connection.read().await.unwrap_err();
        assert!(matches!(err, Error::ReadTimeout { timeout_ms: 100 }));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let err = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[tokio::test]
    async fn test_rejected_upgrade_is_handshake_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut stream, &mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n")
                .await;
        });

        let err = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .err()
            .expect("handshake should fail");
        assert!(matches!(err, Error::Handshake { .. }), "got {err:?}");
    }

    /// Accepts one TCP connection, reads the first bytes and hangs up.
    async fn spawn_plain_tcp_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut stream, &mut buf).await;
        });

        port
    }

    #[tokio::test]
    async fn test_tls_against_plain_server_fails_cleanly() {
        let port = spawn_plain_tcp_server().await;

        let transport = TungsteniteTransport::new();
        let params = resolve(&format!("wss://127.0.0.1:{port}/")).expect("valid url");
        assert!(params.tls);
        let socket = transport
            .connect(&params, &SocketOptions { tls: true, ..options() })
            .await
            .expect("tcp connect");
        let request = HandshakeRequest::new("/", TEST_TIMEOUT);

        let err = transport
            .handshake(socket, &request)
            .await
            .err()
            .expect("tls handshake should fail");
        assert!(
            matches!(
                err,
                Error::Transport { .. } | Error::Handshake { .. } | Error::Io(_)
            ),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_close_is_bounded_when_peer_stops_reading() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(ws);
        });

        let mut connection = open(&format!("ws://127.0.0.1:{port}/"))
            .await
            .expect("connect");

        // Fill the socket buffers until a write stalls.
        let chunk = vec![0u8; 64 * 1024];
        let mut stalled = false;
        for _ in 0..2048 {
            let write = connection.write(Message::Binary(chunk.clone()));
            if timeout(Duration::from_millis(200), write).await.is_err() {
                stalled = true;
                break;
            }
        }
        assert!(stalled, "peer never applied backpressure");

        let result = timeout(CLOSE_ACK_TIMEOUT * 3, connection.close(CloseOptions::new()))
            .await
            .expect("close must finish within its own bound");
        assert!(matches!(result, Err(Error::Transport { .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn test_silent_server_hits_handshake_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let transport = TungsteniteTransport::new();
        let params = resolve(&format!("ws://127.0.0.1:{port}/")).expect("valid url");
        let socket = transport
            .connect(&params, &options())
            .await
            .expect("tcp connect");
        let request = HandshakeRequest::new("/", Duration::from_millis(200));

        let err = transport.handshake(socket, &request).await.err().expect("timeout");
        assert!(matches!(err, Error::HandshakeTimeout { timeout_ms: 200 }));
    }
}
