//! Value types exchanged with the transport.
//!
//! [`Message`] is what the caller reads and writes. The option structs
//! carry connection settings from the client into the transport.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Close code sent when a reason is given without an explicit code.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

// ============================================================================
// Message
// ============================================================================

/// An application-level WebSocket message.
///
/// Control frames (ping, pong, close) never surface as a `Message`; the
/// transport consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// UTF-8 text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
}

impl Message {
    /// Returns `true` for text messages.
    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns the text payload, if this is a text message.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the payload as bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the message and returns its payload.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(data) => data,
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Self::Binary(data.to_vec())
    }
}

// ============================================================================
// CloseOptions
// ============================================================================

/// Options for the close handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseOptions {
    /// Close status code.
    pub code: Option<u16>,
    /// Human-readable close reason.
    pub reason: Option<String>,
}

impl CloseOptions {
    /// Creates options that send a bare close frame.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code: None,
            reason: None,
        }
    }

    /// Sets the close code.
    #[inline]
    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the close reason.
    #[inline]
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the code to put on the wire.
    ///
    /// A reason cannot travel without a code, so a reason alone implies
    /// [`NORMAL_CLOSE_CODE`].
    #[must_use]
    pub fn effective_code(&self) -> Option<u16> {
        match (self.code, &self.reason) {
            (Some(code), _) => Some(code),
            (None, Some(_)) => Some(NORMAL_CLOSE_CODE),
            (None, None) => None,
        }
    }
}

// ============================================================================
// SocketOptions
// ============================================================================

/// Settings applied when opening the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Wrap the socket in TLS.
    pub tls: bool,
    /// Largest accepted frame and message, in bytes.
    pub max_frame_size: usize,
    /// Initial read buffer size, in bytes.
    pub read_buffer_size: usize,
}

// ============================================================================
// HandshakeRequest
// ============================================================================

/// Parameters of the WebSocket upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request target, including any query string.
    pub path: String,
    /// Upper bound for the whole upgrade exchange.
    pub timeout: Duration,
    /// Extra headers, applied over the transport's defaults.
    pub headers: Vec<(String, String)>,
}

impl HandshakeRequest {
    /// Creates a request with no extra headers.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_conversions() {
        let text = Message::from("hello");
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.len(), 5);

        let binary = Message::from(vec![1u8, 2, 3]);
        assert!(!binary.is_text());
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_message() {
        assert!(Message::from(String::new()).is_empty());
        assert!(!Message::from(&b"x"[..]).is_empty());
    }

    #[test]
    fn test_close_options_effective_code() {
        assert_eq!(CloseOptions::new().effective_code(), None);
        assert_eq!(
            CloseOptions::new().with_reason("bye").effective_code(),
            Some(NORMAL_CLOSE_CODE)
        );
        assert_eq!(
            CloseOptions::new().with_code(4000).effective_code(),
            Some(4000)
        );
    }

    #[test]
    fn test_handshake_request_headers() {
        let request = HandshakeRequest::new("/feed", Duration::from_secs(10))
            .with_header("Host", "example.com");

        assert_eq!(request.header("host"), Some("example.com"));
        assert_eq!(request.header("Origin"), None);
    }
}
