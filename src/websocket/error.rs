//! WebSocket-specific error types for the stock feed client.

use thiserror::Error;

/// WebSocket-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebSocketError {
    /// Connection attempt failed
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Established connection closed
    #[error("Connection closed: code {code}, reason: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    /// Connect attempt exceeded the configured timeout
    #[error("Operation timed out")]
    Timeout,

    #[error("Invalid WebSocket URL: {0}")]
    InvalidUrl(String),

    /// Socket not open
    #[error("Not connected to WebSocket server")]
    NotConnected,

    /// Background task already running
    #[error("Already connected to WebSocket server")]
    AlreadyConnected,

    #[error("Failed to send message: {0}")]
    SendFailed(String),

    /// Internal channel closed
    #[error("Internal channel closed")]
    ChannelClosed,

    /// JSON decode failure
    #[error("Failed to parse message: {0}")]
    MessageParseError(String),

    #[error("WebSocket protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(feature = "native")]
impl From<tokio_tungstenite::tungstenite::Error> for WebSocketError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed => WebSocketError::ConnectionClosed {
                code: 1000,
                reason: "Connection closed normally".to_string(),
            },
            Error::AlreadyClosed => WebSocketError::NotConnected,
            Error::Io(e) => WebSocketError::Io(e.to_string()),
            Error::Protocol(e) => WebSocketError::Protocol(e.to_string()),
            Error::Url(e) => WebSocketError::InvalidUrl(e.to_string()),
            other => WebSocketError::Protocol(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for WebSocketError {
    fn from(err: serde_json::Error) -> Self {
        WebSocketError::MessageParseError(err.to_string())
    }
}

/// Result type alias for WebSocket operations
pub type WsResult<T> = Result<T, WebSocketError>;
