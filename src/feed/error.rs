//! Connection error types

use std::time::Duration;
use thiserror::Error;

/// Transport-level failures. None of them are fatal: the manager answers
/// every one with a reconnect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Could not establish the connection (refused, DNS, handshake)
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Connect or upgrade handshake did not finish in time
    #[error("Connect timed out after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// Error while reading from an open connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// Peer closed the connection or the stream ended
    #[error("Connection closed by peer")]
    Closed,

    /// Nothing received within the idle window
    #[error("No traffic for {}s", .0.as_secs())]
    IdleTimeout(Duration),

    /// Writing a frame failed
    #[error("Send failed: {0}")]
    Send(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ConnectionError::Closed,
            other => ConnectionError::Transport(other.to_string()),
        }
    }
}
