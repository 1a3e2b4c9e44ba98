//! Transport seam
//!
//! The manager talks to the socket through [`Connector`] and
//! [`FrameStream`]. [`WsConnector`] is the real WebSocket implementation;
//! tests plug in scripted transports.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::ConnectionError;

/// One item read from an open connection
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A text frame for the decoder
    Text(String),
    /// Ping/pong traffic; proves the peer is alive
    Heartbeat,
}

/// An open, bidirectional frame stream
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame; `None` once the peer closed the stream
    async fn next_frame(&mut self) -> Option<Result<Incoming, ConnectionError>>;

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError>;

    async fn send_ping(&mut self) -> Result<(), ConnectionError>;

    /// Best-effort close handshake
    async fn close(&mut self);
}

/// Opens frame streams to an address
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Box<dyn FrameStream>, ConnectionError>;
}

/// `tokio-tungstenite` backed connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn FrameStream>, ConnectionError> {
        let (ws, response) = connect_async(address)
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsFrameStream { ws }))
    }
}

struct WsFrameStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_frame(&mut self) -> Option<Result<Incoming, ConnectionError>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => return Some(Ok(Incoming::Text(text))),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(Incoming::Text(text))),
                    Err(e) => {
                        tracing::warn!(bytes = e.as_bytes().len(), "Dropping non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Ping(_) | Message::Pong(_) => return Some(Ok(Incoming::Heartbeat)),
                Message::Close(frame) => {
                    if let Some(frame) = frame {
                        tracing::debug!(code = %frame.code, reason = %frame.reason, "Close frame received");
                    }
                    return None;
                }
                Message::Frame(_) => continue,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), ConnectionError> {
        self.ws
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "Close handshake failed");
        }
    }
}
