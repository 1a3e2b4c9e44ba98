//! Connection Manager
//!
//! Keeps exactly one logical connection to the telemetry endpoint open for
//! as long as the application runs. Frames are handed to the registered
//! handler inline, in arrival order, on the manager's own task. Every
//! failure ends in a backoff sleep and a new attempt; only shutdown stops
//! the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, sleep_until, timeout, Instant, MissedTickBehavior};

use super::backoff::BackoffPolicy;
use super::error::ConnectionError;
use super::shutdown::Shutdown;
use super::status::{ConnectionState, ConnectionStatus};
use super::transport::{Connector, FrameStream, Incoming};
use crate::protocol::ClientMessage;

/// Upper bound on the close handshake during teardown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Sole consumer of inbound frames
pub trait FrameHandler: Send {
    fn on_frame(&mut self, frame: &str);

    /// Called after each subscription request went out on the socket
    fn on_request(&mut self, _request: &ClientMessage) {}
}

impl<F> FrameHandler for F
where
    F: FnMut(&str) + Send,
{
    fn on_frame(&mut self, frame: &str) {
        self(frame)
    }
}

/// Connection manager settings
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub backoff: BackoffPolicy,
    /// Limit on TCP connect plus the upgrade handshake
    pub connect_timeout: Duration,
    /// How often to ping an open connection
    pub ping_interval: Duration,
    /// Silence longer than this is treated as a dropped connection
    pub idle_timeout: Duration,
    /// Requests sent after every successful open
    pub subscriptions: Vec<ClientMessage>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(54),
            idle_timeout: Duration::from_secs(60),
            subscriptions: vec![ClientMessage::RootSubscribe],
        }
    }
}

/// How a session on an open connection ended
enum SessionEnd {
    Shutdown,
    Dropped(ConnectionError),
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    options: ManagerOptions,
    handler: Option<Box<dyn FrameHandler>>,
    status: ConnectionStatus,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl ConnectionManager {
    pub fn new(address: impl Into<String>, connector: Arc<dyn Connector>, options: ManagerOptions) -> Self {
        let status = ConnectionStatus::new(address);
        let (status_tx, _) = watch::channel(status.clone());

        Self {
            connector,
            options,
            handler: None,
            status,
            status_tx,
        }
    }

    /// Register the frame consumer. Last registration wins; the previous
    /// handler is returned.
    pub fn on_message<H>(&mut self, handler: H) -> Option<Box<dyn FrameHandler>>
    where
        H: FrameHandler + 'static,
    {
        self.handler.replace(Box::new(handler))
    }

    pub fn address(&self) -> &str {
        &self.status.address
    }

    pub fn state(&self) -> ConnectionState {
        self.status.state
    }

    pub fn retry_count(&self) -> u32 {
        self.status.retry_count
    }

    /// Status updates for the rendering layer
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Connect and keep reconnecting until `shutdown` fires.
    ///
    /// On return the connection is closed, no timer is pending, and the
    /// state is `Closed`.
    pub async fn run(&mut self, mut shutdown: Shutdown) {
        let address = self.status.address.clone();
        let connect_timeout = self.options.connect_timeout;
        tracing::info!(address = %address, "Starting feed connection");

        while !shutdown.is_triggered() {
            self.transition(ConnectionState::Connecting);

            let attempt = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                result = timeout(connect_timeout, self.connector.connect(&address)) => {
                    result.unwrap_or_else(|_| Err(ConnectionError::ConnectTimeout(connect_timeout)))
                }
            };

            match attempt {
                Ok(stream) => {
                    self.status.retry_count = 0;
                    self.transition(ConnectionState::Open);
                    tracing::info!(address = %address, "Feed connected");

                    match self.session(stream, &mut shutdown).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Dropped(e) => {
                            tracing::warn!(address = %address, error = %e, "Feed connection lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        address = %address,
                        attempt = self.status.retry_count + 1,
                        error = %e,
                        "Feed connect failed"
                    );
                }
            }

            let delay = self.options.backoff.delay(self.status.retry_count);
            self.status.retry_count = self.status.retry_count.saturating_add(1);
            self.transition(ConnectionState::Reconnecting);
            tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnecting after backoff");

            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = sleep(delay) => {}
            }
        }

        self.transition(ConnectionState::Closed);
        tracing::info!(address = %address, "Feed connection stopped");
    }

    async fn session(&mut self, mut stream: Box<dyn FrameStream>, shutdown: &mut Shutdown) -> SessionEnd {
        let idle_timeout = self.options.idle_timeout;
        let mut last_activity = Instant::now();

        for request in &self.options.subscriptions {
            let text = match request.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode subscription");
                    continue;
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    close_stream(&mut stream).await;
                    return SessionEnd::Shutdown;
                }
                sent = stream.send_text(text) => {
                    if let Err(e) = sent {
                        return SessionEnd::Dropped(e);
                    }
                }
                _ = sleep_until(last_activity + idle_timeout) => {
                    close_stream(&mut stream).await;
                    return SessionEnd::Dropped(ConnectionError::IdleTimeout(idle_timeout));
                }
            }

            if let Some(handler) = self.handler.as_mut() {
                handler.on_request(request);
            }
        }

        let ping_every = self.options.ping_interval;
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    close_stream(&mut stream).await;
                    return SessionEnd::Shutdown;
                }
                incoming = stream.next_frame() => match incoming {
                    Some(Ok(Incoming::Text(text))) => {
                        last_activity = Instant::now();
                        self.dispatch(&text);
                    }
                    Some(Ok(Incoming::Heartbeat)) => {
                        last_activity = Instant::now();
                    }
                    Some(Err(e)) => return SessionEnd::Dropped(e),
                    None => return SessionEnd::Dropped(ConnectionError::Closed),
                },
                _ = ping.tick() => {
                    if let Err(e) = stream.send_ping().await {
                        return SessionEnd::Dropped(e);
                    }
                }
                _ = sleep_until(last_activity + idle_timeout) => {
                    close_stream(&mut stream).await;
                    return SessionEnd::Dropped(ConnectionError::IdleTimeout(idle_timeout));
                }
            }
        }
    }

    fn dispatch(&mut self, frame: &str) {
        match self.handler.as_mut() {
            Some(handler) => handler.on_frame(frame),
            None => tracing::debug!(bytes = frame.len(), "No frame handler registered; frame dropped"),
        }
    }

    fn transition(&mut self, state: ConnectionState) {
        if self.status.state == state {
            return;
        }
        tracing::debug!(from = %self.status.state, to = %state, "Connection state change");
        self.status.state = state;
        self.status.last_change = Utc::now();
        self.status_tx.send_replace(self.status.clone());
    }
}

async fn close_stream(stream: &mut Box<dyn FrameStream>) {
    if timeout(CLOSE_TIMEOUT, stream.close()).await.is_err() {
        tracing::debug!("Close handshake timed out");
    }
}
