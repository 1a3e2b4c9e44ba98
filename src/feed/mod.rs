//! Feed connection
//!
//! Owns the single WebSocket connection to the telemetry endpoint: connect,
//! subscribe, keepalive, and reconnect with backoff until shutdown.

mod backoff;
mod error;
mod manager;
mod shutdown;
mod status;
mod transport;

pub use backoff::BackoffPolicy;
pub use error::ConnectionError;
pub use manager::{ConnectionManager, FrameHandler, ManagerOptions};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use status::{ConnectionState, ConnectionStatus};
pub use transport::{Connector, FrameStream, Incoming, WsConnector};
