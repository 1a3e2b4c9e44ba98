//! # chartfeed
//!
//! Live telemetry feed for a charting dashboard. One WebSocket connection is
//! kept open to the server the dashboard was served from; every frame is
//! decoded into a typed event and reconciled into bounded, time-ordered
//! series that the rendering layer reads and subscribes to.
//!
//! ## Modules
//!
//! - [`feed`]: connection manager (connect, keepalive, reconnect with backoff)
//! - [`protocol`]: frame decoder and outbound subscription messages
//! - [`dashboard`]: series state, reconciler, and read-only reader handle
//! - [`pipeline`]: the frame handler wiring decoder to reconciler
//! - [`endpoint`]: socket URL resolution from the application origin
//! - [`config`] and [`logging`]: ambient setup for the binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chartfeed::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = resolve_endpoint("http://localhost:8081", "/ws")?;
//!
//!     let reconciler = Reconciler::new(ReconcilerOptions::default());
//!     let reader = reconciler.reader();
//!     reader.subscribe(|update| println!("{}: {} points", update.series, update.points.len()));
//!
//!     let mut manager = ConnectionManager::new(url.as_str(), Arc::new(WsConnector), ManagerOptions::default());
//!     manager.on_message(FeedPipeline::new(reconciler));
//!
//!     let (trigger, shutdown) = shutdown_channel();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         trigger.trigger();
//!     });
//!
//!     manager.run(shutdown).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod endpoint;
pub mod feed;
pub mod logging;
pub mod pipeline;
pub mod protocol;

// Re-export top-level types for convenience
pub use dashboard::{
    DashboardReader, DashboardState, DuplicatePolicy, Point, Reconciler, ReconcilerOptions, Series,
    SeriesUpdate, SubscriptionId, UpdateCause,
};

pub use feed::{
    shutdown_channel, BackoffPolicy, ConnectionError, ConnectionManager, ConnectionState,
    ConnectionStatus, Connector, FrameHandler, FrameStream, ManagerOptions, Shutdown,
    ShutdownTrigger, WsConnector,
};

pub use protocol::{
    decode, decode_at, ClientMessage, DecodeError, Decoder, Event, EventKind, Payload,
};

pub use pipeline::{FeedPipeline, PipelineCounters, PipelineStats};

pub use endpoint::{resolve_endpoint, EndpointError};

pub use config::{Config, ConfigError, LoggingConfig};

pub use logging::{init_logging, LoggingError};
