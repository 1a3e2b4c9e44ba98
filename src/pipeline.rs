//! Frame pipeline
//!
//! The frame handler the connection manager drives: decode each frame and
//! apply the resulting event to the dashboard. Bad frames are logged,
//! counted and dropped; nothing here can stop the feed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dashboard::Reconciler;
use crate::feed::FrameHandler;
use crate::protocol::{ClientMessage, DecodeError, Decoder, Payload};

/// Live counters, shared with whoever wants to report them
#[derive(Debug, Default)]
pub struct PipelineCounters {
    frames_received: AtomicU64,
    events_applied: AtomicU64,
    server_errors: AtomicU64,
    malformed_payload: AtomicU64,
    unknown_kind: AtomicU64,
    missing_series: AtomicU64,
    invalid_field: AtomicU64,
}

impl PipelineCounters {
    fn record_drop(&self, error: &DecodeError) {
        let counter = match error {
            DecodeError::MalformedPayload(_) => &self.malformed_payload,
            DecodeError::UnknownKind(_) => &self.unknown_kind,
            DecodeError::MissingSeries => &self.missing_series,
            DecodeError::InvalidField { .. } => &self.invalid_field,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            malformed_payload: self.malformed_payload.load(Ordering::Relaxed),
            unknown_kind: self.unknown_kind.load(Ordering::Relaxed),
            missing_series: self.missing_series.load(Ordering::Relaxed),
            invalid_field: self.invalid_field.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_received: u64,
    pub events_applied: u64,
    /// `error` events reported by the server
    pub server_errors: u64,
    pub malformed_payload: u64,
    pub unknown_kind: u64,
    pub missing_series: u64,
    pub invalid_field: u64,
}

impl PipelineStats {
    pub fn frames_dropped(&self) -> u64 {
        self.malformed_payload + self.unknown_kind + self.missing_series + self.invalid_field
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frames: {}, Applied: {}, Dropped: {} (malformed {}, unknown kind {}, no series {}, bad field {}), Server errors: {}",
            self.frames_received,
            self.events_applied,
            self.frames_dropped(),
            self.malformed_payload,
            self.unknown_kind,
            self.missing_series,
            self.invalid_field,
            self.server_errors
        )
    }
}

/// Decoder + reconciler glue
pub struct FeedPipeline {
    decoder: Decoder,
    reconciler: Reconciler,
    counters: Arc<PipelineCounters>,
}

impl FeedPipeline {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            decoder: Decoder::new(),
            reconciler,
            counters: Arc::new(PipelineCounters::default()),
        }
    }

    /// Counter handle that stays valid after the pipeline moves into the
    /// connection manager
    pub fn counters(&self) -> Arc<PipelineCounters> {
        Arc::clone(&self.counters)
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Decode and apply one frame
    pub fn process(&mut self, frame: &str) {
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);

        let event = match self.decoder.decode(frame) {
            Ok(event) => event,
            Err(e) => {
                self.counters.record_drop(&e);
                tracing::warn!(
                    class = e.class(),
                    error = %e,
                    frame = %preview(frame),
                    "Dropping undecodable frame"
                );
                return;
            }
        };

        if let Payload::Error { message } = event.payload() {
            self.counters.server_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(message = %message, "Server reported an error");
            return;
        }

        self.reconciler.apply(&event);
        self.counters.events_applied.fetch_add(1, Ordering::Relaxed);
    }
}

impl FrameHandler for FeedPipeline {
    fn on_frame(&mut self, frame: &str) {
        self.process(frame);
    }

    fn on_request(&mut self, request: &ClientMessage) {
        self.decoder.track(request);
    }
}

/// First few characters of a frame for log lines
fn preview(frame: &str) -> &str {
    const MAX: usize = 120;
    match frame.char_indices().nth(MAX) {
        Some((idx, _)) => &frame[..idx],
        None => frame,
    }
}
