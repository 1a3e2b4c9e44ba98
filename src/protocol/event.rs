//! Decoded inbound events

use chrono::{DateTime, Utc};
use std::fmt;

use crate::dashboard::Point;

/// Tag of an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// One new point for one series
    Metric,
    /// Full contents of one series
    Snapshot,
    /// List of series the server can feed
    Catalog,
    /// Server-side error report
    Error,
}

impl EventKind {
    /// Parse a wire tag. The file-watching server's reply tags are
    /// accepted as aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "metric" => Some(EventKind::Metric),
            "snapshot" | "file_subscribe" => Some(EventKind::Snapshot),
            "catalog" | "root_subscribe" => Some(EventKind::Catalog),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Metric => "metric",
            EventKind::Snapshot => "snapshot",
            EventKind::Catalog => "catalog",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload of an event
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Metric { series: String, point: Point },
    Snapshot { series: String, points: Vec<Point> },
    Catalog { series: Vec<String> },
    Error { message: String },
}

impl Payload {
    pub fn kind(&self) -> EventKind {
        match self {
            Payload::Metric { .. } => EventKind::Metric,
            Payload::Snapshot { .. } => EventKind::Snapshot,
            Payload::Catalog { .. } => EventKind::Catalog,
            Payload::Error { .. } => EventKind::Error,
        }
    }
}

/// A decoded message; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    payload: Payload,
    received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(payload: Payload, received_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            received_at,
        }
    }

    /// Metric event stamped with the current time
    pub fn metric(series: impl Into<String>, t: i64, v: f64) -> Self {
        Self::new(
            Payload::Metric {
                series: series.into(),
                point: Point::new(t, v),
            },
            Utc::now(),
        )
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}
