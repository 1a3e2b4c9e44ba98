//! Message Decoder
//!
//! Turns one raw text frame into a typed [`Event`]. Both the flat form
//! (`{"kind":"metric","series":"mem","t":5,"v":70}`) and the `{"type","data"}`
//! envelope are accepted. The envelope also carries the file-watching
//! server's replies: `root_subscribe` (a list of names, read as a catalog)
//! and `file_subscribe` (`{"values":[[x,y],...]}`, read as a snapshot).
//! Those snapshots carry no series name; [`Decoder`] fills it in from the
//! `file_subscribe` requests it was told about.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::DecodeError;
use super::event::{Event, EventKind, Payload};
use super::messages::{ClientMessage, FILE_SUBSCRIBE};
use crate::dashboard::Point;

/// Decode a frame, stamping it with the current time
pub fn decode(raw: &str) -> Result<Event, DecodeError> {
    decode_at(raw, Utc::now())
}

/// Decode a frame with an explicit arrival timestamp
pub fn decode_at(raw: &str, received_at: DateTime<Utc>) -> Result<Event, DecodeError> {
    let (frame, kind) = parse(raw)?;
    build(&frame, kind, None, received_at)
}

/// Stateful decoder that names unnamed `file_subscribe` snapshots
#[derive(Debug, Default)]
pub struct Decoder {
    /// Requested series whose reply has not arrived yet, oldest first
    pending: VecDeque<String>,
    /// Series the server is currently streaming values for
    active: Option<String>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request that went out on the socket
    pub fn track(&mut self, request: &ClientMessage) {
        match request {
            // Every (re)connect starts with a root request; the server drops
            // the client's file subscription when it sees one
            ClientMessage::RootSubscribe => {
                self.pending.clear();
                self.active = None;
            }
            ClientMessage::SeriesSubscribe { name } => self.pending.push_back(name.clone()),
        }
    }

    /// Series unnamed snapshots are attributed to
    pub fn active_series(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn decode(&mut self, raw: &str) -> Result<Event, DecodeError> {
        self.decode_at(raw, Utc::now())
    }

    pub fn decode_at(&mut self, raw: &str, received_at: DateTime<Utc>) -> Result<Event, DecodeError> {
        let (frame, kind) = parse(raw)?;

        // One reply per request, in request order
        if tag(&frame) == Some(FILE_SUBSCRIBE) {
            if let Some(next) = self.pending.pop_front() {
                self.active = Some(next);
            }
        }

        build(&frame, kind, self.active.as_deref(), received_at)
    }
}

fn tag(frame: &Map<String, Value>) -> Option<&str> {
    frame
        .get("kind")
        .or_else(|| frame.get("type"))
        .and_then(Value::as_str)
}

fn parse(raw: &str) -> Result<(Map<String, Value>, EventKind), DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(frame) = value else {
        return Err(DecodeError::MalformedPayload(
            "expected a JSON object".to_string(),
        ));
    };

    let kind = match tag(&frame) {
        Some(tag) => EventKind::from_tag(tag)
            .ok_or_else(|| DecodeError::UnknownKind(Some(tag.to_string())))?,
        None => return Err(DecodeError::UnknownKind(None)),
    };

    Ok((frame, kind))
}

fn build(
    frame: &Map<String, Value>,
    kind: EventKind,
    fallback_series: Option<&str>,
    received_at: DateTime<Utc>,
) -> Result<Event, DecodeError> {
    // A bare string in `data` is how the server reports a failed request
    if kind != EventKind::Error {
        if let Some(Value::String(message)) = frame.get("data") {
            return Ok(Event::new(
                Payload::Error {
                    message: message.clone(),
                },
                received_at,
            ));
        }
    }

    let body = match frame.get("data") {
        Some(Value::Object(data)) => data,
        _ => frame,
    };

    let payload = match kind {
        EventKind::Metric => Payload::Metric {
            series: series_name(body)?,
            point: Point::new(
                timestamp(body.get("t"), "t")?,
                sample(body.get("v"), "v")?,
            ),
        },
        EventKind::Snapshot => Payload::Snapshot {
            series: match series_name(body) {
                Err(DecodeError::MissingSeries) => fallback_series
                    .map(str::to_string)
                    .ok_or(DecodeError::MissingSeries)?,
                other => other?,
            },
            points: point_list(body.get("points").or_else(|| body.get("values")))?,
        },
        EventKind::Catalog => Payload::Catalog {
            series: catalog(frame, body)?,
        },
        EventKind::Error => Payload::Error {
            message: error_message(frame, body),
        },
    };

    Ok(Event::new(payload, received_at))
}

fn series_name(body: &Map<String, Value>) -> Result<String, DecodeError> {
    match body.get("series").or_else(|| body.get("name")) {
        None | Some(Value::Null) => Err(DecodeError::MissingSeries),
        Some(Value::String(name)) => {
            let name = name.trim();
            if name.is_empty() {
                Err(DecodeError::MissingSeries)
            } else {
                Ok(name.to_string())
            }
        }
        Some(other) => Err(DecodeError::invalid(
            "series",
            format!("expected a string, got {other}"),
        )),
    }
}

fn timestamp(value: Option<&Value>, field: &'static str) -> Result<i64, DecodeError> {
    let value = value.ok_or_else(|| DecodeError::invalid(field, "missing"))?;
    if let Some(t) = value.as_i64() {
        return Ok(t);
    }

    // Integral floats such as `5.0` are accepted
    match value.as_f64() {
        Some(f)
            if f.is_finite()
                && f.fract() == 0.0
                && f >= i64::MIN as f64
                && f < i64::MAX as f64 =>
        {
            Ok(f as i64)
        }
        _ => Err(DecodeError::invalid(
            field,
            format!("expected an integer timestamp, got {value}"),
        )),
    }
}

fn sample(value: Option<&Value>, field: &'static str) -> Result<f64, DecodeError> {
    let value = value.ok_or_else(|| DecodeError::invalid(field, "missing"))?;
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(DecodeError::invalid(
            field,
            format!("expected a finite number, got {value}"),
        )),
    }
}

fn point_list(value: Option<&Value>) -> Result<Vec<Point>, DecodeError> {
    let Some(Value::Array(items)) = value else {
        return Err(DecodeError::invalid("points", "expected an array"));
    };

    items
        .iter()
        .map(|item| match item {
            Value::Array(pair) if pair.len() == 2 => Ok(Point::new(
                timestamp(pair.first(), "points")?,
                sample(pair.get(1), "points")?,
            )),
            Value::Object(obj) => Ok(Point::new(
                timestamp(obj.get("t"), "points")?,
                sample(obj.get("v"), "points")?,
            )),
            other => Err(DecodeError::invalid(
                "points",
                format!("expected [t, v] or {{\"t\", \"v\"}}, got {other}"),
            )),
        })
        .collect()
}

fn catalog(frame: &Map<String, Value>, body: &Map<String, Value>) -> Result<Vec<String>, DecodeError> {
    let list = match (body.get("series"), frame.get("data")) {
        (Some(Value::Array(list)), _) => list,
        (_, Some(Value::Array(list))) => list,
        _ => return Err(DecodeError::invalid("series", "expected an array of names")),
    };

    list.iter()
        .map(|item| match item {
            Value::String(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
            Value::String(_) => Err(DecodeError::MissingSeries),
            other => Err(DecodeError::invalid(
                "series",
                format!("expected a string, got {other}"),
            )),
        })
        .collect()
}

fn error_message(frame: &Map<String, Value>, body: &Map<String, Value>) -> String {
    body.get("message")
        .or_else(|| frame.get("data"))
        .and_then(Value::as_str)
        .unwrap_or("unspecified error")
        .to_string()
}
