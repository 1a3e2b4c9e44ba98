//! Wire Protocol
//!
//! Inbound frames are JSON objects tagged by `kind` (or `type`):
//!
//! - `metric` - one point: `{"kind":"metric","series":"cpu","t":5,"v":70}`
//! - `snapshot` - whole series: `{"kind":"snapshot","series":"cpu","points":[[1,2],[2,3]]}`
//! - `catalog` - available series: `{"kind":"catalog","series":["cpu","mem"]}`
//! - `error` - server error: `{"kind":"error","message":"..."}`
//!
//! The file-watching server's `root_subscribe` and `file_subscribe` replies
//! are read as `catalog` and `snapshot`.
//!
//! Outbound requests are [`ClientMessage`]s.

mod decoder;
mod error;
mod event;
mod messages;

pub use decoder::{decode, decode_at, Decoder};
pub use error::DecodeError;
pub use event::{Event, EventKind, Payload};
pub use messages::{ClientMessage, FILE_SUBSCRIBE};
