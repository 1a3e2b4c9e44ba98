//! Outbound Message Types
//!
//! Requests the client sends to the telemetry server. They use the server's
//! `{"type": ..., "data": ...}` envelope and its `root_subscribe` /
//! `file_subscribe` request names.

use serde::{Deserialize, Serialize};

/// Wire tag of a series request, and of the server's reply to it
pub const FILE_SUBSCRIBE: &str = "file_subscribe";

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the catalog of available series
    RootSubscribe,
    /// Ask for a snapshot of one series followed by live updates. The
    /// server keeps one such subscription per connection; the last wins.
    #[serde(rename = "file_subscribe")]
    SeriesSubscribe {
        /// Series name
        name: String,
    },
}

impl ClientMessage {
    pub fn series(name: impl Into<String>) -> Self {
        ClientMessage::SeriesSubscribe { name: name.into() }
    }

    /// Subscriptions to replay on every (re)connect: the catalog first, then
    /// each named series.
    pub fn subscriptions_for<I, S>(series: I) -> Vec<ClientMessage>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(ClientMessage::RootSubscribe)
            .chain(series.into_iter().map(ClientMessage::series))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_root_subscribe() {
        let json = ClientMessage::RootSubscribe.to_json().unwrap();
        assert_eq!(json, r#"{"type":"root_subscribe"}"#);
    }

    #[test]
    fn test_serialize_series_subscribe() {
        let json = ClientMessage::series("cpu").to_json().unwrap();
        assert!(json.contains("\"type\":\"file_subscribe\""));
        assert!(json.contains("\"data\":{\"name\":\"cpu\"}"));
    }

    #[test]
    fn test_subscriptions_order() {
        let subs = ClientMessage::subscriptions_for(["cpu", "mem"]);
        assert_eq!(
            subs,
            vec![
                ClientMessage::RootSubscribe,
                ClientMessage::series("cpu"),
                ClientMessage::series("mem"),
            ]
        );
    }
}
