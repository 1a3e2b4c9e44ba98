//! Connection state tracking

use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle of the single feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    /// Whether the dashboard should show its data as live
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Published snapshot of the connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub address: String,
    pub state: ConnectionState,
    /// Reconnects scheduled since the last successful open, whether the
    /// connect failed or an open session dropped
    pub retry_count: u32,
    pub last_change: DateTime<Utc>,
}

impl ConnectionStatus {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: ConnectionState::Closed,
            retry_count: 0,
            last_change: Utc::now(),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.state, self.address)?;
        if self.retry_count > 0 {
            write!(f, ", retry {}", self.retry_count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let mut status = ConnectionStatus::new("ws://localhost:8081/ws");
        assert_eq!(status.to_string(), "closed (ws://localhost:8081/ws)");

        status.state = ConnectionState::Reconnecting;
        status.retry_count = 2;
        assert_eq!(
            status.to_string(),
            "reconnecting (ws://localhost:8081/ws), retry 2"
        );
        assert!(!status.state.is_live());
    }
}
