//! Session configuration.

use std::time::Duration;

use lobby_core::{ConnectionConfig, DEFAULT_HANDSHAKE_TIMEOUT, history::DEFAULT_HISTORY_LIMIT};

/// Default frames buffered per inbound channel and for outbound sends.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Transport endpoint, e.g. `ws://localhost:8080/ws/chat/websocket`
    pub endpoint: String,
    /// Virtual host sent in `CONNECT`
    pub host: String,
    /// Timeout for the broker to answer `CONNECT`
    pub handshake_timeout: Duration,
    /// Frames buffered per inbound channel
    pub channel_capacity: usize,
    /// Messages requested when a history load does not name a limit
    pub history_limit: usize,
}

impl SessionConfig {
    /// Default configuration for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), ..Self::default() }
    }

    pub(crate) fn connection(&self) -> ConnectionConfig {
        ConnectionConfig { host: self.host.clone(), handshake_timeout: self.handshake_timeout }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080/ws/chat/websocket".to_string(),
            host: "localhost".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
