//! Realtime (STOMP over WebSocket) channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Realtime channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint of the message broker.
    #[serde(default = "default_url")]
    pub url: String,
    /// Fixed delay before reconnecting after an unexpected disconnect.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Heartbeat interval the client expects from the broker.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_incoming_ms: u64,
    /// Heartbeat interval at which the client writes to the broker.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_outgoing_ms: u64,
    /// Upper bound for `subscribe_when_connected` to wait for the handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Topics subscribed on every successful handshake.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl RealtimeConfig {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_delay_ms: default_reconnect_delay(),
            heartbeat_incoming_ms: default_heartbeat(),
            heartbeat_outgoing_ms: default_heartbeat(),
            connect_timeout_seconds: default_connect_timeout(),
            topics: Vec::new(),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:9089/ws".to_string()
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_heartbeat() -> u64 {
    10000
}

fn default_connect_timeout() -> u64 {
    10
}
