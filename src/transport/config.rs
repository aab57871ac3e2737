use serde::{Deserialize, Serialize};

/// Robot endpoint and send policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Scheme, host and port of the robot server
    pub server_address: String,
    /// Path appended to `server_address`
    pub path: String,
    /// Minimum spacing between two requests
    pub min_interval_ms: u64,
    /// Outbound records buffered before new ones are dropped
    pub queue_capacity: usize,
    pub timeout_ms: u64,
    /// When false, records are only logged
    pub enabled: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            server_address: "http://127.0.0.1:5000".to_string(),
            path: "/robot".to_string(),
            min_interval_ms: 250,
            queue_capacity: 32,
            timeout_ms: 1000,
            enabled: true,
        }
    }
}

impl TransportConfig {
    /// Full URL requests are posted to
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.server_address.trim_end_matches('/'),
            self.path
        )
    }
}
