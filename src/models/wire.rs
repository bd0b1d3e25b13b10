// Stream envelopes: what the push channels carry, and the subscribe handshake.

use serde::{Deserialize, Serialize};

use super::{ContainerSnapshot, NetworkMap, SystemStats};

/// Any field may be absent; present fields are routed independently.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPayload {
    #[serde(default)]
    pub system_stats: Option<SystemStats>,
    #[serde(default)]
    pub containers: Option<Vec<ContainerSnapshot>>,
    #[serde(default)]
    pub networks: Option<NetworkMap>,
}

/// One line from a log-tail channel.
#[derive(Debug, Clone, Deserialize)]
pub struct LogPayload {
    pub line: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Set on network-aggregate tails to name the emitting container.
    #[serde(default)]
    pub container: Option<String>,
}

/// First frame sent on the system channel once it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "subscribe", rename_all = "camelCase")]
pub struct Handshake {
    pub refresh_interval: u32,
}
