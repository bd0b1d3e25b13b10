// Container inventory models (wire names follow /api/containers)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::nullable;

/// Container status; serializes to lowercase JSON (e.g. "running").
/// Unrecognised states are kept verbatim so transitions between them still register.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContainerStatus {
    Running,
    Exited,
    Paused,
    Restarting,
    Created,
    Removing,
    Dead,
    Stopped,
    Other(String),
}

impl ContainerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ContainerStatus::Running => "running",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Created => "created",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Other(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }
}

impl From<String> for ContainerStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "running" => ContainerStatus::Running,
            "exited" => ContainerStatus::Exited,
            "paused" => ContainerStatus::Paused,
            "restarting" => ContainerStatus::Restarting,
            "created" => ContainerStatus::Created,
            "removing" => ContainerStatus::Removing,
            "dead" => ContainerStatus::Dead,
            "stopped" => ContainerStatus::Stopped,
            other => ContainerStatus::Other(other.to_string()),
        }
    }
}

impl From<&str> for ContainerStatus {
    fn from(s: &str) -> Self {
        ContainerStatus::from(s.to_string())
    }
}

impl From<ContainerStatus> for String {
    fn from(s: ContainerStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ContainerStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub memory_usage_mb: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    /// RFC3339 creation time as reported by the runtime; empty when unknown.
    #[serde(default, rename = "created", deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub memory_limit_mb: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub memory_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub networks: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub ports: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub restart_count: u32,
}

impl ContainerSnapshot {
    /// First 12 characters of the id, as shown in the table and activity text.
    pub fn short_id(&self) -> &str {
        abbreviate_id(&self.id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.short_id()
        } else {
            &self.name
        }
    }
}

pub fn abbreviate_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Lifecycle command accepted by `POST /container/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
    Remove,
}

impl ContainerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Restart => "restart",
            ContainerAction::Remove => "remove",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            ContainerAction::Start => "started",
            ContainerAction::Stop => "stopped",
            ContainerAction::Restart => "restarted",
            ContainerAction::Remove => "removed",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
