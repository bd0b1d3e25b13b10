// Activity feed entries and the unread-notification state persisted beside them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Success,
    Error,
    Warning,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Strictly increasing within one log; seeded from wall-clock millis.
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl Activity {
    pub fn same_content(&self, kind: ActivityKind, title: &str, description: &str) -> bool {
        self.kind == kind && self.title == title && self.description == description
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    pub seen: bool,
    pub unread_count: u32,
    pub last_seen_at: DateTime<Utc>,
}

impl NotificationState {
    pub fn seen_at(at: DateTime<Utc>) -> Self {
        Self {
            seen: true,
            unread_count: 0,
            last_seen_at: at,
        }
    }
}
