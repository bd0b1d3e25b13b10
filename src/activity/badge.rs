// Notification badge shown on the activity bell.

use serde::Serialize;

use crate::models::{Activity, ActivityKind, NotificationState};

/// Activities considered when picking the badge colour.
const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeSeverity {
    Normal,
    Warning,
    Refresh,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub severity: BadgeSeverity,
    /// Shown only while there are unseen activities.
    pub count: Option<u32>,
}

/// `activities` is newest first.
pub fn derive_badge(activities: &[Activity], state: &NotificationState) -> Badge {
    let recent = &activities[..activities.len().min(RECENT_WINDOW)];
    let has = |kind: ActivityKind| recent.iter().any(|a| a.kind == kind);
    let unread = !state.seen && state.unread_count > 0;

    let severity = if has(ActivityKind::Error) {
        BadgeSeverity::Critical
    } else if unread && has(ActivityKind::Refresh) {
        BadgeSeverity::Refresh
    } else if has(ActivityKind::Warning) {
        BadgeSeverity::Warning
    } else {
        BadgeSeverity::Normal
    };
    Badge {
        severity,
        count: (!state.seen).then_some(state.unread_count),
    }
}
