// Activity feed: de-duplicated, capped, persisted, with unread tracking and a
// rate-limited highlight for critical entries.

mod badge;

pub use badge::{Badge, BadgeSeverity, derive_badge};

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::time::Duration;

use crate::error::StoreError;
use crate::models::{Activity, ActivityKind, NotificationState};
use crate::rate_limit::Throttle;
use crate::store::{ClientStore, StorageKeys, load_json, save_json};

pub const MAX_ACTIVITIES: usize = 10;
/// Identical (kind, title, description) entries inside this window are dropped.
pub const DUPLICATE_WINDOW_SECS: i64 = 60;
/// Notification state older than this is reset to seen on load.
pub const NOTIFICATION_STALE_SECS: i64 = 3600;

const CRITICAL_MARKERS: [&str; 4] = ["stop", "fail", "not accessible", "system resources"];

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Duplicate,
    Recorded { activity: Activity, highlight: bool },
}

impl RecordOutcome {
    pub fn highlight(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { highlight: true, .. })
    }
}

pub fn is_critical(kind: ActivityKind, title: &str, description: &str) -> bool {
    if kind == ActivityKind::Error {
        return true;
    }
    let title = title.to_lowercase();
    let description = description.to_lowercase();
    CRITICAL_MARKERS
        .iter()
        .any(|m| title.contains(m) || description.contains(m))
}

pub struct ActivityLog {
    store: Arc<dyn ClientStore>,
    keys: StorageKeys,
    /// Newest first.
    activities: Vec<Activity>,
    notifications: NotificationState,
    highlight: Throttle,
    last_id: i64,
}

impl ActivityLog {
    pub fn new(
        store: Arc<dyn ClientStore>,
        keys: StorageKeys,
        highlight_interval: Duration,
    ) -> Self {
        Self {
            store,
            keys,
            activities: Vec::new(),
            notifications: NotificationState::seen_at(Utc::now()),
            highlight: Throttle::new(highlight_interval),
            last_id: 0,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn notifications(&self) -> NotificationState {
        self.notifications
    }

    pub fn badge(&self) -> Badge {
        derive_badge(&self.activities, &self.notifications)
    }

    pub async fn record(
        &mut self,
        kind: ActivityKind,
        title: &str,
        description: &str,
    ) -> RecordOutcome {
        self.record_at(Utc::now(), kind, title, description).await
    }

    /// Storage failures are logged; the in-memory feed is updated regardless.
    pub async fn record_at(
        &mut self,
        now: DateTime<Utc>,
        kind: ActivityKind,
        title: &str,
        description: &str,
    ) -> RecordOutcome {
        let window = TimeDelta::seconds(DUPLICATE_WINDOW_SECS);
        let duplicate = self.activities.iter().any(|a| {
            a.same_content(kind, title, description)
                && now.signed_duration_since(a.occurred_at).abs() < window
        });
        if duplicate {
            tracing::debug!(title, "activity suppressed as duplicate");
            return RecordOutcome::Duplicate;
        }

        self.last_id = (self.last_id + 1).max(now.timestamp_millis());
        let activity = Activity {
            id: self.last_id,
            kind,
            title: title.to_string(),
            description: description.to_string(),
            occurred_at: now,
        };
        self.activities.insert(0, activity.clone());
        self.activities.truncate(MAX_ACTIVITIES);

        if self.notifications.seen {
            self.notifications.seen = false;
            self.notifications.unread_count = 1;
        } else {
            self.notifications.unread_count = self.notifications.unread_count.saturating_add(1);
        }

        if let Err(e) = self.persist_activities().await {
            tracing::warn!(error = %e, operation = "persist_activities", "activity not persisted");
        }
        if let Err(e) = self.persist_notifications().await {
            tracing::warn!(
                error = %e,
                operation = "persist_notifications",
                "notification state not persisted"
            );
        }

        let highlight = is_critical(kind, title, description) && self.highlight.try_acquire();
        RecordOutcome::Recorded {
            activity,
            highlight,
        }
    }

    pub async fn mark_seen(&mut self) -> Result<(), StoreError> {
        self.mark_seen_at(Utc::now()).await
    }

    pub async fn mark_seen_at(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.notifications = NotificationState::seen_at(now);
        self.persist_notifications().await
    }

    pub async fn load_persisted(&mut self) -> Result<(), StoreError> {
        self.load_persisted_at(Utc::now()).await
    }

    /// Restores the feed and notification state. A stale state is reset to seen, then
    /// the unread count is re-derived from the restored feed.
    pub async fn load_persisted_at(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut activities: Vec<Activity> = load_json(self.store.as_ref(), &self.keys.activities)
            .await?
            .unwrap_or_default();
        activities.truncate(MAX_ACTIVITIES);
        self.last_id = activities.iter().map(|a| a.id).max().unwrap_or(0);
        self.activities = activities;

        let mut state: NotificationState =
            load_json(self.store.as_ref(), &self.keys.notifications)
                .await?
                .unwrap_or_else(|| NotificationState::seen_at(now));
        let stale = TimeDelta::seconds(NOTIFICATION_STALE_SECS);
        if now.signed_duration_since(state.last_seen_at) > stale {
            tracing::debug!(
                unread_count = state.unread_count,
                "notification state stale; resetting"
            );
            state = NotificationState::seen_at(now);
        }
        state.unread_count = if state.seen {
            0
        } else {
            self.activities.len() as u32
        };
        self.notifications = state;
        self.persist_notifications().await
    }

    async fn persist_activities(&self) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), &self.keys.activities, &self.activities).await
    }

    async fn persist_notifications(&self) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), &self.keys.notifications, &self.notifications).await
    }
}
