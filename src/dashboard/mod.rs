// Dashboard context: owns every piece of client state and routes channel payloads,
// snapshot fetches and user actions into it.

mod view;

pub use view::{
    ActivityEntry, DashboardView, ERROR_PLACEHOLDER, LogView, LogViewLine, SortKey, SortOrder,
    filter_and_sort, format_bytes, format_time_ago, format_uptime, load_display,
};

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::activity::{ActivityLog, RecordOutcome};
use crate::api::HostApi;
use crate::config::RenderingConfig;
use crate::error::{CommandError, DataShapeError, StoreError};
use crate::health::HealthReport;
use crate::logtail::{AppendOutcome, LogTail, LogTarget};
use crate::models::{
    ActivityKind, ContainerAction, ContainerSnapshot, LogLine, LogPayload, NetworkMap, Settings,
    StreamPayload, SystemStats, abbreviate_id, group_by_network,
};
use crate::rate_limit::{Debounce, Throttle};
use crate::reconcile::Reconciler;
use crate::series::ChartSet;
use crate::session::{ChannelKey, ChannelSpec, ChannelStatus, ConnectionState, MessageSink};
use crate::store::{ClientStore, StorageKeys, load_json, save_json};

/// Consecutive failures on one feed before its display flips to "Error".
pub const FAILURE_THRESHOLD: u32 = 3;
/// Consecutive failed reconnects before a "Connection Lost" activity.
pub const CONNECTION_LOST_ATTEMPTS: u32 = 3;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    Render,
    /// A critical activity was recorded; at most once per highlight interval.
    Highlight,
    LogsAppended { follow: bool },
}

/// The two snapshot feeds whose failures are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    SystemStats,
    Containers,
}

impl Feed {
    fn error_activity(&self) -> (&'static str, &'static str) {
        match self {
            Feed::SystemStats => ("System Stats Error", "Failed to load system statistics"),
            Feed::Containers => ("Container Load Error", "Failed to load container information"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FeedHealth {
    consecutive_failures: u32,
    errored: bool,
}

struct DashboardState {
    settings: Settings,
    charts: ChartSet,
    stats: Option<SystemStats>,
    health: Option<HealthReport>,
    reconciler: Reconciler,
    containers: Vec<ContainerSnapshot>,
    networks: Option<NetworkMap>,
    log_tail: Option<LogTail>,
    stats_feed: FeedHealth,
    containers_feed: FeedHealth,
    sort: (SortKey, SortOrder),
}

impl DashboardState {
    fn feed_mut(&mut self, feed: Feed) -> &mut FeedHealth {
        match feed {
            Feed::SystemStats => &mut self.stats_feed,
            Feed::Containers => &mut self.containers_feed,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DashboardDeps {
    pub store: Arc<dyn ClientStore>,
    pub api: Arc<dyn HostApi>,
    pub keys: StorageKeys,
    pub rendering: RenderingConfig,
}

pub struct Dashboard {
    state: Mutex<DashboardState>,
    activity: tokio::sync::Mutex<ActivityLog>,
    store: Arc<dyn ClientStore>,
    api: Arc<dyn HostApi>,
    keys: StorageKeys,
    render: Throttle,
    reload: Debounce<()>,
    /// Serializes reloads so results apply in request order.
    reload_gate: tokio::sync::Mutex<()>,
    reload_tasks: Mutex<Vec<JoinHandle<()>>>,
    post_action_reload: Duration,
    events: broadcast::Sender<DashboardEvent>,
    shut_down: AtomicBool,
}

impl Dashboard {
    pub fn new(deps: DashboardDeps) -> Arc<Self> {
        let DashboardDeps {
            store,
            api,
            keys,
            rendering,
        } = deps;
        let settings = Settings::default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new_cyclic(|weak: &Weak<Dashboard>| {
            let weak = weak.clone();
            let reload = Debounce::new(
                Duration::from_millis(rendering.refresh_debounce_ms),
                move |()| {
                    if let Some(dashboard) = weak.upgrade() {
                        dashboard.spawn_reload();
                    }
                },
            );
            Dashboard {
                state: Mutex::new(DashboardState {
                    charts: ChartSet::with_capacity(settings.chart_points),
                    settings,
                    stats: None,
                    health: None,
                    reconciler: Reconciler::new(),
                    containers: Vec::new(),
                    networks: None,
                    log_tail: None,
                    stats_feed: FeedHealth::default(),
                    containers_feed: FeedHealth::default(),
                    sort: (SortKey::default(), SortOrder::default()),
                }),
                activity: tokio::sync::Mutex::new(ActivityLog::new(
                    store.clone(),
                    keys.clone(),
                    Duration::from_millis(rendering.highlight_interval_ms),
                )),
                store,
                api,
                keys,
                render: Throttle::new(Duration::from_millis(rendering.render_interval_ms)),
                reload,
                reload_gate: tokio::sync::Mutex::new(()),
                reload_tasks: Mutex::new(Vec::new()),
                post_action_reload: Duration::from_millis(rendering.post_action_reload_ms),
                events,
                shut_down: AtomicBool::new(false),
            }
        })
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        lock(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DashboardEvent) {
        if self.is_shut_down() {
            return;
        }
        // No subscribers is fine; the view is pulled on demand.
        let _ = self.events.send(event);
    }

    fn request_render(&self) {
        if self.render.try_acquire() {
            self.emit(DashboardEvent::Render);
        }
    }

    /// Restores settings, activities and notification state from the store.
    pub async fn load_persisted(&self) -> Result<(), StoreError> {
        let stored: Option<Settings> = load_json(self.store.as_ref(), &self.keys.settings).await?;
        if let Some(settings) = stored {
            self.apply_settings(settings.normalized());
        }
        self.activity.lock().await.load_persisted().await
    }

    pub fn settings(&self) -> Settings {
        self.state().settings.clone()
    }

    pub async fn record(
        &self,
        kind: ActivityKind,
        title: &str,
        description: &str,
    ) -> RecordOutcome {
        let outcome = self.activity.lock().await.record(kind, title, description).await;
        if outcome.highlight() {
            self.emit(DashboardEvent::Highlight);
        }
        if let RecordOutcome::Recorded { .. } = outcome {
            self.request_render();
        }
        outcome
    }

    pub fn apply_system_stats(&self, stats: SystemStats) {
        {
            let mut state = self.state();
            state.charts.cpu.push(stats.cpu_usage_percent);
            state.charts.memory.push(stats.memory.used_percent);
            state.charts.network.push(stats.network_total_bytes() as f64);
            state.health = Some(HealthReport::from_stats(&stats));
            state.stats = Some(stats);
            state.stats_feed = FeedHealth::default();
        }
        self.request_render();
    }

    /// Replaces the container list and records one activity per status transition.
    pub async fn apply_containers(&self, batch: Vec<ContainerSnapshot>) {
        let transitions = {
            let mut state = self.state();
            let transitions = state.reconciler.reconcile(&batch);
            state.containers = batch;
            state.containers_feed = FeedHealth::default();
            transitions
        };
        for t in &transitions {
            tracing::info!(
                container = %t.name,
                from = %t.from,
                to = %t.to,
                "container status changed"
            );
            self.record(t.severity(), &t.title(), &t.description()).await;
        }
        self.request_render();
    }

    pub fn apply_networks(&self, networks: NetworkMap) {
        self.state().networks = Some(networks);
        self.request_render();
    }

    /// Counts a failed fetch or malformed payload. Crossing the threshold flags the
    /// feed, records one error activity and restarts the count.
    pub async fn record_failure(&self, feed: Feed) {
        let crossed = {
            let mut state = self.state();
            let health = state.feed_mut(feed);
            health.consecutive_failures += 1;
            if health.consecutive_failures >= FAILURE_THRESHOLD {
                health.consecutive_failures = 0;
                health.errored = true;
                true
            } else {
                false
            }
        };
        if crossed {
            let (title, description) = feed.error_activity();
            self.record(ActivityKind::Error, title, description).await;
        }
    }

    pub fn feed_errored(&self, feed: Feed) -> bool {
        let mut state = self.state();
        state.feed_mut(feed).errored
    }

    /// Routes one frame from a push channel.
    pub async fn on_message(&self, spec: &ChannelSpec, text: &str) {
        if self.is_shut_down() {
            return;
        }
        match spec.key {
            ChannelKey::System | ChannelKey::Containers => {
                let payload = match serde_json::from_str::<StreamPayload>(text) {
                    Ok(p) => p,
                    Err(source) => {
                        let e = DataShapeError {
                            channel: spec.key.as_str(),
                            source,
                        };
                        tracing::warn!(channel = %spec.key, error = %e, "payload rejected");
                        let feed = match spec.key {
                            ChannelKey::System => Feed::SystemStats,
                            _ => Feed::Containers,
                        };
                        self.record_failure(feed).await;
                        return;
                    }
                };
                if let Some(stats) = payload.system_stats {
                    self.apply_system_stats(stats);
                }
                if let Some(containers) = payload.containers {
                    self.apply_containers(containers).await;
                }
                if let Some(networks) = payload.networks {
                    self.apply_networks(networks);
                }
            }
            ChannelKey::Logs => {
                let Some(target) = &spec.log_target else {
                    return;
                };
                // Plain-text frames are taken as the line itself.
                let payload = serde_json::from_str::<LogPayload>(text).unwrap_or(LogPayload {
                    line: text.to_string(),
                    timestamp: None,
                    container: None,
                });
                let source = payload.container.unwrap_or_else(|| target.name().to_string());
                let line = LogLine::new(source, &payload.line, payload.timestamp);
                self.append_log(target, line);
            }
        }
    }

    /// Lines for a target other than the active view are dropped.
    pub fn append_log(&self, target: &LogTarget, line: LogLine) -> Option<AppendOutcome> {
        let outcome = {
            let mut state = self.state();
            let tail = state.log_tail.as_mut().filter(|t| t.target() == target)?;
            tail.append(line)
        };
        if let AppendOutcome::Appended { follow } = outcome {
            self.emit(DashboardEvent::LogsAppended { follow });
        }
        Some(outcome)
    }

    pub async fn on_connection_state(&self, spec: &ChannelSpec, status: ChannelStatus) {
        if status.state == ConnectionState::Closed
            && status.reconnect_attempts == CONNECTION_LOST_ATTEMPTS
        {
            let description = format!(
                "Lost connection to the {} stream; retrying",
                spec.key.as_str()
            );
            self.record(ActivityKind::Warning, "Connection Lost", &description)
                .await;
        }
    }

    /// Debounced; bursts collapse into one fetch of every snapshot.
    pub fn request_reload(&self) {
        if !self.is_shut_down() {
            self.reload.call(());
        }
    }

    pub fn reload_pending(&self) -> bool {
        self.reload.is_pending()
    }

    /// Cancels pending and in-flight reloads. Afterwards nothing is scheduled,
    /// applied from a channel or broadcast. Idempotent.
    pub fn shutdown(&self) {
        let tasks = {
            let mut tasks = lock(&self.reload_tasks);
            self.shut_down.store(true, Ordering::SeqCst);
            std::mem::take(&mut *tasks)
        };
        self.reload.cancel();
        for task in tasks {
            task.abort();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn spawn_reload(self: &Arc<Self>) {
        let mut tasks = lock(&self.reload_tasks);
        if self.is_shut_down() {
            return;
        }
        tasks.retain(|t| !t.is_finished());
        let dashboard = self.clone();
        tasks.push(tokio::spawn(async move { dashboard.reload_now().await }));
    }

    /// Fetches every snapshot. Concurrent calls run one after another.
    pub async fn reload_now(&self) {
        let _gate = self.reload_gate.lock().await;
        if self.is_shut_down() {
            return;
        }
        let (stats, containers, networks) = tokio::join!(
            self.api.system_stats(),
            self.api.containers(),
            self.api.networks()
        );
        if self.is_shut_down() {
            tracing::debug!("reload finished after shutdown; dropped");
            return;
        }
        match stats {
            Ok(stats) => self.apply_system_stats(stats),
            Err(e) => {
                tracing::warn!(error = %e, operation = "system_stats", "fetch failed");
                self.record_failure(Feed::SystemStats).await;
            }
        }
        match containers {
            Ok(containers) => self.apply_containers(containers).await,
            Err(e) => {
                tracing::warn!(error = %e, operation = "containers", "fetch failed");
                self.record_failure(Feed::Containers).await;
            }
        }
        match networks {
            Ok(networks) => self.apply_networks(networks),
            Err(e) => tracing::warn!(error = %e, operation = "networks", "fetch failed"),
        }
    }

    pub async fn refresh_all(&self) {
        self.record(ActivityKind::Refresh, "Manual Refresh", "All data has been refreshed")
            .await;
        self.request_reload();
    }

    /// Failures are recorded and returned, never retried.
    pub async fn control_container(
        &self,
        id: &str,
        action: ContainerAction,
    ) -> Result<(), CommandError> {
        let short = abbreviate_id(id);
        match self.api.container_action(id, action).await {
            Ok(_) => {
                self.record(
                    ActivityKind::Success,
                    &format!("Container {}", action),
                    &format!("Successfully {} container {}", action.past_tense(), short),
                )
                .await;
                if !self.is_shut_down() {
                    self.reload.call_after(self.post_action_reload, ());
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    container_id = id,
                    action = %action,
                    error = %e,
                    "container action failed"
                );
                self.record(
                    ActivityKind::Error,
                    &format!("Container {} Failed", action),
                    &format!("Failed to {} container {}", action, short),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Persists and applies. A failed save is still applied for this session.
    pub async fn update_settings(&self, settings: Settings) -> Result<(), StoreError> {
        let settings = settings.normalized();
        self.apply_settings(settings.clone());
        let saved = save_json(self.store.as_ref(), &self.keys.settings, &settings).await;
        if let Err(e) = &saved {
            tracing::warn!(error = %e, operation = "save_settings", "settings not persisted");
        }
        self.record(
            ActivityKind::Success,
            "Settings Updated",
            "Application settings have been saved",
        )
        .await;
        saved
    }

    fn apply_settings(&self, settings: Settings) {
        {
            let mut state = self.state();
            state.charts.set_capacity(settings.chart_points);
            if let Some(tail) = state.log_tail.as_mut() {
                tail.set_level(settings.log_level);
            }
            state.settings = settings;
        }
        self.request_render();
    }

    /// Replaces the active log view and hands back the previous one.
    pub fn open_logs(&self, target: LogTarget) -> Option<LogTail> {
        let mut state = self.state();
        let level = state.settings.log_level;
        tracing::info!(target = %target, "log view opened");
        state.log_tail.replace(LogTail::new(target, level))
    }

    /// Puts back a view returned by [`open_logs`](Self::open_logs).
    pub fn restore_logs(&self, previous: Option<LogTail>) {
        self.state().log_tail = previous;
    }

    pub fn close_logs(&self) {
        self.state().log_tail = None;
    }

    pub fn log_target(&self) -> Option<LogTarget> {
        self.state().log_tail.as_ref().map(|t| t.target().clone())
    }

    pub fn set_log_scroll(&self, distance_from_bottom: f64) {
        if let Some(tail) = self.state().log_tail.as_mut() {
            tail.set_scroll(distance_from_bottom);
        }
    }

    pub fn set_sort(&self, key: SortKey, order: SortOrder) {
        self.state().sort = (key, order);
        self.request_render();
    }

    pub async fn mark_activities_seen(&self) -> Result<(), StoreError> {
        self.activity.lock().await.mark_seen().await?;
        self.request_render();
        Ok(())
    }

    pub async fn view(&self) -> DashboardView {
        let (activities, badge) = {
            let log = self.activity.lock().await;
            (log.activities().to_vec(), log.badge())
        };
        let now = Utc::now();
        let activities = activities
            .into_iter()
            .map(|activity| ActivityEntry {
                time_ago: format_time_ago(activity.occurred_at, now),
                activity,
            })
            .collect();

        let state = self.state();
        let settings = state.settings.clone();
        let (key, order) = state.sort;
        let containers = filter_and_sort(&state.containers, settings.show_exited, key, order);
        let running_containers = containers.iter().filter(|c| c.status.is_running()).count();
        let network_groups = if settings.group_by_network {
            group_by_network(&containers, state.networks.as_ref())
        } else {
            Vec::new()
        };

        let stats_error = state.stats_feed.errored;
        let stats_text = |f: &dyn Fn(&SystemStats) -> String| -> String {
            match (&state.stats, stats_error) {
                (_, true) => ERROR_PLACEHOLDER.to_string(),
                (Some(s), false) => f(s),
                (None, false) => "--".to_string(),
            }
        };
        let cpu_display = stats_text(&|s| format!("{:.1}%", s.cpu_usage_percent));
        let memory_display = stats_text(&|s| format!("{:.1} GB", s.memory.used_memory));
        let network_in_display =
            stats_text(&|s| format!("{}/s", format_bytes(s.network.bytes_recv)));
        let network_out_display =
            stats_text(&|s| format!("{}/s", format_bytes(s.network.bytes_sent)));
        let uptime_display = stats_text(&|s| format_uptime(s.uptime_seconds));
        let load_display =
            stats_text(&|s| view::load_display(&s.load_average, settings.load_avg_period));

        DashboardView {
            total_containers: containers.len(),
            running_containers,
            containers,
            network_groups,
            stats: state.stats.clone(),
            health: state.health,
            stats_error,
            containers_error: state.containers_feed.errored,
            cpu_display,
            memory_display,
            network_in_display,
            network_out_display,
            uptime_display,
            load_display,
            cpu_history: state.charts.cpu.values().collect(),
            memory_history: state.charts.memory.values().collect(),
            network_history: state.charts.network.values().collect(),
            activities,
            badge,
            logs: state
                .log_tail
                .as_ref()
                .map(|t| LogView::from_tail(t, settings.show_timestamps)),
            settings,
        }
    }
}

#[async_trait]
impl MessageSink for Dashboard {
    async fn on_message(&self, spec: &ChannelSpec, text: &str) {
        Dashboard::on_message(self, spec, text).await;
    }

    async fn on_state(&self, spec: &ChannelSpec, status: ChannelStatus) {
        self.on_connection_state(spec, status).await;
    }
}
