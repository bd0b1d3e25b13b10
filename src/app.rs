// Session composition: one dashboard fed by the system, containers and log channels.

use std::sync::Arc;
use tokio::time::Duration;
use url::Url;

use crate::api::HostApi;
use crate::config::AppConfig;
use crate::dashboard::{Dashboard, DashboardDeps};
use crate::error::SessionError;
use crate::logtail::LogTarget;
use crate::models::{ActivityKind, Settings};
use crate::session::{ChannelKey, ChannelSpec, MessageSink, SessionManager, Transport};
use crate::store::{ClientStore, StorageKeys};

pub struct App {
    config: AppConfig,
    ws_base: Url,
    dashboard: Arc<Dashboard>,
    sessions: SessionManager,
}

impl App {
    /// Restores persisted state, opens the system and containers channels and
    /// schedules the first snapshot reload.
    pub async fn start(
        config: AppConfig,
        store: Arc<dyn ClientStore>,
        api: Arc<dyn HostApi>,
        transport: Arc<dyn Transport>,
    ) -> anyhow::Result<Self> {
        let ws_base = config.ws_base()?;
        let dashboard = Dashboard::new(DashboardDeps {
            store,
            api,
            keys: StorageKeys::new(&config.storage.namespace),
            rendering: config.rendering.clone(),
        });
        if let Err(e) = dashboard.load_persisted().await {
            tracing::warn!(
                error = %e,
                operation = "load_persisted",
                "persisted state not restored"
            );
            dashboard
                .record(
                    ActivityKind::Error,
                    "Initialization Error",
                    "Failed to initialize application",
                )
                .await;
        }

        let sink: Arc<dyn MessageSink> = dashboard.clone();
        let sessions = SessionManager::new(
            transport,
            sink,
            Duration::from_millis(config.streams.reconnect_delay_ms),
        );
        let app = Self {
            config,
            ws_base,
            dashboard,
            sessions,
        };
        app.open_system().await?;
        app.sessions
            .open(ChannelSpec::containers(
                &app.ws_base,
                &app.config.streams.containers_path,
            )?)
            .await?;
        app.dashboard.request_reload();
        tracing::info!(base_url = %app.config.server.base_url, "dashboard session started");
        Ok(app)
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// (Re)opens the system channel so its handshake carries the current refresh interval.
    async fn open_system(&self) -> Result<(), SessionError> {
        let refresh_interval = self.dashboard.settings().refresh_interval;
        let spec = ChannelSpec::system(
            &self.ws_base,
            &self.config.streams.system_path,
            refresh_interval,
        )?;
        self.sessions.open(spec).await
    }

    /// Switches the log view to `target`, replacing any previous tail channel.
    pub async fn open_logs(&self, target: LogTarget) -> Result<(), SessionError> {
        let spec = ChannelSpec::logs(
            &self.ws_base,
            &self.config.streams.logs_path,
            target.clone(),
            self.config.streams.log_tail as usize,
        )?;
        let previous = self.dashboard.open_logs(target);
        if let Err(e) = self.sessions.open(spec).await {
            self.dashboard.restore_logs(previous);
            return Err(e);
        }
        Ok(())
    }

    pub async fn close_logs(&self) {
        self.sessions.close(ChannelKey::Logs).await;
        self.dashboard.close_logs();
    }

    pub async fn update_settings(&self, settings: Settings) -> anyhow::Result<()> {
        let previous = self.dashboard.settings().refresh_interval;
        let saved = self.dashboard.update_settings(settings).await;
        if self.dashboard.settings().refresh_interval != previous {
            tracing::info!(
                refresh_interval = self.dashboard.settings().refresh_interval,
                "refresh interval changed; resubscribing"
            );
            self.open_system().await?;
        }
        self.dashboard.request_reload();
        Ok(saved?)
    }

    /// Closes every channel and cancels pending timers. Safe to call more than once.
    pub async fn teardown(&self) {
        self.dashboard.shutdown();
        if self.sessions.is_torn_down() {
            return;
        }
        self.sessions.teardown().await;
    }
}
