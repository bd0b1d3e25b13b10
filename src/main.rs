use anyhow::Result;
use logique::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use dashboard::{Dashboard, DashboardEvent};
use health::HealthTier;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Headless presenter: pulls the view on every render signal and logs what a UI would show.
fn spawn_presenter(dashboard: Arc<Dashboard>) -> tokio::task::JoinHandle<()> {
    let mut events = dashboard.subscribe();
    tokio::spawn(async move {
        let mut last_tier: Option<HealthTier> = None;
        let mut last_activity: Option<i64> = None;
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "presenter lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                DashboardEvent::Render => {
                    let view = dashboard.view().await;
                    let tier = view.health.map(|h| h.tier);
                    if tier != last_tier
                        && let Some(tier) = tier
                    {
                        tracing::info!(
                            tier = tier.css_class(),
                            label = tier.label(),
                            "health changed"
                        );
                    }
                    last_tier = tier;
                    if let Some(newest) = view.activities.first()
                        && last_activity != Some(newest.activity.id)
                    {
                        tracing::info!(
                            kind = ?newest.activity.kind,
                            title = %newest.activity.title,
                            description = %newest.activity.description,
                            "activity"
                        );
                        last_activity = Some(newest.activity.id);
                    }
                    tracing::debug!(
                        cpu = %view.cpu_display,
                        memory = %view.memory_display,
                        load = %view.load_display,
                        containers = view.total_containers,
                        running = view.running_containers,
                        unread = ?view.badge.count,
                        "render"
                    );
                }
                DashboardEvent::Highlight => {
                    tracing::info!("critical activity highlighted");
                }
                DashboardEvent::LogsAppended { follow } => {
                    tracing::trace!(follow, "log lines appended");
                }
            }
        }
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let store: Arc<dyn store::ClientStore> =
        Arc::new(store::SqliteStore::connect(&app_config.storage.path).await?);
    let host_api: Arc<dyn api::HostApi> =
        Arc::new(api::HttpHostApi::new(app_config.http_base()?)?);
    let transport: Arc<dyn session::Transport> = Arc::new(session::WsTransport);

    let app = app::App::start(app_config, store, host_api, transport).await?;
    let presenter = spawn_presenter(app.dashboard().clone());

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    app.teardown().await;
    presenter.abort();

    Ok(())
}
