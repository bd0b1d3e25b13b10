use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub streams: StreamsConfig,
    #[serde(default)]
    pub rendering: RenderingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host API root, e.g. `http://127.0.0.1:8000`. WebSocket URLs swap the scheme.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamsConfig {
    #[serde(default = "default_system_path")]
    pub system_path: String,
    #[serde(default = "default_containers_path")]
    pub containers_path: String,
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Lines requested from the log-tail channel on open.
    #[serde(default = "default_log_tail")]
    pub log_tail: u32,
}

fn default_system_path() -> String {
    "/ws/system".into()
}

fn default_containers_path() -> String {
    "/ws/containers".into()
}

fn default_logs_path() -> String {
    "/ws/logs".into()
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_log_tail() -> u32 {
    1000
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            system_path: default_system_path(),
            containers_path: default_containers_path(),
            logs_path: default_logs_path(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            log_tail: default_log_tail(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderingConfig {
    /// Minimum spacing between render signals.
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,
    #[serde(default = "default_highlight_interval_ms")]
    pub highlight_interval_ms: u64,
    /// Delay before reloading containers after a successful action.
    #[serde(default = "default_post_action_reload_ms")]
    pub post_action_reload_ms: u64,
}

fn default_render_interval_ms() -> u64 {
    100
}

fn default_refresh_debounce_ms() -> u64 {
    200
}

fn default_highlight_interval_ms() -> u64 {
    5000
}

fn default_post_action_reload_ms() -> u64 {
    1000
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: default_render_interval_ms(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
            highlight_interval_ms: default_highlight_interval_ms(),
            post_action_reload_ms: default_post_action_reload_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "logique".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base = Url::parse(&self.server.base_url)
            .map_err(|e| anyhow::anyhow!("server.base_url is not a valid URL: {}", e))?;
        anyhow::ensure!(
            matches!(base.scheme(), "http" | "https"),
            "server.base_url must use http or https, got {}",
            base.scheme()
        );
        for (key, path) in [
            ("streams.system_path", &self.streams.system_path),
            ("streams.containers_path", &self.streams.containers_path),
            ("streams.logs_path", &self.streams.logs_path),
        ] {
            anyhow::ensure!(path.starts_with('/'), "{} must start with '/', got {:?}", key, path);
        }
        anyhow::ensure!(
            self.streams.reconnect_delay_ms > 0,
            "streams.reconnect_delay_ms must be > 0, got {}",
            self.streams.reconnect_delay_ms
        );
        anyhow::ensure!(
            self.streams.log_tail > 0,
            "streams.log_tail must be > 0, got {}",
            self.streams.log_tail
        );
        anyhow::ensure!(
            self.rendering.render_interval_ms > 0,
            "rendering.render_interval_ms must be > 0, got {}",
            self.rendering.render_interval_ms
        );
        anyhow::ensure!(
            self.rendering.refresh_debounce_ms > 0,
            "rendering.refresh_debounce_ms must be > 0, got {}",
            self.rendering.refresh_debounce_ms
        );
        anyhow::ensure!(
            self.rendering.highlight_interval_ms > 0,
            "rendering.highlight_interval_ms must be > 0, got {}",
            self.rendering.highlight_interval_ms
        );
        anyhow::ensure!(
            self.rendering.post_action_reload_ms > 0,
            "rendering.post_action_reload_ms must be > 0, got {}",
            self.rendering.post_action_reload_ms
        );
        anyhow::ensure!(!self.storage.path.is_empty(), "storage.path must be non-empty");
        anyhow::ensure!(
            !self.storage.namespace.is_empty(),
            "storage.namespace must be non-empty"
        );
        Ok(())
    }

    pub fn http_base(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&self.server.base_url)?)
    }

    /// Host API root with the scheme switched to ws/wss.
    pub fn ws_base(&self) -> anyhow::Result<Url> {
        let mut url = self.http_base()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot derive websocket URL from {}", url))?;
        Ok(url)
    }
}
