// Shared test helpers: fake host API, scripted transport, payload builders

#![allow(dead_code)]

use async_trait::async_trait;
use logique::api::{ActionResponse, HostApi};
use logique::config::RenderingConfig;
use logique::dashboard::{Dashboard, DashboardDeps};
use logique::error::{CommandError, TransportError};
use logique::models::*;
use logique::session::{ChannelSpec, ChannelStatus, Connection, MessageSink, Transport};
use logique::store::{MemoryStore, StorageKeys};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;
use url::Url;

pub const TEST_CONFIG: &str = r#"
[server]
base_url = "http://127.0.0.1:8000"

[streams]
system_path = "/ws/system"
containers_path = "/ws/containers"
logs_path = "/ws/logs"
reconnect_delay_ms = 3000
log_tail = 1000

[rendering]
render_interval_ms = 100
refresh_debounce_ms = 200
highlight_interval_ms = 5000
post_action_reload_ms = 1000

[storage]
path = "data/client.db"
namespace = "logique"
"#;

pub fn stats_json(cpu: f64, cores: u32, load_1min: f64) -> Value {
    json!({
        "cpu_usage_percent": cpu,
        "cpu_cores": cores,
        "memory": {"used_percent": 40.0, "used_memory": 3.2, "total_gb": 8.0},
        "network": {"bytes_recv": 2048, "bytes_sent": 1024},
        "disk": {"used_gb": 20.0, "total_gb": 100.0, "used_percent": 20.0},
        "uptime_seconds": 3660,
        "load_average": {"1min": load_1min, "5min": 0.5, "15min": 0.25}
    })
}

pub fn stats(cpu: f64, cores: u32, load_1min: f64) -> SystemStats {
    serde_json::from_value(stats_json(cpu, cores, load_1min)).unwrap()
}

pub fn container_json(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": status,
        "cpu_percent": 1.5,
        "memory_usage_mb": 64.0,
        "image": "nginx:latest",
        "created": "2024-05-01T10:00:00Z",
        "networks": ["bridge"]
    })
}

pub fn container(id: &str, name: &str, status: &str) -> ContainerSnapshot {
    serde_json::from_value(container_json(id, name, status)).unwrap()
}

/// Host API double with scripted responses and call counters.
#[derive(Default)]
pub struct FakeHostApi {
    pub stats: Mutex<Option<SystemStats>>,
    pub containers: Mutex<Option<Vec<ContainerSnapshot>>>,
    pub networks: Mutex<NetworkMap>,
    pub fail_actions: AtomicBool,
    pub stats_calls: AtomicUsize,
    pub containers_calls: AtomicUsize,
    pub actions: Mutex<Vec<(String, ContainerAction)>>,
    /// Applied to every snapshot fetch.
    pub latency: Mutex<Duration>,
    /// Consumed one per `containers()` call before falling back to `containers`.
    pub container_script: Mutex<VecDeque<(Duration, Vec<ContainerSnapshot>)>>,
}

impl FakeHostApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        *api.stats.lock().unwrap() = Some(stats(10.0, 4, 0.2));
        *api.containers.lock().unwrap() = Some(vec![container("aaa111", "web", "running")]);
        Arc::new(api)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub fn containers_calls(&self) -> usize {
        self.containers_calls.load(Ordering::SeqCst)
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn script_containers(&self, delay: Duration, batch: Vec<ContainerSnapshot>) {
        self.container_script
            .lock()
            .unwrap()
            .push_back((delay, batch));
    }

    async fn wait(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn unavailable(what: &str) -> CommandError {
    CommandError::Status {
        status: 500,
        body: format!("{} unavailable", what),
    }
}

#[async_trait]
impl HostApi for FakeHostApi {
    async fn system_stats(&self) -> Result<SystemStats, CommandError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.stats
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("stats"))
    }

    async fn containers(&self) -> Result<Vec<ContainerSnapshot>, CommandError> {
        self.containers_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.container_script.lock().unwrap().pop_front();
        if let Some((delay, batch)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(batch);
        }
        self.wait().await;
        self.containers
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("containers"))
    }

    async fn networks(&self) -> Result<NetworkMap, CommandError> {
        self.wait().await;
        Ok(self.networks.lock().unwrap().clone())
    }

    async fn container_action(
        &self,
        id: &str,
        action: ContainerAction,
    ) -> Result<ActionResponse, CommandError> {
        self.actions.lock().unwrap().push((id.to_string(), action));
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(unavailable("docker"));
        }
        Ok(ActionResponse {
            status: action.past_tense().to_string(),
            container_id: id.to_string(),
        })
    }
}

pub fn test_dashboard() -> (Arc<Dashboard>, Arc<FakeHostApi>, Arc<MemoryStore>) {
    let api = FakeHostApi::new();
    let store = Arc::new(MemoryStore::new());
    let dashboard = Dashboard::new(DashboardDeps {
        store: store.clone(),
        api: api.clone(),
        keys: StorageKeys::new("logique"),
        rendering: RenderingConfig::default(),
    });
    (dashboard, api, store)
}

/// Server side of one fake connection.
pub struct FakePeer {
    pub url: Url,
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl FakePeer {
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.to_client.send(text.into());
    }

    /// Next frame the client sent; `None` once the client closed.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    pub fn hang_up(self) {}
}

struct FakeConnection {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        match &self.outgoing {
            Some(tx) => tx
                .send(text)
                .map_err(|e| TransportError::Send(e.to_string())),
            None => Err(TransportError::Send("closed".into())),
        }
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.incoming.close();
        self.outgoing = None;
    }
}

/// Transport whose connections are handed to the test as [`FakePeer`]s.
pub struct FakeTransport {
    pub refuse: AtomicBool,
    pub attempts: AtomicUsize,
    peers_tx: mpsc::UnboundedSender<FakePeer>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<FakePeer>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            refuse: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            peers_tx,
            peers_rx: tokio::sync::Mutex::new(peers_rx),
        })
    }

    pub async fn next_peer(&self) -> FakePeer {
        self.peers_rx
            .lock()
            .await
            .recv()
            .await
            .expect("transport dropped")
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let _ = self.peers_tx.send(FakePeer {
            url: url.clone(),
            to_client,
            from_client,
        });
        Ok(Box::new(FakeConnection {
            incoming,
            outgoing: Some(outgoing),
        }))
    }
}

/// Sink that forwards every dispatched frame and state change to the test.
pub struct RecordingSink {
    messages: mpsc::UnboundedSender<(ChannelSpec, String)>,
    pub states: Mutex<Vec<ChannelStatus>>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(ChannelSpec, String)>) {
        let (messages, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                messages,
                states: Mutex::new(Vec::new()),
            }),
            rx,
        )
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn on_message(&self, spec: &ChannelSpec, text: &str) {
        let _ = self.messages.send((spec.clone(), text.to_string()));
    }

    async fn on_state(&self, _spec: &ChannelSpec, status: ChannelStatus) {
        self.states.lock().unwrap().push(status);
    }
}
