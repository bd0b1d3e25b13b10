// Stream session manager: at most one live connection per logical channel, each
// guarded by a generation counter so a superseded task can never dispatch again.

mod channel;
mod transport;

pub use transport::{Connection, Transport, WsTransport};

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::Instrument;
use url::Url;

use crate::error::SessionError;
use crate::logtail::LogTarget;
use crate::models::Handshake;
use channel::ChannelTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKey {
    System,
    Containers,
    /// The single log-tail channel; opening a new target replaces the old one.
    Logs,
}

impl ChannelKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKey::System => "system",
            ChannelKey::Containers => "containers",
            ChannelKey::Logs => "logs",
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Consecutive failed connects or drops since the last successful open.
    pub reconnect_attempts: u32,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            reconnect_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub key: ChannelKey,
    pub url: Url,
    /// Sent once after every successful connect.
    pub handshake: Option<Handshake>,
    pub log_target: Option<LogTarget>,
}

impl ChannelSpec {
    pub fn system(ws_base: &Url, path: &str, refresh_interval: u32) -> Result<Self, SessionError> {
        Ok(Self {
            key: ChannelKey::System,
            url: channel_url(ws_base, path)?,
            handshake: Some(Handshake { refresh_interval }),
            log_target: None,
        })
    }

    pub fn containers(ws_base: &Url, path: &str) -> Result<Self, SessionError> {
        Ok(Self {
            key: ChannelKey::Containers,
            url: channel_url(ws_base, path)?,
            handshake: None,
            log_target: None,
        })
    }

    /// `{path}/{id}?tail=N` for a container, `{path}/network/{name}?tail=N` for a network.
    pub fn logs(
        ws_base: &Url,
        path: &str,
        target: LogTarget,
        tail: usize,
    ) -> Result<Self, SessionError> {
        let mut url = channel_url(ws_base, path)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            if let LogTarget::Network(_) = &target {
                segments.push("network");
            }
            segments.push(target.name());
        }
        url.query_pairs_mut()
            .append_pair("tail", &tail.to_string());
        Ok(Self {
            key: ChannelKey::Logs,
            url,
            handshake: None,
            log_target: Some(target),
        })
    }
}

/// Appends `path` below the base, keeping any prefix the base already carries.
fn channel_url(ws_base: &Url, path: &str) -> Result<Url, SessionError> {
    let mut url = ws_base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(path.split('/').filter(|s| !s.is_empty()));
    Ok(url)
}

/// Receives every dispatched frame of every channel, in per-channel arrival order.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn on_message(&self, spec: &ChannelSpec, text: &str);

    async fn on_state(&self, _spec: &ChannelSpec, _status: ChannelStatus) {}
}

struct ChannelHandle {
    spec: ChannelSpec,
    status: watch::Receiver<ChannelStatus>,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Sessions {
    channels: HashMap<ChannelKey, ChannelHandle>,
    generations: HashMap<ChannelKey, Arc<AtomicU64>>,
    torn_down: bool,
}

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn MessageSink>,
    reconnect_delay: Duration,
    sessions: Mutex<Sessions>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn MessageSink>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            transport,
            sink,
            reconnect_delay,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces any live connection on the same key. The previous task is stopped
    /// and awaited before this returns.
    pub async fn open(&self, spec: ChannelSpec) -> Result<(), SessionError> {
        let key = spec.key;
        let previous = {
            let mut sessions = self.sessions();
            if sessions.torn_down {
                return Err(SessionError::TornDown);
            }
            let generation = sessions
                .generations
                .entry(key)
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .clone();
            let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;

            let (status_tx, status_rx) = watch::channel(ChannelStatus::default());
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let task = ChannelTask {
                spec: spec.clone(),
                generation,
                my_generation,
                transport: self.transport.clone(),
                sink: self.sink.clone(),
                reconnect_delay: self.reconnect_delay,
                status_tx,
                shutdown_rx,
            };
            let span = tracing::info_span!("channel", channel = %key, generation = my_generation);
            let handle = tokio::spawn(task.run().instrument(span));
            sessions.channels.insert(
                key,
                ChannelHandle {
                    spec,
                    status: status_rx,
                    shutdown_tx,
                    task: handle,
                },
            )
        };
        if let Some(previous) = previous {
            tracing::debug!(channel = %key, "replacing live channel");
            stop(previous).await;
        }
        Ok(())
    }

    /// Closes the channel and cancels its pending reconnect. Idempotent.
    pub async fn close(&self, key: ChannelKey) {
        let handle = {
            let mut sessions = self.sessions();
            if let Some(generation) = sessions.generations.get(&key) {
                generation.fetch_add(1, Ordering::SeqCst);
            }
            sessions.channels.remove(&key)
        };
        if let Some(handle) = handle {
            stop(handle).await;
        }
    }

    /// Closes every channel; later `open` calls fail with [`SessionError::TornDown`].
    pub async fn teardown(&self) {
        let handles: Vec<ChannelHandle> = {
            let mut sessions = self.sessions();
            sessions.torn_down = true;
            for generation in sessions.generations.values() {
                generation.fetch_add(1, Ordering::SeqCst);
            }
            sessions.channels.drain().map(|(_, h)| h).collect()
        };
        let n = handles.len();
        for handle in handles {
            stop(handle).await;
        }
        tracing::info!(channels_closed = n, "session torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.sessions().torn_down
    }

    pub fn status(&self, key: ChannelKey) -> Option<ChannelStatus> {
        self.sessions()
            .channels
            .get(&key)
            .map(|h| *h.status.borrow())
    }

    pub fn watch_status(&self, key: ChannelKey) -> Option<watch::Receiver<ChannelStatus>> {
        self.sessions().channels.get(&key).map(|h| h.status.clone())
    }

    pub fn spec(&self, key: ChannelKey) -> Option<ChannelSpec> {
        self.sessions().channels.get(&key).map(|h| h.spec.clone())
    }

    pub fn open_channels(&self) -> Vec<ChannelKey> {
        self.sessions().channels.keys().copied().collect()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let mut sessions = self.sessions();
        for generation in sessions.generations.values() {
            generation.fetch_add(1, Ordering::SeqCst);
        }
        for (_, handle) in sessions.channels.drain() {
            handle.task.abort();
        }
    }
}

async fn stop(handle: ChannelHandle) {
    let ChannelHandle {
        spec,
        shutdown_tx,
        task,
        ..
    } = handle;
    // The task may already have exited; a failed send is fine.
    let _ = shutdown_tx.send(());
    if let Err(e) = task.await
        && !e.is_cancelled()
    {
        tracing::warn!(channel = %spec.key, error = %e, "channel task failed");
    }
}
