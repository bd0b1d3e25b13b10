// Per-channel task: connect, handshake, dispatch in arrival order, fixed-delay reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{oneshot, watch};
use tokio::time::Duration;

use super::transport::{Connection, Transport};
use super::{ChannelSpec, ChannelStatus, ConnectionState, MessageSink};

pub(super) struct ChannelTask {
    pub spec: ChannelSpec,
    /// Current generation for this channel key; bumped on every open/close.
    pub generation: Arc<AtomicU64>,
    pub my_generation: u64,
    pub transport: Arc<dyn Transport>,
    pub sink: Arc<dyn MessageSink>,
    pub reconnect_delay: Duration,
    pub status_tx: watch::Sender<ChannelStatus>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

enum SessionEnd {
    /// Peer closed or the connection failed; reconnect.
    Dropped,
    /// Explicit close or a newer open superseded this task.
    Stopped,
}

impl ChannelTask {
    fn is_live(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.my_generation
    }

    async fn publish(&self, state: ConnectionState, reconnect_attempts: u32) {
        let status = ChannelStatus {
            state,
            reconnect_attempts,
        };
        self.status_tx.send_replace(status);
        if self.is_live() {
            self.sink.on_state(&self.spec, status).await;
        }
    }

    pub(super) async fn run(mut self) {
        let mut attempts: u32 = 0;
        loop {
            if !self.is_live() {
                break;
            }
            self.publish(ConnectionState::Connecting, attempts).await;

            let transport = self.transport.clone();
            let connected = tokio::select! {
                r = transport.connect(&self.spec.url) => r,
                _ = &mut self.shutdown_rx => break,
            };

            match connected {
                Ok(mut conn) => {
                    tracing::info!(channel = %self.spec.key, url = %self.spec.url, "channel open");
                    attempts = 0;
                    self.publish(ConnectionState::Open, attempts).await;
                    let end = self.serve(conn.as_mut()).await;
                    conn.close().await;
                    tracing::info!(channel = %self.spec.key, "channel closed");
                    if let SessionEnd::Stopped = end {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = %self.spec.key, error = %e, "channel connect failed");
                }
            }

            attempts = attempts.saturating_add(1);
            self.publish(ConnectionState::Closed, attempts).await;
            tracing::debug!(
                channel = %self.spec.key,
                attempt = attempts,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnect scheduled"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = &mut self.shutdown_rx => break,
            }
        }
        self.status_tx.send_replace(ChannelStatus {
            state: ConnectionState::Closed,
            reconnect_attempts: attempts,
        });
    }

    async fn serve(&mut self, conn: &mut dyn Connection) -> SessionEnd {
        if let Some(handshake) = &self.spec.handshake {
            let frame = match serde_json::to_string(handshake) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(channel = %self.spec.key, error = %e, "handshake encode failed");
                    return SessionEnd::Dropped;
                }
            };
            if let Err(e) = conn.send(frame).await {
                tracing::warn!(channel = %self.spec.key, error = %e, "handshake send failed");
                return SessionEnd::Dropped;
            }
        }

        loop {
            let msg = tokio::select! {
                msg = conn.recv() => msg,
                _ = &mut self.shutdown_rx => return SessionEnd::Stopped,
            };
            match msg {
                Some(Ok(text)) => {
                    if !self.is_live() {
                        tracing::debug!(
                            channel = %self.spec.key,
                            "dropping message from stale channel"
                        );
                        return SessionEnd::Stopped;
                    }
                    self.sink.on_message(&self.spec, &text).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(channel = %self.spec.key, error = %e, "channel receive failed");
                    return SessionEnd::Dropped;
                }
                None => return SessionEnd::Dropped,
            }
        }
    }
}
