// Error taxonomy: transport, payload shape, container commands, client storage.

use thiserror::Error;

/// Channel connect / send / receive failure. Recovered by the reconnect loop.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Payload that could not be decoded into the channel's schema.
#[derive(Debug, Error)]
#[error("malformed {channel} payload: {source}")]
pub struct DataShapeError {
    pub channel: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Container action or snapshot request against the host API failed.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("host API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has been torn down")]
    TornDown,
    #[error("invalid channel URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
