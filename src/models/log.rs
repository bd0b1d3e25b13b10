// Log-tail lines and the cascading level filter

use chrono::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    /// Container id or name the line came from.
    pub source_id: String,
    pub line: String,
    pub timestamp: Option<String>,
}

impl LogLine {
    /// Builds a line, lifting a leading RFC3339 token (docker `timestamps=true`) or a
    /// bracketed `[...]` prefix into `timestamp` when none was supplied.
    pub fn new(source_id: impl Into<String>, raw: &str, timestamp: Option<String>) -> Self {
        let raw = raw.trim_end_matches(['\r', '\n']);
        let (timestamp, line) = match timestamp {
            Some(ts) => (Some(ts), raw.to_string()),
            None => split_timestamp(raw),
        };
        Self {
            source_id: source_id.into(),
            line,
            timestamp,
        }
    }
}

fn split_timestamp(raw: &str) -> (Option<String>, String) {
    if let Some(rest) = raw.strip_prefix('[')
        && let Some(end) = rest.find(']')
    {
        let ts = &rest[..end];
        if DateTime::parse_from_rfc3339(ts).is_ok() {
            return (
                Some(ts.to_string()),
                rest[end + 1..].trim_start().to_string(),
            );
        }
    }
    if let Some((head, tail)) = raw.split_once(' ')
        && DateTime::parse_from_rfc3339(head).is_ok()
    {
        return (Some(head.to_string()), tail.to_string());
    }
    (None, raw.to_string())
}

/// Display filter. Levels cascade: `Info` keeps info, warn and error lines,
/// `Warning` keeps warn and error, `Error` keeps only error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    All,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn matches(&self, line: &str) -> bool {
        if *self == LogLevel::All {
            return true;
        }
        let lower = line.to_lowercase();
        let error = lower.contains("error");
        match self {
            LogLevel::All => true,
            LogLevel::Error => error,
            LogLevel::Warning => error || lower.contains("warn"),
            LogLevel::Info => error || lower.contains("warn") || lower.contains("info"),
        }
    }
}
