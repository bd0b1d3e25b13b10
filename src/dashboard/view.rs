// Read-only projection handed to the presentation layer, plus its formatting helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::activity::Badge;
use crate::health::HealthReport;
use crate::logtail::{LogTail, LogTarget};
use crate::models::{
    Activity, ContainerSnapshot, ContainerStatus, LoadAvgPeriod, LoadAverage, LogLevel,
    NetworkGroup, Settings, SystemStats,
};

/// Shown in place of a metric once its channel crossed the failure threshold.
pub const ERROR_PLACEHOLDER: &str = "Error";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Status,
    Cpu,
    Memory,
    Created,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub settings: Settings,
    /// Post-filter, post-sort.
    pub containers: Vec<ContainerSnapshot>,
    pub total_containers: usize,
    pub running_containers: usize,
    /// Empty unless `groupByNetwork` is on.
    pub network_groups: Vec<NetworkGroup>,
    pub stats: Option<SystemStats>,
    pub health: Option<HealthReport>,
    pub stats_error: bool,
    pub containers_error: bool,
    pub cpu_display: String,
    pub memory_display: String,
    pub network_in_display: String,
    pub network_out_display: String,
    pub uptime_display: String,
    pub load_display: String,
    pub cpu_history: Vec<f64>,
    pub memory_history: Vec<f64>,
    pub network_history: Vec<f64>,
    pub activities: Vec<ActivityEntry>,
    pub badge: Badge,
    pub logs: Option<LogView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub activity: Activity,
    pub time_ago: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub target: LogTarget,
    pub level: LogLevel,
    pub following: bool,
    pub lines: Vec<LogViewLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogViewLine {
    pub source_id: String,
    pub line: String,
    /// Omitted when `showTimestamps` is off.
    pub timestamp: Option<String>,
    pub color: Option<&'static str>,
}

impl LogView {
    pub(crate) fn from_tail(tail: &LogTail, show_timestamps: bool) -> Self {
        let lines = tail
            .lines()
            .map(|l| LogViewLine {
                source_id: l.source_id.clone(),
                line: l.line.clone(),
                timestamp: if show_timestamps {
                    l.timestamp.clone()
                } else {
                    None
                },
                color: tail.color_for(&l.source_id),
            })
            .collect();
        Self {
            target: tail.target().clone(),
            level: tail.level(),
            following: tail.is_following(),
            lines,
        }
    }
}

pub fn filter_and_sort(
    containers: &[ContainerSnapshot],
    show_exited: bool,
    key: SortKey,
    order: SortOrder,
) -> Vec<ContainerSnapshot> {
    let mut out: Vec<ContainerSnapshot> = containers
        .iter()
        .filter(|c| show_exited || c.status != ContainerStatus::Exited)
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        let ord = compare(a, b, key).then_with(|| a.id.cmp(&b.id));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    out
}

fn compare(a: &ContainerSnapshot, b: &ContainerSnapshot, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a
            .display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase()),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
        SortKey::Memory => a.memory_usage_mb.total_cmp(&b.memory_usage_mb),
        SortKey::Created => a.created_at.cmp(&b.created_at),
    }
}

pub fn load_display(load: &LoadAverage, period: LoadAvgPeriod) -> String {
    match period {
        LoadAvgPeriod::OneMinute => format!("{:.2}", load.one),
        LoadAvgPeriod::FiveMinutes => format!("{:.2}", load.five),
        LoadAvgPeriod::FifteenMinutes => format!("{:.2}", load.fifteen),
        LoadAvgPeriod::All => format!("{:.2} / {:.2} / {:.2}", load.one, load.five, load.fifteen),
    }
}

/// `1.5 KB`, `0 B`; binary units up to GB.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}

pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(at).num_seconds().max(0);
    if secs < 60 {
        "Just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn container(id: &str, name: &str, status: &str, cpu: f64) -> ContainerSnapshot {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": name, "status": status, "cpu_percent": cpu,
        }))
        .unwrap()
    }

    #[test]
    fn hides_exited_and_sorts() {
        let list = vec![
            container("1", "web", "running", 5.0),
            container("2", "Cache", "exited", 0.0),
            container("3", "api", "running", 40.0),
        ];
        let names = |v: Vec<ContainerSnapshot>| v.into_iter().map(|c| c.name).collect::<Vec<_>>();

        assert_eq!(
            names(filter_and_sort(&list, true, SortKey::Name, SortOrder::Asc)),
            vec!["api", "Cache", "web"]
        );
        assert_eq!(
            names(filter_and_sort(&list, false, SortKey::Cpu, SortOrder::Desc)),
            vec!["api", "web"]
        );
    }

    #[test]
    fn load_per_period() {
        let load = LoadAverage {
            one: 1.0,
            five: 0.5,
            fifteen: 0.25,
        };
        assert_eq!(load_display(&load, LoadAvgPeriod::OneMinute), "1.00");
        assert_eq!(load_display(&load, LoadAvgPeriod::FifteenMinutes), "0.25");
        assert_eq!(load_display(&load, LoadAvgPeriod::All), "1.00 / 0.50 / 0.25");
    }

    #[test]
    fn human_formats() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
        assert_eq!(format_uptime(90_061), "1d 1h");
        assert_eq!(format_uptime(3_660), "1h 1m");
        assert_eq!(format_uptime(59), "0m");

        let now = Utc::now();
        assert_eq!(format_time_ago(now, now), "Just now");
        assert_eq!(format_time_ago(now - TimeDelta::minutes(5), now), "5m ago");
        assert_eq!(format_time_ago(now - TimeDelta::hours(3), now), "3h ago");
        assert_eq!(format_time_ago(now - TimeDelta::days(2), now), "2d ago");
    }
}
