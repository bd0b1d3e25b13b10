// User settings persisted under `{namespace}-settings` (JSON, camelCase)

use serde::{Deserialize, Serialize};

use super::LogLevel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadAvgPeriod {
    #[default]
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "all")]
    All,
}

/// Missing fields take their defaults, so older stored objects merge cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub show_exited: bool,
    pub show_timestamps: bool,
    pub auto_refresh_logs: bool,
    pub log_level: LogLevel,
    /// Seconds; sent to the system channel in the subscribe handshake.
    pub refresh_interval: u32,
    pub chart_points: usize,
    pub group_by_network: bool,
    pub load_avg_period: LoadAvgPeriod,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_exited: true,
            show_timestamps: true,
            auto_refresh_logs: false,
            log_level: LogLevel::All,
            refresh_interval: 10,
            chart_points: 50,
            group_by_network: true,
            load_avg_period: LoadAvgPeriod::OneMinute,
        }
    }
}

impl Settings {
    /// Clamps values the UI could have stored out of range.
    pub fn normalized(mut self) -> Self {
        self.refresh_interval = self.refresh_interval.max(1);
        self.chart_points = self.chart_points.max(2);
        self
    }
}
