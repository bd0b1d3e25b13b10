// Host health tier derived from one system stats sample.

use serde::Serialize;

use crate::models::SystemStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    Healthy,
    Warning,
    Critical,
}

impl HealthTier {
    /// CSS class used by the health indicator.
    pub fn css_class(&self) -> &'static str {
        match self {
            HealthTier::Healthy => "healthy",
            HealthTier::Warning => "warning",
            HealthTier::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            HealthTier::Healthy => "#22c55e",
            HealthTier::Warning => "#f59e0b",
            HealthTier::Critical => "#ef4444",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthTier::Healthy => "System Healthy",
            HealthTier::Warning => "System Moderate Load",
            HealthTier::Critical => "System Under Load",
        }
    }
}

/// Critical thresholds are checked first and win over warning thresholds.
pub fn classify(
    cpu_percent: f64,
    mem_percent: f64,
    disk_percent: f64,
    load_1min: f64,
    cpu_cores: u32,
) -> HealthTier {
    let cores = f64::from(cpu_cores);
    let critical =
        cpu_percent > 90.0 || mem_percent > 95.0 || disk_percent > 95.0 || load_1min > 2.0 * cores;
    if critical {
        HealthTier::Critical
    } else if cpu_percent > 75.0
        || mem_percent > 80.0
        || disk_percent > 85.0
        || load_1min > cores
    {
        HealthTier::Warning
    } else {
        HealthTier::Healthy
    }
}

/// Tier plus the metrics it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthReport {
    pub tier: HealthTier,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    pub load_1min: f64,
    pub cpu_cores: u32,
}

impl HealthReport {
    /// A host that reports no core count is treated as single-core.
    pub fn from_stats(stats: &SystemStats) -> Self {
        let cpu_cores = stats.cpu_cores.max(1);
        let tier = classify(
            stats.cpu_usage_percent,
            stats.memory.used_percent,
            stats.disk.used_percent,
            stats.load_average.one,
            cpu_cores,
        );
        Self {
            tier,
            cpu_percent: stats.cpu_usage_percent,
            mem_percent: stats.memory.used_percent,
            disk_percent: stats.disk.used_percent,
            load_1min: stats.load_average.one,
            cpu_cores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reference_points() {
        assert_eq!(classify(95.0, 0.0, 0.0, 0.0, 4), HealthTier::Critical);
        assert_eq!(classify(80.0, 0.0, 0.0, 0.0, 4), HealthTier::Warning);
        assert_eq!(classify(50.0, 50.0, 50.0, 1.0, 4), HealthTier::Healthy);
    }

    #[test]
    fn critical_dominates_warning() {
        assert_eq!(classify(80.0, 96.0, 0.0, 0.0, 4), HealthTier::Critical);
        assert_eq!(classify(0.0, 0.0, 90.0, 9.0, 4), HealthTier::Critical);
    }

    #[test]
    fn load_thresholds_scale_with_cores() {
        assert_eq!(classify(0.0, 0.0, 0.0, 4.0, 4), HealthTier::Healthy);
        assert_eq!(classify(0.0, 0.0, 0.0, 4.5, 4), HealthTier::Warning);
        assert_eq!(classify(0.0, 0.0, 0.0, 8.5, 4), HealthTier::Critical);
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(classify(90.0, 95.0, 95.0, 0.0, 4), HealthTier::Warning);
        assert_eq!(classify(75.0, 80.0, 85.0, 0.0, 4), HealthTier::Healthy);
    }

    #[test]
    fn report_from_stats_maps_critical_to_red() {
        let stats: SystemStats = serde_json::from_value(serde_json::json!({
            "cpu_usage_percent": 92,
            "cpu_cores": 4,
            "load_average": {"1min": 10, "5min": 8, "15min": 6}
        }))
        .unwrap();
        let report = HealthReport::from_stats(&stats);
        assert_eq!(report.tier, HealthTier::Critical);
        assert_eq!(report.tier.css_class(), "critical");
        assert_eq!(report.tier.color(), "#ef4444");
    }

    #[test]
    fn missing_core_count_counts_as_one() {
        let stats: SystemStats =
            serde_json::from_value(serde_json::json!({ "load_average": 0.5 })).unwrap();
        let report = HealthReport::from_stats(&stats);
        assert_eq!(report.cpu_cores, 1);
        assert_eq!(report.tier, HealthTier::Healthy);
    }
}
