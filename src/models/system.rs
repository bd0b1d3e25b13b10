// Host stats as published by /api/system-stats and the system channel.
// Missing or null numbers default to 0, missing objects to empty.

use serde::{Deserialize, Deserializer, Serialize};

use super::nullable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    #[serde(default, deserialize_with = "nullable")]
    pub used_percent: f64,
    /// GB in use.
    #[serde(default, deserialize_with = "nullable")]
    pub used_memory: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_gb: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub available_gb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    #[serde(default, deserialize_with = "nullable")]
    pub used_gb: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_gb: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub used_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub free_gb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    #[serde(default, deserialize_with = "nullable")]
    pub bytes_recv: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub bytes_sent: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub packets_recv: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub packets_sent: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAverage {
    #[serde(rename = "1min")]
    pub one: f64,
    #[serde(rename = "5min")]
    pub five: f64,
    #[serde(rename = "15min")]
    pub fifteen: f64,
}

/// Older hosts publish only the 1-minute figure as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoadAverageWire {
    Single(f64),
    Periods {
        #[serde(rename = "1min", default, deserialize_with = "nullable")]
        one: f64,
        #[serde(rename = "5min", default, deserialize_with = "nullable")]
        five: f64,
        #[serde(rename = "15min", default, deserialize_with = "nullable")]
        fifteen: f64,
    },
}

impl<'de> Deserialize<'de> for LoadAverage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Option::<LoadAverageWire>::deserialize(deserializer)?;
        Ok(match wire {
            None => LoadAverage::default(),
            Some(LoadAverageWire::Single(one)) => LoadAverage {
                one,
                five: 0.0,
                fifteen: 0.0,
            },
            Some(LoadAverageWire::Periods { one, five, fifteen }) => {
                LoadAverage { one, five, fifteen }
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_usage_percent: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_cores: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub memory: MemoryStats,
    #[serde(default, deserialize_with = "nullable")]
    pub network: NetworkCounters,
    #[serde(default, deserialize_with = "nullable")]
    pub disk: DiskStats,
    #[serde(default, deserialize_with = "nullable")]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub load_average: LoadAverage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl SystemStats {
    /// Combined rx + tx byte counter plotted on the network chart.
    pub fn network_total_bytes(&self) -> u64 {
        self.network.bytes_recv.saturating_add(self.network.bytes_sent)
    }
}
