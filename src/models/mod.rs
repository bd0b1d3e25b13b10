// Domain models and wire schemas, validated at the boundary

mod activity;
mod container;
mod log;
mod network;
mod settings;
mod system;
mod wire;

use serde::{Deserialize, Deserializer};

pub use activity::{Activity, ActivityKind, NotificationState};
pub use container::{ContainerAction, ContainerSnapshot, ContainerStatus, abbreviate_id};
pub use log::{LogLevel, LogLine};
pub use network::{
    DEFAULT_NETWORK, NetworkGroup, NetworkInfo, NetworkMap, NetworkMember, group_by_network,
};
pub use settings::{LoadAvgPeriod, Settings};
pub use system::{DiskStats, LoadAverage, MemoryStats, NetworkCounters, SystemStats};
pub use wire::{Handshake, LogPayload, StreamPayload};

/// Treats an explicit `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
