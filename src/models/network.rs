// Docker network models and the per-batch grouping projection

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{ContainerSnapshot, ContainerStatus, nullable};

/// Network used when a container reports no attachment.
pub const DEFAULT_NETWORK: &str = "bridge";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMember {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ContainerStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub ip_address: String,
}

/// One entry of the `/api/networks` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub driver: String,
    #[serde(default, deserialize_with = "nullable")]
    pub scope: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subnet: String,
    #[serde(default, deserialize_with = "nullable")]
    pub containers: Vec<NetworkMember>,
}

pub type NetworkMap = BTreeMap<String, NetworkInfo>;

/// Read-only projection: containers of the current batch attached to one network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkGroup {
    pub name: String,
    pub containers: Vec<ContainerSnapshot>,
}

/// Groups `containers` by network. Membership comes from `networks` when the host
/// published it; otherwise from each container's own attachment list, falling back
/// to [`DEFAULT_NETWORK`]. Empty groups are omitted; output is ordered by name.
pub fn group_by_network(
    containers: &[ContainerSnapshot],
    networks: Option<&NetworkMap>,
) -> Vec<NetworkGroup> {
    let mut groups: BTreeMap<String, Vec<ContainerSnapshot>> = BTreeMap::new();
    for container in containers {
        let mut names: Vec<&str> = Vec::new();
        if let Some(map) = networks {
            for (key, info) in map {
                if info.containers.iter().any(|m| m.id == container.id) {
                    names.push(key.as_str());
                }
            }
        }
        if names.is_empty() {
            names.extend(container.networks.iter().map(String::as_str));
        }
        if names.is_empty() {
            names.push(DEFAULT_NETWORK);
        }
        let mut seen = HashSet::new();
        for name in names {
            if seen.insert(name) {
                groups
                    .entry(name.to_string())
                    .or_default()
                    .push(container.clone());
            }
        }
    }
    groups
        .into_iter()
        .map(|(name, containers)| NetworkGroup { name, containers })
        .collect()
}
