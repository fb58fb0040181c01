//! GCP elastigroup

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use super::Capacity;
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<Scheduling>,
}

impl Group {
    pub fn capacity_mut(&mut self) -> &mut Capacity {
        self.capacity.get_or_insert_with(Capacity::default)
    }

    pub fn compute_mut(&mut self) -> &mut Compute {
        self.compute.get_or_insert_with(Compute::default)
    }

    pub fn strategy_mut(&mut self) -> &mut Strategy {
        self.strategy.get_or_insert_with(Strategy::default)
    }

    pub fn scheduling_mut(&mut self) -> &mut Scheduling {
        self.scheduling.get_or_insert_with(Scheduling::default)
    }
}

impl RemoteObject for Group {
    fn scaffold() -> Self {
        Self {
            capacity: Some(Capacity::default()),
            compute: Some(Compute::default()),
            strategy: Some(Strategy::default()),
            scheduling: Some(Scheduling::default()),
            ..Self::default()
        }
    }
}

impl ApiObject for Group {
    const PATH: &'static str = "/gcp/gce/group";
    const KEY: &'static str = "group";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Gpu>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_configs: Option<Vec<AccessConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_ip_ranges: Option<Vec<AliasIpRange>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasIpRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_cidr_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork_range_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preemptible_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_demand_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_to_od: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scheduling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
}
