//! AWS elastigroup

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use super::{Capacity, Nullable};
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub description: Nullable<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<Integration>,
}

impl Group {
    pub fn capacity_mut(&mut self) -> &mut Capacity {
        self.capacity.get_or_insert_with(Capacity::default)
    }

    pub fn compute_mut(&mut self) -> &mut Compute {
        self.compute.get_or_insert_with(Compute::default)
    }

    pub fn launch_specification_mut(&mut self) -> &mut LaunchSpecification {
        self.compute_mut()
            .launch_specification
            .get_or_insert_with(LaunchSpecification::default)
    }

    pub fn strategy_mut(&mut self) -> &mut Strategy {
        self.strategy.get_or_insert_with(Strategy::default)
    }

    pub fn launch_specification(&self) -> Option<&LaunchSpecification> {
        self.compute.as_ref()?.launch_specification.as_ref()
    }

    /// Load balancers currently attached, of every kind
    pub fn load_balancers(&self) -> &[LoadBalancer] {
        self.launch_specification()
            .and_then(|spec| spec.load_balancers_config.as_ref())
            .and_then(|config| config.load_balancers.as_deref())
            .unwrap_or_default()
    }

    pub fn set_load_balancers(&mut self, balancers: Vec<LoadBalancer>) {
        self.launch_specification_mut().load_balancers_config = Some(LoadBalancersConfig {
            load_balancers: Some(balancers),
        });
    }
}

impl RemoteObject for Group {
    fn scaffold() -> Self {
        Self {
            capacity: Some(Capacity::default()),
            compute: Some(Compute {
                launch_specification: Some(LaunchSpecification::default()),
                ..Compute::default()
            }),
            strategy: Some(Strategy::default()),
            ..Self::default()
        }
    }
}

impl ApiObject for Group {
    const PATH: &'static str = "/aws/ec2/group";
    const KEY: &'static str = "group";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<AvailabilityZone>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub elastic_ips: Nullable<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_specification: Option<LaunchSpecification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_group_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_grace_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_unhealthy_duration_before_replacement: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancers_config: Option<LoadBalancersConfig>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub tags: Nullable<Vec<GroupTag>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancers: Option<Vec<LoadBalancer>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_set_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    /// Spot percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub on_demand_count: Nullable<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_vs_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilize_reserved_instances: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_to_od: Option<bool>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub revert_to_spot: Nullable<RevertToSpot>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub signals: Nullable<Vec<Signal>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertToSpot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perform_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_windows: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub route53: Nullable<Route53Integration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route53Integration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<Domain>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotinst_acct_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_set_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_sets: Option<Vec<RecordSet>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_public_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_public_dns: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_and_skips_unset() {
        let mut group = Group::default();
        group.name = Some("eg-test".to_string());
        group.capacity_mut().minimum = Some(0);
        group.strategy_mut().fallback_to_od = Some(true);

        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "name": "eg-test",
                "capacity": {"minimum": 0},
                "strategy": {"fallbackToOd": true}
            })
        );
    }

    #[test]
    fn load_balancers_round_trip_through_json() {
        let group: Group = serde_json::from_value(json!({
            "id": "sig-1",
            "compute": {"launchSpecification": {"loadBalancersConfig": {"loadBalancers": [
                {"type": "CLASSIC", "name": "elb-1"},
                {"type": "MULTAI_TARGET_SET", "balancerId": "b-1", "targetSetId": "ts-1"}
            ]}}}
        }))
        .unwrap();

        assert_eq!(group.id(), Some("sig-1"));
        assert_eq!(group.load_balancers().len(), 2);
        assert_eq!(group.load_balancers()[1].target_set_id.as_deref(), Some("ts-1"));
    }

    #[test]
    fn cleared_fields_serialize_as_null() {
        let mut group = Group::default();
        group.description = Nullable::Null;
        group.compute_mut().elastic_ips = Nullable::Null;
        group.launch_specification_mut().tags = Nullable::Null;
        group.strategy_mut().signals = Nullable::Null;

        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "description": null,
                "compute": {"elasticIps": null, "launchSpecification": {"tags": null}},
                "strategy": {"signals": null}
            })
        );
    }
}
