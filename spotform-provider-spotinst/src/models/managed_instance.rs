//! AWS managed instance

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<Persistence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
}

impl ManagedInstance {
    pub fn persistence_mut(&mut self) -> &mut Persistence {
        self.persistence.get_or_insert_with(Persistence::default)
    }

    pub fn health_check_mut(&mut self) -> &mut HealthCheck {
        self.health_check.get_or_insert_with(HealthCheck::default)
    }

    pub fn compute_mut(&mut self) -> &mut Compute {
        self.compute.get_or_insert_with(Compute::default)
    }

    pub fn launch_specification_mut(&mut self) -> &mut LaunchSpecification {
        self.compute_mut()
            .launch_specification
            .get_or_insert_with(LaunchSpecification::default)
    }

    pub fn instance_types_mut(&mut self) -> &mut InstanceTypes {
        self.launch_specification_mut()
            .instance_types
            .get_or_insert_with(InstanceTypes::default)
    }

    pub fn launch_specification(&self) -> Option<&LaunchSpecification> {
        self.compute.as_ref()?.launch_specification.as_ref()
    }

    pub fn instance_types(&self) -> Option<&InstanceTypes> {
        self.launch_specification()?.instance_types.as_ref()
    }
}

impl RemoteObject for ManagedInstance {
    fn scaffold() -> Self {
        Self {
            persistence: Some(Persistence::default()),
            health_check: Some(HealthCheck::default()),
            compute: Some(Compute {
                launch_specification: Some(LaunchSpecification {
                    instance_types: Some(InstanceTypes::default()),
                    ..LaunchSpecification::default()
                }),
                ..Compute::default()
            }),
            ..Self::default()
        }
    }
}

impl ApiObject for ManagedInstance {
    const PATH: &'static str = "/aws/ec2/managedInstance";
    const KEY: &'static str = "managedInstance";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_block_devices: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_root_device: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_private_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_devices_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_healing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_duration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_specification: Option<LaunchSpecification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_types: Option<InstanceTypes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTypes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associate_public_ip_address: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associate_ipv6_address: Option<bool>,
}
