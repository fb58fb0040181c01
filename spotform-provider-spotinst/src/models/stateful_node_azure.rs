//! Azure stateful node
//!
//! A single virtual machine whose disks, network and identity survive spot
//! interruptions. The network block mirrors the Azure NIC layout: one
//! primary interface plus any secondary ones, each in a subnet of the same
//! virtual network.

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use super::Nullable;
use super::elastigroup_azure::Login;
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub description: Nullable<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<Persistence>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub health: Nullable<Health>,
}

impl StatefulNode {
    pub fn compute_mut(&mut self) -> &mut Compute {
        self.compute.get_or_insert_with(Compute::default)
    }

    pub fn vm_sizes_mut(&mut self) -> &mut VmSizes {
        self.compute_mut().vm_sizes.get_or_insert_with(VmSizes::default)
    }

    pub fn launch_specification_mut(&mut self) -> &mut LaunchSpecification {
        self.compute_mut()
            .launch_specification
            .get_or_insert_with(LaunchSpecification::default)
    }

    pub fn persistence_mut(&mut self) -> &mut Persistence {
        self.persistence.get_or_insert_with(Persistence::default)
    }

    pub fn vm_sizes(&self) -> Option<&VmSizes> {
        self.compute.as_ref()?.vm_sizes.as_ref()
    }

    pub fn launch_specification(&self) -> Option<&LaunchSpecification> {
        self.compute.as_ref()?.launch_specification.as_ref()
    }
}

impl RemoteObject for StatefulNode {}

impl ApiObject for StatefulNode {
    const PATH: &'static str = "/azure/compute/statefulNode";
    const KEY: &'static str = "statefulNode";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_sizes: Option<VmSizes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_specification: Option<LaunchSpecification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSizes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub od_sizes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub preferred_spot_sizes: Nullable<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<Login>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<NetworkInterface>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<ResourceRef>,
    #[serde(
        rename = "enableIPForwarding",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_ip_forwarding: Option<bool>,
    #[serde(
        rename = "privateIPAddresses",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_addresses: Option<Vec<String>>,
    #[serde(
        rename = "additionalIPConfigurations",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_ip_configurations: Option<Vec<AdditionalIpConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ips: Option<Vec<ResourceRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_security_groups: Option<Vec<ResourceRef>>,
}

/// Azure resource addressed by name within a resource group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalIpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "privateIPAddressVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_persist_os_disk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk_persistence_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_persist_data_disks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_disks_persistence_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_persist_network: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_persist_vm: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_healing: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn network_uses_azure_field_names() {
        let wire = json!({
            "virtualNetworkName": "vnet-1",
            "resourceGroupName": "rg-net",
            "networkInterfaces": [{
                "subnetName": "default",
                "isPrimary": true,
                "assignPublicIp": true,
                "publicIpSku": "Standard",
                "enableIPForwarding": false,
                "privateIPAddresses": ["10.0.0.4"],
                "additionalIPConfigurations": [{"name": "ipc-2", "privateIPAddressVersion": "IPv4"}],
                "publicIps": [{"name": "pip-1", "resourceGroupName": "rg-net"}],
                "networkSecurityGroup": {"name": "nsg-1", "resourceGroupName": "rg-net"}
            }]
        });

        let network: Network = serde_json::from_value(wire.clone()).unwrap();
        let nic = &network.network_interfaces.as_ref().unwrap()[0];
        assert_eq!(nic.private_ip_addresses, Some(vec!["10.0.0.4".to_string()]));
        assert_eq!(
            nic.additional_ip_configurations.as_ref().unwrap()[0]
                .private_ip_address_version
                .as_deref(),
            Some("IPv4")
        );
        assert_eq!(serde_json::to_value(&network).unwrap(), wire);
    }
}
