//! Azure elastigroup (v3 API)

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
    pub resource_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

impl Group {
    pub fn capacity_mut(&mut self) -> &mut Capacity {
        self.capacity.get_or_insert_with(Capacity::default)
    }

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

    pub fn strategy_mut(&mut self) -> &mut Strategy {
        self.strategy.get_or_insert_with(Strategy::default)
    }

    pub fn launch_specification(&self) -> Option<&LaunchSpecification> {
        self.compute.as_ref()?.launch_specification.as_ref()
    }
}

impl RemoteObject for Group {
    fn scaffold() -> Self {
        Self {
            capacity: Some(Capacity::default()),
            compute: Some(Compute {
                vm_sizes: Some(VmSizes::default()),
                launch_specification: Some(LaunchSpecification::default()),
                ..Compute::default()
            }),
            strategy: Some(Strategy::default()),
            ..Self::default()
        }
    }
}

impl ApiObject for Group {
    const PATH: &'static str = "/azure/compute/group";
    const KEY: &'static str = "group";

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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<Login>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<MarketplaceImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub od_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_to_od: Option<bool>,
}
