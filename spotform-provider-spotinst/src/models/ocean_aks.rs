//! Ocean AKS virtual node group

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use super::Tag;
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNodeGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocean_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_specification: Option<LaunchSpecification>,
}

impl VirtualNodeGroup {
    pub fn launch_specification_mut(&mut self) -> &mut LaunchSpecification {
        self.launch_specification
            .get_or_insert_with(LaunchSpecification::default)
    }
}

impl RemoteObject for VirtualNodeGroup {
    fn scaffold() -> Self {
        Self {
            launch_specification: Some(LaunchSpecification::default()),
            ..Self::default()
        }
    }
}

impl ApiObject for VirtualNodeGroup {
    const PATH: &'static str = "/ocean/azure/np/virtualNodeGroup";
    const KEY: &'static str = "virtualNodeGroup";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<OsDisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(rename = "sizeGB", skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilize_ephemeral_storage: Option<bool>,
}
