//! AWS elastigroup imported from an Elastic Beanstalk environment
//!
//! The group definition comes from the import endpoint and is submitted
//! back almost untouched, so every part of it not modeled here is kept in
//! `other` and serialized as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spotform_core::wrapper::RemoteObject;

use super::{Capacity, Nullable};
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeanstalkGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute: Option<Compute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<Integration>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl BeanstalkGroup {
    pub fn capacity_mut(&mut self) -> &mut Capacity {
        self.capacity.get_or_insert_with(Capacity::default)
    }

    pub fn compute_mut(&mut self) -> &mut Compute {
        self.compute.get_or_insert_with(Compute::default)
    }

    pub fn instance_types_mut(&mut self) -> &mut InstanceTypes {
        self.compute_mut()
            .instance_types
            .get_or_insert_with(InstanceTypes::default)
    }

    pub fn elastic_beanstalk_mut(&mut self) -> &mut ElasticBeanstalk {
        self.integration
            .get_or_insert_with(Integration::default)
            .elastic_beanstalk
            .get_or_insert_with(ElasticBeanstalk::default)
    }

    pub fn elastic_beanstalk(&self) -> Option<&ElasticBeanstalk> {
        self.integration.as_ref()?.elastic_beanstalk.as_ref()
    }
}

impl RemoteObject for BeanstalkGroup {}

impl ApiObject for BeanstalkGroup {
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
    pub instance_types: Option<InstanceTypes>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ondemand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_beanstalk: Option<ElasticBeanstalk>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticBeanstalk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub managed_actions: Nullable<ManagedActions>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedActions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_update: Option<PlatformUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perform_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_level: Option<String>,
}

/// Maintenance state of a beanstalk group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStatus {
    /// Serving traffic; maintenance can start
    Active,
    /// In maintenance, waiting for the user to finish it
    AwaitUserUpdate,
    /// Any state in between; start and finish have to wait
    Transitional(String),
}

impl MaintenanceStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "ACTIVE" => MaintenanceStatus::Active,
            "AWAIT_USER_UPDATE" => MaintenanceStatus::AwaitUserUpdate,
            other => MaintenanceStatus::Transitional(other.to_string()),
        }
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintenanceStatus::Active => write!(f, "ACTIVE"),
            MaintenanceStatus::AwaitUserUpdate => write!(f, "AWAIT_USER_UPDATE"),
            MaintenanceStatus::Transitional(status) => write!(f, "{}", status),
        }
    }
}
