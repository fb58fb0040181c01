//! Multai load balancer

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use super::{Nullable, Tag};
use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balancer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(
        rename = "dnsCNAMEAliases",
        default,
        skip_serializing_if = "Nullable::is_unset"
    )]
    pub dns_cname_aliases: Nullable<Vec<String>>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub timeouts: Nullable<Timeouts>,
    #[serde(default, skip_serializing_if = "Nullable::is_unset")]
    pub tags: Nullable<Vec<Tag>>,
}

impl RemoteObject for Balancer {}

impl ApiObject for Balancer {
    const PATH: &'static str = "/loadBalancer/balancer";
    const KEY: &'static str = "balancer";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draining: Option<i64>,
}
