//! Health check

use serde::{Deserialize, Serialize};
use spotform_core::wrapper::RemoteObject;

use crate::client::ApiObject;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<Check>,
}

impl HealthCheck {
    pub fn check_mut(&mut self) -> &mut Check {
        self.check.get_or_insert_with(Check::default)
    }
}

impl RemoteObject for HealthCheck {
    fn scaffold() -> Self {
        Self {
            check: Some(Check::default()),
            ..Self::default()
        }
    }
}

impl ApiObject for HealthCheck {
    const PATH: &'static str = "/healthCheck";
    const KEY: &'static str = "healthCheck";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy: Option<i64>,
}
