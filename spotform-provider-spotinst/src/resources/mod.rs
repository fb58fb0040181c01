//! Resource type definitions
//!
//! Each submodule describes one resource type: its static configuration
//! (endpoint object, not-found code, retried create errors) and the field
//! registry that maps user attributes onto the vendor model.

pub mod elastigroup_aws;
pub mod elastigroup_aws_beanstalk;
pub mod elastigroup_azure_v3;
pub mod elastigroup_gcp;
pub mod health_check;
pub mod managed_instance_aws;
pub mod multai_balancer;
pub mod ocean_aks_virtual_node_group;
pub mod stateful_node_azure;

use std::collections::HashMap;

use spotform_core::field::RegistryError;
use spotform_core::schema::ResourceSchema;

use crate::client::ClientError;
use crate::provider::{ManagedResource, ResourceHandler};

/// Create error raised while a freshly created IAM instance profile is not
/// yet visible to EC2
pub const IAM_PROFILE_NOT_READY: RetryOn = RetryOn {
    code: "InvalidParameterValue",
    message: "Invalid IAM Instance Profile",
};

/// API error that makes a create call worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOn {
    pub code: &'static str,
    pub message: &'static str,
}

impl RetryOn {
    pub fn matches(&self, err: &ClientError) -> bool {
        err.matches(self.code, self.message)
    }
}

/// Static configuration of a resource type
#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    /// Type name used in configuration files (e.g., "spotinst_elastigroup_aws")
    pub type_name: &'static str,
    /// Object name used in log lines (e.g., "Group")
    pub label: &'static str,
    /// Error code the API answers with when the object does not exist
    pub not_found_code: &'static str,
    /// Create errors that are retried until the time budget runs out
    pub retry_on: Option<RetryOn>,
    pub description: &'static str,
}

// Modules after `custom:` provide their own `handler()` instead of a plain
// field registry
macro_rules! managed_resources {
    ($($module:ident),* $(,)?; custom: $($custom:ident),* $(,)?) => {
        /// Handlers for every resource type this provider manages
        pub(crate) fn handlers() -> Result<Vec<Box<dyn ResourceHandler>>, RegistryError> {
            Ok(vec![
                $(Box::new(ManagedResource::new($module::CONFIG, $module::fields()?)?),)*
                $($custom::handler()?,)*
            ])
        }

        /// Names of every resource type this provider manages
        pub fn type_names() -> Vec<&'static str> {
            vec![$($module::CONFIG.type_name,)* $($custom::CONFIG.type_name,)*]
        }
    };
}

managed_resources!(
    elastigroup_aws,
    elastigroup_gcp,
    elastigroup_azure_v3,
    health_check,
    managed_instance_aws,
    multai_balancer,
    ocean_aks_virtual_node_group,
    stateful_node_azure;
    custom: elastigroup_aws_beanstalk,
);

/// Schemas of every managed resource type, keyed by type name
///
/// Needs no credentials; used to validate configuration offline.
pub fn schemas() -> Result<HashMap<String, ResourceSchema>, RegistryError> {
    Ok(handlers()?
        .into_iter()
        .map(|handler| (handler.type_name().to_string(), handler.schema()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;

    #[test]
    fn every_registry_builds() {
        let handlers = handlers().unwrap();
        assert_eq!(handlers.len(), type_names().len());
        for (handler, name) in handlers.iter().zip(type_names()) {
            assert_eq!(handler.type_name(), name);
            assert!(!handler.schema().attributes.is_empty());
        }
    }

    #[test]
    fn schemas_cover_every_type() {
        let schemas = schemas().unwrap();
        for name in type_names() {
            assert_eq!(schemas[name].resource_type, name);
        }
    }

    #[test]
    fn iam_profile_errors_are_recognized() {
        let err = ClientError::Api {
            status: 400,
            errors: vec![ApiError {
                code: "InvalidParameterValue".to_string(),
                message: "Invalid IAM Instance Profile name: role-x".to_string(),
            }],
        };
        assert!(IAM_PROFILE_NOT_READY.matches(&err));
        assert!(!IAM_PROFILE_NOT_READY.matches(&ClientError::EmptyResponse));
    }
}
