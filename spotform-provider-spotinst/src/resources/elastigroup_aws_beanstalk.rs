//! spotinst_elastigroup_aws_beanstalk
//!
//! AWS elastigroup that takes over the instances of an Elastic Beanstalk
//! environment. Create imports the group definition from the environment
//! and submits it with the configured overrides. Updates first move the
//! group into or out of maintenance when `maintenance` changed.

use async_trait::async_trait;
use log::{debug, info, warn};
use spotform_core::data::ResourceData;
use spotform_core::expand::{BlockBuilder, block, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::provider::{ProviderError, ProviderResult};
use spotform_core::resource::{Resource, ResourceId, State, Value};
use spotform_core::retry::{RetryError, RetryPolicy, retry};
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};
use spotform_core::wrapper::Handle;

use super::{IAM_PROFILE_NOT_READY, ResourceConfig};
use crate::client::{ApiObject, ClientError, SpotinstClient, first_item};
use crate::models::Nullable;
use crate::models::elastigroup_aws_beanstalk::{
    BeanstalkGroup, MaintenanceStatus, ManagedActions, PlatformUpdate,
};
use crate::provider::{ManagedResource, ResourceHandler};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_elastigroup_aws_beanstalk",
    label: "Beanstalk group",
    not_found_code: "GROUP_DOESNT_EXIST",
    retry_on: Some(IAM_PROFILE_NOT_READY),
    description: "Elastigroup managing the instances of an Elastic Beanstalk environment",
};

const AFFINITY: &str = "elastigroup_aws_beanstalk";

pub const NAME: &str = "name";
pub const REGION: &str = "region";
pub const PRODUCT: &str = "product";
pub const MIN_SIZE: &str = "min_size";
pub const MAX_SIZE: &str = "max_size";
pub const DESIRED_CAPACITY: &str = "desired_capacity";
pub const BEANSTALK_ENVIRONMENT_NAME: &str = "beanstalk_environment_name";
pub const BEANSTALK_ENVIRONMENT_ID: &str = "beanstalk_environment_id";
pub const INSTANCE_TYPES_SPOT: &str = "instance_types_spot";
pub const MAINTENANCE: &str = "maintenance";
pub const MANAGED_ACTIONS: &str = "managed_actions";

const PLATFORM_UPDATE: &str = "platform_update";
const PERFORM_AT: &str = "perform_at";
const TIME_WINDOW: &str = "time_window";
const UPDATE_LEVEL: &str = "update_level";

const IMPORT_PATH: &str = "/aws/ec2/group/beanstalk/import";

pub fn fields() -> Result<FieldRegistry<BeanstalkGroup>, RegistryError> {
    let mut fields = FieldRegistry::new();

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(NAME, AttributeType::String).required())
            .on_read(|group: &BeanstalkGroup, data| {
                data.set_opt(NAME, group.name.clone());
                Ok(())
            })
            .on_create(write_name)
            .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(REGION, AttributeType::String)
                .required()
                .force_new(),
        )
        .on_read(|group: &BeanstalkGroup, data| {
            data.set_opt(REGION, group.region.clone());
            Ok(())
        })
        .on_create(|group, data| {
            if let Some(region) = data.get_string(REGION)? {
                group.region = Some(region);
            }
            Ok(())
        }),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(PRODUCT, AttributeType::String).required())
            .on_read(|group: &BeanstalkGroup, data| {
                let product = group.compute.as_ref().and_then(|c| c.product.clone());
                data.set_opt(PRODUCT, product);
                Ok(())
            })
            .on_create(|group, data| {
                if let Some(product) = data.get_string(PRODUCT)? {
                    group.compute_mut().product = Some(product);
                }
                Ok(())
            })
            .on_update(|_, _| Err(FieldError::update_not_allowed(PRODUCT))),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(MIN_SIZE, types::non_negative_int()))
            .on_read(|group: &BeanstalkGroup, data| {
                data.set_opt(MIN_SIZE, group.capacity.as_ref().and_then(|c| c.minimum));
                Ok(())
            })
            .on_create(write_min_size)
            .on_update(write_min_size),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(MAX_SIZE, types::non_negative_int()))
            .on_read(|group: &BeanstalkGroup, data| {
                data.set_opt(MAX_SIZE, group.capacity.as_ref().and_then(|c| c.maximum));
                Ok(())
            })
            .on_create(write_max_size)
            .on_update(write_max_size),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(DESIRED_CAPACITY, types::non_negative_int()),
        )
        .on_read(|group: &BeanstalkGroup, data| {
            data.set_opt(DESIRED_CAPACITY, group.capacity.as_ref().and_then(|c| c.target));
            Ok(())
        })
        .on_create(write_desired_capacity)
        .on_update(write_desired_capacity),
    )?;

    // Environment selectors only feed the import call; the API never echoes the name
    fields.register(FieldDescriptor::new(
        AFFINITY,
        AttributeSchema::new(BEANSTALK_ENVIRONMENT_NAME, AttributeType::String)
            .force_new()
            .write_only()
            .conflicts_with(BEANSTALK_ENVIRONMENT_ID),
    ))?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(BEANSTALK_ENVIRONMENT_ID, AttributeType::String)
                .force_new()
                .write_only()
                .conflicts_with(BEANSTALK_ENVIRONMENT_NAME),
        )
        .on_read(|group: &BeanstalkGroup, data| {
            let environment = group
                .elastic_beanstalk()
                .and_then(|eb| eb.environment_id.clone());
            data.set_opt(BEANSTALK_ENVIRONMENT_ID, environment);
            Ok(())
        }),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(INSTANCE_TYPES_SPOT, types::string_list()).required(),
        )
        .on_read(|group: &BeanstalkGroup, data| {
            let spot = group
                .compute
                .as_ref()
                .and_then(|c| c.instance_types.as_ref())
                .and_then(|types| types.spot.clone());
            data.set_opt(INSTANCE_TYPES_SPOT, spot);
            Ok(())
        })
        .on_create(write_instance_types_spot)
        .on_update(write_instance_types_spot),
    )?;

    // Resolved by the handler around the update call
    fields.register(FieldDescriptor::new(
        AFFINITY,
        AttributeSchema::new(MAINTENANCE, types::one_of(&["START", "END"])),
    ))?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                MANAGED_ACTIONS,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(
                                PLATFORM_UPDATE,
                                AttributeType::Block(
                                    BlockSchema::new()
                                        .attribute(
                                            AttributeSchema::new(
                                                PERFORM_AT,
                                                types::one_of(&["never", "timeWindow"]),
                                            )
                                            .required(),
                                        )
                                        .attribute(AttributeSchema::new(
                                            TIME_WINDOW,
                                            AttributeType::String,
                                        ))
                                        .attribute(AttributeSchema::new(
                                            UPDATE_LEVEL,
                                            types::one_of(&["minorAndPatch", "patch"]),
                                        ))
                                        .max_items(1),
                                ),
                            )
                            .required(),
                        )
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &BeanstalkGroup, data| {
            let entry = group
                .elastic_beanstalk()
                .and_then(|eb| eb.managed_actions.as_ref())
                .map(flatten_managed_actions);
            data.set_opt(MANAGED_ACTIONS, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_managed_actions)
        .on_update(write_managed_actions),
    )?;

    Ok(fields)
}

fn write_name(group: &mut Handle<BeanstalkGroup>, data: &ResourceData) -> FieldResult<()> {
    if let Some(name) = data.get_string(NAME)? {
        group.name = Some(name);
    }
    Ok(())
}

fn write_min_size(group: &mut Handle<BeanstalkGroup>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(MIN_SIZE)? {
        group.capacity_mut().minimum = Some(v);
    }
    Ok(())
}

fn write_max_size(group: &mut Handle<BeanstalkGroup>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(MAX_SIZE)? {
        group.capacity_mut().maximum = Some(v);
    }
    Ok(())
}

fn write_desired_capacity(
    group: &mut Handle<BeanstalkGroup>,
    data: &ResourceData,
) -> FieldResult<()> {
    if let Some(v) = data.get_int(DESIRED_CAPACITY)? {
        group.capacity_mut().target = Some(v);
    }
    Ok(())
}

fn write_instance_types_spot(
    group: &mut Handle<BeanstalkGroup>,
    data: &ResourceData,
) -> FieldResult<()> {
    if let Some(spot) = data.get_strings(INSTANCE_TYPES_SPOT)?.filter(|s| !s.is_empty()) {
        group.instance_types_mut().spot = Some(spot);
    }
    Ok(())
}

fn write_managed_actions(
    group: &mut Handle<BeanstalkGroup>,
    data: &ResourceData,
) -> FieldResult<()> {
    let actions = block(data, MANAGED_ACTIONS)?
        .map(|entry| -> FieldResult<ManagedActions> {
            let platform_update = entry
                .block(PLATFORM_UPDATE)
                .ok_or_else(|| FieldError::missing(MANAGED_ACTIONS, PLATFORM_UPDATE))?;
            Ok(ManagedActions {
                platform_update: Some(PlatformUpdate {
                    perform_at: platform_update.string(PERFORM_AT),
                    time_window: platform_update.string(TIME_WINDOW),
                    update_level: platform_update.string(UPDATE_LEVEL),
                }),
            })
        })
        .transpose()?;

    let actions = Nullable::new(actions, data.is_removed(MANAGED_ACTIONS));
    if !actions.is_unset() {
        group.elastic_beanstalk_mut().managed_actions = actions;
    }
    Ok(())
}

fn flatten_managed_actions(actions: &ManagedActions) -> Value {
    let platform_update = actions.platform_update.as_ref().map(|update| {
        BlockBuilder::new()
            .set(PERFORM_AT, update.perform_at.clone())
            .set(TIME_WINDOW, update.time_window.clone())
            .set(UPDATE_LEVEL, update.update_level.clone())
            .build()
    });
    BlockBuilder::new()
        .nested(PLATFORM_UPDATE, platform_update.into_iter().collect())
        .build()
}

// =============================================================================
// Handler
// =============================================================================

/// Requested maintenance transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Maintenance {
    Start,
    End,
}

impl Maintenance {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "START" => Some(Maintenance::Start),
            "END" => Some(Maintenance::End),
            _ => None,
        }
    }

    /// Value reported for a group in `status`; transitional states report nothing
    fn reported(status: &MaintenanceStatus) -> Option<&'static str> {
        match status {
            MaintenanceStatus::Active => Some("END"),
            MaintenanceStatus::AwaitUserUpdate => Some("START"),
            MaintenanceStatus::Transitional(_) => None,
        }
    }

    fn action(self) -> &'static str {
        match self {
            Maintenance::Start => "start",
            Maintenance::End => "finish",
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum MaintenanceError {
    #[error("unable to start maintenance, already in maintenance mode")]
    AlreadyStarted,

    #[error("unable to end maintenance, the group is already active")]
    AlreadyActive,

    #[error("group status is {0}")]
    Pending(MaintenanceStatus),

    #[error(transparent)]
    Client(#[from] ClientError),
}

fn item_path(identifier: &str, suffix: &str) -> String {
    format!("{}/{}/beanstalk/{}", BeanstalkGroup::PATH, identifier, suffix)
}

async fn maintenance_status(
    client: &SpotinstClient,
    identifier: &str,
) -> Result<MaintenanceStatus, ClientError> {
    let items = client.get(&item_path(identifier, "status"), &[]).await?;
    items
        .iter()
        .find_map(|item| {
            item.as_str()
                .or_else(|| item.get("status").and_then(serde_json::Value::as_str))
        })
        .map(MaintenanceStatus::parse)
        .ok_or(ClientError::EmptyResponse)
}

/// Beanstalk groups are plain AWS groups with an import step on create and
/// maintenance handling on update
pub(crate) struct BeanstalkHandler {
    group: ManagedResource<BeanstalkGroup>,
}

pub(crate) fn handler() -> Result<Box<dyn ResourceHandler>, RegistryError> {
    Ok(Box::new(BeanstalkHandler {
        group: ManagedResource::new(CONFIG, fields()?)?,
    }))
}

impl BeanstalkHandler {
    /// Group definition derived from the environment named in `resource`
    async fn import(
        &self,
        client: &SpotinstClient,
        resource: &Resource,
    ) -> ProviderResult<BeanstalkGroup> {
        let id = &resource.id;
        let attribute = |key: &str| {
            resource
                .attributes
                .get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
        };

        let environment = match (
            attribute(BEANSTALK_ENVIRONMENT_ID),
            attribute(BEANSTALK_ENVIRONMENT_NAME),
        ) {
            (Some(environment_id), _) => ("environmentId", environment_id),
            (None, Some(environment_name)) => ("environmentName", environment_name),
            (None, None) => {
                return Err(ProviderError::new(format!(
                    "one of {} or {} is required",
                    BEANSTALK_ENVIRONMENT_ID, BEANSTALK_ENVIRONMENT_NAME
                ))
                .for_resource(id.clone()));
            }
        };
        let region = attribute(REGION).unwrap_or_default();
        debug!("===> Beanstalk import: {}={} in {}", environment.0, environment.1, region);

        let missing = || {
            ProviderError::new("failed to import group, does the Beanstalk environment exist?")
                .for_resource(id.clone())
        };
        let items = match client
            .get(IMPORT_PATH, &[environment, ("region", region)])
            .await
        {
            Ok(items) => items,
            Err(e) if self.group.is_not_found(&e) => return Err(missing().with_cause(e)),
            Err(e) => return Err(self.group.client_error(id, "import", e)),
        };
        first_item(items).map_err(|e| missing().with_cause(e))
    }

    async fn toggle_maintenance(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        id: &ResourceId,
        identifier: &str,
        maintenance: Maintenance,
    ) -> ProviderResult<()> {
        retry(policy, || async move {
            let status = match maintenance_status(client, identifier).await {
                Ok(status) => status,
                Err(e) => return Err(RetryError::NonRetryable(MaintenanceError::from(e))),
            };

            match (maintenance, status) {
                (Maintenance::Start, MaintenanceStatus::AwaitUserUpdate) => {
                    Err(RetryError::NonRetryable(MaintenanceError::AlreadyStarted))
                }
                (Maintenance::End, MaintenanceStatus::Active) => {
                    Err(RetryError::NonRetryable(MaintenanceError::AlreadyActive))
                }
                (_, MaintenanceStatus::Transitional(status)) => Err(RetryError::Retryable(
                    MaintenanceError::Pending(MaintenanceStatus::Transitional(status)),
                )),
                (maintenance, _) => {
                    let path = item_path(identifier, &format!("maintenance/{}", maintenance.action()));
                    if let Err(e) = client.put(&path).await {
                        return Err(RetryError::NonRetryable(MaintenanceError::from(e)));
                    }
                    info!(
                        "Beanstalk group {} maintenance {} requested",
                        identifier,
                        maintenance.action()
                    );
                    Ok(())
                }
            }
        })
        .await
        .map_err(|e| {
            ProviderError::new("failed to resolve beanstalk maintenance mode")
                .for_resource(id.clone())
                .with_cause(e)
        })
    }
}

#[async_trait]
impl ResourceHandler for BeanstalkHandler {
    fn type_name(&self) -> &'static str {
        CONFIG.type_name
    }

    fn schema(&self) -> ResourceSchema {
        self.group.schema()
    }

    async fn read(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let mut state = self.group.read(client, id, identifier).await?;
        if !state.exists {
            return Ok(state);
        }

        match maintenance_status(client, identifier).await {
            Ok(status) => {
                debug!("===> Beanstalk maintenance status of {}: {}", identifier, status);
                if let Some(reported) = Maintenance::reported(&status) {
                    state
                        .attributes
                        .insert(MAINTENANCE.to_string(), Value::from(reported));
                }
            }
            Err(e) => warn!("failed to read maintenance status of {}: {}", identifier, e),
        }
        Ok(state)
    }

    async fn create(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        resource: &Resource,
    ) -> ProviderResult<State> {
        self.group.validate(&resource.id, &resource.attributes)?;
        let imported = self.import(client, resource).await?;
        self.group
            .create_from(client, policy, resource, Some(imported))
            .await
    }

    async fn update(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let object = self.group.build_update(id, identifier, from, to)?;

        let requested = to.attributes.get(MAINTENANCE).and_then(Value::as_str);
        let reported = from.attributes.get(MAINTENANCE).and_then(Value::as_str);
        if let Some(maintenance) = requested
            .filter(|r| Some(*r) != reported)
            .and_then(Maintenance::parse)
        {
            self.toggle_maintenance(client, policy, id, identifier, maintenance)
                .await?;
        }

        if let Some(object) = object {
            self.group.send_update(client, id, identifier, &object).await?;
        }
        self.read(client, id, identifier).await
    }

    async fn delete(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        self.group.delete(client, id, identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::wrapper::ResourceWrapper;
    use std::collections::HashMap;

    fn wrapper() -> ResourceWrapper<BeanstalkGroup> {
        ResourceWrapper::new(CONFIG.type_name, fields().unwrap()).unwrap()
    }

    fn platform_update(perform_at: &str) -> Value {
        let update = BlockBuilder::new()
            .set(PERFORM_AT, Some(perform_at))
            .set(TIME_WINDOW, Some("Mon:23:50-Tue:00:20"))
            .set(UPDATE_LEVEL, Some("minorAndPatch"))
            .build();
        Value::List(vec![
            BlockBuilder::new()
                .nested(PLATFORM_UPDATE, vec![update])
                .build(),
        ])
    }

    fn config() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("web-eg"));
        attrs.insert(REGION.to_string(), Value::from("us-west-2"));
        attrs.insert(PRODUCT.to_string(), Value::from("Linux/UNIX"));
        attrs.insert(MIN_SIZE.to_string(), Value::Int(1));
        attrs.insert(MAX_SIZE.to_string(), Value::Int(4));
        attrs.insert(DESIRED_CAPACITY.to_string(), Value::Int(2));
        attrs.insert(INSTANCE_TYPES_SPOT.to_string(), Value::from(vec!["t3.medium", "t3.large"]));
        attrs.insert(MANAGED_ACTIONS.to_string(), platform_update("timeWindow"));
        attrs
    }

    fn imported() -> BeanstalkGroup {
        serde_json::from_value(serde_json::json!({
            "name": "web-env",
            "region": "us-west-2",
            "capacity": {"minimum": 1, "maximum": 1, "target": 1},
            "compute": {
                "product": "Linux/UNIX",
                "instanceTypes": {"ondemand": "t3.medium", "spot": ["t3.medium"]},
                "launchSpecification": {"imageId": "ami-1"}
            },
            "integration": {"elasticBeanstalk": {"environmentId": "e-123"}}
        }))
        .unwrap()
    }

    #[test]
    fn create_overrides_the_imported_group() {
        let group = wrapper()
            .on_create(Some(imported()), &ResourceData::new(config()))
            .unwrap();
        let body = serde_json::to_value(&group).unwrap();

        assert_eq!(body["name"], "web-eg");
        assert_eq!(body["capacity"]["maximum"], 4);
        assert_eq!(body["compute"]["instanceTypes"]["ondemand"], "t3.medium");
        assert_eq!(body["compute"]["instanceTypes"]["spot"][1], "t3.large");
        assert_eq!(body["compute"]["launchSpecification"]["imageId"], "ami-1");
        assert_eq!(
            body["integration"]["elasticBeanstalk"]["managedActions"]["platformUpdate"]["performAt"],
            "timeWindow"
        );
    }

    #[test]
    fn create_then_read_round_trips() {
        let wrapper = wrapper();
        let group = wrapper
            .on_create(Some(imported()), &ResourceData::new(config()))
            .unwrap();

        let mut state = ResourceData::for_read("sig-1");
        wrapper.on_read(&group, &mut state).unwrap();
        let mut attributes = state.into_attributes();
        assert_eq!(
            attributes.remove(BEANSTALK_ENVIRONMENT_ID),
            Some(Value::from("e-123"))
        );
        assert_eq!(attributes, config());
    }

    #[test]
    fn removed_managed_actions_are_sent_as_null() {
        let mut current = config();
        current.remove(MANAGED_ACTIONS);
        let data = ResourceData::for_update("sig-1", config(), current);

        let (changed, group) = wrapper().on_update(&data).unwrap();
        assert!(changed);
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            serde_json::json!({"integration": {"elasticBeanstalk": {"managedActions": null}}})
        );
    }

    #[test]
    fn maintenance_alone_builds_no_update() {
        let mut current = config();
        current.insert(MAINTENANCE.to_string(), Value::from("START"));
        let data = ResourceData::for_update("sig-1", config(), current);

        let (changed, _) = wrapper().on_update(&data).unwrap();
        assert!(!changed);
    }

    #[test]
    fn maintenance_values() {
        assert_eq!(Maintenance::parse("START"), Some(Maintenance::Start));
        assert_eq!(Maintenance::parse("STATUS"), None);
        assert_eq!(Maintenance::reported(&MaintenanceStatus::Active), Some("END"));
        assert_eq!(
            Maintenance::reported(&MaintenanceStatus::Transitional("PENDING".to_string())),
            None
        );
        assert_eq!(
            item_path("sig-1", "maintenance/finish"),
            "/aws/ec2/group/sig-1/beanstalk/maintenance/finish"
        );
    }

    #[test]
    fn environment_selectors_are_write_only() {
        let schema = wrapper().schema();
        assert!(schema.attributes[BEANSTALK_ENVIRONMENT_NAME].write_only);
        assert!(schema.attributes[BEANSTALK_ENVIRONMENT_ID].force_new);
    }
}
