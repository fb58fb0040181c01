//! spotinst_elastigroup_azure_v3

use spotform_core::data::ResourceData;
use spotform_core::expand::{BlockBuilder, block, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::ResourceConfig;
use crate::models::elastigroup_azure::{CustomImage, Group, Image, Login, MarketplaceImage};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_elastigroup_azure_v3",
    label: "Group",
    not_found_code: "GROUP_DOESNT_EXIST",
    retry_on: None,
    description: "Elastigroup running on Azure virtual machines",
};

const AFFINITY: &str = "elastigroup_azure";
const AFFINITY_STRATEGY: &str = "elastigroup_azure_strategy";
const AFFINITY_VM_SIZES: &str = "elastigroup_azure_vm_sizes";
const AFFINITY_IMAGE: &str = "elastigroup_azure_image";
const AFFINITY_LOGIN: &str = "elastigroup_azure_login";

pub const NAME: &str = "name";
pub const REGION: &str = "region";
pub const RESOURCE_GROUP_NAME: &str = "resource_group_name";
pub const OS: &str = "os";
pub const MAX_SIZE: &str = "max_size";
pub const MIN_SIZE: &str = "min_size";
pub const DESIRED_CAPACITY: &str = "desired_capacity";
pub const SPOT_PERCENTAGE: &str = "spot_percentage";
pub const OD_COUNT: &str = "od_count";
pub const DRAINING_TIMEOUT: &str = "draining_timeout";
pub const FALLBACK_TO_ON_DEMAND: &str = "fallback_to_on_demand";
pub const OD_SIZES: &str = "od_sizes";
pub const SPOT_SIZES: &str = "spot_sizes";
pub const IMAGE: &str = "image";
pub const LOGIN: &str = "login";

const MARKETPLACE: &str = "marketplace";
const PUBLISHER: &str = "publisher";
const OFFER: &str = "offer";
const SKU: &str = "sku";
const VERSION: &str = "version";
const CUSTOM: &str = "custom";
const IMAGE_RESOURCE_GROUP_NAME: &str = "resource_group_name";
const IMAGE_NAME: &str = "image_name";
const USER_NAME: &str = "user_name";
const SSH_PUBLIC_KEY: &str = "ssh_public_key";
const PASSWORD: &str = "password";

pub fn fields() -> Result<FieldRegistry<Group>, RegistryError> {
    let mut fields = FieldRegistry::new();
    register_group(&mut fields)?;
    register_strategy(&mut fields)?;
    register_vm_sizes(&mut fields)?;
    register_image(&mut fields)?;
    register_login(&mut fields)?;
    Ok(fields)
}

// =============================================================================
// Group
// =============================================================================

fn register_group(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(NAME, AttributeType::String).required(),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(NAME, group.name.clone());
            Ok(())
        })
        .on_create(write_name)
        .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(REGION, AttributeType::String).required(),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(REGION, group.region.clone());
            Ok(())
        })
        .on_create(write_region)
        .on_update(write_region),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(RESOURCE_GROUP_NAME, AttributeType::String).required(),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(RESOURCE_GROUP_NAME, group.resource_group_name.clone());
            Ok(())
        })
        .on_create(|group, data| {
            group.resource_group_name = data.get_string(RESOURCE_GROUP_NAME)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(RESOURCE_GROUP_NAME))),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(OS, types::one_of(&["Linux", "Windows"])).required(),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(OS, group.compute.as_ref().and_then(|c| c.os.clone()));
            Ok(())
        })
        .on_create(|group, data| {
            group.compute_mut().os = data.get_string(OS)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(OS))),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(MAX_SIZE, types::non_negative_int()))
            .on_read(|group: &Group, data| {
                data.set_opt(MAX_SIZE, group.capacity.as_ref().and_then(|c| c.maximum));
                Ok(())
            })
            .on_create(write_max_size)
            .on_update(write_max_size),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(MIN_SIZE, types::non_negative_int()))
            .on_read(|group: &Group, data| {
                data.set_opt(MIN_SIZE, group.capacity.as_ref().and_then(|c| c.minimum));
                Ok(())
            })
            .on_create(write_min_size)
            .on_update(write_min_size),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(DESIRED_CAPACITY, types::non_negative_int()),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(DESIRED_CAPACITY, group.capacity.as_ref().and_then(|c| c.target));
            Ok(())
        })
        .on_create(write_desired_capacity)
        .on_update(write_desired_capacity),
    )?;

    Ok(())
}

fn write_name(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.name = data.get_string(NAME)?;
    Ok(())
}

fn write_region(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.region = data.get_string(REGION)?;
    Ok(())
}

fn write_max_size(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(MAX_SIZE)? {
        group.capacity_mut().maximum = Some(v);
    }
    Ok(())
}

fn write_min_size(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(MIN_SIZE)? {
        group.capacity_mut().minimum = Some(v);
    }
    Ok(())
}

fn write_desired_capacity(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(DESIRED_CAPACITY)? {
        group.capacity_mut().target = Some(v);
    }
    Ok(())
}

// =============================================================================
// Strategy
// =============================================================================

fn register_strategy(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(SPOT_PERCENTAGE, types::percentage()).conflicts_with(OD_COUNT),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                SPOT_PERCENTAGE,
                group.strategy.as_ref().and_then(|s| s.spot_percentage),
            );
            Ok(())
        })
        .on_create(write_spot_percentage)
        .on_update(write_spot_percentage),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(OD_COUNT, types::non_negative_int())
                .conflicts_with(SPOT_PERCENTAGE),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(OD_COUNT, group.strategy.as_ref().and_then(|s| s.od_count));
            Ok(())
        })
        .on_create(write_od_count)
        .on_update(write_od_count),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(DRAINING_TIMEOUT, types::non_negative_int()),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                DRAINING_TIMEOUT,
                group.strategy.as_ref().and_then(|s| s.draining_timeout),
            );
            Ok(())
        })
        .on_create(write_draining_timeout)
        .on_update(write_draining_timeout),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(FALLBACK_TO_ON_DEMAND, AttributeType::Bool),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                FALLBACK_TO_ON_DEMAND,
                group.strategy.as_ref().and_then(|s| s.fallback_to_od),
            );
            Ok(())
        })
        .on_create(write_fallback_to_on_demand)
        .on_update(write_fallback_to_on_demand),
    )?;

    Ok(())
}

fn write_spot_percentage(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().spot_percentage = data.get_int(SPOT_PERCENTAGE)?;
    Ok(())
}

fn write_od_count(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().od_count = data.get_int(OD_COUNT)?;
    Ok(())
}

fn write_draining_timeout(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().draining_timeout = data.get_positive_int(DRAINING_TIMEOUT)?;
    Ok(())
}

fn write_fallback_to_on_demand(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().fallback_to_od = data.get_bool(FALLBACK_TO_ON_DEMAND)?;
    Ok(())
}

// =============================================================================
// VM Sizes
// =============================================================================

fn register_vm_sizes(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_VM_SIZES,
            AttributeSchema::new(OD_SIZES, types::string_list()).required(),
        )
        .on_read(|group: &Group, data| {
            let sizes = group
                .compute
                .as_ref()
                .and_then(|c| c.vm_sizes.as_ref())
                .and_then(|s| s.od_sizes.clone());
            data.set_opt(OD_SIZES, sizes);
            Ok(())
        })
        .on_create(write_od_sizes)
        .on_update(write_od_sizes),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_VM_SIZES,
            AttributeSchema::new(SPOT_SIZES, types::string_list()).required(),
        )
        .on_read(|group: &Group, data| {
            let sizes = group
                .compute
                .as_ref()
                .and_then(|c| c.vm_sizes.as_ref())
                .and_then(|s| s.spot_sizes.clone());
            data.set_opt(SPOT_SIZES, sizes);
            Ok(())
        })
        .on_create(write_spot_sizes)
        .on_update(write_spot_sizes),
    )?;

    Ok(())
}

fn write_od_sizes(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.vm_sizes_mut().od_sizes = data.get_strings(OD_SIZES)?;
    Ok(())
}

fn write_spot_sizes(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.vm_sizes_mut().spot_sizes = data.get_strings(SPOT_SIZES)?;
    Ok(())
}

// =============================================================================
// Image
// =============================================================================

fn register_image(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    let marketplace = BlockSchema::new()
        .attribute(AttributeSchema::new(PUBLISHER, AttributeType::String).required())
        .attribute(AttributeSchema::new(OFFER, AttributeType::String).required())
        .attribute(AttributeSchema::new(SKU, AttributeType::String).required())
        .attribute(AttributeSchema::new(VERSION, AttributeType::String))
        .max_items(1);
    let custom = BlockSchema::new()
        .attribute(AttributeSchema::new(IMAGE_RESOURCE_GROUP_NAME, AttributeType::String).required())
        .attribute(AttributeSchema::new(IMAGE_NAME, AttributeType::String).required())
        .max_items(1);

    fields.register(
        FieldDescriptor::new(
            AFFINITY_IMAGE,
            AttributeSchema::new(
                IMAGE,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(
                            MARKETPLACE,
                            AttributeType::Block(marketplace),
                        ))
                        .attribute(AttributeSchema::new(CUSTOM, AttributeType::Block(custom)))
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entry = group
                .launch_specification()
                .and_then(|spec| spec.image.as_ref())
                .map(flatten_image);
            data.set_opt(IMAGE, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_image)
        .on_update(write_image),
    )?;

    Ok(())
}

fn write_image(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let Some(entry) = block(data, IMAGE)? else {
        return Ok(());
    };

    let marketplace = entry.block(MARKETPLACE).map(|m| MarketplaceImage {
        publisher: m.string(PUBLISHER),
        offer: m.string(OFFER),
        sku: m.string(SKU),
        version: m.string(VERSION),
    });
    let custom = entry.block(CUSTOM).map(|c| CustomImage {
        resource_group_name: c.string(IMAGE_RESOURCE_GROUP_NAME),
        name: c.string(IMAGE_NAME),
    });
    if marketplace.is_some() && custom.is_some() {
        return Err(FieldError::invalid(
            IMAGE,
            "only one of marketplace or custom may be set",
        ));
    }

    group.launch_specification_mut().image = Some(Image {
        marketplace,
        custom,
    });
    Ok(())
}

fn flatten_image(image: &Image) -> Value {
    let marketplace: Vec<Value> = image
        .marketplace
        .iter()
        .map(|m| {
            BlockBuilder::new()
                .set(PUBLISHER, m.publisher.clone())
                .set(OFFER, m.offer.clone())
                .set(SKU, m.sku.clone())
                .set(VERSION, m.version.clone())
                .build()
        })
        .collect();
    let custom: Vec<Value> = image
        .custom
        .iter()
        .map(|c| {
            BlockBuilder::new()
                .set(IMAGE_RESOURCE_GROUP_NAME, c.resource_group_name.clone())
                .set(IMAGE_NAME, c.name.clone())
                .build()
        })
        .collect();
    BlockBuilder::new()
        .nested(MARKETPLACE, marketplace)
        .nested(CUSTOM, custom)
        .build()
}

// =============================================================================
// Login
// =============================================================================

fn register_login(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_LOGIN,
            AttributeSchema::new(
                LOGIN,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(USER_NAME, AttributeType::String).required())
                        .attribute(AttributeSchema::new(SSH_PUBLIC_KEY, AttributeType::String))
                        .attribute(AttributeSchema::new(PASSWORD, AttributeType::String))
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entry = group
                .launch_specification()
                .and_then(|spec| spec.login.as_ref())
                .map(|login| {
                    BlockBuilder::new()
                        .set(USER_NAME, login.user_name.clone())
                        .set(SSH_PUBLIC_KEY, login.ssh_public_key.clone())
                        .set(PASSWORD, login.password.clone())
                        .build()
                });
            data.set_opt(LOGIN, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_login)
        .on_update(write_login),
    )?;

    Ok(())
}

fn write_login(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let login = block(data, LOGIN)?
        .map(|entry| -> FieldResult<Login> {
            let user_name = entry
                .string(USER_NAME)
                .ok_or_else(|| FieldError::missing(LOGIN, USER_NAME))?;
            Ok(Login {
                user_name: Some(user_name),
                ssh_public_key: entry.string(SSH_PUBLIC_KEY),
                password: entry.string(PASSWORD),
            })
        })
        .transpose()?;
    group.launch_specification_mut().login = login;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::wrapper::ResourceWrapper;
    use std::collections::HashMap;

    fn wrapper() -> ResourceWrapper<Group> {
        ResourceWrapper::new(CONFIG.type_name, fields().unwrap()).unwrap()
    }

    fn config() -> HashMap<String, Value> {
        let marketplace = BlockBuilder::new()
            .set(PUBLISHER, Some("Canonical"))
            .set(OFFER, Some("UbuntuServer"))
            .set(SKU, Some("18.04-LTS"))
            .set(VERSION, Some("latest"))
            .build();
        let image = BlockBuilder::new()
            .nested(MARKETPLACE, vec![marketplace])
            .build();

        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("eg-azure"));
        attrs.insert(REGION.to_string(), Value::from("eastus"));
        attrs.insert(RESOURCE_GROUP_NAME.to_string(), Value::from("rg-1"));
        attrs.insert(OS.to_string(), Value::from("Linux"));
        attrs.insert(OD_SIZES.to_string(), Value::from(vec!["standard_a1_v1"]));
        attrs.insert(SPOT_SIZES.to_string(), Value::from(vec!["standard_a1_v1"]));
        attrs.insert(IMAGE.to_string(), Value::List(vec![image]));
        attrs
    }

    #[test]
    fn create_then_read_round_trips() {
        let wrapper = wrapper();
        let group = wrapper
            .on_create(None, &ResourceData::new(config()))
            .unwrap();

        let mut state = ResourceData::for_read("sig-azure");
        wrapper.on_read(&group, &mut state).unwrap();
        assert_eq!(state.into_attributes(), config());
    }

    #[test]
    fn resource_group_cannot_change() {
        let mut current = config();
        current.insert(RESOURCE_GROUP_NAME.to_string(), Value::from("rg-2"));
        let data = ResourceData::for_update("sig-azure", config(), current);

        assert_eq!(
            wrapper().on_update(&data).unwrap_err(),
            FieldError::update_not_allowed(RESOURCE_GROUP_NAME)
        );
    }

    #[test]
    fn image_sources_are_exclusive() {
        let custom = BlockBuilder::new()
            .set(IMAGE_RESOURCE_GROUP_NAME, Some("rg-images"))
            .set(IMAGE_NAME, Some("golden"))
            .build();
        let marketplace = BlockBuilder::new().set(PUBLISHER, Some("Canonical")).build();
        let image = BlockBuilder::new()
            .nested(MARKETPLACE, vec![marketplace])
            .nested(CUSTOM, vec![custom])
            .build();
        let mut attrs = config();
        attrs.insert(IMAGE.to_string(), Value::List(vec![image]));

        let err = wrapper()
            .on_create(None, &ResourceData::new(attrs))
            .unwrap_err();
        assert!(matches!(err, FieldError::Invalid { field, .. } if field == IMAGE));
    }
}
