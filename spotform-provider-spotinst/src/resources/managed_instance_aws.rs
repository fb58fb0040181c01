//! spotinst_managed_instance_aws

use spotform_core::data::ResourceData;
use spotform_core::expand::{Block, BlockBuilder, blocks, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::{IAM_PROFILE_NOT_READY, ResourceConfig};
use crate::models::managed_instance::{ManagedInstance, NetworkInterface};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_managed_instance_aws",
    label: "ManagedInstance",
    not_found_code: "MANAGED_INSTANCE_DOESNT_EXIST",
    retry_on: Some(IAM_PROFILE_NOT_READY),
    description: "Single stateful AWS instance kept alive on spot capacity",
};

const AFFINITY: &str = "managed_instance_aws";
const AFFINITY_PERSISTENCE: &str = "managed_instance_aws_persistence";
const AFFINITY_HEALTH_CHECK: &str = "managed_instance_aws_health_check";
const AFFINITY_COMPUTE: &str = "managed_instance_aws_compute";
const AFFINITY_LAUNCH_SPECIFICATION: &str = "managed_instance_aws_launch_specification";

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const REGION: &str = "region";
pub const PERSIST_BLOCK_DEVICES: &str = "persist_block_devices";
pub const PERSIST_ROOT_DEVICE: &str = "persist_root_device";
pub const PERSIST_PRIVATE_IP: &str = "persist_private_ip";
pub const BLOCK_DEVICES_MODE: &str = "block_devices_mode";
pub const HEALTH_CHECK_TYPE: &str = "health_check_type";
pub const AUTO_HEALING: &str = "auto_healing";
pub const GRACE_PERIOD: &str = "grace_period";
pub const UNHEALTHY_DURATION: &str = "unhealthy_duration";
pub const PRODUCT: &str = "product";
pub const SUBNET_IDS: &str = "subnet_ids";
pub const VPC_ID: &str = "vpc_id";
pub const ELASTIC_IP: &str = "elastic_ip";
pub const PRIVATE_IP: &str = "private_ip";
pub const INSTANCE_TYPES: &str = "instance_types";
pub const PREFERRED_TYPE: &str = "preferred_type";
pub const NETWORK_INTERFACE: &str = "network_interface";

const DEVICE_INDEX: &str = "device_index";
const NETWORK_INTERFACE_ID: &str = "network_interface_id";
const ASSOCIATE_PUBLIC_IP_ADDRESS: &str = "associate_public_ip_address";
const ASSOCIATE_IPV6_ADDRESS: &str = "associate_ipv6_address";

pub fn fields() -> Result<FieldRegistry<ManagedInstance>, RegistryError> {
    let mut fields = FieldRegistry::new();
    register_instance(&mut fields)?;
    register_persistence(&mut fields)?;
    register_health_check(&mut fields)?;
    register_compute(&mut fields)?;
    register_launch_specification(&mut fields)?;
    Ok(fields)
}

// =============================================================================
// Instance
// =============================================================================

fn register_instance(fields: &mut FieldRegistry<ManagedInstance>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(NAME, AttributeType::String).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(NAME, mi.name.clone());
            Ok(())
        })
        .on_create(write_name)
        .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(DESCRIPTION, AttributeType::String))
            .on_read(|mi: &ManagedInstance, data| {
                data.set_opt(DESCRIPTION, mi.description.clone());
                Ok(())
            })
            .on_create(write_description)
            .on_update(write_description),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(REGION, AttributeType::String).force_new(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(REGION, mi.region.clone());
            Ok(())
        })
        .on_create(|mi, data| {
            mi.region = data.get_string(REGION)?;
            Ok(())
        }),
    )?;

    Ok(())
}

fn write_name(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.name = data.get_string(NAME)?;
    Ok(())
}

fn write_description(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.description = data.get_string(DESCRIPTION)?;
    Ok(())
}

// =============================================================================
// Persistence
// =============================================================================

fn register_persistence(fields: &mut FieldRegistry<ManagedInstance>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(PERSIST_BLOCK_DEVICES, AttributeType::Bool).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                PERSIST_BLOCK_DEVICES,
                mi.persistence.as_ref().and_then(|p| p.persist_block_devices),
            );
            Ok(())
        })
        .on_create(write_persist_block_devices)
        .on_update(write_persist_block_devices),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(PERSIST_ROOT_DEVICE, AttributeType::Bool),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                PERSIST_ROOT_DEVICE,
                mi.persistence.as_ref().and_then(|p| p.persist_root_device),
            );
            Ok(())
        })
        .on_create(write_persist_root_device)
        .on_update(write_persist_root_device),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(PERSIST_PRIVATE_IP, AttributeType::Bool),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                PERSIST_PRIVATE_IP,
                mi.persistence.as_ref().and_then(|p| p.persist_private_ip),
            );
            Ok(())
        })
        .on_create(write_persist_private_ip)
        .on_update(write_persist_private_ip),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(BLOCK_DEVICES_MODE, types::one_of(&["reattach", "onLaunch"])),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                BLOCK_DEVICES_MODE,
                mi.persistence.as_ref().and_then(|p| p.block_devices_mode.clone()),
            );
            Ok(())
        })
        .on_create(write_block_devices_mode)
        .on_update(write_block_devices_mode),
    )?;

    Ok(())
}

fn write_persist_block_devices(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.persistence_mut().persist_block_devices = data.get_bool(PERSIST_BLOCK_DEVICES)?;
    Ok(())
}

fn write_persist_root_device(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.persistence_mut().persist_root_device = data.get_bool(PERSIST_ROOT_DEVICE)?;
    Ok(())
}

fn write_persist_private_ip(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.persistence_mut().persist_private_ip = data.get_bool(PERSIST_PRIVATE_IP)?;
    Ok(())
}

fn write_block_devices_mode(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.persistence_mut().block_devices_mode = data.get_string(BLOCK_DEVICES_MODE)?;
    Ok(())
}

// =============================================================================
// Health Check
// =============================================================================

fn register_health_check(fields: &mut FieldRegistry<ManagedInstance>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_HEALTH_CHECK,
            AttributeSchema::new(HEALTH_CHECK_TYPE, types::one_of(&["EC2", "ELB", "TARGET_GROUP"])),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                HEALTH_CHECK_TYPE,
                mi.health_check.as_ref().and_then(|h| h.kind.clone()),
            );
            Ok(())
        })
        .on_create(write_health_check_type)
        .on_update(write_health_check_type),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_HEALTH_CHECK,
            AttributeSchema::new(AUTO_HEALING, AttributeType::Bool),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                AUTO_HEALING,
                mi.health_check.as_ref().and_then(|h| h.auto_healing),
            );
            Ok(())
        })
        .on_create(write_auto_healing)
        .on_update(write_auto_healing),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_HEALTH_CHECK,
            AttributeSchema::new(GRACE_PERIOD, types::positive_int()),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                GRACE_PERIOD,
                mi.health_check.as_ref().and_then(|h| h.grace_period),
            );
            Ok(())
        })
        .on_create(write_grace_period)
        .on_update(write_grace_period),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_HEALTH_CHECK,
            AttributeSchema::new(UNHEALTHY_DURATION, types::positive_int()),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                UNHEALTHY_DURATION,
                mi.health_check.as_ref().and_then(|h| h.unhealthy_duration),
            );
            Ok(())
        })
        .on_create(write_unhealthy_duration)
        .on_update(write_unhealthy_duration),
    )?;

    Ok(())
}

fn write_health_check_type(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.health_check_mut().kind = data.get_string(HEALTH_CHECK_TYPE)?;
    Ok(())
}

fn write_auto_healing(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.health_check_mut().auto_healing = data.get_bool(AUTO_HEALING)?;
    Ok(())
}

fn write_grace_period(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.health_check_mut().grace_period = data.get_positive_int(GRACE_PERIOD)?;
    Ok(())
}

fn write_unhealthy_duration(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    mi.health_check_mut().unhealthy_duration = data.get_positive_int(UNHEALTHY_DURATION)?;
    Ok(())
}

// =============================================================================
// Compute
// =============================================================================

fn register_compute(fields: &mut FieldRegistry<ManagedInstance>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_COMPUTE,
            AttributeSchema::new(PRODUCT, AttributeType::String).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(PRODUCT, mi.compute.as_ref().and_then(|c| c.product.clone()));
            Ok(())
        })
        .on_create(|mi, data| {
            mi.compute_mut().product = data.get_string(PRODUCT)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(PRODUCT))),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_COMPUTE,
            AttributeSchema::new(SUBNET_IDS, types::string_list()).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                SUBNET_IDS,
                mi.compute.as_ref().and_then(|c| c.subnet_ids.clone()),
            );
            Ok(())
        })
        .on_create(write_subnet_ids)
        .on_update(write_subnet_ids),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_COMPUTE,
            AttributeSchema::new(VPC_ID, AttributeType::String).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(VPC_ID, mi.compute.as_ref().and_then(|c| c.vpc_id.clone()));
            Ok(())
        })
        .on_create(write_vpc_id)
        .on_update(write_vpc_id),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_COMPUTE,
            AttributeSchema::new(ELASTIC_IP, AttributeType::String),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                ELASTIC_IP,
                mi.compute.as_ref().and_then(|c| c.elastic_ip.clone()),
            );
            Ok(())
        })
        .on_create(write_elastic_ip)
        .on_update(write_elastic_ip),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_COMPUTE,
            AttributeSchema::new(PRIVATE_IP, AttributeType::String),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                PRIVATE_IP,
                mi.compute.as_ref().and_then(|c| c.private_ip.clone()),
            );
            Ok(())
        })
        .on_create(write_private_ip)
        .on_update(write_private_ip),
    )?;

    Ok(())
}

fn write_subnet_ids(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.compute_mut().subnet_ids = data.get_strings(SUBNET_IDS)?;
    Ok(())
}

fn write_vpc_id(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.compute_mut().vpc_id = data.get_string(VPC_ID)?;
    Ok(())
}

fn write_elastic_ip(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.compute_mut().elastic_ip = data.get_string(ELASTIC_IP)?;
    Ok(())
}

fn write_private_ip(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.compute_mut().private_ip = data.get_string(PRIVATE_IP)?;
    Ok(())
}

// =============================================================================
// Launch Specification
// =============================================================================

fn register_launch_specification(
    fields: &mut FieldRegistry<ManagedInstance>,
) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_LAUNCH_SPECIFICATION,
            AttributeSchema::new(INSTANCE_TYPES, types::string_list()).required(),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                INSTANCE_TYPES,
                mi.instance_types().and_then(|t| t.types.clone()),
            );
            Ok(())
        })
        .on_create(write_instance_types)
        .on_update(write_instance_types),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_LAUNCH_SPECIFICATION,
            AttributeSchema::new(PREFERRED_TYPE, AttributeType::String),
        )
        .on_read(|mi: &ManagedInstance, data| {
            data.set_opt(
                PREFERRED_TYPE,
                mi.instance_types().and_then(|t| t.preferred_type.clone()),
            );
            Ok(())
        })
        .on_create(write_preferred_type)
        .on_update(write_preferred_type),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_LAUNCH_SPECIFICATION,
            AttributeSchema::new(
                NETWORK_INTERFACE,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(DEVICE_INDEX, types::non_negative_int()).required(),
                        )
                        .attribute(AttributeSchema::new(NETWORK_INTERFACE_ID, AttributeType::String))
                        .attribute(AttributeSchema::new(
                            ASSOCIATE_PUBLIC_IP_ADDRESS,
                            AttributeType::Bool,
                        ))
                        .attribute(AttributeSchema::new(ASSOCIATE_IPV6_ADDRESS, AttributeType::Bool)),
                ),
            ),
        )
        .on_read(|mi: &ManagedInstance, data| {
            let entries: Vec<Value> = mi
                .launch_specification()
                .and_then(|spec| spec.network_interfaces.as_ref())
                .map(|interfaces| interfaces.iter().map(flatten_network_interface).collect())
                .unwrap_or_default();
            data.set_opt(NETWORK_INTERFACE, flattened(entries));
            Ok(())
        })
        .on_create(write_network_interfaces)
        .on_update(write_network_interfaces),
    )?;

    Ok(())
}

fn write_instance_types(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.instance_types_mut().types = data.get_strings(INSTANCE_TYPES)?;
    Ok(())
}

fn write_preferred_type(mi: &mut Handle<ManagedInstance>, data: &ResourceData) -> FieldResult<()> {
    mi.instance_types_mut().preferred_type = data.get_string(PREFERRED_TYPE)?;
    Ok(())
}

fn write_network_interfaces(
    mi: &mut Handle<ManagedInstance>,
    data: &ResourceData,
) -> FieldResult<()> {
    let interfaces = blocks(data, NETWORK_INTERFACE)?
        .map(|entries| {
            entries
                .iter()
                .map(expand_network_interface)
                .collect::<FieldResult<Vec<_>>>()
        })
        .transpose()?;
    mi.launch_specification_mut().network_interfaces = interfaces;
    Ok(())
}

fn expand_network_interface(entry: &Block<'_>) -> FieldResult<NetworkInterface> {
    let device_index = entry
        .int(DEVICE_INDEX)
        .ok_or_else(|| FieldError::missing(NETWORK_INTERFACE, DEVICE_INDEX))?;
    Ok(NetworkInterface {
        device_index: Some(device_index),
        network_interface_id: entry.string(NETWORK_INTERFACE_ID),
        associate_public_ip_address: entry.bool(ASSOCIATE_PUBLIC_IP_ADDRESS),
        associate_ipv6_address: entry.bool(ASSOCIATE_IPV6_ADDRESS),
    })
}

fn flatten_network_interface(interface: &NetworkInterface) -> Value {
    BlockBuilder::new()
        .set(DEVICE_INDEX, interface.device_index)
        .set(NETWORK_INTERFACE_ID, interface.network_interface_id.clone())
        .set(ASSOCIATE_PUBLIC_IP_ADDRESS, interface.associate_public_ip_address)
        .set(ASSOCIATE_IPV6_ADDRESS, interface.associate_ipv6_address)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::wrapper::ResourceWrapper;
    use std::collections::HashMap;

    fn wrapper() -> ResourceWrapper<ManagedInstance> {
        ResourceWrapper::new(CONFIG.type_name, fields().unwrap()).unwrap()
    }

    fn config() -> HashMap<String, Value> {
        let eni = BlockBuilder::new()
            .set(DEVICE_INDEX, Some(0i64))
            .set(ASSOCIATE_PUBLIC_IP_ADDRESS, Some(true))
            .build();

        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("mi-db"));
        attrs.insert(REGION.to_string(), Value::from("us-west-2"));
        attrs.insert(PERSIST_BLOCK_DEVICES.to_string(), Value::Bool(true));
        attrs.insert(BLOCK_DEVICES_MODE.to_string(), Value::from("reattach"));
        attrs.insert(PRODUCT.to_string(), Value::from("Linux/UNIX"));
        attrs.insert(SUBNET_IDS.to_string(), Value::from(vec!["subnet-1", "subnet-2"]));
        attrs.insert(VPC_ID.to_string(), Value::from("vpc-1"));
        attrs.insert(INSTANCE_TYPES.to_string(), Value::from(vec!["t3.large", "m5.large"]));
        attrs.insert(PREFERRED_TYPE.to_string(), Value::from("t3.large"));
        attrs.insert(NETWORK_INTERFACE.to_string(), Value::List(vec![eni]));
        attrs
    }

    #[test]
    fn create_then_read_round_trips() {
        let wrapper = wrapper();
        let mi = wrapper
            .on_create(None, &ResourceData::new(config()))
            .unwrap();
        assert_eq!(
            mi.instance_types().and_then(|t| t.preferred_type.as_deref()),
            Some("t3.large")
        );

        let mut state = ResourceData::for_read("smi-1");
        wrapper.on_read(&mi, &mut state).unwrap();
        assert_eq!(state.into_attributes(), config());
    }

    #[test]
    fn region_is_not_sent_on_update() {
        let mut current = config();
        current.insert(REGION.to_string(), Value::from("eu-west-1"));
        current.insert(PREFERRED_TYPE.to_string(), Value::from("m5.large"));
        let data = ResourceData::for_update("smi-1", config(), current);

        let (changed, mi) = wrapper().on_update(&data).unwrap();
        assert!(changed);
        assert!(mi.region.is_none());
        assert_eq!(
            mi.instance_types().and_then(|t| t.preferred_type.as_deref()),
            Some("m5.large")
        );
    }

    #[test]
    fn network_interface_requires_device_index() {
        let eni = BlockBuilder::new()
            .set(NETWORK_INTERFACE_ID, Some("eni-1"))
            .build();
        let mut attrs = config();
        attrs.insert(NETWORK_INTERFACE.to_string(), Value::List(vec![eni]));

        let err = wrapper()
            .on_create(None, &ResourceData::new(attrs))
            .unwrap_err();
        assert_eq!(err, FieldError::missing(NETWORK_INTERFACE, DEVICE_INDEX));
    }
}
