//! spotinst_stateful_node_azure

use spotform_core::data::ResourceData;
use spotform_core::expand::{Block, BlockBuilder, block, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::ResourceConfig;
use crate::models::Nullable;
use crate::models::elastigroup_azure::Login;
use crate::models::stateful_node_azure::{
    AdditionalIpConfiguration, Health, Network, NetworkInterface, ResourceRef, StatefulNode,
};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_stateful_node_azure",
    label: "Stateful node",
    not_found_code: "STATEFUL_NODE_DOESNT_EXIST",
    retry_on: None,
    description: "Azure virtual machine that keeps its disks and network across spot interruptions",
};

const AFFINITY: &str = "stateful_node_azure";
const AFFINITY_VM_SIZES: &str = "stateful_node_azure_vm_sizes";
const AFFINITY_LOGIN: &str = "stateful_node_azure_login";
const AFFINITY_NETWORK: &str = "stateful_node_azure_network";
const AFFINITY_PERSISTENCE: &str = "stateful_node_azure_persistence";
const AFFINITY_HEALTH: &str = "stateful_node_azure_health";

pub const NAME: &str = "name";
pub const REGION: &str = "region";
pub const RESOURCE_GROUP_NAME: &str = "resource_group_name";
pub const DESCRIPTION: &str = "description";
pub const OS: &str = "os";
pub const OD_SIZES: &str = "od_sizes";
pub const SPOT_SIZES: &str = "spot_sizes";
pub const PREFERRED_SPOT_SIZES: &str = "preferred_spot_sizes";
pub const LOGIN: &str = "login";
pub const NETWORK: &str = "network";
pub const SHOULD_PERSIST_OS_DISK: &str = "should_persist_os_disk";
pub const OS_DISK_PERSISTENCE_MODE: &str = "os_disk_persistence_mode";
pub const SHOULD_PERSIST_DATA_DISKS: &str = "should_persist_data_disks";
pub const DATA_DISKS_PERSISTENCE_MODE: &str = "data_disks_persistence_mode";
pub const SHOULD_PERSIST_NETWORK: &str = "should_persist_network";
pub const SHOULD_PERSIST_VM: &str = "should_persist_vm";
pub const HEALTH: &str = "health";

const USER_NAME: &str = "user_name";
const SSH_PUBLIC_KEY: &str = "ssh_public_key";
const PASSWORD: &str = "password";

const VIRTUAL_NETWORK_NAME: &str = "virtual_network_name";
const NETWORK_RESOURCE_GROUP_NAME: &str = "resource_group_name";
const NETWORK_INTERFACES: &str = "network_interfaces";
const SUBNET_NAME: &str = "subnet_name";
const IS_PRIMARY: &str = "is_primary";
const ASSIGN_PUBLIC_IP: &str = "assign_public_ip";
const PUBLIC_IP_SKU: &str = "public_ip_sku";
const NETWORK_SECURITY_GROUP: &str = "network_security_group";
const ENABLE_IP_FORWARDING: &str = "enable_ip_forwarding";
const PRIVATE_IP_ADDRESSES: &str = "private_ip_addresses";
const ADDITIONAL_IP_CONFIGURATIONS: &str = "additional_ip_configurations";
const PRIVATE_IP_ADDRESS_VERSION: &str = "private_ip_address_version";
const PUBLIC_IPS: &str = "public_ips";
const APPLICATION_SECURITY_GROUPS: &str = "application_security_groups";
const REF_NAME: &str = "name";
const REF_RESOURCE_GROUP_NAME: &str = "resource_group_name";

const HEALTH_CHECK_TYPES: &str = "health_check_types";
const GRACE_PERIOD: &str = "grace_period";
const UNHEALTHY_DURATION: &str = "unhealthy_duration";
const AUTO_HEALING: &str = "auto_healing";

const PERSISTENCE_MODES: &[&str] = &["reattach", "onLaunch"];

pub fn fields() -> Result<FieldRegistry<StatefulNode>, RegistryError> {
    let mut fields = FieldRegistry::new();
    register_node(&mut fields)?;
    register_vm_sizes(&mut fields)?;
    register_login(&mut fields)?;
    register_network(&mut fields)?;
    register_persistence(&mut fields)?;
    register_health(&mut fields)?;
    Ok(fields)
}

// =============================================================================
// Node
// =============================================================================

fn register_node(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(NAME, AttributeType::String).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(NAME, node.name.clone());
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
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(REGION, node.region.clone());
            Ok(())
        })
        .on_create(|node, data| {
            node.region = data.get_string(REGION)?;
            Ok(())
        }),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(RESOURCE_GROUP_NAME, AttributeType::String)
                .required()
                .force_new(),
        )
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(RESOURCE_GROUP_NAME, node.resource_group_name.clone());
            Ok(())
        })
        .on_create(|node, data| {
            node.resource_group_name = data.get_string(RESOURCE_GROUP_NAME)?;
            Ok(())
        }),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(DESCRIPTION, AttributeType::String))
            .on_read(|node: &StatefulNode, data| {
                data.set_opt(DESCRIPTION, node.description.as_ref().cloned());
                Ok(())
            })
            .on_create(write_description)
            .on_update(write_description),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(OS, types::one_of(&["Linux", "Windows"])).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(OS, node.compute.as_ref().and_then(|c| c.os.clone()));
            Ok(())
        })
        .on_create(|node, data| {
            node.compute_mut().os = data.get_string(OS)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(OS))),
    )?;

    Ok(())
}

fn write_name(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    node.name = data.get_string(NAME)?;
    Ok(())
}

fn write_description(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    node.description = Nullable::new(data.get_string(DESCRIPTION)?, data.is_removed(DESCRIPTION));
    Ok(())
}

// =============================================================================
// VM Sizes
// =============================================================================

fn register_vm_sizes(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_VM_SIZES,
            AttributeSchema::new(OD_SIZES, types::string_list()).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(OD_SIZES, node.vm_sizes().and_then(|s| s.od_sizes.clone()));
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
        .on_read(|node: &StatefulNode, data| {
            data.set_opt(SPOT_SIZES, node.vm_sizes().and_then(|s| s.spot_sizes.clone()));
            Ok(())
        })
        .on_create(write_spot_sizes)
        .on_update(write_spot_sizes),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_VM_SIZES,
            AttributeSchema::new(PREFERRED_SPOT_SIZES, types::string_list()),
        )
        .on_read(|node: &StatefulNode, data| {
            let preferred = node
                .vm_sizes()
                .and_then(|s| s.preferred_spot_sizes.as_ref().cloned());
            data.set_opt(PREFERRED_SPOT_SIZES, preferred);
            Ok(())
        })
        .on_create(write_preferred_spot_sizes)
        .on_update(write_preferred_spot_sizes),
    )?;

    Ok(())
}

fn write_od_sizes(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    node.vm_sizes_mut().od_sizes = data.get_strings(OD_SIZES)?;
    Ok(())
}

fn write_spot_sizes(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    node.vm_sizes_mut().spot_sizes = data.get_strings(SPOT_SIZES)?;
    Ok(())
}

fn write_preferred_spot_sizes(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    let preferred = data
        .get_strings(PREFERRED_SPOT_SIZES)?
        .filter(|sizes| !sizes.is_empty());
    let preferred = Nullable::new(preferred, data.is_removed(PREFERRED_SPOT_SIZES));
    if !preferred.is_unset() {
        node.vm_sizes_mut().preferred_spot_sizes = preferred;
    }
    Ok(())
}

// =============================================================================
// Login
// =============================================================================

fn register_login(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
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
        .on_read(|node: &StatefulNode, data| {
            let entry = node
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
        .on_create(|node, data| {
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
            node.launch_specification_mut().login = login;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(LOGIN))),
    )?;

    Ok(())
}

// =============================================================================
// Network
// =============================================================================

fn resource_ref_schema() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new(REF_NAME, AttributeType::String).required())
        .attribute(AttributeSchema::new(REF_RESOURCE_GROUP_NAME, AttributeType::String).required())
}

fn register_network(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
    let network_security_group = BlockSchema::new()
        .attribute(AttributeSchema::new(REF_NAME, AttributeType::String))
        .attribute(AttributeSchema::new(REF_RESOURCE_GROUP_NAME, AttributeType::String))
        .max_items(1);
    let additional_ip_configurations = BlockSchema::new()
        .attribute(AttributeSchema::new(REF_NAME, AttributeType::String).required())
        .attribute(
            AttributeSchema::new(PRIVATE_IP_ADDRESS_VERSION, types::one_of(&["IPv4", "IPv6"]))
                .required(),
        );
    let network_interfaces = BlockSchema::new()
        .attribute(AttributeSchema::new(SUBNET_NAME, AttributeType::String).required())
        .attribute(AttributeSchema::new(IS_PRIMARY, AttributeType::Bool).required())
        .attribute(AttributeSchema::new(ASSIGN_PUBLIC_IP, AttributeType::Bool))
        .attribute(AttributeSchema::new(PUBLIC_IP_SKU, AttributeType::String))
        .attribute(AttributeSchema::new(
            NETWORK_SECURITY_GROUP,
            AttributeType::Block(network_security_group),
        ))
        .attribute(AttributeSchema::new(ENABLE_IP_FORWARDING, AttributeType::Bool))
        .attribute(AttributeSchema::new(PRIVATE_IP_ADDRESSES, types::string_list()))
        .attribute(AttributeSchema::new(
            ADDITIONAL_IP_CONFIGURATIONS,
            AttributeType::Block(additional_ip_configurations),
        ))
        .attribute(AttributeSchema::new(
            PUBLIC_IPS,
            AttributeType::Block(resource_ref_schema()),
        ))
        .attribute(AttributeSchema::new(
            APPLICATION_SECURITY_GROUPS,
            AttributeType::Block(resource_ref_schema()),
        ));

    fields.register(
        FieldDescriptor::new(
            AFFINITY_NETWORK,
            AttributeSchema::new(
                NETWORK,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(VIRTUAL_NETWORK_NAME, AttributeType::String)
                                .required(),
                        )
                        .attribute(
                            AttributeSchema::new(NETWORK_RESOURCE_GROUP_NAME, AttributeType::String)
                                .required(),
                        )
                        .attribute(
                            AttributeSchema::new(
                                NETWORK_INTERFACES,
                                AttributeType::Block(network_interfaces),
                            )
                            .required(),
                        )
                        .max_items(1),
                ),
            )
            .required(),
        )
        .on_read(|node: &StatefulNode, data| {
            let entry = node
                .launch_specification()
                .and_then(|spec| spec.network.as_ref())
                .map(flatten_network);
            data.set_opt(NETWORK, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_network)
        .on_update(write_network),
    )?;

    Ok(())
}

fn write_network(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    let Some(entry) = block(data, NETWORK)? else {
        return Ok(());
    };

    let interfaces = entry
        .blocks(NETWORK_INTERFACES)
        .into_iter()
        .map(expand_network_interface)
        .collect::<FieldResult<Vec<_>>>()?;
    if interfaces.iter().filter(|nic| nic.is_primary == Some(true)).count() != 1 {
        return Err(FieldError::invalid(
            NETWORK,
            "exactly one network interface must be primary",
        ));
    }

    node.launch_specification_mut().network = Some(Network {
        virtual_network_name: entry.string(VIRTUAL_NETWORK_NAME),
        resource_group_name: entry.string(NETWORK_RESOURCE_GROUP_NAME),
        network_interfaces: Some(interfaces),
    });
    Ok(())
}

fn expand_network_interface(nic: Block<'_>) -> FieldResult<NetworkInterface> {
    let subnet_name = nic
        .string(SUBNET_NAME)
        .ok_or_else(|| FieldError::missing(NETWORK_INTERFACES, SUBNET_NAME))?;

    let additional_ip_configurations = nic
        .blocks(ADDITIONAL_IP_CONFIGURATIONS)
        .into_iter()
        .map(|config| AdditionalIpConfiguration {
            name: config.string(REF_NAME),
            private_ip_address_version: config.string(PRIVATE_IP_ADDRESS_VERSION),
        })
        .collect::<Vec<_>>();

    Ok(NetworkInterface {
        subnet_name: Some(subnet_name),
        is_primary: nic.bool(IS_PRIMARY),
        assign_public_ip: nic.bool(ASSIGN_PUBLIC_IP),
        public_ip_sku: nic.string(PUBLIC_IP_SKU),
        network_security_group: nic.block(NETWORK_SECURITY_GROUP).map(expand_resource_ref),
        enable_ip_forwarding: nic.bool(ENABLE_IP_FORWARDING),
        private_ip_addresses: nic.strings(PRIVATE_IP_ADDRESSES),
        additional_ip_configurations: non_empty(additional_ip_configurations),
        public_ips: non_empty(expand_resource_refs(nic, PUBLIC_IPS)),
        application_security_groups: non_empty(expand_resource_refs(
            nic,
            APPLICATION_SECURITY_GROUPS,
        )),
    })
}

fn expand_resource_ref(entry: Block<'_>) -> ResourceRef {
    ResourceRef {
        name: entry.string(REF_NAME),
        resource_group_name: entry.string(REF_RESOURCE_GROUP_NAME),
    }
}

fn expand_resource_refs(nic: Block<'_>, key: &str) -> Vec<ResourceRef> {
    nic.blocks(key).into_iter().map(expand_resource_ref).collect()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

fn flatten_network(network: &Network) -> Value {
    let interfaces = network
        .network_interfaces
        .iter()
        .flatten()
        .map(flatten_network_interface)
        .collect();
    BlockBuilder::new()
        .set(VIRTUAL_NETWORK_NAME, network.virtual_network_name.clone())
        .set(NETWORK_RESOURCE_GROUP_NAME, network.resource_group_name.clone())
        .nested(NETWORK_INTERFACES, interfaces)
        .build()
}

fn flatten_network_interface(nic: &NetworkInterface) -> Value {
    let additional_ip_configurations = nic
        .additional_ip_configurations
        .iter()
        .flatten()
        .map(|config| {
            BlockBuilder::new()
                .set(REF_NAME, config.name.clone())
                .set(PRIVATE_IP_ADDRESS_VERSION, config.private_ip_address_version.clone())
                .build()
        })
        .collect();

    BlockBuilder::new()
        .set(SUBNET_NAME, nic.subnet_name.clone())
        .set(IS_PRIMARY, nic.is_primary)
        .set(ASSIGN_PUBLIC_IP, nic.assign_public_ip)
        .set(PUBLIC_IP_SKU, nic.public_ip_sku.clone())
        .nested(
            NETWORK_SECURITY_GROUP,
            nic.network_security_group.iter().map(flatten_resource_ref).collect(),
        )
        .set(ENABLE_IP_FORWARDING, nic.enable_ip_forwarding)
        .set(PRIVATE_IP_ADDRESSES, nic.private_ip_addresses.clone())
        .nested(ADDITIONAL_IP_CONFIGURATIONS, additional_ip_configurations)
        .nested(
            PUBLIC_IPS,
            nic.public_ips.iter().flatten().map(flatten_resource_ref).collect(),
        )
        .nested(
            APPLICATION_SECURITY_GROUPS,
            nic.application_security_groups
                .iter()
                .flatten()
                .map(flatten_resource_ref)
                .collect(),
        )
        .build()
}

fn flatten_resource_ref(entry: &ResourceRef) -> Value {
    BlockBuilder::new()
        .set(REF_NAME, entry.name.clone())
        .set(REF_RESOURCE_GROUP_NAME, entry.resource_group_name.clone())
        .build()
}

// =============================================================================
// Persistence
// =============================================================================

fn register_persistence(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(SHOULD_PERSIST_OS_DISK, AttributeType::Bool).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node.persistence.as_ref().and_then(|p| p.should_persist_os_disk);
            data.set_opt(SHOULD_PERSIST_OS_DISK, value);
            Ok(())
        })
        .on_create(write_should_persist_os_disk)
        .on_update(write_should_persist_os_disk),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(OS_DISK_PERSISTENCE_MODE, types::one_of(PERSISTENCE_MODES)),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node
                .persistence
                .as_ref()
                .and_then(|p| p.os_disk_persistence_mode.clone());
            data.set_opt(OS_DISK_PERSISTENCE_MODE, value);
            Ok(())
        })
        .on_create(write_os_disk_persistence_mode)
        .on_update(write_os_disk_persistence_mode),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(SHOULD_PERSIST_DATA_DISKS, AttributeType::Bool).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node
                .persistence
                .as_ref()
                .and_then(|p| p.should_persist_data_disks);
            data.set_opt(SHOULD_PERSIST_DATA_DISKS, value);
            Ok(())
        })
        .on_create(write_should_persist_data_disks)
        .on_update(write_should_persist_data_disks),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(DATA_DISKS_PERSISTENCE_MODE, types::one_of(PERSISTENCE_MODES)),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node
                .persistence
                .as_ref()
                .and_then(|p| p.data_disks_persistence_mode.clone());
            data.set_opt(DATA_DISKS_PERSISTENCE_MODE, value);
            Ok(())
        })
        .on_create(write_data_disks_persistence_mode)
        .on_update(write_data_disks_persistence_mode),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(SHOULD_PERSIST_NETWORK, AttributeType::Bool).required(),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node.persistence.as_ref().and_then(|p| p.should_persist_network);
            data.set_opt(SHOULD_PERSIST_NETWORK, value);
            Ok(())
        })
        .on_create(write_should_persist_network)
        .on_update(write_should_persist_network),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_PERSISTENCE,
            AttributeSchema::new(SHOULD_PERSIST_VM, AttributeType::Bool),
        )
        .on_read(|node: &StatefulNode, data| {
            let value = node.persistence.as_ref().and_then(|p| p.should_persist_vm);
            data.set_opt(SHOULD_PERSIST_VM, value);
            Ok(())
        })
        .on_create(write_should_persist_vm)
        .on_update(write_should_persist_vm),
    )?;

    Ok(())
}

fn write_should_persist_os_disk(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    node.persistence_mut().should_persist_os_disk = data.get_bool(SHOULD_PERSIST_OS_DISK)?;
    Ok(())
}

fn write_os_disk_persistence_mode(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    node.persistence_mut().os_disk_persistence_mode = data.get_string(OS_DISK_PERSISTENCE_MODE)?;
    Ok(())
}

fn write_should_persist_data_disks(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    node.persistence_mut().should_persist_data_disks = data.get_bool(SHOULD_PERSIST_DATA_DISKS)?;
    Ok(())
}

fn write_data_disks_persistence_mode(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    node.persistence_mut().data_disks_persistence_mode =
        data.get_string(DATA_DISKS_PERSISTENCE_MODE)?;
    Ok(())
}

fn write_should_persist_network(
    node: &mut Handle<StatefulNode>,
    data: &ResourceData,
) -> FieldResult<()> {
    node.persistence_mut().should_persist_network = data.get_bool(SHOULD_PERSIST_NETWORK)?;
    Ok(())
}

fn write_should_persist_vm(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    node.persistence_mut().should_persist_vm = data.get_bool(SHOULD_PERSIST_VM)?;
    Ok(())
}

// =============================================================================
// Health
// =============================================================================

fn register_health(fields: &mut FieldRegistry<StatefulNode>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_HEALTH,
            AttributeSchema::new(
                HEALTH,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(HEALTH_CHECK_TYPES, types::string_list())
                                .required(),
                        )
                        .attribute(AttributeSchema::new(GRACE_PERIOD, types::non_negative_int()))
                        .attribute(AttributeSchema::new(
                            UNHEALTHY_DURATION,
                            types::non_negative_int(),
                        ))
                        .attribute(AttributeSchema::new(AUTO_HEALING, AttributeType::Bool).required())
                        .max_items(1),
                ),
            ),
        )
        .on_read(|node: &StatefulNode, data| {
            let entry = node.health.as_ref().map(|health| {
                BlockBuilder::new()
                    .set(HEALTH_CHECK_TYPES, health.health_check_types.clone())
                    .set(GRACE_PERIOD, health.grace_period)
                    .set(UNHEALTHY_DURATION, health.unhealthy_duration)
                    .set(AUTO_HEALING, health.auto_healing)
                    .build()
            });
            data.set_opt(HEALTH, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_health)
        .on_update(write_health),
    )?;

    Ok(())
}

fn write_health(node: &mut Handle<StatefulNode>, data: &ResourceData) -> FieldResult<()> {
    let health = block(data, HEALTH)?.map(|entry| Health {
        health_check_types: entry.strings(HEALTH_CHECK_TYPES),
        grace_period: entry.int(GRACE_PERIOD),
        unhealthy_duration: entry.int(UNHEALTHY_DURATION),
        auto_healing: entry.bool(AUTO_HEALING),
    });
    node.health = Nullable::new(health, data.is_removed(HEALTH));
    Ok(())
}
