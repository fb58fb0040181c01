//! spotinst_elastigroup_gcp

use spotform_core::data::ResourceData;
use spotform_core::expand::{Block, BlockBuilder, block, blocks, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::ResourceConfig;
use crate::models::elastigroup_gcp::{
    AccessConfig, AliasIpRange, Gpu, Group, NetworkInterface, Task,
};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_elastigroup_gcp",
    label: "Group",
    not_found_code: "GROUP_DOESNT_EXIST",
    retry_on: None,
    description: "Elastigroup running on Google Compute Engine",
};

const AFFINITY: &str = "elastigroup_gcp";
const AFFINITY_NETWORK_INTERFACE: &str = "elastigroup_gcp_network_interface";
const AFFINITY_GPU: &str = "elastigroup_gcp_gpu";
const AFFINITY_STRATEGY: &str = "elastigroup_gcp_strategy";
const AFFINITY_SCHEDULED_TASK: &str = "elastigroup_gcp_scheduled_task";

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const MAX_SIZE: &str = "max_size";
pub const MIN_SIZE: &str = "min_size";
pub const DESIRED_CAPACITY: &str = "desired_capacity";
pub const NETWORK_INTERFACE: &str = "network_interface";
pub const PREEMPTIBLE_PERCENTAGE: &str = "preemptible_percentage";
pub const ONDEMAND_COUNT: &str = "ondemand_count";
pub const DRAINING_TIMEOUT: &str = "draining_timeout";
pub const FALLBACK_TO_ONDEMAND: &str = "fallback_to_ondemand";
pub const PROVISIONING_MODEL: &str = "provisioning_model";
pub const GPU: &str = "gpu";
pub const SCHEDULED_TASK: &str = "scheduled_task";

const NETWORK: &str = "network";
const ACCESS_CONFIGS: &str = "access_configs";
const ACCESS_CONFIG_NAME: &str = "name";
const ACCESS_CONFIG_TYPE: &str = "type";
const ALIAS_IP_RANGES: &str = "alias_ip_ranges";
const IP_CIDR_RANGE: &str = "ip_cidr_range";
const SUBNETWORK_RANGE_NAME: &str = "subnetwork_range_name";
const GPU_COUNT: &str = "count";
const GPU_TYPE: &str = "type";
const TASK_IS_ENABLED: &str = "is_enabled";
const TASK_TYPE: &str = "task_type";
const TASK_CRON_EXPRESSION: &str = "cron_expression";
const TASK_TARGET_CAPACITY: &str = "target_capacity";
const TASK_MIN_CAPACITY: &str = "min_capacity";
const TASK_MAX_CAPACITY: &str = "max_capacity";

pub fn fields() -> Result<FieldRegistry<Group>, RegistryError> {
    let mut fields = FieldRegistry::new();
    register_group(&mut fields)?;
    register_network_interfaces(&mut fields)?;
    register_gpu(&mut fields)?;
    register_strategy(&mut fields)?;
    register_scheduled_tasks(&mut fields)?;
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
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(DESCRIPTION, AttributeType::String))
            .on_read(|group: &Group, data| {
                data.set_opt(DESCRIPTION, group.description.clone());
                Ok(())
            })
            .on_create(write_description)
            .on_update(write_description),
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

fn write_description(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.description = data.get_string(DESCRIPTION)?;
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
// Network Interfaces
// =============================================================================

fn register_network_interfaces(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    let access_config = BlockSchema::new()
        .attribute(AttributeSchema::new(ACCESS_CONFIG_NAME, AttributeType::String))
        .attribute(AttributeSchema::new(ACCESS_CONFIG_TYPE, AttributeType::String));
    let alias_ip_range = BlockSchema::new()
        .attribute(AttributeSchema::new(IP_CIDR_RANGE, AttributeType::String).required())
        .attribute(AttributeSchema::new(SUBNETWORK_RANGE_NAME, AttributeType::String).required());

    fields.register(
        FieldDescriptor::new(
            AFFINITY_NETWORK_INTERFACE,
            AttributeSchema::new(
                NETWORK_INTERFACE,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(NETWORK, AttributeType::String).required())
                        .attribute(AttributeSchema::new(
                            ACCESS_CONFIGS,
                            AttributeType::Block(access_config),
                        ))
                        .attribute(AttributeSchema::new(
                            ALIAS_IP_RANGES,
                            AttributeType::Block(alias_ip_range),
                        )),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entries = group
                .compute
                .as_ref()
                .and_then(|c| c.network_interfaces.as_ref())
                .map(|interfaces| flatten_network_interfaces(interfaces))
                .unwrap_or_default();
            data.set_opt(NETWORK_INTERFACE, flattened(entries));
            Ok(())
        })
        .on_create(write_network_interfaces)
        .on_update(write_network_interfaces),
    )?;

    Ok(())
}

fn write_network_interfaces(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let interfaces = blocks(data, NETWORK_INTERFACE)?
        .map(|entries| entries.iter().map(expand_network_interface).collect());
    group.compute_mut().network_interfaces = interfaces;
    Ok(())
}

fn expand_network_interface(entry: &Block<'_>) -> NetworkInterface {
    let access_configs: Vec<AccessConfig> = entry
        .blocks(ACCESS_CONFIGS)
        .iter()
        .map(|config| AccessConfig {
            name: config.string(ACCESS_CONFIG_NAME),
            kind: config.string(ACCESS_CONFIG_TYPE),
        })
        .collect();
    let alias_ip_ranges: Vec<AliasIpRange> = entry
        .blocks(ALIAS_IP_RANGES)
        .iter()
        .map(|range| AliasIpRange {
            ip_cidr_range: range.string(IP_CIDR_RANGE),
            subnetwork_range_name: range.string(SUBNETWORK_RANGE_NAME),
        })
        .collect();

    NetworkInterface {
        network: entry.string(NETWORK),
        access_configs: Some(access_configs).filter(|c| !c.is_empty()),
        alias_ip_ranges: Some(alias_ip_ranges).filter(|r| !r.is_empty()),
    }
}

fn flatten_network_interfaces(interfaces: &[NetworkInterface]) -> Vec<Value> {
    interfaces
        .iter()
        .map(|interface| {
            let access_configs = interface
                .access_configs
                .iter()
                .flatten()
                .map(|config| {
                    BlockBuilder::new()
                        .set(ACCESS_CONFIG_NAME, config.name.clone())
                        .set(ACCESS_CONFIG_TYPE, config.kind.clone())
                        .build()
                })
                .collect();
            let alias_ip_ranges = interface
                .alias_ip_ranges
                .iter()
                .flatten()
                .map(|range| {
                    BlockBuilder::new()
                        .set(IP_CIDR_RANGE, range.ip_cidr_range.clone())
                        .set(SUBNETWORK_RANGE_NAME, range.subnetwork_range_name.clone())
                        .build()
                })
                .collect();
            BlockBuilder::new()
                .set(NETWORK, interface.network.clone())
                .nested(ACCESS_CONFIGS, access_configs)
                .nested(ALIAS_IP_RANGES, alias_ip_ranges)
                .build()
        })
        .collect()
}

// =============================================================================
// GPU
// =============================================================================

fn register_gpu(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_GPU,
            AttributeSchema::new(
                GPU,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(GPU_COUNT, types::positive_int()).required())
                        .attribute(AttributeSchema::new(GPU_TYPE, AttributeType::String).required())
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entry = group.compute.as_ref().and_then(|c| c.gpu.as_ref()).map(|gpu| {
                BlockBuilder::new()
                    .set(GPU_COUNT, gpu.count)
                    .set(GPU_TYPE, gpu.kind.clone())
                    .build()
            });
            data.set_opt(GPU, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_gpu)
        .on_update(write_gpu),
    )?;

    Ok(())
}

fn write_gpu(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let gpu = block(data, GPU)?
        .map(|entry| -> FieldResult<Gpu> {
            Ok(Gpu {
                count: Some(
                    entry
                        .positive_int(GPU_COUNT)
                        .ok_or_else(|| FieldError::missing(GPU, GPU_COUNT))?,
                ),
                kind: Some(
                    entry
                        .string(GPU_TYPE)
                        .ok_or_else(|| FieldError::missing(GPU, GPU_TYPE))?,
                ),
            })
        })
        .transpose()?;
    group.compute_mut().gpu = gpu;
    Ok(())
}

// =============================================================================
// Strategy
// =============================================================================

fn register_strategy(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(PREEMPTIBLE_PERCENTAGE, types::percentage())
                .conflicts_with(ONDEMAND_COUNT),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                PREEMPTIBLE_PERCENTAGE,
                group.strategy.as_ref().and_then(|s| s.preemptible_percentage),
            );
            Ok(())
        })
        .on_create(write_preemptible_percentage)
        .on_update(write_preemptible_percentage),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(ONDEMAND_COUNT, types::non_negative_int())
                .conflicts_with(PREEMPTIBLE_PERCENTAGE),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                ONDEMAND_COUNT,
                group.strategy.as_ref().and_then(|s| s.on_demand_count),
            );
            Ok(())
        })
        .on_create(write_ondemand_count)
        .on_update(write_ondemand_count),
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
            AttributeSchema::new(FALLBACK_TO_ONDEMAND, AttributeType::Bool),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                FALLBACK_TO_ONDEMAND,
                group.strategy.as_ref().and_then(|s| s.fallback_to_od),
            );
            Ok(())
        })
        .on_create(write_fallback_to_ondemand)
        .on_update(write_fallback_to_ondemand),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(PROVISIONING_MODEL, types::one_of(&["SPOT", "PREEMPTIBLE"])),
        )
        .on_read(|group: &Group, data| {
            let v = group
                .strategy
                .as_ref()
                .and_then(|s| s.provisioning_model.clone());
            data.set_opt(PROVISIONING_MODEL, v);
            Ok(())
        })
        .on_create(write_provisioning_model)
        .on_update(write_provisioning_model),
    )?;

    Ok(())
}

fn write_preemptible_percentage(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().preemptible_percentage = data.get_int(PREEMPTIBLE_PERCENTAGE)?;
    Ok(())
}

fn write_ondemand_count(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().on_demand_count = data.get_int(ONDEMAND_COUNT)?;
    Ok(())
}

fn write_draining_timeout(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().draining_timeout = data.get_positive_int(DRAINING_TIMEOUT)?;
    Ok(())
}

fn write_fallback_to_ondemand(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().fallback_to_od = data.get_bool(FALLBACK_TO_ONDEMAND)?;
    Ok(())
}

fn write_provisioning_model(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().provisioning_model = data.get_string(PROVISIONING_MODEL)?;
    Ok(())
}

// =============================================================================
// Scheduled Tasks
// =============================================================================

fn register_scheduled_tasks(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_SCHEDULED_TASK,
            AttributeSchema::new(
                SCHEDULED_TASK,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(TASK_IS_ENABLED, AttributeType::Bool))
                        .attribute(
                            AttributeSchema::new(TASK_TYPE, types::one_of(&["setCapacity"]))
                                .required(),
                        )
                        .attribute(
                            AttributeSchema::new(TASK_CRON_EXPRESSION, AttributeType::String)
                                .required(),
                        )
                        .attribute(AttributeSchema::new(
                            TASK_TARGET_CAPACITY,
                            types::non_negative_int(),
                        ))
                        .attribute(AttributeSchema::new(
                            TASK_MIN_CAPACITY,
                            types::non_negative_int(),
                        ))
                        .attribute(AttributeSchema::new(
                            TASK_MAX_CAPACITY,
                            types::non_negative_int(),
                        )),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entries: Vec<Value> = group
                .scheduling
                .as_ref()
                .and_then(|s| s.tasks.as_ref())
                .map(|tasks| {
                    tasks
                        .iter()
                        .map(|task| {
                            BlockBuilder::new()
                                .set(TASK_IS_ENABLED, task.is_enabled)
                                .set(TASK_TYPE, task.kind.clone())
                                .set(TASK_CRON_EXPRESSION, task.cron_expression.clone())
                                .set(TASK_TARGET_CAPACITY, task.target_capacity)
                                .set(TASK_MIN_CAPACITY, task.min_capacity)
                                .set(TASK_MAX_CAPACITY, task.max_capacity)
                                .build()
                        })
                        .collect()
                })
                .unwrap_or_default();
            data.set_opt(SCHEDULED_TASK, flattened(entries));
            Ok(())
        })
        .on_create(write_scheduled_tasks)
        .on_update(write_scheduled_tasks),
    )?;

    Ok(())
}

fn write_scheduled_tasks(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let tasks = blocks(data, SCHEDULED_TASK)?.map(|entries| {
        entries
            .iter()
            .map(|entry| Task {
                is_enabled: entry.bool(TASK_IS_ENABLED),
                kind: entry.string(TASK_TYPE),
                cron_expression: entry.string(TASK_CRON_EXPRESSION),
                target_capacity: entry.int(TASK_TARGET_CAPACITY),
                min_capacity: entry.int(TASK_MIN_CAPACITY),
                max_capacity: entry.int(TASK_MAX_CAPACITY),
            })
            .collect()
    });
    group.scheduling_mut().tasks = tasks;
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

    fn network_interfaces() -> Value {
        let first = BlockBuilder::new()
            .set(NETWORK, Some("default"))
            .nested(
                ACCESS_CONFIGS,
                vec![
                    BlockBuilder::new()
                        .set(ACCESS_CONFIG_NAME, Some("external"))
                        .set(ACCESS_CONFIG_TYPE, Some("ONE_TO_ONE_NAT"))
                        .build(),
                ],
            )
            .build();
        let second = BlockBuilder::new()
            .set(NETWORK, Some("internal"))
            .nested(
                ALIAS_IP_RANGES,
                vec![
                    BlockBuilder::new()
                        .set(IP_CIDR_RANGE, Some("10.128.0.0/24"))
                        .set(SUBNETWORK_RANGE_NAME, Some("pods"))
                        .build(),
                ],
            )
            .build();
        Value::List(vec![first, second])
    }

    fn config() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("eg-gcp"));
        attrs.insert(MIN_SIZE.to_string(), Value::Int(0));
        attrs.insert(MAX_SIZE.to_string(), Value::Int(2));
        attrs.insert(NETWORK_INTERFACE.to_string(), network_interfaces());
        attrs
    }

    #[test]
    fn network_interfaces_round_trip() {
        let wrapper = wrapper();
        let group = wrapper
            .on_create(None, &ResourceData::new(config()))
            .unwrap();

        let interfaces = group.compute.as_ref().unwrap().network_interfaces.as_ref().unwrap();
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[1].alias_ip_ranges.as_ref().unwrap().len(), 1);

        let mut state = ResourceData::for_read("sig-gcp");
        wrapper.on_read(&group, &mut state).unwrap();
        assert_eq!(state.into_attributes(), config());
    }

    #[test]
    fn gpu_requires_type() {
        let mut attrs = config();
        attrs.insert(
            GPU.to_string(),
            Value::List(vec![BlockBuilder::new().set(GPU_COUNT, Some(Value::Int(1))).build()]),
        );
        let err = wrapper()
            .on_create(None, &ResourceData::new(attrs))
            .unwrap_err();
        assert_eq!(err, FieldError::missing(GPU, GPU_TYPE));
    }

    #[test]
    fn scheduled_task_update() {
        let task = BlockBuilder::new()
            .set(TASK_TYPE, Some("setCapacity"))
            .set(TASK_CRON_EXPRESSION, Some("0 1 * * *"))
            .set(TASK_TARGET_CAPACITY, Some(Value::Int(3)))
            .build();
        let mut current = config();
        current.insert(SCHEDULED_TASK.to_string(), Value::List(vec![task]));

        let data = ResourceData::for_update("sig-gcp", config(), current);
        let (changed, group) = wrapper().on_update(&data).unwrap();

        assert!(changed);
        let tasks = group.scheduling.unwrap().tasks.unwrap();
        assert_eq!(tasks[0].target_capacity, Some(3));
        assert!(group.name.is_none());
    }
}
