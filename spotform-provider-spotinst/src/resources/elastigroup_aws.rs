//! spotinst_elastigroup_aws
//!
//! AWS elastigroup. The three balancer fields (`elastic_load_balancers`,
//! `target_group_arns`, `multai_target_sets`) share one vendor list. On
//! create each field appends its own kind. On update the first field that
//! fires rebuilds the list from all three kinds, and the list is cleared only
//! when all three are empty.

use std::sync::LazyLock;

use regex::Regex;
use spotform_core::data::ResourceData;
use spotform_core::expand::{BlockBuilder, block, blocks, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::{IAM_PROFILE_NOT_READY, ResourceConfig};
use crate::models::Nullable;
use crate::models::elastigroup_aws::{
    AvailabilityZone, Domain, Group, GroupTag, Integration, LoadBalancer, RecordSet, RevertToSpot,
    Route53Integration, Signal,
};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_elastigroup_aws",
    label: "Group",
    not_found_code: "GROUP_DOESNT_EXIST",
    retry_on: Some(IAM_PROFILE_NOT_READY),
    description: "Elastigroup running on AWS EC2",
};

const AFFINITY: &str = "elastigroup_aws";
const AFFINITY_STRATEGY: &str = "elastigroup_aws_strategy";
const AFFINITY_INTEGRATIONS: &str = "elastigroup_aws_integrations";

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const PRODUCT: &str = "product";
pub const MAX_SIZE: &str = "max_size";
pub const MIN_SIZE: &str = "min_size";
pub const DESIRED_CAPACITY: &str = "desired_capacity";
pub const CAPACITY_UNIT: &str = "capacity_unit";
pub const HEALTH_CHECK_GRACE_PERIOD: &str = "health_check_grace_period";
pub const HEALTH_CHECK_TYPE: &str = "health_check_type";
pub const HEALTH_CHECK_UNHEALTHY_DURATION: &str =
    "health_check_unhealthy_duration_before_replacement";
pub const REGION: &str = "region";
pub const SUBNET_IDS: &str = "subnet_ids";
pub const AVAILABILITY_ZONES: &str = "availability_zones";
pub const ELASTIC_LOAD_BALANCERS: &str = "elastic_load_balancers";
pub const TARGET_GROUP_ARNS: &str = "target_group_arns";
pub const MULTAI_TARGET_SETS: &str = "multai_target_sets";
pub const TAGS: &str = "tags";
pub const ELASTIC_IPS: &str = "elastic_ips";
pub const REVERT_TO_SPOT: &str = "revert_to_spot";
pub const SIGNAL: &str = "signal";

pub const SPOT_PERCENTAGE: &str = "spot_percentage";
pub const ONDEMAND_COUNT: &str = "ondemand_count";
pub const ORIENTATION: &str = "orientation";
pub const LIFETIME_PERIOD: &str = "lifetime_period";
pub const DRAINING_TIMEOUT: &str = "draining_timeout";
pub const UTILIZE_RESERVED_INSTANCES: &str = "utilize_reserved_instances";
pub const FALLBACK_TO_ONDEMAND: &str = "fallback_to_ondemand";

pub const INTEGRATION_ROUTE53: &str = "integration_route53";

const TARGET_SET_ID: &str = "target_set_id";
const BALANCER_ID: &str = "balancer_id";
const TAG_KEY: &str = "key";
const TAG_VALUE: &str = "value";
const PERFORM_AT: &str = "perform_at";
const TIME_WINDOWS: &str = "time_windows";
const SIGNAL_NAME: &str = "name";
const SIGNAL_TIMEOUT: &str = "timeout";
const DOMAINS: &str = "domains";
const HOSTED_ZONE_ID: &str = "hosted_zone_id";
const SPOTINST_ACCT_ID: &str = "spotinst_acct_id";
const RECORD_SET_TYPE: &str = "record_set_type";
const RECORD_SETS: &str = "record_sets";
const RECORD_SET_NAME: &str = "name";
const USE_PUBLIC_IP: &str = "use_public_ip";
const USE_PUBLIC_DNS: &str = "use_public_dns";

static TARGET_GROUP_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"arn:aws:elasticloadbalancing:.*:\d{12}:targetgroup/(.*)/.*")
        .expect("target group arn pattern is valid")
});

pub fn fields() -> Result<FieldRegistry<Group>, RegistryError> {
    let mut fields = FieldRegistry::new();
    register_group(&mut fields)?;
    register_capacity(&mut fields)?;
    register_compute(&mut fields)?;
    register_balancers(&mut fields)?;
    register_strategy(&mut fields)?;
    register_integrations(&mut fields)?;
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
            AttributeSchema::new(DESCRIPTION, AttributeType::String).required(),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(DESCRIPTION, group.description.as_ref().cloned());
            Ok(())
        })
        .on_create(write_description)
        .on_update(write_description),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(PRODUCT, AttributeType::String)
                .required()
                .with_description("Operating system product, e.g. Linux/UNIX"),
        )
        .on_read(|group: &Group, data| {
            let product = group.compute.as_ref().and_then(|c| c.product.clone());
            data.set_opt(PRODUCT, product);
            Ok(())
        })
        .on_create(|group, data| {
            group.compute_mut().product = data.get_string(PRODUCT)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(PRODUCT))),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(REGION, AttributeType::String))
            .on_read(|group: &Group, data| {
                data.set_opt(REGION, group.region.clone());
                Ok(())
            })
            .on_create(write_region)
            .on_update(write_region),
    )?;

    Ok(())
}

fn write_name(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.name = data.get_string(NAME)?;
    Ok(())
}

fn write_description(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.description =
        Nullable::new(data.get_string(DESCRIPTION)?, data.is_removed(DESCRIPTION));
    Ok(())
}

fn write_region(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.region = data.get_string(REGION)?;
    Ok(())
}

// =============================================================================
// Capacity
// =============================================================================

fn register_capacity(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(MAX_SIZE, types::non_negative_int()),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(MAX_SIZE, group.capacity.as_ref().and_then(|c| c.maximum));
            Ok(())
        })
        .on_create(write_max_size)
        .on_update(write_max_size),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(MIN_SIZE, types::non_negative_int()),
        )
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
            data.set_opt(
                DESIRED_CAPACITY,
                group.capacity.as_ref().and_then(|c| c.target),
            );
            Ok(())
        })
        .on_create(write_desired_capacity)
        .on_update(write_desired_capacity),
    )?;

    // Changing the unit replaces the group, so there is no update callback
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(CAPACITY_UNIT, types::one_of(&["instance", "weight"]))
                .force_new(),
        )
        .on_read(|group: &Group, data| {
            let unit = group.capacity.as_ref().and_then(|c| c.unit.clone());
            data.set_opt(CAPACITY_UNIT, unit);
            Ok(())
        })
        .on_create(|group, data| {
            group.capacity_mut().unit = data.get_string(CAPACITY_UNIT)?;
            Ok(())
        }),
    )?;

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
// Compute
// =============================================================================

fn register_compute(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(HEALTH_CHECK_TYPE, AttributeType::String),
        )
        .on_read(|group: &Group, data| {
            let v = group
                .launch_specification()
                .and_then(|spec| spec.health_check_type.clone());
            data.set_opt(HEALTH_CHECK_TYPE, v);
            Ok(())
        })
        .on_create(write_health_check_type)
        .on_update(write_health_check_type),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(HEALTH_CHECK_GRACE_PERIOD, types::non_negative_int()),
        )
        .on_read(|group: &Group, data| {
            let v = group
                .launch_specification()
                .and_then(|spec| spec.health_check_grace_period);
            data.set_opt(HEALTH_CHECK_GRACE_PERIOD, v);
            Ok(())
        })
        .on_create(write_health_check_grace_period)
        .on_update(write_health_check_grace_period),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(HEALTH_CHECK_UNHEALTHY_DURATION, types::non_negative_int()),
        )
        .on_read(|group: &Group, data| {
            let v = group
                .launch_specification()
                .and_then(|spec| spec.health_check_unhealthy_duration_before_replacement);
            data.set_opt(HEALTH_CHECK_UNHEALTHY_DURATION, v);
            Ok(())
        })
        .on_create(write_health_check_unhealthy_duration)
        .on_update(write_health_check_unhealthy_duration),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(SUBNET_IDS, types::string_list()).conflicts_with(AVAILABILITY_ZONES),
        )
        .on_read(|group: &Group, data| {
            let v = group.compute.as_ref().and_then(|c| c.subnet_ids.clone());
            data.set_opt(SUBNET_IDS, v);
            Ok(())
        })
        .on_create(write_subnet_ids)
        .on_update(write_subnet_ids),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(AVAILABILITY_ZONES, types::string_list())
                .conflicts_with(SUBNET_IDS)
                .with_description("Zones as zone[:subnet_id[:placement_group]]"),
        )
        .on_read(|group: &Group, data| {
            let zones = group
                .compute
                .as_ref()
                .and_then(|c| c.availability_zones.as_ref())
                .map(|zones| zones.iter().map(flatten_availability_zone).collect::<Vec<_>>());
            data.set_opt(AVAILABILITY_ZONES, zones);
            Ok(())
        })
        .on_create(write_availability_zones)
        .on_update(write_availability_zones),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                TAGS,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(TAG_KEY, AttributeType::String).required())
                        .attribute(AttributeSchema::new(TAG_VALUE, AttributeType::String)),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entries: Vec<Value> = group
                .launch_specification()
                .and_then(|spec| spec.tags.as_ref())
                .map(|tags| {
                    tags.iter()
                        .map(|tag| {
                            BlockBuilder::new()
                                .set(TAG_KEY, tag.tag_key.clone())
                                .set(TAG_VALUE, tag.tag_value.clone())
                                .build()
                        })
                        .collect()
                })
                .unwrap_or_default();
            data.set_opt(TAGS, flattened(entries));
            Ok(())
        })
        .on_create(write_tags)
        .on_update(write_tags),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(ELASTIC_IPS, types::string_list()))
            .on_read(|group: &Group, data| {
                let v = group.compute.as_ref().and_then(|c| c.elastic_ips.as_ref().cloned());
                data.set_opt(ELASTIC_IPS, v);
                Ok(())
            })
            .on_create(write_elastic_ips)
            .on_update(write_elastic_ips),
    )?;

    Ok(())
}

fn write_health_check_type(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.launch_specification_mut().health_check_type = data.get_string(HEALTH_CHECK_TYPE)?;
    Ok(())
}

fn write_health_check_grace_period(
    group: &mut Handle<Group>,
    data: &ResourceData,
) -> FieldResult<()> {
    group.launch_specification_mut().health_check_grace_period =
        data.get_positive_int(HEALTH_CHECK_GRACE_PERIOD)?;
    Ok(())
}

fn write_health_check_unhealthy_duration(
    group: &mut Handle<Group>,
    data: &ResourceData,
) -> FieldResult<()> {
    group
        .launch_specification_mut()
        .health_check_unhealthy_duration_before_replacement =
        data.get_positive_int(HEALTH_CHECK_UNHEALTHY_DURATION)?;
    Ok(())
}

fn write_subnet_ids(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(ids) = data.get_strings(SUBNET_IDS)?.filter(|ids| !ids.is_empty()) {
        group.compute_mut().subnet_ids = Some(ids);
    }
    Ok(())
}

fn write_availability_zones(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(zones) = data.get_strings(AVAILABILITY_ZONES)?.filter(|z| !z.is_empty()) {
        group.compute_mut().availability_zones =
            Some(zones.iter().map(|z| expand_availability_zone(z)).collect());
    }
    Ok(())
}

fn write_tags(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let tags = blocks(data, TAGS)?.map(|entries| {
        entries
            .iter()
            .map(|entry| GroupTag {
                tag_key: entry.string(TAG_KEY),
                tag_value: entry.string(TAG_VALUE),
            })
            .collect()
    });
    group.launch_specification_mut().tags = Nullable::new(tags, data.is_removed(TAGS));
    Ok(())
}

fn write_elastic_ips(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let ips = data.get_strings(ELASTIC_IPS)?.filter(|ips| !ips.is_empty());
    group.compute_mut().elastic_ips = Nullable::new(ips, data.is_removed(ELASTIC_IPS));
    Ok(())
}

/// Parse `zone[:subnet_id[:placement_group]]`
fn expand_availability_zone(zone: &str) -> AvailabilityZone {
    let mut parts = zone.splitn(3, ':').map(str::trim);
    let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
    AvailabilityZone {
        name: non_empty(parts.next()),
        subnet_id: non_empty(parts.next()),
        placement_group_name: non_empty(parts.next()),
    }
}

fn flatten_availability_zone(zone: &AvailabilityZone) -> String {
    let mut out = zone.name.clone().unwrap_or_default();
    match (&zone.subnet_id, &zone.placement_group_name) {
        (Some(subnet), Some(group)) => out.push_str(&format!(":{}:{}", subnet, group)),
        (Some(subnet), None) => out.push_str(&format!(":{}", subnet)),
        (None, Some(group)) => out.push_str(&format!("::{}", group)),
        (None, None) => {}
    }
    out
}

// =============================================================================
// Load Balancers
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalancerKind {
    Classic,
    TargetGroup,
    MultaiTargetSet,
}

impl BalancerKind {
    const ALL: [BalancerKind; 3] = [
        BalancerKind::Classic,
        BalancerKind::TargetGroup,
        BalancerKind::MultaiTargetSet,
    ];

    fn as_str(self) -> &'static str {
        match self {
            BalancerKind::Classic => "CLASSIC",
            BalancerKind::TargetGroup => "TARGET_GROUP",
            BalancerKind::MultaiTargetSet => "MULTAI_TARGET_SET",
        }
    }

    fn of(balancer: &LoadBalancer) -> Option<BalancerKind> {
        let kind = balancer.kind.as_deref()?;
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(kind))
    }

    /// Balancers of this kind declared in the configuration
    fn expand(self, data: &ResourceData) -> FieldResult<Vec<LoadBalancer>> {
        let kind = Some(self.as_str().to_string());
        match self {
            BalancerKind::Classic => Ok(data
                .get_strings(ELASTIC_LOAD_BALANCERS)?
                .unwrap_or_default()
                .into_iter()
                .map(|name| LoadBalancer {
                    kind: kind.clone(),
                    name: Some(name),
                    ..LoadBalancer::default()
                })
                .collect()),
            BalancerKind::TargetGroup => data
                .get_strings(TARGET_GROUP_ARNS)?
                .unwrap_or_default()
                .into_iter()
                .map(|arn| {
                    let name = target_group_name(&arn)?;
                    Ok(LoadBalancer {
                        kind: kind.clone(),
                        name: Some(name),
                        arn: Some(arn),
                        ..LoadBalancer::default()
                    })
                })
                .collect(),
            BalancerKind::MultaiTargetSet => Ok(blocks(data, MULTAI_TARGET_SETS)?
                .unwrap_or_default()
                .iter()
                .map(|entry| LoadBalancer {
                    kind: kind.clone(),
                    balancer_id: entry.string(BALANCER_ID),
                    target_set_id: entry.string(TARGET_SET_ID),
                    ..LoadBalancer::default()
                })
                .collect()),
        }
    }
}

fn target_group_name(arn: &str) -> FieldResult<String> {
    TARGET_GROUP_ARN
        .captures(arn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            FieldError::invalid(
                TARGET_GROUP_ARNS,
                format!("cannot determine target group name from arn '{}'", arn),
            )
        })
}

fn balancers_of(group: &Group, kind: BalancerKind) -> impl Iterator<Item = &LoadBalancer> {
    group
        .load_balancers()
        .iter()
        .filter(move |b| BalancerKind::of(b) == Some(kind))
}

/// Append the configured balancers of one kind to the group's list
fn append_balancers(
    group: &mut Handle<Group>,
    data: &ResourceData,
    kind: BalancerKind,
) -> FieldResult<()> {
    let balancers = kind.expand(data)?;
    if balancers.is_empty() {
        return Ok(());
    }
    let mut merged = group.load_balancers().to_vec();
    merged.extend(balancers);
    group.set_load_balancers(merged);
    Ok(())
}

/// Rebuild the balancer list from every kind, once per update call
fn merge_balancers(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let mut empty_kinds = 0;
    for kind in BalancerKind::ALL {
        if !group.mark_once(kind.as_str()) {
            continue;
        }
        let balancers = kind.expand(data)?;
        if balancers.is_empty() {
            empty_kinds += 1;
            continue;
        }
        let mut merged = group.load_balancers().to_vec();
        merged.extend(balancers);
        group.set_load_balancers(merged);
    }

    if empty_kinds == BalancerKind::ALL.len() {
        group.set_load_balancers(Vec::new());
    }
    Ok(())
}

fn register_balancers(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(ELASTIC_LOAD_BALANCERS, types::string_list()),
        )
        .on_read(|group: &Group, data| {
            let names: Vec<String> = balancers_of(group, BalancerKind::Classic)
                .filter_map(|b| b.name.clone())
                .collect();
            data.set_opt(ELASTIC_LOAD_BALANCERS, Some(names).filter(|n| !n.is_empty()));
            Ok(())
        })
        .on_create(|group, data| append_balancers(group, data, BalancerKind::Classic))
        .on_update(merge_balancers),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(TARGET_GROUP_ARNS, types::string_list()),
        )
        .on_read(|group: &Group, data| {
            let arns: Vec<String> = balancers_of(group, BalancerKind::TargetGroup)
                .filter_map(|b| b.arn.clone())
                .collect();
            data.set_opt(TARGET_GROUP_ARNS, Some(arns).filter(|a| !a.is_empty()));
            Ok(())
        })
        .on_create(|group, data| append_balancers(group, data, BalancerKind::TargetGroup))
        .on_update(merge_balancers),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                MULTAI_TARGET_SETS,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(TARGET_SET_ID, AttributeType::String).required(),
                        )
                        .attribute(
                            AttributeSchema::new(BALANCER_ID, AttributeType::String).required(),
                        ),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entries = balancers_of(group, BalancerKind::MultaiTargetSet)
                .map(|b| {
                    BlockBuilder::new()
                        .set(TARGET_SET_ID, b.target_set_id.clone())
                        .set(BALANCER_ID, b.balancer_id.clone())
                        .build()
                })
                .collect();
            data.set_opt(MULTAI_TARGET_SETS, flattened(entries));
            Ok(())
        })
        .on_create(|group, data| append_balancers(group, data, BalancerKind::MultaiTargetSet))
        .on_update(merge_balancers),
    )?;

    Ok(())
}

// =============================================================================
// Strategy
// =============================================================================

fn register_strategy(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(SPOT_PERCENTAGE, types::percentage())
                .conflicts_with(ONDEMAND_COUNT),
        )
        .on_read(|group: &Group, data| {
            let risk = group.strategy.as_ref().and_then(|s| s.risk);
            data.set_opt(SPOT_PERCENTAGE, risk.map(|r| r.round() as i64));
            Ok(())
        })
        .on_create(write_spot_percentage)
        .on_update(write_spot_percentage),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(ONDEMAND_COUNT, types::non_negative_int())
                .conflicts_with(SPOT_PERCENTAGE),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                ONDEMAND_COUNT,
                group.strategy.as_ref().and_then(|s| s.on_demand_count.as_ref().copied()),
            );
            Ok(())
        })
        .on_create(write_ondemand_count)
        .on_update(write_ondemand_count),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(
                ORIENTATION,
                types::one_of(&[
                    "balanced",
                    "costOriented",
                    "availabilityOriented",
                    "equalAzDistribution",
                ]),
            ),
        )
        .on_read(|group: &Group, data| {
            let v = group
                .strategy
                .as_ref()
                .and_then(|s| s.availability_vs_cost.clone());
            data.set_opt(ORIENTATION, v);
            Ok(())
        })
        .on_create(write_orientation)
        .on_update(write_orientation),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(LIFETIME_PERIOD, AttributeType::String),
        )
        .on_read(|group: &Group, data| {
            let v = group.strategy.as_ref().and_then(|s| s.lifetime_period.clone());
            data.set_opt(LIFETIME_PERIOD, v);
            Ok(())
        })
        .on_create(write_lifetime_period)
        .on_update(write_lifetime_period),
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
            AttributeSchema::new(UTILIZE_RESERVED_INSTANCES, AttributeType::Bool),
        )
        .on_read(|group: &Group, data| {
            data.set_opt(
                UTILIZE_RESERVED_INSTANCES,
                group.strategy.as_ref().and_then(|s| s.utilize_reserved_instances),
            );
            Ok(())
        })
        .on_create(write_utilize_reserved_instances)
        .on_update(write_utilize_reserved_instances),
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
            AttributeSchema::new(
                REVERT_TO_SPOT,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(
                                PERFORM_AT,
                                types::one_of(&["always", "never", "timeWindow"]),
                            )
                            .required(),
                        )
                        .attribute(AttributeSchema::new(TIME_WINDOWS, types::string_list()))
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entry = group
                .strategy
                .as_ref()
                .and_then(|s| s.revert_to_spot.as_ref())
                .map(|revert| {
                    BlockBuilder::new()
                        .set(PERFORM_AT, revert.perform_at.clone())
                        .set(TIME_WINDOWS, revert.time_windows.clone())
                        .build()
                });
            data.set_opt(REVERT_TO_SPOT, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_revert_to_spot)
        .on_update(write_revert_to_spot),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY_STRATEGY,
            AttributeSchema::new(
                SIGNAL,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(SIGNAL_NAME, AttributeType::String).required(),
                        )
                        .attribute(AttributeSchema::new(SIGNAL_TIMEOUT, types::positive_int())),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entries: Vec<Value> = group
                .strategy
                .as_ref()
                .and_then(|s| s.signals.as_ref())
                .map(|signals| {
                    signals
                        .iter()
                        .map(|signal| {
                            BlockBuilder::new()
                                .set(SIGNAL_NAME, signal.name.as_ref().map(|n| n.to_lowercase()))
                                .set(SIGNAL_TIMEOUT, signal.timeout)
                                .build()
                        })
                        .collect()
                })
                .unwrap_or_default();
            data.set_opt(SIGNAL, flattened(entries));
            Ok(())
        })
        .on_create(write_signals)
        .on_update(write_signals),
    )?;

    Ok(())
}

fn write_spot_percentage(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    if let Some(v) = data.get_int(SPOT_PERCENTAGE)? {
        group.strategy_mut().risk = Some(v as f64);
    }
    Ok(())
}

fn write_ondemand_count(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().on_demand_count =
        Nullable::new(data.get_int(ONDEMAND_COUNT)?, data.is_removed(ONDEMAND_COUNT));
    Ok(())
}

fn write_orientation(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().availability_vs_cost = data.get_string(ORIENTATION)?;
    Ok(())
}

fn write_lifetime_period(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().lifetime_period = data.get_string(LIFETIME_PERIOD)?;
    Ok(())
}

fn write_draining_timeout(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().draining_timeout = data.get_positive_int(DRAINING_TIMEOUT)?;
    Ok(())
}

fn write_utilize_reserved_instances(
    group: &mut Handle<Group>,
    data: &ResourceData,
) -> FieldResult<()> {
    group.strategy_mut().utilize_reserved_instances = data.get_bool(UTILIZE_RESERVED_INSTANCES)?;
    Ok(())
}

fn write_fallback_to_ondemand(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    group.strategy_mut().fallback_to_od = data.get_bool(FALLBACK_TO_ONDEMAND)?;
    Ok(())
}

fn write_revert_to_spot(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let revert = block(data, REVERT_TO_SPOT)?
        .map(|entry| -> FieldResult<RevertToSpot> {
            let perform_at = entry
                .string(PERFORM_AT)
                .ok_or_else(|| FieldError::missing(REVERT_TO_SPOT, PERFORM_AT))?;
            Ok(RevertToSpot {
                perform_at: Some(perform_at),
                time_windows: entry.strings(TIME_WINDOWS),
            })
        })
        .transpose()?;
    group.strategy_mut().revert_to_spot = Nullable::new(revert, data.is_removed(REVERT_TO_SPOT));
    Ok(())
}

fn write_signals(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let signals = blocks(data, SIGNAL)?.map(|entries| {
        entries
            .iter()
            .map(|entry| Signal {
                name: entry.str(SIGNAL_NAME).map(str::to_uppercase),
                timeout: entry.positive_int(SIGNAL_TIMEOUT),
            })
            .collect()
    });
    group.strategy_mut().signals = Nullable::new(signals, data.is_removed(SIGNAL));
    Ok(())
}

// =============================================================================
// Integrations
// =============================================================================

fn register_integrations(fields: &mut FieldRegistry<Group>) -> Result<(), RegistryError> {
    let record_set = BlockSchema::new()
        .attribute(AttributeSchema::new(RECORD_SET_NAME, AttributeType::String).required())
        .attribute(AttributeSchema::new(USE_PUBLIC_IP, AttributeType::Bool))
        .attribute(AttributeSchema::new(USE_PUBLIC_DNS, AttributeType::Bool));
    let domain = BlockSchema::new()
        .attribute(AttributeSchema::new(HOSTED_ZONE_ID, AttributeType::String).required())
        .attribute(AttributeSchema::new(SPOTINST_ACCT_ID, AttributeType::String))
        .attribute(AttributeSchema::new(
            RECORD_SET_TYPE,
            types::one_of(&["a", "cname"]),
        ))
        .attribute(AttributeSchema::new(RECORD_SETS, AttributeType::Block(record_set)).required());

    fields.register(
        FieldDescriptor::new(
            AFFINITY_INTEGRATIONS,
            AttributeSchema::new(
                INTEGRATION_ROUTE53,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(DOMAINS, AttributeType::Block(domain)).required(),
                        )
                        .max_items(1),
                ),
            ),
        )
        .on_read(|group: &Group, data| {
            let entry = group
                .integration
                .as_ref()
                .and_then(|i| i.route53.as_ref())
                .map(flatten_route53);
            data.set_opt(INTEGRATION_ROUTE53, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_route53)
        .on_update(write_route53),
    )?;

    Ok(())
}

fn write_route53(group: &mut Handle<Group>, data: &ResourceData) -> FieldResult<()> {
    let route53 = block(data, INTEGRATION_ROUTE53)?.map(|entry| Route53Integration {
        domains: Some(
            entry
                .blocks(DOMAINS)
                .iter()
                .map(|domain| Domain {
                    hosted_zone_id: domain.string(HOSTED_ZONE_ID),
                    spotinst_acct_id: domain.string(SPOTINST_ACCT_ID),
                    record_set_type: domain.string(RECORD_SET_TYPE),
                    record_sets: Some(
                        domain
                            .blocks(RECORD_SETS)
                            .iter()
                            .map(|set| RecordSet {
                                name: set.string(RECORD_SET_NAME),
                                use_public_ip: set.bool(USE_PUBLIC_IP),
                                use_public_dns: set.bool(USE_PUBLIC_DNS),
                            })
                            .collect(),
                    ),
                })
                .collect(),
        ),
    });
    let route53 = Nullable::new(route53, data.is_removed(INTEGRATION_ROUTE53));
    if !route53.is_unset() {
        group
            .integration
            .get_or_insert_with(Integration::default)
            .route53 = route53;
    }
    Ok(())
}

fn flatten_route53(route53: &Route53Integration) -> Value {
    let domains = route53
        .domains
        .iter()
        .flatten()
        .map(|domain| {
            let record_sets = domain
                .record_sets
                .iter()
                .flatten()
                .map(|set| {
                    BlockBuilder::new()
                        .set(RECORD_SET_NAME, set.name.clone())
                        .set(USE_PUBLIC_IP, set.use_public_ip)
                        .set(USE_PUBLIC_DNS, set.use_public_dns)
                        .build()
                })
                .collect();
            BlockBuilder::new()
                .set(HOSTED_ZONE_ID, domain.hosted_zone_id.clone())
                .set(SPOTINST_ACCT_ID, domain.spotinst_acct_id.clone())
                .set(RECORD_SET_TYPE, domain.record_set_type.clone())
                .nested(RECORD_SETS, record_sets)
                .build()
        })
        .collect();
    BlockBuilder::new().nested(DOMAINS, domains).build()
}
