//! spotinst_health_check

use spotform_core::data::ResourceData;
use spotform_core::expand::{BlockBuilder, block, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::{IAM_PROFILE_NOT_READY, ResourceConfig};
use crate::models::health_check::{Check, HealthCheck};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_health_check",
    label: "HealthCheck",
    not_found_code: "HEALTH_CHECK_DOESNT_EXIST",
    retry_on: Some(IAM_PROFILE_NOT_READY),
    description: "Health check probing a resource through a proxy",
};

const AFFINITY: &str = "health_check";

pub const NAME: &str = "name";
pub const RESOURCE_ID: &str = "resource_id";
pub const PROXY_ADDRESS: &str = "proxy_address";
pub const PROXY_PORT: &str = "proxy_port";
pub const CHECK: &str = "check";

const PROTOCOL: &str = "protocol";
const ENDPOINT: &str = "endpoint";
const PORT: &str = "port";
const INTERVAL: &str = "interval";
const TIMEOUT: &str = "timeout";
const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";

pub fn fields() -> Result<FieldRegistry<HealthCheck>, RegistryError> {
    let mut fields = FieldRegistry::new();

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(NAME, AttributeType::String))
            .on_read(|hc: &HealthCheck, data| {
                data.set_opt(NAME, hc.name.clone());
                Ok(())
            })
            .on_create(write_name)
            .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(RESOURCE_ID, AttributeType::String).required(),
        )
        .on_read(|hc: &HealthCheck, data| {
            data.set_opt(RESOURCE_ID, hc.resource_id.clone());
            Ok(())
        })
        .on_create(write_resource_id)
        .on_update(write_resource_id),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(PROXY_ADDRESS, AttributeType::String).required(),
        )
        .on_read(|hc: &HealthCheck, data| {
            data.set_opt(PROXY_ADDRESS, hc.proxy_address.clone());
            Ok(())
        })
        .on_create(write_proxy_address)
        .on_update(write_proxy_address),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(PROXY_PORT, types::positive_int()))
            .on_read(|hc: &HealthCheck, data| {
                data.set_opt(PROXY_PORT, hc.proxy_port);
                Ok(())
            })
            .on_create(write_proxy_port)
            .on_update(write_proxy_port),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                CHECK,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(
                            AttributeSchema::new(PROTOCOL, types::one_of(&["http", "https", "tcp"]))
                                .required(),
                        )
                        .attribute(AttributeSchema::new(ENDPOINT, AttributeType::String))
                        .attribute(AttributeSchema::new(PORT, types::positive_int()).required())
                        .attribute(AttributeSchema::new(INTERVAL, types::positive_int()).required())
                        .attribute(AttributeSchema::new(TIMEOUT, types::positive_int()).required())
                        .attribute(AttributeSchema::new(HEALTHY, types::positive_int()))
                        .attribute(AttributeSchema::new(UNHEALTHY, types::positive_int()))
                        .max_items(1),
                ),
            )
            .required(),
        )
        .on_read(|hc: &HealthCheck, data| {
            let entry = hc.check.as_ref().map(flatten_check);
            data.set_opt(CHECK, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_check)
        .on_update(write_check),
    )?;

    Ok(fields)
}

fn write_name(hc: &mut Handle<HealthCheck>, data: &ResourceData) -> FieldResult<()> {
    hc.name = data.get_string(NAME)?;
    Ok(())
}

fn write_resource_id(hc: &mut Handle<HealthCheck>, data: &ResourceData) -> FieldResult<()> {
    hc.resource_id = data.get_string(RESOURCE_ID)?;
    Ok(())
}

fn write_proxy_address(hc: &mut Handle<HealthCheck>, data: &ResourceData) -> FieldResult<()> {
    hc.proxy_address = data.get_string(PROXY_ADDRESS)?;
    Ok(())
}

fn write_proxy_port(hc: &mut Handle<HealthCheck>, data: &ResourceData) -> FieldResult<()> {
    hc.proxy_port = data.get_positive_int(PROXY_PORT)?;
    Ok(())
}

fn write_check(hc: &mut Handle<HealthCheck>, data: &ResourceData) -> FieldResult<()> {
    let Some(entry) = block(data, CHECK)? else {
        return Ok(());
    };
    let protocol = entry
        .string(PROTOCOL)
        .ok_or_else(|| FieldError::missing(CHECK, PROTOCOL))?;

    *hc.check_mut() = Check {
        protocol: Some(protocol),
        endpoint: entry.string(ENDPOINT),
        port: entry.positive_int(PORT),
        interval: entry.positive_int(INTERVAL),
        timeout: entry.positive_int(TIMEOUT),
        healthy: entry.positive_int(HEALTHY),
        unhealthy: entry.positive_int(UNHEALTHY),
    };
    Ok(())
}

fn flatten_check(check: &Check) -> Value {
    BlockBuilder::new()
        .set(PROTOCOL, check.protocol.clone())
        .set(ENDPOINT, check.endpoint.clone())
        .set(PORT, check.port)
        .set(INTERVAL, check.interval)
        .set(TIMEOUT, check.timeout)
        .set(HEALTHY, check.healthy)
        .set(UNHEALTHY, check.unhealthy)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::wrapper::ResourceWrapper;
    use std::collections::HashMap;

    fn wrapper() -> ResourceWrapper<HealthCheck> {
        ResourceWrapper::new(CONFIG.type_name, fields().unwrap()).unwrap()
    }

    fn config(interval: i64) -> HashMap<String, Value> {
        let check = BlockBuilder::new()
            .set(PROTOCOL, Some("http"))
            .set(ENDPOINT, Some("/health"))
            .set(PORT, Some(80i64))
            .set(INTERVAL, Some(interval))
            .set(TIMEOUT, Some(5i64))
            .build();

        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("hc-web"));
        attrs.insert(RESOURCE_ID.to_string(), Value::from("sig-1234"));
        attrs.insert(PROXY_ADDRESS.to_string(), Value::from("http://proxy.example.com"));
        attrs.insert(PROXY_PORT.to_string(), Value::Int(80));
        attrs.insert(CHECK.to_string(), Value::List(vec![check]));
        attrs
    }

    #[test]
    fn check_block_round_trips() {
        let wrapper = wrapper();
        let hc = wrapper
            .on_create(None, &ResourceData::new(config(10)))
            .unwrap();
        assert_eq!(hc.check.as_ref().and_then(|c| c.protocol.as_deref()), Some("http"));

        let mut state = ResourceData::for_read("hc-1");
        wrapper.on_read(&hc, &mut state).unwrap();
        assert_eq!(state.into_attributes(), config(10));
    }

    #[test]
    fn update_rewrites_whole_check() {
        let data = ResourceData::for_update("hc-1", config(10), config(30));
        let (changed, hc) = wrapper().on_update(&data).unwrap();

        assert!(changed);
        let check = hc.check.unwrap();
        assert_eq!(check.interval, Some(30));
        assert_eq!(check.port, Some(80));
        assert!(hc.name.is_none());
    }
}
