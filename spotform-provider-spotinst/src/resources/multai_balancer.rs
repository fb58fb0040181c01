//! spotinst_multai_balancer

use spotform_core::data::ResourceData;
use spotform_core::expand::{BlockBuilder, block, blocks, flattened};
use spotform_core::field::{FieldDescriptor, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::ResourceConfig;
use crate::models::{Nullable, Tag};
use crate::models::multai::{Balancer, Timeouts};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_multai_balancer",
    label: "Balancer",
    not_found_code: "LOAD_BALANCER_DOESNT_EXIST",
    retry_on: None,
    description: "Multai load balancer",
};

const AFFINITY: &str = "multai_balancer";

pub const NAME: &str = "name";
pub const SCHEME: &str = "scheme";
pub const DNS_CNAME_ALIASES: &str = "dns_cname_aliases";
pub const CONNECTION_TIMEOUTS: &str = "connection_timeouts";
pub const TAGS: &str = "tags";

const IDLE: &str = "idle";
const DRAINING: &str = "draining";
const TAG_KEY: &str = "key";
const TAG_VALUE: &str = "value";

pub fn fields() -> Result<FieldRegistry<Balancer>, RegistryError> {
    let mut fields = FieldRegistry::new();

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(NAME, AttributeType::String).required())
            .on_read(|balancer: &Balancer, data| {
                data.set_opt(NAME, balancer.name.clone());
                Ok(())
            })
            .on_create(write_name)
            .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(SCHEME, types::one_of(&["internal", "internet-facing"])),
        )
        .on_read(|balancer: &Balancer, data| {
            data.set_opt(SCHEME, balancer.scheme.clone());
            Ok(())
        })
        .on_create(write_scheme)
        .on_update(write_scheme),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(DNS_CNAME_ALIASES, types::string_list()),
        )
        .on_read(|balancer: &Balancer, data| {
            data.set_opt(DNS_CNAME_ALIASES, balancer.dns_cname_aliases.as_ref().cloned());
            Ok(())
        })
        .on_create(write_dns_cname_aliases)
        .on_update(write_dns_cname_aliases),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                CONNECTION_TIMEOUTS,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(IDLE, types::positive_int()))
                        .attribute(AttributeSchema::new(DRAINING, types::positive_int()))
                        .max_items(1),
                ),
            ),
        )
        .on_read(|balancer: &Balancer, data| {
            let entry = balancer.timeouts.as_ref().map(|timeouts| {
                BlockBuilder::new()
                    .set(IDLE, timeouts.idle)
                    .set(DRAINING, timeouts.draining)
                    .build()
            });
            data.set_opt(CONNECTION_TIMEOUTS, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_connection_timeouts)
        .on_update(write_connection_timeouts),
    )?;

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(
                TAGS,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(TAG_KEY, AttributeType::String).required())
                        .attribute(AttributeSchema::new(TAG_VALUE, AttributeType::String).required()),
                ),
            ),
        )
        .on_read(|balancer: &Balancer, data| {
            let entries: Vec<Value> = balancer
                .tags
                .as_ref()
                .into_iter()
                .flatten()
                .map(|tag| {
                    BlockBuilder::new()
                        .set(TAG_KEY, tag.key.clone())
                        .set(TAG_VALUE, tag.value.clone())
                        .build()
                })
                .collect();
            data.set_opt(TAGS, flattened(entries));
            Ok(())
        })
        .on_create(write_tags)
        .on_update(write_tags),
    )?;

    Ok(fields)
}

fn write_name(balancer: &mut Handle<Balancer>, data: &ResourceData) -> FieldResult<()> {
    balancer.name = data.get_string(NAME)?;
    Ok(())
}

fn write_scheme(balancer: &mut Handle<Balancer>, data: &ResourceData) -> FieldResult<()> {
    balancer.scheme = data.get_string(SCHEME)?;
    Ok(())
}

fn write_dns_cname_aliases(balancer: &mut Handle<Balancer>, data: &ResourceData) -> FieldResult<()> {
    balancer.dns_cname_aliases = Nullable::new(
        data.get_strings(DNS_CNAME_ALIASES)?.filter(|aliases| !aliases.is_empty()),
        data.is_removed(DNS_CNAME_ALIASES),
    );
    Ok(())
}

fn write_connection_timeouts(
    balancer: &mut Handle<Balancer>,
    data: &ResourceData,
) -> FieldResult<()> {
    let timeouts = block(data, CONNECTION_TIMEOUTS)?.map(|entry| Timeouts {
        idle: entry.positive_int(IDLE),
        draining: entry.positive_int(DRAINING),
    });
    balancer.timeouts = Nullable::new(timeouts, data.is_removed(CONNECTION_TIMEOUTS));
    Ok(())
}

fn write_tags(balancer: &mut Handle<Balancer>, data: &ResourceData) -> FieldResult<()> {
    // Entries without a key are dropped
    let tags = blocks(data, TAGS)?.map(|entries| {
        entries
            .iter()
            .filter_map(|entry| {
                let key = entry.string(TAG_KEY)?;
                Some(Tag {
                    key: Some(key),
                    value: entry.string(TAG_VALUE),
                })
            })
            .collect()
    });
    balancer.tags = Nullable::new(tags, data.is_removed(TAGS));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::wrapper::ResourceWrapper;
    use std::collections::HashMap;

    fn wrapper() -> ResourceWrapper<Balancer> {
        ResourceWrapper::new(CONFIG.type_name, fields().unwrap()).unwrap()
    }

    fn tag(key: &str, value: &str) -> Value {
        BlockBuilder::new()
            .set(TAG_KEY, Some(key))
            .set(TAG_VALUE, Some(value))
            .build()
    }

    fn config() -> HashMap<String, Value> {
        let timeouts = BlockBuilder::new()
            .set(IDLE, Some(60i64))
            .set(DRAINING, Some(30i64))
            .build();

        let mut attrs = HashMap::new();
        attrs.insert(NAME.to_string(), Value::from("lb-edge"));
        attrs.insert(SCHEME.to_string(), Value::from("internet-facing"));
        attrs.insert(
            DNS_CNAME_ALIASES.to_string(),
            Value::from(vec!["edge.example.com"]),
        );
        attrs.insert(CONNECTION_TIMEOUTS.to_string(), Value::List(vec![timeouts]));
        attrs.insert(
            TAGS.to_string(),
            Value::List(vec![tag("env", "prod"), tag("team", "edge")]),
        );
        attrs
    }

    #[test]
    fn create_then_read_round_trips() {
        let wrapper = wrapper();
        let balancer = wrapper
            .on_create(None, &ResourceData::new(config()))
            .unwrap();
        assert_eq!(balancer.tags.as_ref().map(Vec::len), Some(2));

        let mut state = ResourceData::for_read("bal-1");
        wrapper.on_read(&balancer, &mut state).unwrap();
        assert_eq!(state.into_attributes(), config());
    }

    #[test]
    fn body_uses_vendor_alias_key() {
        let balancer = wrapper()
            .on_create(None, &ResourceData::new(config()))
            .unwrap();
        let body = serde_json::to_value(&balancer).unwrap();

        assert_eq!(body["dnsCNAMEAliases"][0], "edge.example.com");
        assert_eq!(body["timeouts"]["idle"], 60);
    }

    #[test]
    fn removed_timeouts_are_cleared() {
        let mut current = config();
        current.remove(CONNECTION_TIMEOUTS);
        let data = ResourceData::for_update("bal-1", config(), current);

        let (changed, balancer) = wrapper().on_update(&data).unwrap();
        assert!(changed);
        let body = serde_json::to_value(&balancer).unwrap();
        assert_eq!(body["timeouts"], serde_json::Value::Null);
        assert!(body.as_object().unwrap().contains_key("timeouts"));
        assert!(body.get("name").is_none());
        assert!(body.get("tags").is_none());
    }

    #[test]
    fn removed_tags_and_aliases_are_sent_as_null() {
        let mut current = config();
        current.remove(TAGS);
        current.insert(DNS_CNAME_ALIASES.to_string(), Value::List(vec![]));
        let data = ResourceData::for_update("bal-1", config(), current);

        let (_, balancer) = wrapper().on_update(&data).unwrap();
        assert_eq!(
            serde_json::to_value(&balancer).unwrap(),
            serde_json::json!({"dnsCNAMEAliases": null, "tags": null})
        );
    }

    #[test]
    fn create_leaves_absent_blocks_out() {
        let mut attrs = config();
        attrs.remove(CONNECTION_TIMEOUTS);
        attrs.remove(TAGS);

        let balancer = wrapper().on_create(None, &ResourceData::new(attrs)).unwrap();
        let body = serde_json::to_value(&balancer).unwrap();
        assert!(body.get("timeouts").is_none());
        assert!(body.get("tags").is_none());
    }
}
