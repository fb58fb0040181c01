//! spotinst_ocean_aks_virtual_node_group

use spotform_core::data::ResourceData;
use spotform_core::expand::{Block, BlockBuilder, block, flattened};
use spotform_core::field::{FieldDescriptor, FieldError, FieldRegistry, FieldResult, RegistryError};
use spotform_core::resource::Value;
use spotform_core::schema::{AttributeSchema, AttributeType, BlockSchema, types};
use spotform_core::wrapper::Handle;

use super::ResourceConfig;
use crate::models::Tag;
use crate::models::ocean_aks::{LaunchSpecification, OsDisk, VirtualNodeGroup};

pub const CONFIG: ResourceConfig = ResourceConfig {
    type_name: "spotinst_ocean_aks_virtual_node_group",
    label: "VirtualNodeGroup",
    not_found_code: "CANT_GET_OCEAN_LAUNCH_SPEC",
    retry_on: None,
    description: "Virtual node group of an Ocean AKS cluster",
};

const AFFINITY: &str = "ocean_aks_virtual_node_group";
const AFFINITY_LAUNCH_SPECIFICATION: &str = "ocean_aks_virtual_node_group_launch_specification";

pub const OCEAN_ID: &str = "ocean_id";
pub const NAME: &str = "name";
pub const ZONES: &str = "zones";
pub const LAUNCH_SPECIFICATION: &str = "launch_specification";

const OS_DISK: &str = "os_disk";
const SIZE_GB: &str = "size_gb";
const DISK_TYPE: &str = "type";
const UTILIZE_EPHEMERAL_STORAGE: &str = "utilize_ephemeral_storage";
const TAG: &str = "tag";
const TAG_KEY: &str = "key";
const TAG_VALUE: &str = "value";

pub fn fields() -> Result<FieldRegistry<VirtualNodeGroup>, RegistryError> {
    let mut fields = FieldRegistry::new();

    fields.register(
        FieldDescriptor::new(
            AFFINITY,
            AttributeSchema::new(OCEAN_ID, AttributeType::String).required(),
        )
        .on_read(|vng: &VirtualNodeGroup, data| {
            data.set_opt(OCEAN_ID, vng.ocean_id.clone());
            Ok(())
        })
        .on_create(|vng, data| {
            vng.ocean_id = data.get_string(OCEAN_ID)?;
            Ok(())
        })
        .on_update(|_, _| Err(FieldError::update_not_allowed(OCEAN_ID))),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(NAME, AttributeType::String))
            .on_read(|vng: &VirtualNodeGroup, data| {
                data.set_opt(NAME, vng.name.clone());
                Ok(())
            })
            .on_create(write_name)
            .on_update(write_name),
    )?;

    fields.register(
        FieldDescriptor::new(AFFINITY, AttributeSchema::new(ZONES, types::string_list()))
            .on_read(|vng: &VirtualNodeGroup, data| {
                data.set_opt(ZONES, vng.zones.clone());
                Ok(())
            })
            .on_create(write_zones)
            .on_update(write_zones),
    )?;

    let os_disk = BlockSchema::new()
        .attribute(AttributeSchema::new(SIZE_GB, types::positive_int()).required())
        .attribute(AttributeSchema::new(
            DISK_TYPE,
            types::one_of(&["Standard_LRS", "Premium_LRS", "StandardSSD_LRS"]),
        ))
        .attribute(AttributeSchema::new(UTILIZE_EPHEMERAL_STORAGE, AttributeType::Bool))
        .max_items(1);
    let tag = BlockSchema::new()
        .attribute(AttributeSchema::new(TAG_KEY, AttributeType::String).required())
        .attribute(AttributeSchema::new(TAG_VALUE, AttributeType::String));

    fields.register(
        FieldDescriptor::new(
            AFFINITY_LAUNCH_SPECIFICATION,
            AttributeSchema::new(
                LAUNCH_SPECIFICATION,
                AttributeType::Block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(OS_DISK, AttributeType::Block(os_disk)))
                        .attribute(AttributeSchema::new(TAG, AttributeType::Block(tag)))
                        .max_items(1),
                ),
            ),
        )
        .on_read(|vng: &VirtualNodeGroup, data| {
            let entry = vng
                .launch_specification
                .as_ref()
                .map(flatten_launch_specification)
                .filter(|entry| entry.as_map().is_some_and(|fields| !fields.is_empty()));
            data.set_opt(LAUNCH_SPECIFICATION, flattened(entry.into_iter().collect()));
            Ok(())
        })
        .on_create(write_launch_specification)
        .on_update(write_launch_specification),
    )?;

    Ok(fields)
}

fn write_name(vng: &mut Handle<VirtualNodeGroup>, data: &ResourceData) -> FieldResult<()> {
    vng.name = data.get_string(NAME)?;
    Ok(())
}

fn write_zones(vng: &mut Handle<VirtualNodeGroup>, data: &ResourceData) -> FieldResult<()> {
    vng.zones = data.get_strings(ZONES)?;
    Ok(())
}

fn write_launch_specification(
    vng: &mut Handle<VirtualNodeGroup>,
    data: &ResourceData,
) -> FieldResult<()> {
    let Some(entry) = block(data, LAUNCH_SPECIFICATION)? else {
        *vng.launch_specification_mut() = LaunchSpecification::default();
        return Ok(());
    };

    let spec = vng.launch_specification_mut();
    spec.os_disk = entry.block(OS_DISK).map(|disk| expand_os_disk(&disk));
    let tags: Vec<Tag> = entry
        .blocks(TAG)
        .iter()
        .filter_map(|tag| {
            Some(Tag {
                key: Some(tag.string(TAG_KEY)?),
                value: tag.string(TAG_VALUE),
            })
        })
        .collect();
    spec.tags = if tags.is_empty() { None } else { Some(tags) };
    Ok(())
}

fn expand_os_disk(disk: &Block<'_>) -> OsDisk {
    OsDisk {
        size_gb: disk.positive_int(SIZE_GB),
        kind: disk.string(DISK_TYPE),
        utilize_ephemeral_storage: disk.bool(UTILIZE_EPHEMERAL_STORAGE),
    }
}

fn flatten_launch_specification(spec: &LaunchSpecification) -> Value {
    let os_disk: Vec<Value> = spec
        .os_disk
        .iter()
        .map(|disk| {
            BlockBuilder::new()
                .set(SIZE_GB, disk.size_gb)
                .set(DISK_TYPE, disk.kind.clone())
                .set(UTILIZE_EPHEMERAL_STORAGE, disk.utilize_ephemeral_storage)
                .build()
        })
        .collect();
    let tags: Vec<Value> = spec
        .tags
        .iter()
        .flatten()
        .map(|tag| {
            BlockBuilder::new()
                .set(TAG_KEY, tag.key.clone())
                .set(TAG_VALUE, tag.value.clone())
                .build()
        })
        .collect();
    BlockBuilder::new()
        .nested(OS_DISK, os_disk)
        .nested(TAG, tags)
        .build()
}
