//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in the configuration file with the
//! "current state" fetched from the Provider, and generates a list of
//! required Effects (Plan).

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A changed attribute cannot be updated in place -> delete and create
    Replace {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let mut changed = find_changed_attributes(&desired.attributes, current);
    if let Some(schema) = schema {
        changed.retain(|name| !schema.attributes.get(name).is_some_and(|attr| attr.write_only));
    }

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let force_new = schema.is_some_and(|schema| {
        changed.iter().any(|name| {
            schema
                .attributes
                .get(name)
                .is_some_and(|attr| attr.force_new)
        })
    });

    if force_new {
        Diff::Replace {
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// An absent value equals a zero value. Attributes the configuration no
/// longer declares are reported when the current state still holds a value
/// for them and they were declared before.
fn find_changed_attributes(desired: &HashMap<String, Value>, current: &State) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        let desired_value = Some(desired_value).filter(|v| !v.is_zero());
        let current_value = current.attributes.get(key).filter(|v| !v.is_zero());
        if desired_value != current_value {
            changed.push(key.clone());
        }
    }

    for (key, current_value) in &current.attributes {
        if !desired.contains_key(key) && !current_value.is_zero() && current.is_declared(key) {
            changed.push(key.clone());
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Resources present in `current_states` but no longer declared are deleted.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.get(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => {
                plan.add(Effect::Update { id, from, to });
            }
            Diff::Replace { from, to, .. } => {
                if let Some(identifier) = from.identifier.clone() {
                    plan.add(Effect::Delete {
                        id: from.id.clone(),
                        identifier,
                    });
                }
                plan.add(Effect::Create(to));
            }
            Diff::NoChange(_) => {}
        }
    }

    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|state| state.exists && !desired.iter().any(|r| r.id == state.id))
        .collect();
    orphans.sort_by(|a, b| {
        (&a.id.resource_type, &a.id.name).cmp(&(&b.id.resource_type, &b.id.name))
    });

    for state in orphans {
        if let Some(identifier) = &state.identifier {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};

    fn existing(name: &str, attrs: &[(&str, Value)]) -> State {
        let attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        State::existing(ResourceId::new("spotinst_elastigroup_aws", name), attributes)
            .with_identifier(format!("sig-{}", name))
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("spotinst_elastigroup_aws", "web");
        let current = State::not_found(ResourceId::new("spotinst_elastigroup_aws", "web"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("spotinst_elastigroup_aws", "web")
            .with_attribute("region", "us-west-2")
            .with_attribute("min_size", Value::Int(0));
        let current = existing("web", &[("region", Value::from("us-west-2"))]);

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired =
            Resource::new("spotinst_elastigroup_aws", "web").with_attribute("max_size", Value::Int(3));
        let current = existing("web", &[("max_size", Value::Int(1))]);

        match diff(&desired, &current, None) {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["max_size".to_string()]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_attribute_changes() {
        let schema = ResourceSchema::new("spotinst_elastigroup_aws")
            .attribute(AttributeSchema::new("capacity_unit", AttributeType::String).force_new());
        let desired = Resource::new("spotinst_elastigroup_aws", "web")
            .with_attribute("capacity_unit", "weight");
        let current = existing("web", &[("capacity_unit", Value::from("instance"))]);

        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn diff_update_when_declared_attribute_is_removed() {
        let desired = Resource::new("spotinst_elastigroup_aws", "web").with_attribute("name", "eg");
        let current = existing(
            "web",
            &[
                ("name", Value::from("eg")),
                ("elastic_ips", Value::from(vec!["eip-1"])),
            ],
        );

        match diff(&desired, &current, None) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["elastic_ips".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_ignores_attributes_never_declared() {
        let desired = Resource::new("spotinst_elastigroup_aws", "web").with_attribute("name", "eg");
        let current = existing(
            "web",
            &[
                ("name", Value::from("eg")),
                ("health_check_type", Value::from("EC2")),
                ("tags", Value::List(vec![])),
            ],
        )
        .with_declared(["name"]);

        assert!(matches!(diff(&desired, &current, None), Diff::NoChange(_)));
    }

    #[test]
    fn diff_reports_each_removed_declared_attribute() {
        let desired = Resource::new("spotinst_elastigroup_aws", "web").with_attribute("name", "eg");
        let current = existing(
            "web",
            &[
                ("name", Value::from("eg")),
                ("description", Value::from("old")),
                ("ondemand_count", Value::Int(2)),
                ("health_check_type", Value::from("EC2")),
            ],
        )
        .with_declared(["name", "description", "ondemand_count"]);

        match diff(&desired, &current, None) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(
                changed_attributes,
                vec!["description".to_string(), "ondemand_count".to_string()]
            ),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn removing_force_new_attribute_replaces() {
        let schema = ResourceSchema::new("spotinst_elastigroup_aws")
            .attribute(AttributeSchema::new("capacity_unit", AttributeType::String).force_new());
        let desired = Resource::new("spotinst_elastigroup_aws", "web");
        let current = existing("web", &[("capacity_unit", Value::from("weight"))])
            .with_declared(["capacity_unit"]);

        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn write_only_attributes_are_not_compared() {
        let schema = ResourceSchema::new("spotinst_elastigroup_aws_beanstalk").attribute(
            AttributeSchema::new("beanstalk_environment_name", AttributeType::String)
                .force_new()
                .write_only(),
        );
        let desired = Resource::new("spotinst_elastigroup_aws_beanstalk", "web")
            .with_attribute("beanstalk_environment_name", "web-env");
        let current = existing("web", &[]);

        assert!(matches!(
            diff(&desired, &current, Some(&schema)),
            Diff::NoChange(_)
        ));
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("spotinst_elastigroup_aws", "new-group"),
            Resource::new("spotinst_elastigroup_aws", "existing-group")
                .with_attribute("fallback_to_ondemand", true),
        ];

        let mut current_states = HashMap::new();
        current_states.insert(
            ResourceId::new("spotinst_elastigroup_aws", "existing-group"),
            existing(
                "existing-group",
                &[("fallback_to_ondemand", Value::Bool(false))],
            ),
        );
        current_states.insert(
            ResourceId::new("spotinst_elastigroup_aws", "removed-group"),
            existing("removed-group", &[]),
        );

        let plan = create_plan(&resources, &current_states, &HashMap::new());

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        assert!(matches!(
            &plan.effects()[2],
            Effect::Delete { identifier, .. } if identifier == "sig-removed-group"
        ));
    }
}
