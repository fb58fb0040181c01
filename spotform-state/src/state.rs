//! State file structures

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use spotform_core::resource::{ResourceId, State, Value};

/// Everything spotform remembers between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies one state history; a state from another lineage is never
    /// overwritten
    pub lineage: String,
    /// Version of spotform that last wrote this state
    pub spotform_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            spotform_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.spotform_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Record the state of a resource; resources that no longer exist are
    /// removed
    pub fn record(&mut self, state: &State) {
        if !state.exists {
            self.remove_resource(&state.id);
            return;
        }
        let entry = ResourceState::from_state(state);
        match self.resources.iter_mut().find(|r| r.matches(&state.id)) {
            Some(existing) => *existing = entry,
            None => self.resources.push(entry),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Last recorded state of every resource, keyed by id
    pub fn current_states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| {
                let state = r.to_state();
                (state.id.clone(), state)
            })
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "spotinst_elastigroup_aws")
    pub resource_type: String,
    /// Local name from the configuration file
    pub name: String,
    /// Remote identifier (e.g., "sig-1234abcd")
    pub identifier: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    /// Attribute keys the configuration declared at the last apply
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub declared: BTreeSet<String>,
}

impl ResourceState {
    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }

    pub fn from_state(state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone().unwrap_or_default(),
            attributes: state.attributes.clone(),
            declared: state.declared.clone().unwrap_or_default(),
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn to_state(&self) -> State {
        State::existing(self.id(), self.attributes.clone())
            .with_identifier(&self.identifier)
            .with_declared(self.declared.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, identifier: &str, max_size: i64) -> State {
        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), Value::from(name));
        attributes.insert("max_size".to_string(), Value::Int(max_size));
        State::existing(ResourceId::new("spotinst_elastigroup_aws", name), attributes)
            .with_identifier(identifier)
            .with_declared(["name", "max_size"])
    }

    #[test]
    fn new_state_is_empty() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn record_replaces_existing_entry() {
        let mut file = StateFile::new();
        file.record(&group("web", "sig-1", 2));
        file.record(&group("web", "sig-1", 5));
        file.record(&group("api", "sig-2", 1));

        assert_eq!(file.resources.len(), 2);
        let id = ResourceId::new("spotinst_elastigroup_aws", "web");
        assert_eq!(
            file.find_resource(&id).unwrap().attributes["max_size"],
            Value::Int(5)
        );
    }

    #[test]
    fn record_of_missing_resource_removes_it() {
        let mut file = StateFile::new();
        file.record(&group("web", "sig-1", 2));

        let id = ResourceId::new("spotinst_elastigroup_aws", "web");
        file.record(&State::not_found(id.clone()));
        assert!(file.find_resource(&id).is_none());
    }

    #[test]
    fn current_states_restore_identifiers() {
        let mut file = StateFile::new();
        file.record(&group("web", "sig-1", 2));

        let states = file.current_states();
        let id = ResourceId::new("spotinst_elastigroup_aws", "web");
        assert_eq!(states[&id], group("web", "sig-1", 2));
    }

    #[test]
    fn serialized_state_reads_back() {
        let mut file = StateFile::new();
        file.record(&group("web", "sig-1", 2));
        file.increment_serial();

        let json = serde_json::to_string_pretty(&file).unwrap();
        let read: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(read.serial, 1);
        assert_eq!(read.lineage, file.lineage);
        assert_eq!(read.resources, file.resources);
    }

    #[test]
    fn declared_keys_survive_a_round_trip() {
        let mut file = StateFile::new();
        file.record(&group("web", "sig-1", 2));

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(
            json["resources"][0]["declared"],
            serde_json::json!(["max_size", "name"])
        );

        let read: StateFile = serde_json::from_value(json).unwrap();
        let id = ResourceId::new("spotinst_elastigroup_aws", "web");
        let state = &read.current_states()[&id];
        assert!(state.is_declared("max_size"));
        assert!(!state.is_declared("tags"));
    }

    #[test]
    fn states_written_without_declared_keys_still_load() {
        let read: ResourceState = serde_json::from_str(
            r#"{"resource_type": "spotinst_elastigroup_aws", "name": "web", "identifier": "sig-1"}"#,
        )
        .unwrap();
        assert!(read.declared.is_empty());
        assert_eq!(read.to_state().declared, Some(BTreeSet::new()));
    }
}
