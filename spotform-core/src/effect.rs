//! Effect - A side effect to be performed against a Provider
//!
//! Effects are plain values. Nothing happens until an Interpreter runs them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read an existing remote object into state (import)
    Read { id: ResourceId, identifier: String },
    /// Create a new remote object
    Create(Resource),
    /// Update an existing remote object
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete a remote object
    Delete { id: ResourceId, identifier: String },
}

impl Effect {
    /// Whether running this Effect changes remote state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read { .. })
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read { id, .. } => id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
            Effect::Delete { id, .. } => id,
        }
    }

    /// Short label for display (e.g., "+ spotinst_health_check.hc")
    pub fn label(&self) -> String {
        let symbol = match self {
            Effect::Read { .. } => "<=",
            Effect::Create(_) => "+",
            Effect::Update { .. } => "~",
            Effect::Delete { .. } => "-",
        };
        format!("{} {}", symbol, self.resource_id())
    }
}
