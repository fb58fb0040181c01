//! Spotform Spotinst Provider
//!
//! Manages Spotinst objects (elastigroups, Beanstalk groups, managed
//! instances, Azure stateful nodes, health checks, load balancers, Ocean node
//! groups) through the Spotinst REST API.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings and their sources
//! - `client` - REST client and error classification
//! - `models` - Wire representation of vendor objects
//! - `resources` - Field registries, one module per resource type
//! - `provider` - SpotinstProvider implementation

pub mod client;
pub mod config;
pub mod models;
pub mod provider;
pub mod resources;

// Re-export main types
pub use config::{Config, ConfigError, ConfigSource};
pub use provider::SpotinstProvider;

use spotform_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use spotform_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SpotinstProvider {
    fn name(&self) -> &'static str {
        "spotinst"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.resource_type_list()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}
