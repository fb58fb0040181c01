//! Spotinst Provider implementation
//!
//! Every resource type is served by a `ManagedResource`: a field registry
//! wrapper for translation plus the generic CRUD client. `SpotinstProvider`
//! routes each call to the handler of the resource's type.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info, warn};
use spotform_core::data::ResourceData;
use spotform_core::field::{FieldError, FieldRegistry, RegistryError};
use spotform_core::provider::{ProviderError, ProviderResult, ResourceType};
use spotform_core::resource::{Resource, ResourceId, State, Value};
use spotform_core::retry::{RetryError, RetryPolicy, retry};
use spotform_core::schema::ResourceSchema;
use spotform_core::wrapper::{RemoteObject, ResourceWrapper};

use crate::client::{ApiObject, ClientError, SpotinstClient};
use crate::config::Config;
use crate::resources::{self, ResourceConfig};

/// CRUD operations of one resource type
#[async_trait]
pub(crate) trait ResourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    async fn read(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State>;

    async fn create(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        resource: &Resource,
    ) -> ProviderResult<State>;

    async fn update(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State>;

    async fn delete(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()>;
}

/// Resource type backed by a field registry and a remote object `T`
pub(crate) struct ManagedResource<T> {
    config: ResourceConfig,
    wrapper: ResourceWrapper<T>,
    schema: ResourceSchema,
}

impl<T: ApiObject + RemoteObject + 'static> ManagedResource<T> {
    pub(crate) fn new(
        config: ResourceConfig,
        fields: FieldRegistry<T>,
    ) -> Result<Self, RegistryError> {
        let wrapper = ResourceWrapper::new(config.type_name, fields)?;
        let schema = wrapper.schema().with_description(config.description);
        Ok(Self {
            config,
            wrapper,
            schema,
        })
    }

    pub(crate) fn validate(
        &self,
        id: &ResourceId,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<()> {
        self.schema.validate(attributes).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ProviderError::new(format!("invalid attributes: {}", messages.join("; ")))
                .for_resource(id.clone())
        })
    }

    pub(crate) fn is_not_found(&self, err: &ClientError) -> bool {
        err.has_code(self.config.not_found_code) || matches!(err, ClientError::EmptyResponse)
    }

    fn field_error(&self, id: &ResourceId, action: &str, err: FieldError) -> ProviderError {
        ProviderError::new(format!(
            "failed to {} {} configuration",
            action,
            self.config.label.to_lowercase()
        ))
        .for_resource(id.clone())
        .with_cause(err)
    }

    pub(crate) fn client_error(
        &self,
        id: &ResourceId,
        action: &str,
        err: ClientError,
    ) -> ProviderError {
        ProviderError::new(format!(
            "failed to {} {}",
            action,
            self.config.label.to_lowercase()
        ))
        .for_resource(id.clone())
        .with_cause(err)
    }

    fn log_configuration(&self, action: &str, object: &T) {
        match serde_json::to_string(object) {
            Ok(json) => debug!("===> {} {} configuration: {}", self.config.label, action, json),
            Err(e) => warn!("{} {} configuration is not serializable: {}", self.config.label, action, e),
        }
    }

    /// Create `resource`, starting from `imported` instead of an empty object
    pub(crate) async fn create_from(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        resource: &Resource,
        imported: Option<T>,
    ) -> ProviderResult<State> {
        let id = &resource.id;
        self.validate(id, &resource.attributes)?;

        let data = ResourceData::new(resource.attributes.clone());
        let object = self
            .wrapper
            .on_create(imported, &data)
            .map_err(|e| self.field_error(id, "build", e))?;
        self.log_configuration("create", &object);

        let service = client.service::<T>();
        let service = &service;
        let object = &object;
        let retry_on = self.config.retry_on;
        let created = retry(policy, || async move {
            service.create(object).await.map_err(|e| {
                if retry_on.is_some_and(|r| r.matches(&e)) {
                    RetryError::Retryable(e)
                } else {
                    RetryError::NonRetryable(e)
                }
            })
        })
        .await
        .map_err(|e| self.client_error(id, "create", e))?;

        let identifier = created.id().map(str::to_string).ok_or_else(|| {
            ProviderError::new(format!(
                "created {} has no id",
                self.config.label.to_lowercase()
            ))
            .for_resource(id.clone())
        })?;
        info!("{} created successfully: {}", self.config.label, identifier);

        self.read(client, id, &identifier).await
    }

    /// Update request for the attributes that changed, `None` when nothing did
    pub(crate) fn build_update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<Option<T>> {
        self.validate(id, &to.attributes)?;

        // Values the configuration never declared are server side and stay untouched
        let prior = from
            .attributes
            .iter()
            .filter(|(key, _)| to.attributes.contains_key(*key) || from.is_declared(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let data = ResourceData::for_update(identifier, prior, to.attributes.clone());
        let (changed, object) = self
            .wrapper
            .on_update(&data)
            .map_err(|e| self.field_error(id, "build", e))?;

        if !changed {
            debug!(
                "{} {} has no changes, skipping update",
                self.config.label, identifier
            );
            return Ok(None);
        }
        Ok(Some(object))
    }

    pub(crate) async fn send_update(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
        object: &T,
    ) -> ProviderResult<()> {
        self.log_configuration("update", object);
        client
            .service::<T>()
            .update(identifier, object)
            .await
            .map_err(|e| self.client_error(id, "update", e))?;
        info!("{} updated successfully: {}", self.config.label, identifier);
        Ok(())
    }
}

#[async_trait]
impl<T: ApiObject + RemoteObject + 'static> ResourceHandler for ManagedResource<T> {
    fn type_name(&self) -> &'static str {
        self.config.type_name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }

    async fn read(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let object = match client.service::<T>().read(identifier).await {
            Ok(object) => object,
            Err(e) if self.is_not_found(&e) => {
                warn!(
                    "{} {} not found, removing it from state",
                    self.config.label, identifier
                );
                return Ok(State::not_found(id.clone()));
            }
            Err(e) => return Err(self.client_error(id, "read", e)),
        };

        let mut data = ResourceData::for_read(identifier);
        self.wrapper
            .on_read(&object, &mut data)
            .map_err(|e| self.field_error(id, "read", e))?;
        debug!("{} read successfully: {}", self.config.label, identifier);

        Ok(State::existing(id.clone(), data.into_attributes()).with_identifier(identifier))
    }

    async fn create(
        &self,
        client: &SpotinstClient,
        policy: &RetryPolicy,
        resource: &Resource,
    ) -> ProviderResult<State> {
        self.create_from(client, policy, resource, None).await
    }

    async fn update(
        &self,
        client: &SpotinstClient,
        _policy: &RetryPolicy,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let Some(object) = self.build_update(id, identifier, from, to)? else {
            let state = State::existing(id.clone(), from.attributes.clone());
            return Ok(state.with_identifier(identifier));
        };
        self.send_update(client, id, identifier, &object).await?;
        self.read(client, id, identifier).await
    }

    async fn delete(
        &self,
        client: &SpotinstClient,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        debug!("===> {} delete: {}", self.config.label, identifier);
        match client.service::<T>().delete(identifier).await {
            Ok(()) => {
                info!("{} deleted successfully: {}", self.config.label, identifier);
                Ok(())
            }
            Err(e) if self.is_not_found(&e) => {
                warn!("{} {} already deleted", self.config.label, identifier);
                Ok(())
            }
            Err(e) => Err(self.client_error(id, "delete", e)),
        }
    }
}

/// Resource type as exposed through the `Provider` trait
struct SpotinstResourceType {
    name: &'static str,
    schema: ResourceSchema,
}

impl ResourceType for SpotinstResourceType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

/// Spotinst Provider
pub struct SpotinstProvider {
    client: SpotinstClient,
    retry: RetryPolicy,
    handlers: HashMap<&'static str, Box<dyn ResourceHandler>>,
}

impl SpotinstProvider {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = SpotinstClient::new(config)
            .map_err(|e| ProviderError::new("failed to build HTTP client").with_cause(e))?;
        let handlers = resources::handlers()
            .map_err(|e| ProviderError::new("invalid resource definition").with_cause(e))?
            .into_iter()
            .map(|handler| (handler.type_name(), handler))
            .collect();

        Ok(Self {
            client,
            retry: config.retry.clone(),
            handlers,
        })
    }

    /// Schemas of every managed resource type, keyed by type name
    pub fn schemas(&self) -> HashMap<String, ResourceSchema> {
        self.handlers
            .iter()
            .map(|(name, handler)| (name.to_string(), handler.schema()))
            .collect()
    }

    pub(crate) fn resource_type_list(&self) -> Vec<Box<dyn ResourceType>> {
        resources::type_names()
            .into_iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| {
                Box::new(SpotinstResourceType {
                    name: handler.type_name(),
                    schema: handler.schema(),
                }) as Box<dyn ResourceType>
            })
            .collect()
    }

    fn handler(&self, id: &ResourceId) -> ProviderResult<&dyn ResourceHandler> {
        self.handlers
            .get(id.resource_type.as_str())
            .map(|handler| &**handler)
            .ok_or_else(|| {
                ProviderError::new(format!("unknown resource type '{}'", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let handler = self.handler(id)?;
        match identifier {
            Some(identifier) => handler.read(&self.client, id, identifier).await,
            None => Ok(State::not_found(id.clone())),
        }
    }

    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        self.handler(&resource.id)?
            .create(&self.client, &self.retry, resource)
            .await
    }

    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        self.handler(id)?
            .update(&self.client, &self.retry, id, identifier, from, to)
            .await
    }

    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        self.handler(id)?
            .delete(&self.client, id, identifier)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SpotinstProvider {
        SpotinstProvider::new(&Config::new("secret")).unwrap()
    }

    #[test]
    fn every_type_is_routed() {
        let provider = provider();
        for name in resources::type_names() {
            let id = ResourceId::new(name, "example");
            assert_eq!(provider.handler(&id).unwrap().type_name(), name);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let provider = provider();
        let id = ResourceId::new("spotinst_unknown", "example");
        let err = provider.handler(&id).err().unwrap();
        assert!(err.to_string().contains("unknown resource type"));
    }

    #[test]
    fn resource_types_follow_declaration_order() {
        let names: Vec<&str> = provider()
            .resource_type_list()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, resources::type_names());
    }

    #[test]
    fn schemas_carry_descriptions() {
        let schemas = provider().schemas();
        let schema = &schemas["spotinst_elastigroup_aws"];
        assert!(schema.description.is_some());
        assert!(schema.attributes.contains_key("product"));
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let provider = provider();
        let id = ResourceId::new("spotinst_health_check", "hc");
        let state = provider.read_resource(&id, None).await.unwrap();
        assert!(!state.exists);
    }
}
