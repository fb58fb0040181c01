//! Field - Per-field descriptors and the registry that holds them
//!
//! A resource type is described field by field. Each field carries its
//! attribute schema plus the callbacks that move its value between the
//! user-facing configuration and the remote object:
//!
//! - `on_read` copies a value from the remote object into the resource data
//! - `on_create` copies a value from the configuration into a new remote object
//! - `on_update` does the same for an update request
//! - `has_change` decides whether `on_update` must run
//!
//! Descriptors are registered once at provider construction and are
//! immutable afterwards.

use std::collections::HashMap;

use crate::data::ResourceData;
use crate::schema::{AttributeSchema, ResourceSchema};
use crate::wrapper::Handle;

/// Error raised while translating a single field
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("field '{field}': missing required value '{key}'")]
    MissingValue { field: String, key: String },

    #[error("field '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("field '{field}' cannot be changed after creation")]
    UpdateNotAllowed { field: String },
}

impl FieldError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingValue {
            field: field.into(),
            key: key.into(),
        }
    }

    pub fn update_not_allowed(field: impl Into<String>) -> Self {
        Self::UpdateNotAllowed {
            field: field.into(),
        }
    }
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Error raised while building a registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("field name must not be empty")]
    EmptyName,

    #[error("field '{0}' is already registered")]
    Duplicate(String),

    #[error("resource '{0}' has no registered fields")]
    Empty(String),
}

/// Copies a field from the remote object into the resource data
pub type ReadFn<T> = fn(&T, &mut ResourceData) -> FieldResult<()>;

/// Copies a field from the resource data into the remote object
pub type WriteFn<T> = fn(&mut Handle<T>, &ResourceData) -> FieldResult<()>;

/// Decides whether a field changed between prior and current configuration
pub type ChangeFn = fn(&ResourceData) -> bool;

/// Descriptor of a single field
pub struct FieldDescriptor<T> {
    /// Group the field belongs to (e.g., "elastigroup_aws_strategy"), for logging
    affinity: &'static str,
    schema: AttributeSchema,
    on_read: Option<ReadFn<T>>,
    on_create: Option<WriteFn<T>>,
    on_update: Option<WriteFn<T>>,
    has_change: Option<ChangeFn>,
}

impl<T> FieldDescriptor<T> {
    pub fn new(affinity: &'static str, schema: AttributeSchema) -> Self {
        Self {
            affinity,
            schema,
            on_read: None,
            on_create: None,
            on_update: None,
            has_change: None,
        }
    }

    pub fn on_read(mut self, f: ReadFn<T>) -> Self {
        self.on_read = Some(f);
        self
    }

    pub fn on_create(mut self, f: WriteFn<T>) -> Self {
        self.on_create = Some(f);
        self
    }

    pub fn on_update(mut self, f: WriteFn<T>) -> Self {
        self.on_update = Some(f);
        self
    }

    pub fn has_change(mut self, f: ChangeFn) -> Self {
        self.has_change = Some(f);
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn affinity(&self) -> &'static str {
        self.affinity
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn reader(&self) -> Option<ReadFn<T>> {
        self.on_read
    }

    pub fn creator(&self) -> Option<WriteFn<T>> {
        self.on_create
    }

    pub fn updater(&self) -> Option<WriteFn<T>> {
        self.on_update
    }

    /// Whether this field changed between prior and current configuration
    ///
    /// Without an explicit predicate a field counts as changed when its own
    /// value differs.
    pub fn changed(&self, data: &ResourceData) -> bool {
        match self.has_change {
            Some(f) => f(data),
            None => data.has_change(&self.schema.name),
        }
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("affinity", &self.affinity)
            .field("name", &self.schema.name)
            .field("on_read", &self.on_read.is_some())
            .field("on_create", &self.on_create.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("has_change", &self.has_change.is_some())
            .finish()
    }
}

/// Ordered registry of field descriptors
///
/// Iteration follows registration order. A field whose callback reads what
/// another field wrote into the remote object must be registered after it.
#[derive(Debug)]
pub struct FieldRegistry<T> {
    fields: Vec<FieldDescriptor<T>>,
    index: HashMap<String, usize>,
}

impl<T> Default for FieldRegistry<T> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> FieldRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor; names must be non-empty and unique
    pub fn register(&mut self, descriptor: FieldDescriptor<T>) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.index.insert(name, self.fields.len());
        self.fields.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor<T>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the resource schema from the registered fields
    pub fn schema(&self, resource_type: &str) -> ResourceSchema {
        self.fields
            .iter()
            .fold(ResourceSchema::new(resource_type), |schema, field| {
                schema.attribute(field.schema.clone())
            })
    }
}
