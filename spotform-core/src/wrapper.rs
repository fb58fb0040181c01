//! Wrapper - Run a field registry over one remote object
//!
//! A `ResourceWrapper` owns the registry of one resource type and exposes
//! the three translation entry points used by the provider: `on_create`,
//! `on_read` and `on_update`. Each entry point walks the registry in
//! declaration order and stops at the first field error.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use log::debug;

use crate::data::ResourceData;
use crate::field::{FieldRegistry, FieldResult, RegistryError};
use crate::schema::ResourceSchema;

/// Remote object a resource wrapper translates to and from
pub trait RemoteObject: Default {
    /// Object used when nothing was imported, with the nested structure that
    /// field callbacks write into already allocated
    fn scaffold() -> Self {
        Self::default()
    }
}

/// Remote object under construction, scoped to one wrapper call
///
/// Besides the object itself the handle carries marks that let several
/// fields sharing one part of the object process it exactly once per call.
#[derive(Debug)]
pub struct Handle<T> {
    object: T,
    marks: HashSet<&'static str>,
}

impl<T> Handle<T> {
    pub fn new(object: T) -> Self {
        Self {
            object,
            marks: HashSet::new(),
        }
    }

    /// Returns true the first time it is called with `key` on this handle
    pub fn mark_once(&mut self, key: &'static str) -> bool {
        self.marks.insert(key)
    }

    pub fn into_inner(self) -> T {
        self.object
    }
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T> DerefMut for Handle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.object
    }
}

/// Translation entry points for one resource type
#[derive(Debug)]
pub struct ResourceWrapper<T> {
    resource_type: &'static str,
    fields: FieldRegistry<T>,
}

impl<T: RemoteObject> ResourceWrapper<T> {
    /// Wrap a registry; an empty registry is rejected
    pub fn new(resource_type: &'static str, fields: FieldRegistry<T>) -> Result<Self, RegistryError> {
        if fields.is_empty() {
            return Err(RegistryError::Empty(resource_type.to_string()));
        }
        Ok(Self {
            resource_type,
            fields,
        })
    }

    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    pub fn fields(&self) -> &FieldRegistry<T> {
        &self.fields
    }

    pub fn schema(&self) -> ResourceSchema {
        self.fields.schema(self.resource_type)
    }

    /// Build the remote object for a create request
    ///
    /// Starts from `imported` when given, otherwise from a scaffolded object.
    pub fn on_create(&self, imported: Option<T>, data: &ResourceData) -> FieldResult<T> {
        let mut handle = Handle::new(imported.unwrap_or_else(T::scaffold));

        for field in self.fields.iter() {
            let Some(create) = field.creator() else {
                continue;
            };
            debug!(
                "{}: onCreate field [{}/{}]",
                self.resource_type,
                field.affinity(),
                field.name()
            );
            create(&mut handle, data)?;
        }

        Ok(handle.into_inner())
    }

    /// Copy every readable field of a fetched remote object into `data`
    pub fn on_read(&self, object: &T, data: &mut ResourceData) -> FieldResult<()> {
        for field in self.fields.iter() {
            let Some(read) = field.reader() else {
                continue;
            };
            debug!(
                "{}: onRead field [{}/{}]",
                self.resource_type,
                field.affinity(),
                field.name()
            );
            read(object, data)?;
        }

        Ok(())
    }

    /// Build the remote object for an update request
    ///
    /// Returns whether any field changed. When it is false the caller must
    /// not send an update.
    pub fn on_update(&self, data: &ResourceData) -> FieldResult<(bool, T)> {
        let mut handle = Handle::new(T::scaffold());
        let mut has_changes = false;

        for field in self.fields.iter() {
            let Some(update) = field.updater() else {
                continue;
            };
            if !field.changed(data) {
                continue;
            }
            debug!(
                "{}: onUpdate field [{}/{}]",
                self.resource_type,
                field.affinity(),
                field.name()
            );
            update(&mut handle, data)?;
            has_changes = true;
        }

        Ok((has_changes, handle.into_inner()))
    }
}
