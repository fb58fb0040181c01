//! Vendor models
//!
//! Wire representation of the objects the Spotinst API manages. Every field
//! is optional so that partial objects (update requests in particular) only
//! carry what was set. Fields the API clears with an explicit `null` use
//! [`Nullable`].

pub mod elastigroup_aws;
pub mod elastigroup_aws_beanstalk;
pub mod elastigroup_azure;
pub mod elastigroup_gcp;
pub mod health_check;
pub mod managed_instance;
pub mod multai;
pub mod ocean_aks;
pub mod stateful_node_azure;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that is either left out of a request, sent as `null` to clear the
/// remote value, or sent with a value
///
/// Use with `#[serde(default, skip_serializing_if = "Nullable::is_unset")]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Nullable<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    /// `value` when present, `Null` when the attribute was removed from the
    /// configuration, otherwise `Unset`
    pub fn new(value: Option<T>, removed: bool) -> Self {
        match value {
            Some(value) => Nullable::Value(value),
            None if removed => Nullable::Null,
            None => Nullable::Unset,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Nullable::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Nullable::Null)
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Nullable::Value(value) => Some(value),
            Nullable::Unset | Nullable::Null => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Nullable::Value(value) => Some(value),
            Nullable::Unset | Nullable::Null => None,
        }
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        Nullable::new(value, false)
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Nullable::Value(value) => value.serialize(serializer),
            Nullable::Unset | Nullable::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Nullable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Nullable::Value(value),
            None => Nullable::Null,
        })
    }
}

/// Group capacity, shared by the elastigroup flavours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Plain key/value tag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}
