//! ResourceData - Configuration and state of one resource instance
//!
//! Field callbacks read user configuration from here and write values read
//! back from the remote API into it. On update it also holds the prior
//! attributes so change predicates can compare old and new values.

use std::collections::HashMap;

use crate::field::{FieldError, FieldResult};
use crate::resource::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    prior: HashMap<String, Value>,
    attributes: HashMap<String, Value>,
}

impl ResourceData {
    /// Data for a create request
    pub fn new(attributes: HashMap<String, Value>) -> Self {
        Self {
            id: None,
            prior: HashMap::new(),
            attributes,
        }
    }

    /// Data for an update request
    pub fn for_update(
        id: impl Into<String>,
        prior: HashMap<String, Value>,
        attributes: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            prior,
            attributes,
        }
    }

    /// Empty sink for a read of an existing remote object
    pub fn for_read(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> HashMap<String, Value> {
        self.attributes
    }

    /// Raw value, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Value, if present and not the zero value of its type
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_zero())
    }

    /// Whether the key is present at all, including zero values
    pub fn is_set(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Prior value on update
    pub fn get_prior(&self, key: &str) -> Option<&Value> {
        self.prior.get(key)
    }

    /// Whether a value differs between prior and current configuration
    ///
    /// An absent value and a zero value compare equal.
    pub fn has_change(&self, key: &str) -> bool {
        let old = self.prior.get(key).filter(|v| !v.is_zero());
        let new = self.attributes.get(key).filter(|v| !v.is_zero());
        old != new
    }

    /// Whether a value held before is no longer configured
    pub fn is_removed(&self, key: &str) -> bool {
        self.prior.get(key).is_some_and(|v| !v.is_zero())
            && self.attributes.get(key).is_none_or(Value::is_zero)
    }

    /// Whether any of the keys changed
    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_change(k))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Set the value, or remove the key when `None`
    pub fn set_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.attributes.insert(key, v.into());
            }
            None => {
                self.attributes.remove(&key);
            }
        }
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    pub fn get_str(&self, key: &str) -> FieldResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(key, "String", other)),
        }
    }

    /// Owned non-empty string
    pub fn get_string(&self, key: &str) -> FieldResult<Option<String>> {
        Ok(self
            .get_str(key)?
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    /// Integer greater than zero
    pub fn get_positive_int(&self, key: &str) -> FieldResult<Option<i64>> {
        Ok(self.get_int(key)?.filter(|n| *n > 0))
    }

    pub fn get_int(&self, key: &str) -> FieldResult<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(mismatch(key, "Int", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> FieldResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(key, "Bool", other)),
        }
    }

    /// List of strings; empty strings are dropped
    pub fn get_strings(&self, key: &str) -> FieldResult<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Some(other) => Err(mismatch(key, "List", other)),
        }
    }

    /// Nested block entries; elements that are not objects are skipped
    pub fn get_blocks(&self, key: &str) -> FieldResult<Option<Vec<&HashMap<String, Value>>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.iter().filter_map(Value::as_map).collect())),
            Some(other) => Err(mismatch(key, "Block", other)),
        }
    }

    /// First entry of a single-item nested block
    pub fn get_block(&self, key: &str) -> FieldResult<Option<&HashMap<String, Value>>> {
        Ok(self.get_blocks(key)?.and_then(|b| b.into_iter().next()))
    }
}

fn mismatch(key: &str, expected: &'static str, got: &Value) -> FieldError {
    FieldError::TypeMismatch {
        field: key.to_string(),
        expected,
        got: got.type_name(),
    }
}
