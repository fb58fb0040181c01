//! Expand/Flatten helpers for nested blocks
//!
//! Nested configuration blocks arrive as a list of objects. `Block` gives a
//! typed read-only view on one object for expand functions, and
//! `BlockBuilder` assembles one object for flatten functions.
//!
//! Values inside a block that have the wrong shape are skipped rather than
//! reported: only the top-level accessors on `ResourceData` fail on a type
//! mismatch. Empty strings and empty lists are treated as unset.

use std::collections::HashMap;

use crate::data::ResourceData;
use crate::field::FieldResult;
use crate::resource::Value;

/// Read-only view on one nested block entry
#[derive(Debug, Clone, Copy)]
pub struct Block<'a>(&'a HashMap<String, Value>);

impl<'a> Block<'a> {
    pub fn new(fields: &'a HashMap<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }

    /// Non-empty string value
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.str(key).map(str::to_string)
    }

    /// Integer value, zero included
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    /// Integer value greater than zero
    pub fn positive_int(&self, key: &str) -> Option<i64> {
        self.int(key).filter(|n| *n > 0)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Non-empty list of non-empty strings
    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .get(key)
            .and_then(Value::as_list)?
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if items.is_empty() { None } else { Some(items) }
    }

    /// Entries of a nested block; entries that are not objects are skipped
    pub fn blocks(&self, key: &str) -> Vec<Block<'a>> {
        self.get(key)
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_map).map(Block).collect())
            .unwrap_or_default()
    }

    /// First entry of a single-item nested block
    pub fn block(&self, key: &str) -> Option<Block<'a>> {
        self.blocks(key).into_iter().next()
    }
}

/// Entries of a top-level nested block
///
/// Returns `None` when the field is absent or holds no entries.
pub fn blocks<'a>(data: &'a ResourceData, key: &str) -> FieldResult<Option<Vec<Block<'a>>>> {
    Ok(data
        .get_blocks(key)?
        .map(|items| items.into_iter().map(Block).collect::<Vec<_>>())
        .filter(|items| !items.is_empty()))
}

/// First entry of a top-level single-item nested block
pub fn block<'a>(data: &'a ResourceData, key: &str) -> FieldResult<Option<Block<'a>>> {
    Ok(data.get_block(key)?.map(Block))
}

/// Builds one block entry for flattening
#[derive(Debug, Default)]
pub struct BlockBuilder {
    fields: HashMap<String, Value>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field when the value is present
    pub fn set<V: Into<Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.fields.insert(key.to_string(), v.into());
        }
        self
    }

    /// Set a nested block when it has entries
    pub fn nested(mut self, key: &str, entries: Vec<Value>) -> Self {
        if !entries.is_empty() {
            self.fields.insert(key.to_string(), Value::List(entries));
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Map(self.fields)
    }
}

/// Wrap flattened entries as a block value; `None` when there are none
pub fn flattened(entries: Vec<Value>) -> Option<Value> {
    if entries.is_empty() {
        None
    } else {
        Some(Value::List(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> HashMap<String, Value> {
        match Value::from_json(&value) {
            Some(Value::Map(map)) => map,
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn block_filters_empty_and_zero_values() {
        let fields = entry(json!({
            "name": "",
            "hosted_zone_id": "Z123",
            "count": 0,
            "timeout": 30,
            "time_windows": ["", "Mon:12:00-Mon:13:00"],
            "empty": [],
        }));
        let block = Block::new(&fields);

        assert_eq!(block.str("name"), None);
        assert_eq!(block.str("hosted_zone_id"), Some("Z123"));
        assert_eq!(block.int("count"), Some(0));
        assert_eq!(block.positive_int("count"), None);
        assert_eq!(block.positive_int("timeout"), Some(30));
        assert_eq!(
            block.strings("time_windows"),
            Some(vec!["Mon:12:00-Mon:13:00".to_string()])
        );
        assert_eq!(block.strings("empty"), None);
    }

    #[test]
    fn malformed_inner_values_are_skipped() {
        let fields = entry(json!({
            "name": 5,
            "record_sets": ["not-an-object", {"name": "api"}],
        }));
        let block = Block::new(&fields);

        assert_eq!(block.str("name"), None);
        let sets = block.blocks("record_sets");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].str("name"), Some("api"));
    }

    #[test]
    fn top_level_mismatch_is_an_error() {
        let mut attrs = HashMap::new();
        attrs.insert("gpu".to_string(), Value::from("nvidia"));
        let data = ResourceData::new(attrs);
        assert!(blocks(&data, "gpu").is_err());
        assert!(matches!(blocks(&data, "absent"), Ok(None)));
    }

    #[test]
    fn builder_skips_absent_values() {
        let value = BlockBuilder::new()
            .set("name", Some("cfg"))
            .set::<String>("type", None)
            .nested("ranges", vec![])
            .build();

        assert_eq!(value.to_json(), json!({"name": "cfg"}));
        assert_eq!(flattened(vec![]), None);
    }
}
