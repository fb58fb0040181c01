//! Schema - Define type schemas for resources
//!
//! Every resource type derives its schema from its field registry.
//! Configuration is validated against the schema once, before any field
//! callback runs, so callbacks can rely on well-typed values.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block, written as a list of objects
    Block(BlockSchema),
}

/// Schema of a nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: Vec<AttributeSchema>,
    pub max_items: Option<usize>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.push(schema);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    fn validate(&self, value: &Value) -> Result<(), TypeError> {
        let items = match value {
            Value::List(items) => items,
            other => {
                return Err(TypeError::TypeMismatch {
                    expected: "Block".to_string(),
                    got: other.type_name().to_string(),
                });
            }
        };

        if let Some(max) = self.max_items {
            if items.len() > max {
                return Err(TypeError::TooManyItems {
                    max,
                    got: items.len(),
                });
            }
        }

        for (index, item) in items.iter().enumerate() {
            let fields = match item {
                Value::Map(fields) => fields,
                other => {
                    return Err(TypeError::ListItemError {
                        index,
                        inner: Box::new(TypeError::TypeMismatch {
                            expected: "Map".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    });
                }
            };
            self.validate_fields(fields)
                .map_err(|e| TypeError::ListItemError {
                    index,
                    inner: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn validate_fields(&self, fields: &HashMap<String, Value>) -> Result<(), TypeError> {
        for schema in &self.attributes {
            match fields.get(&schema.name) {
                Some(value) => {
                    schema
                        .attr_type
                        .validate(value)
                        .map_err(|e| TypeError::MapValueError {
                            key: schema.name.clone(),
                            inner: Box::new(e),
                        })?
                }
                None if schema.required => {
                    return Err(TypeError::MissingRequired {
                        name: schema.name.clone(),
                    });
                }
                None => {}
            }
        }

        let mut unknown: Vec<&String> = fields
            .keys()
            .filter(|k| !self.attributes.iter().any(|a| &a.name == *k))
            .collect();
        unknown.sort();
        match unknown.first() {
            Some(name) => Err(TypeError::UnknownAttribute {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), v) => block.validate(v),

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' conflicts with '{other}'")]
    Conflict { name: String, other: String },

    #[error("Too many items: at most {max} allowed, got {got}")]
    TooManyItems { max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Changing this attribute replaces the remote object
    pub force_new: bool,
    /// Attributes that must not be set together with this one
    pub conflicts_with: Vec<String>,
    /// Sent to the API but never read back; plans ignore it
    pub write_only: bool,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            force_new: false,
            conflicts_with: Vec::new(),
            write_only: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn conflicts_with(mut self, other: impl Into<String>) -> Self {
        self.conflicts_with.push(other.into());
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Attribute names in a stable order, for display
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for name in self.attribute_names() {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) {
                errors.push(TypeError::MissingRequired {
                    name: name.to_string(),
                });
            }
        }

        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort();

        // Type check each attribute
        for name in names {
            let value = &attributes[name];
            let Some(schema) = self.attributes.get(name) else {
                errors.push(TypeError::UnknownAttribute { name: name.clone() });
                continue;
            };
            if let Err(e) = schema.attr_type.validate(value) {
                errors.push(TypeError::MapValueError {
                    key: name.clone(),
                    inner: Box::new(e),
                });
            }
            for other in &schema.conflicts_with {
                let set = attributes.get(other).is_some_and(|v| !v.is_zero());
                if set && !value.is_zero() {
                    errors.push(TypeError::Conflict {
                        name: name.clone(),
                        other: other.clone(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Integer greater than or equal to zero
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n > 0 => Ok(()),
                Value::Int(_) => Err("Value must be positive".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Percentage between 0 and 100
    pub fn percentage() -> AttributeType {
        AttributeType::Custom {
            name: "Percentage".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (0..=100).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Percentage {} must be between 0 and 100", n)),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// Enum from a list of string literals
    pub fn one_of(variants: &[&str]) -> AttributeType {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = types::one_of(&["HTTP", "HTTPS"]);
        assert!(t.validate(&Value::from("HTTP")).is_ok());
        assert!(t.validate(&Value::from("TCP")).is_err());
    }

    #[test]
    fn validate_percentage() {
        let t = types::percentage();
        assert!(t.validate(&Value::Int(0)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(101)).is_err());
        assert!(t.validate(&Value::from("50")).is_err());
    }

    #[test]
    fn validate_non_negative_int() {
        let t = types::non_negative_int();
        assert!(t.validate(&Value::Int(0)).is_ok());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    fn network_interface() -> AttributeType {
        AttributeType::Block(
            BlockSchema::new()
                .attribute(AttributeSchema::new("network", AttributeType::String).required())
                .attribute(AttributeSchema::new(
                    "access_configs",
                    AttributeType::Block(
                        BlockSchema::new()
                            .attribute(AttributeSchema::new("name", AttributeType::String))
                            .attribute(AttributeSchema::new("type", AttributeType::String)),
                    ),
                )),
        )
    }

    #[test]
    fn validate_nested_block() {
        let value = Value::from_json(&serde_json::json!([
            {"network": "default", "access_configs": [{"name": "cfg"}]},
            {"network": "other"}
        ]))
        .unwrap();
        assert!(network_interface().validate(&value).is_ok());
    }

    #[test]
    fn block_rejects_missing_and_unknown_keys() {
        let missing = Value::from_json(&serde_json::json!([{"access_configs": []}])).unwrap();
        assert!(network_interface().validate(&missing).is_err());

        let unknown = Value::from_json(&serde_json::json!([{"network": "n", "nic": 1}])).unwrap();
        let err = network_interface().validate(&unknown).unwrap_err();
        assert!(err.to_string().contains("nic"));
    }

    #[test]
    fn block_enforces_max_items() {
        let t = AttributeType::Block(
            BlockSchema::new()
                .attribute(AttributeSchema::new("count", AttributeType::Int))
                .max_items(1),
        );
        let value = Value::from_json(&serde_json::json!([{"count": 1}, {"count": 2}])).unwrap();
        assert!(matches!(
            t.validate(&value),
            Err(TypeError::TooManyItems { max: 1, got: 2 })
        ));
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::positive_int()))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("my-resource".to_string()));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let attrs = HashMap::new();
        let result = schema.validate(&attrs);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let schema = ResourceSchema::new("group")
            .attribute(AttributeSchema::new("name", AttributeType::String));

        let mut attrs = HashMap::new();
        attrs.insert("nmae".to_string(), Value::from("typo"));
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::UnknownAttribute { name } if name == "nmae"));
    }

    #[test]
    fn conflicting_attributes() {
        let schema = ResourceSchema::new("group")
            .attribute(
                AttributeSchema::new("subnet_ids", types::string_list())
                    .conflicts_with("availability_zones"),
            )
            .attribute(AttributeSchema::new("availability_zones", types::string_list()));

        let mut attrs = HashMap::new();
        attrs.insert("subnet_ids".to_string(), Value::from(vec!["subnet-1"]));
        attrs.insert("availability_zones".to_string(), Value::from(vec!["us-west-2a"]));
        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TypeError::Conflict { .. }));

        // An empty list does not count as set
        attrs.insert("availability_zones".to_string(), Value::List(vec![]));
        assert!(schema.validate(&attrs).is_ok());
    }
}
