//! Schema descriptions
//!
//! A schema is an immutable map from attribute name to [`Attribute`]. Each
//! resource type exposes one function that builds its schema for a given
//! [`SchemaType`]; the orchestrator uses the result to validate user
//! configuration and decide between in-place update and replacement.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Whether a schema is built for a managed resource or a read-only lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Resource,
    DataSource,
}

impl SchemaType {
    pub fn is_resource(self) -> bool {
        self == SchemaType::Resource
    }

    pub fn is_data_source(self) -> bool {
        self == SchemaType::DataSource
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    List,
    Map,
}

/// Description of a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: AttributeType,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub force_new: bool,
    /// Element schema of a list of nested objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elem: Option<Schema>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

pub type Schema = BTreeMap<&'static str, Attribute>;

impl Attribute {
    pub fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            elem: None,
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn int() -> Self {
        Self::new(AttributeType::Int)
    }

    pub fn list_of(elem: Schema) -> Self {
        Self {
            elem: Some(elem),
            ..Self::new(AttributeType::List)
        }
    }

    pub fn map() -> Self {
        Self::new(AttributeType::Map)
    }

    pub fn required(mut self, yes: bool) -> Self {
        self.required = yes;
        self
    }

    pub fn optional(mut self, yes: bool) -> Self {
        self.optional = yes;
        self
    }

    pub fn computed(mut self, yes: bool) -> Self {
        self.computed = yes;
        self
    }

    pub fn force_new(mut self, yes: bool) -> Self {
        self.force_new = yes;
        self
    }

    /// Computed attributes that the user may not set
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Tags are an optional string map on every taggable resource
pub fn tags_attribute() -> Attribute {
    Attribute::map().optional(true)
}

/// Check a user configuration against a schema.
///
/// Rejects unknown keys, missing required keys, values on computed-only
/// attributes and values of the wrong JSON type. Nested list elements are
/// checked recursively.
pub fn validate(schema: &Schema, config: &Map<String, Value>) -> Result<()> {
    let mut problems = Vec::new();
    validate_into(schema, config, "", &mut problems);

    if problems.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Invalid configuration: {}", problems.join("; ")))
    }
}

fn validate_into(
    schema: &Schema,
    config: &Map<String, Value>,
    prefix: &str,
    problems: &mut Vec<String>,
) {
    for key in config.keys() {
        if !schema.contains_key(key.as_str()) {
            problems.push(format!("unknown attribute \"{}{}\"", prefix, key));
        }
    }

    for (name, attr) in schema {
        let value = config.get(*name).filter(|v| !v.is_null());
        let path = format!("{}{}", prefix, name);

        let Some(value) = value else {
            if attr.required {
                problems.push(format!("missing required attribute \"{}\"", path));
            }
            continue;
        };

        if attr.is_computed_only() {
            problems.push(format!("attribute \"{}\" is computed and cannot be set", path));
            continue;
        }

        let type_ok = match attr.kind {
            AttributeType::String => value.is_string(),
            AttributeType::Int => value.is_i64() || value.is_u64(),
            AttributeType::List => value.is_array(),
            AttributeType::Map => value
                .as_object()
                .map(|m| m.values().all(Value::is_string))
                .unwrap_or(false),
        };
        if !type_ok {
            problems.push(format!("attribute \"{}\" must be of type {:?}", path, attr.kind));
            continue;
        }

        if let (Some(elem), Some(items)) = (&attr.elem, value.as_array()) {
            for (i, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(obj) => {
                        validate_into(elem, obj, &format!("{}.{}.", path, i), problems)
                    }
                    None => problems.push(format!("{}.{} must be an object", path, i)),
                }
            }
        }
    }
}
