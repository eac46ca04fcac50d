//! Claim payload schemas

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::duration::parse_duration;
use crate::error::{AuthzError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// String accepted by the duration parser, e.g. `"90s"`
    Duration,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Duration => value.as_str().map(|s| parse_duration(s).is_ok()).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Filled in when the field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Declared shape of a program's claim payload
///
/// The default schema accepts any payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,

    #[serde(default = "default_true")]
    pub additional_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ClaimSchema {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            additional_properties: true,
        }
    }
}

impl ClaimSchema {
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn strict(mut self) -> Self {
        self.additional_properties = false;
        self
    }
}

/// Validates a claim payload against a schema
pub trait ClaimValidator: Send + Sync {
    /// Returns the normalized payload, or `ClaimSchemaInvalid`
    fn validate(&self, schema: &ClaimSchema, payload: &Map<String, Value>) -> Result<Map<String, Value>>;
}

/// Field-type validator with defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl ClaimValidator for SchemaValidator {
    fn validate(&self, schema: &ClaimSchema, payload: &Map<String, Value>) -> Result<Map<String, Value>> {
        let mut problems = Vec::new();
        let mut normalized = payload.clone();

        for (name, spec) in &schema.fields {
            match payload.get(name) {
                Some(value) if !spec.field_type.accepts(value) => {
                    problems.push(format!("field {} must be {:?}, got {}", name, spec.field_type, value));
                }
                Some(_) => {}
                None => match &spec.default {
                    Some(default) => {
                        normalized.insert(name.clone(), default.clone());
                    }
                    None if spec.required => problems.push(format!("field {} is required", name)),
                    None => {}
                },
            }
        }

        if !schema.additional_properties {
            for name in payload.keys().filter(|k| !schema.fields.contains_key(*k)) {
                problems.push(format!("field {} is not allowed", name));
            }
        }

        if problems.is_empty() {
            Ok(normalized)
        } else {
            Err(AuthzError::ClaimSchemaInvalid(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn ttl_schema() -> ClaimSchema {
        ClaimSchema::default()
            .with_field("ttl", FieldSpec::new(FieldType::Duration).required())
            .with_field("max_ttl", FieldSpec::new(FieldType::Duration).with_default("1h"))
    }

    #[test]
    fn test_defaults_are_filled() {
        let normalized = SchemaValidator
            .validate(&ttl_schema(), &payload(json!({"ttl": "100s"})))
            .unwrap();
        assert_eq!(normalized["max_ttl"], json!("1h"));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let err = SchemaValidator
            .validate(&ttl_schema(), &payload(json!({"max_ttl": "forever"})))
            .unwrap_err();
        let AuthzError::ClaimSchemaInvalid(message) = err else {
            panic!("expected schema error");
        };
        assert!(message.contains("ttl is required"));
        assert!(message.contains("max_ttl must be Duration"));
    }

    #[test]
    fn test_strict_schema_rejects_unknown_fields() {
        let schema = ttl_schema().strict();
        let result = SchemaValidator.validate(&schema, &payload(json!({"ttl": "1s", "host": "x"})));
        assert!(matches!(result, Err(AuthzError::ClaimSchemaInvalid(_))));
    }

    #[test]
    fn test_schema_from_json() {
        let schema: ClaimSchema = serde_json::from_value(json!({
            "fields": {"ttl": {"type": "duration", "required": true}}
        }))
        .unwrap();
        assert!(schema.additional_properties);
        assert_eq!(schema.fields["ttl"].field_type, FieldType::Duration);
    }
}
