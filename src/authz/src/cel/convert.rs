//! Value conversion between serde_json::Value and cel_interpreter types

use base64::Engine as _;
use cel_interpreter::objects::{Key, Map, Value as CelValue};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Convert serde_json::Value to cel_interpreter::Value
pub fn json_to_cel(value: &JsonValue) -> CelValue {
    match value {
        JsonValue::Null => CelValue::Null,
        JsonValue::Bool(b) => CelValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                CelValue::Float(f)
            } else {
                CelValue::Null
            }
        }
        JsonValue::String(s) => CelValue::String(Arc::new(s.clone())),
        JsonValue::Array(arr) => {
            let items: Vec<CelValue> = arr.iter().map(json_to_cel).collect();
            CelValue::List(Arc::new(items))
        }
        JsonValue::Object(obj) => {
            let entries: HashMap<Key, CelValue> = obj
                .iter()
                .map(|(k, v)| (Key::from(k.clone()), json_to_cel(v)))
                .collect();
            CelValue::Map(Map { map: Arc::new(entries) })
        }
    }
}

/// Convert cel_interpreter::Value to serde_json::Value
///
/// Durations become whole seconds and timestamps RFC 3339 strings, matching
/// how duration strings are handled elsewhere in the engine.
pub fn cel_to_json(value: &CelValue) -> JsonValue {
    match value {
        CelValue::Null => JsonValue::Null,
        CelValue::Bool(b) => JsonValue::Bool(*b),
        CelValue::Int(i) => JsonValue::Number((*i).into()),
        CelValue::UInt(u) => JsonValue::Number((*u).into()),
        CelValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CelValue::String(s) => JsonValue::String(s.to_string()),
        CelValue::Bytes(b) => JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b.as_ref())),
        CelValue::List(list) => JsonValue::Array(list.iter().map(cel_to_json).collect()),
        CelValue::Map(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map.map.iter() {
                let key = match k {
                    Key::String(s) => s.to_string(),
                    Key::Int(i) => i.to_string(),
                    Key::Uint(u) => u.to_string(),
                    Key::Bool(b) => b.to_string(),
                };
                obj.insert(key, cel_to_json(v));
            }
            JsonValue::Object(obj)
        }
        CelValue::Duration(d) => JsonValue::Number(d.num_seconds().into()),
        CelValue::Timestamp(t) => JsonValue::String(t.to_rfc3339()),
        CelValue::Function(_, _) => JsonValue::String(format!("{:?}", value)),
    }
}
