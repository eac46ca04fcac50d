//! Evaluation context for CEL expressions

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Variables visible to a policy program
///
/// `input` is the claim payload of the request; `data` is the read-only
/// document holding the candidate grants, the subject and provider data.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub input: Map<String, Value>,
    pub data: Map<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        self.input = input;
        self
    }

    /// Set one key of the `data` document
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// All variables as a flat map
    pub fn to_variables(&self) -> HashMap<String, Value> {
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), Value::Object(self.input.clone()));
        vars.insert("data".to_string(), Value::Object(self.data.clone()));
        vars
    }
}
