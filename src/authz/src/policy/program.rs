//! Policy program definition

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::schema::ClaimSchema;

/// CEL source of a policy program
///
/// `definitions` run first, in order, each bound under its name. The output
/// expressions then see `input`, `data` and every definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSource {
    #[serde(default)]
    pub definitions: Vec<(String, String)>,

    pub allow: String,

    #[serde(default = "ProgramSource::default_filtered_bindings")]
    pub filtered_bindings: String,

    #[serde(default = "ProgramSource::default_list")]
    pub rules: String,

    #[serde(default = "ProgramSource::default_duration")]
    pub ttl: String,

    #[serde(default = "ProgramSource::default_duration")]
    pub max_ttl: String,

    /// Reasons reported when the program denies
    #[serde(default)]
    pub errors: Option<String>,
}

impl ProgramSource {
    fn default_filtered_bindings() -> String {
        "data.effective_roles".to_string()
    }

    fn default_list() -> String {
        "[]".to_string()
    }

    fn default_duration() -> String {
        "'0'".to_string()
    }

    /// Program that evaluates `allow` and passes every candidate through
    pub fn new(allow: impl Into<String>) -> Self {
        Self {
            definitions: Vec::new(),
            allow: allow.into(),
            filtered_bindings: Self::default_filtered_bindings(),
            rules: Self::default_list(),
            ttl: Self::default_duration(),
            max_ttl: Self::default_duration(),
            errors: None,
        }
    }

    pub fn with_definition(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.definitions.push((name.into(), expr.into()));
        self
    }

    pub fn with_filtered_bindings(mut self, expr: impl Into<String>) -> Self {
        self.filtered_bindings = expr.into();
        self
    }

    pub fn with_rules(mut self, expr: impl Into<String>) -> Self {
        self.rules = expr.into();
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>, max_ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self.max_ttl = max_ttl.into();
        self
    }

    pub fn with_errors(mut self, expr: impl Into<String>) -> Self {
        self.errors = Some(expr.into());
        self
    }
}

/// Policy program bound to role names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyProgram {
    pub name: String,

    pub source: ProgramSource,

    /// Role names or `*` patterns (e.g. `"ssh.*"`)
    pub bound_roles: BTreeSet<String>,

    #[serde(default)]
    pub claim_schema: ClaimSchema,

    /// Auth methods allowed to use the program; empty accepts any
    #[serde(default)]
    pub allowed_auth_methods: BTreeSet<String>,
}

impl PolicyProgram {
    pub fn new(name: impl Into<String>, source: ProgramSource) -> Self {
        Self {
            name: name.into(),
            source,
            bound_roles: BTreeSet::new(),
            claim_schema: ClaimSchema::default(),
            allowed_auth_methods: BTreeSet::new(),
        }
    }

    pub fn with_bound_role(mut self, role: impl Into<String>) -> Self {
        self.bound_roles.insert(role.into());
        self
    }

    pub fn with_claim_schema(mut self, schema: ClaimSchema) -> Self {
        self.claim_schema = schema;
        self
    }

    pub fn with_auth_method(mut self, method: impl Into<String>) -> Self {
        self.allowed_auth_methods.insert(method.into());
        self
    }

    /// Whether the program is bound to `role`
    pub fn is_bound_to(&self, role: &str) -> bool {
        self.bound_roles.iter().any(|pattern| matches_pattern(pattern, role))
    }

    pub fn accepts_auth_method(&self, method: &str) -> bool {
        self.allowed_auth_methods.is_empty() || self.allowed_auth_methods.contains(method)
    }
}

/// Match a pattern against a value (supports wildcards)
fn matches_pattern(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.contains('*') {
        let regex_pattern = regex::escape(pattern).replace(r"\*", ".*");
        if let Ok(regex) = regex::Regex::new(&format!("^{}$", regex_pattern)) {
            return regex.is_match(value);
        }
    }

    pattern == value
}
