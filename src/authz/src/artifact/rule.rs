//! Downstream permission rules and the artifact policy carrying them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Abstract permission on one downstream path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleRepr", into = "RuleRepr")]
pub struct Rule {
    pub path: String,
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub list: bool,
    pub allowed_parameters: BTreeMap<String, Vec<String>>,
    pub required_parameters: Vec<String>,
}

/// Wire form: capabilities as a list of names
#[derive(Serialize, Deserialize)]
struct RuleRepr {
    path: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    allowed_parameters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    required_parameters: Vec<String>,
}

impl From<RuleRepr> for Rule {
    fn from(repr: RuleRepr) -> Self {
        let mut rule = Rule {
            path: repr.path,
            allowed_parameters: repr.allowed_parameters,
            required_parameters: repr.required_parameters,
            ..Default::default()
        };
        for capability in &repr.capabilities {
            match capability.as_str() {
                "create" => rule.create = true,
                "update" => rule.update = true,
                "read" => rule.read = true,
                "delete" => rule.delete = true,
                "list" => rule.list = true,
                _ => {}
            }
        }
        rule
    }
}

impl From<Rule> for RuleRepr {
    fn from(rule: Rule) -> Self {
        RuleRepr {
            capabilities: rule.capabilities().into_iter().map(String::from).collect(),
            path: rule.path,
            allowed_parameters: rule.allowed_parameters,
            required_parameters: rule.required_parameters,
        }
    }
}

impl Rule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_read(mut self) -> Self {
        self.read = true;
        self
    }

    pub fn with_list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn with_create(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn with_update(mut self) -> Self {
        self.update = true;
        self
    }

    pub fn with_delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Granted capabilities in canonical order
    pub fn capabilities(&self) -> Vec<&'static str> {
        [
            (self.create, "create"),
            (self.update, "update"),
            (self.read, "read"),
            (self.delete, "delete"),
            (self.list, "list"),
        ]
        .into_iter()
        .filter_map(|(granted, name)| granted.then_some(name))
        .collect()
    }
}

fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| format!("\"{}\"", s.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "path \"{}\" {{", self.path)?;
        writeln!(f, "   capabilities = [{}]", quoted_list(&self.capabilities()))?;
        if !self.required_parameters.is_empty() {
            writeln!(f, "   required_parameters = [{}]", quoted_list(&self.required_parameters))?;
        }
        if !self.allowed_parameters.is_empty() {
            writeln!(f, "   allowed_parameters = {{")?;
            for (name, values) in &self.allowed_parameters {
                writeln!(f, "      \"{}\" = [{}]", name, quoted_list(values))?;
            }
            writeln!(f, "   }}")?;
        }
        write!(f, "}}")
    }
}

/// Named set of rules created downstream for one authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub rules: Vec<Rule>,
}

impl ArtifactPolicy {
    /// Rules in downstream policy text form, separated by blank lines
    pub fn policy_rules(&self) -> String {
        self.rules
            .iter()
            .map(Rule::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
