//! Policy program evaluation

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use warden_core::{RoleClaim, Subject};

use super::program::PolicyProgram;
use super::schema::{ClaimValidator, SchemaValidator};
use crate::artifact::Rule;
use crate::cel::engine::NamedExpr;
use crate::cel::{Engine as CelEngine, EvalContext};
use crate::duration::parse_duration;
use crate::error::{AuthzError, Result};
use crate::selector::select_best;
use crate::types::EffectiveGrant;

/// Result of running one program for one claim
#[derive(Debug, Clone, Default)]
pub struct PolicyOutcome {
    /// False whenever no grant was chosen, whatever the program said
    pub allow: bool,

    /// Candidates the program kept, in program order
    pub survivors: Vec<EffectiveGrant>,

    pub chosen: Option<EffectiveGrant>,

    pub rules: Vec<Rule>,

    pub ttl: Duration,

    pub max_ttl: Duration,

    /// Reasons reported by the program or found while reading its output
    pub errors: Vec<String>,
}

/// Runs policy programs against candidate grants
pub struct PolicyEvaluator {
    cel: CelEngine,
    validator: Arc<dyn ClaimValidator>,
}

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self {
            cel: CelEngine::new(),
            validator: Arc::new(SchemaValidator),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ClaimValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Drop compiled programs
    pub fn clear_cache(&self) {
        self.cel.clear_cache();
    }

    pub fn cached_programs(&self) -> usize {
        self.cel.cache_stats().size
    }

    /// Validate the claim, run the program and select the best survivor
    ///
    /// A schema violation is `ClaimSchemaInvalid`; a malformed or failing
    /// program is `PolicyEvaluationFailed`. A denial is a normal outcome with
    /// `allow == false`.
    pub fn evaluate(
        &self,
        program: &PolicyProgram,
        subject: &Subject,
        user_data: Value,
        candidates: &[EffectiveGrant],
        claim: &RoleClaim,
    ) -> Result<PolicyOutcome> {
        let normalized = self.validator.validate(&program.claim_schema, &claim.claim)?;
        let ctx = EvalContext::new()
            .with_input(build_input(normalized, claim))
            .with_data("effective_roles", to_json(candidates)?)
            .with_data("subject", to_json(subject)?)
            .with_data("user_data", user_data);

        let source = &program.source;
        let definitions: Vec<NamedExpr<'_>> = source
            .definitions
            .iter()
            .map(|(name, expr)| NamedExpr { name, expr })
            .collect();

        let mut verdict = vec![NamedExpr { name: "allow", expr: &source.allow }];
        if let Some(errors) = &source.errors {
            verdict.push(NamedExpr { name: "errors", expr: errors });
        }
        let verdict = self.cel.evaluate_document(&definitions, &verdict, &ctx)?;

        let allow = match verdict.first() {
            Some((_, Value::Bool(allow))) => *allow,
            other => {
                return Err(AuthzError::PolicyEvaluationFailed(format!(
                    "program {}: allow must be a boolean, got {:?}",
                    program.name,
                    other.map(|(_, v)| v)
                )))
            }
        };
        let mut outcome = PolicyOutcome {
            errors: verdict.get(1).map(|(_, v)| string_list(v)).unwrap_or_default(),
            ..Default::default()
        };
        if !allow {
            debug!(program = %program.name, role = %claim.role, "program denied");
            return Ok(outcome);
        }

        let outputs = [
            NamedExpr { name: "filtered_bindings", expr: &source.filtered_bindings },
            NamedExpr { name: "rules", expr: &source.rules },
            NamedExpr { name: "ttl", expr: &source.ttl },
            NamedExpr { name: "max_ttl", expr: &source.max_ttl },
        ];
        let mut values = self
            .cel
            .evaluate_document(&definitions, &outputs, &ctx)?
            .into_iter()
            .map(|(_, v)| v);
        let filtered = values.next().unwrap_or(Value::Null);
        let rules = values.next().unwrap_or(Value::Null);
        let ttl = values.next().unwrap_or(Value::Null);
        let max_ttl = values.next().unwrap_or(Value::Null);

        outcome.survivors = match_survivors(&program.name, &filtered, candidates)?;
        outcome.rules = serde_json::from_value(rules).map_err(|e| {
            AuthzError::PolicyEvaluationFailed(format!("program {}: malformed rules: {}", program.name, e))
        })?;
        outcome.chosen = select_best(&outcome.survivors).cloned();
        outcome.allow = true;

        match read_duration(&ttl) {
            Ok(d) => outcome.ttl = d,
            Err(e) => outcome.deny(format!("parsing ttl: {}", e)),
        }
        match read_duration(&max_ttl) {
            Ok(d) => outcome.max_ttl = d,
            Err(e) => outcome.deny(format!("parsing max_ttl: {}", e)),
        }
        if outcome.allow && outcome.chosen.is_none() {
            outcome.deny("no effective grant survived the policy".to_string());
        }

        Ok(outcome)
    }
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyOutcome {
    fn deny(&mut self, reason: String) {
        self.allow = false;
        self.chosen = None;
        self.errors.push(reason);
    }
}

fn build_input(mut payload: Map<String, Value>, claim: &RoleClaim) -> Map<String, Value> {
    payload.insert("role".into(), Value::String(claim.role.clone()));
    payload.insert(
        "tenant_uuid".into(),
        Value::String(claim.tenant_uuid.clone().unwrap_or_default()),
    );
    payload.insert(
        "project_uuid".into(),
        Value::String(claim.project_uuid.clone().unwrap_or_default()),
    );
    payload
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AuthzError::InvalidInput(e.to_string()))
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn read_duration(value: &Value) -> std::result::Result<Duration, String> {
    match value {
        Value::String(s) => parse_duration(s),
        other => Err(format!("expected a duration string, got {}", other)),
    }
}

/// Map program output back onto the candidates it was given
fn match_survivors(program: &str, filtered: &Value, candidates: &[EffectiveGrant]) -> Result<Vec<EffectiveGrant>> {
    let items = filtered.as_array().ok_or_else(|| {
        AuthzError::PolicyEvaluationFailed(format!("program {}: filtered_bindings must be a list", program))
    })?;

    let by_key: HashMap<_, &EffectiveGrant> = candidates.iter().map(|c| (c.match_key(), c)).collect();
    let mut survivors = Vec::with_capacity(items.len());
    for item in items {
        let field = |name: &str| item.get(name).and_then(Value::as_str).filter(|s| !s.is_empty());
        let key = (
            field("tenant_uuid").unwrap_or_default(),
            field("project_uuid"),
            field("grant_id").unwrap_or_default(),
        );
        match by_key.get(&key) {
            Some(candidate) => survivors.push((*candidate).clone()),
            None => warn!(program, survivor = %item, "program returned a grant that was not a candidate"),
        }
    }
    Ok(survivors)
}
