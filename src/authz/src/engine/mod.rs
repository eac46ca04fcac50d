//! Authorization engine
//!
//! Orchestrates scope checks, grant resolution, policy evaluation and
//! best-grant selection for a subject's role claims, and aggregates the
//! per-claim decisions into one time-boxed artifact.
//!
//! ```text
//! RoleClaim → ClaimScope → GrantResolver → PolicyEvaluator → select_best → Decision
//!                               ↑                 ↑
//!                        GrantStore snapshot   PolicyRegistry
//! ```

pub mod decision;
pub mod metrics;

pub use decision::{Authorization, Decision, RoleClaimResult};
pub use metrics::{DecisionOutcome, EngineMetrics, MetricsCollector};

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use warden_core::{GrantSource, ProjectUuid, RoleClaim, RoleName, Subject, TenantUuid};

use crate::artifact::{naming, ArtifactPolicy};
use crate::error::{AuthzError, Result};
use crate::policy::{ClaimValidator, PolicyEvaluator, PolicyOutcome, PolicyRegistry, UserDataProvider, EmptyUserData};
use crate::resolver::{EffectiveRoleReport, GrantResolver};
use crate::scope::ClaimScope;
use crate::types::{EffectiveGrant, GrantMap};
use decision::min_non_zero;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Leading part of artifact names
    pub artifact_prefix: String,

    /// Keep compiled CEL programs between requests
    pub enable_program_cache: bool,

    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact_prefix: "warden".to_string(),
            enable_program_cache: true,
            enable_metrics: true,
        }
    }
}

/// Work done for one claim
struct ClaimEvaluation {
    claim: RoleClaim,
    candidates: Vec<EffectiveGrant>,
    outcome: Result<PolicyOutcome>,
}

/// Authorization engine over a grant source and a policy registry
pub struct AuthzEngine {
    grants: Arc<dyn GrantSource>,
    registry: Arc<dyn PolicyRegistry>,
    user_data: Arc<dyn UserDataProvider>,
    evaluator: PolicyEvaluator,
    metrics: Option<Arc<MetricsCollector>>,
    config: EngineConfig,
}

impl AuthzEngine {
    /// Build an engine; fails when the artifact prefix could not be parsed back
    pub fn new(config: EngineConfig, grants: Arc<dyn GrantSource>, registry: Arc<dyn PolicyRegistry>) -> Result<Self> {
        if config.artifact_prefix.is_empty() || config.artifact_prefix.contains(naming::VALID_TILL_SEPARATOR) {
            return Err(AuthzError::InvalidInput(format!(
                "artifact prefix {:?} must be non-empty and must not contain {:?}",
                config.artifact_prefix,
                naming::VALID_TILL_SEPARATOR
            )));
        }

        let metrics = config.enable_metrics.then(|| Arc::new(MetricsCollector::new()));

        info!(
            "AuthzEngine initialized with program_cache={}, metrics={}",
            config.enable_program_cache, config.enable_metrics
        );

        Ok(Self {
            grants,
            registry,
            user_data: Arc::new(EmptyUserData),
            evaluator: PolicyEvaluator::new(),
            metrics,
            config,
        })
    }

    pub fn with_user_data(mut self, provider: Arc<dyn UserDataProvider>) -> Self {
        self.user_data = provider;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ClaimValidator>) -> Self {
        self.evaluator = self.evaluator.with_validator(validator);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolver bound to a fresh snapshot of the grant source
    pub fn resolver(&self) -> GrantResolver {
        GrantResolver::new(self.grants.snapshot())
    }

    /// Candidate grants per role, without policy evaluation
    pub async fn resolve(&self, subject: &Subject, roles: &[RoleName]) -> Result<GrantMap> {
        self.resolver().resolve(subject, roles).await
    }

    pub async fn check_effective_roles(
        &self,
        subject: &Subject,
        roles: &[RoleName],
    ) -> Result<Vec<EffectiveRoleReport>> {
        self.resolver().check_effective_roles(subject, roles).await
    }

    pub async fn list_available_tenants(&self, subject: &Subject) -> Result<BTreeSet<TenantUuid>> {
        self.resolver().list_available_tenants(subject).await
    }

    pub async fn list_available_projects(&self, subject: &Subject) -> Result<BTreeSet<ProjectUuid>> {
        self.resolver().list_available_projects(subject).await
    }

    /// Decide a single claim
    pub async fn evaluate_claim(&self, auth_method: &str, subject: &Subject, claim: &RoleClaim) -> Result<Decision> {
        let start = Instant::now();
        let resolver = self.resolver();
        let evaluation = self.evaluate_one(&resolver, auth_method, subject, claim).await;
        let result = evaluation.outcome.map(|outcome| decision_from(evaluation.claim, outcome));
        self.finish(start, result.as_ref().map(|d| d.allow));
        result
    }

    /// Per-claim report of what a login would get, without creating anything
    ///
    /// Failures are reported inside each result rather than returned.
    pub async fn check_permissions(
        &self,
        auth_method: &str,
        subject: &Subject,
        claims: &[RoleClaim],
    ) -> Vec<RoleClaimResult> {
        let resolver = self.resolver();
        let mut results = Vec::with_capacity(claims.len());

        for claim in claims {
            let evaluation = self.evaluate_one(&resolver, auth_method, subject, claim).await;
            let mut result = RoleClaimResult {
                claim: evaluation.claim,
                rolebinding_exists: !evaluation.candidates.is_empty(),
                allow_login: false,
                require_mfa: false,
                need_approvals: false,
                error: None,
            };
            match evaluation.outcome {
                Ok(outcome) => {
                    result.allow_login = outcome.allow;
                    if let Some(chosen) = &outcome.chosen {
                        result.require_mfa = chosen.require_mfa;
                        result.need_approvals = chosen.need_approvals > 0;
                    }
                    if !outcome.allow {
                        result.error = Some(denial_message(subject, &result.claim, &outcome.errors));
                    }
                }
                Err(e) => result.error = Some(e.to_string()),
            }
            results.push(result);
        }
        results
    }

    /// Authorize every claim and build one artifact for all of them
    ///
    /// Either every claim is allowed and a complete [`Authorization`] is
    /// returned, or the first failure is returned and nothing is built.
    pub async fn authorize(&self, auth_method: &str, subject: &Subject, claims: &[RoleClaim]) -> Result<Authorization> {
        let start = Instant::now();
        let result = self.authorize_inner(auth_method, subject, claims).await;
        self.finish(start, result.as_ref().map(|_| true));
        result
    }

    /// Forget compiled programs after policy configuration changed
    pub fn configuration_changed(&self) {
        self.evaluator.clear_cache();
        info!("policy configuration changed, program cache cleared");
    }

    pub fn metrics(&self) -> Option<EngineMetrics> {
        self.metrics.as_ref().map(|metrics| metrics.snapshot())
    }

    async fn authorize_inner(&self, auth_method: &str, subject: &Subject, claims: &[RoleClaim]) -> Result<Authorization> {
        if claims.is_empty() {
            return Err(AuthzError::InvalidInput("no role claims to authorize".into()));
        }

        debug!("Start authz for {}", subject);
        let resolver = self.resolver();
        let mut decisions = Vec::with_capacity(claims.len());
        let mut reasons = Vec::new();

        for claim in claims {
            let evaluation = self.evaluate_one(&resolver, auth_method, subject, claim).await;
            let decision = decision_from(evaluation.claim, evaluation.outcome?);
            if !decision.allow {
                reasons.push(denial_message(subject, &decision.claim, &decision.errors));
            }
            decisions.push(decision);
        }
        if !reasons.is_empty() {
            return Err(AuthzError::Denied { reasons });
        }

        let ttl = min_non_zero(decisions.iter().map(|d| d.ttl));
        let max_ttl = min_non_zero(decisions.iter().map(|d| d.max_ttl));
        let artifact = ArtifactPolicy {
            name: self.artifact_name(max_ttl)?,
            rules: decisions.iter().flat_map(|d| d.rules.iter().cloned()).collect(),
        };

        info!(subject = %subject, artifact = %artifact.name, claims = decisions.len(), "authorized");
        Ok(Authorization {
            decisions,
            artifact,
            ttl,
            max_ttl,
        })
    }

    async fn evaluate_one(
        &self,
        resolver: &GrantResolver,
        auth_method: &str,
        subject: &Subject,
        claim: &RoleClaim,
    ) -> ClaimEvaluation {
        let mut candidates = Vec::new();
        let outcome = self
            .try_evaluate(resolver, auth_method, subject, claim, &mut candidates)
            .await;
        if !self.config.enable_program_cache {
            self.evaluator.clear_cache();
        }
        if let Err(e) = &outcome {
            if matches!(e, AuthzError::PolicyEvaluationFailed(_)) {
                error!(role = %claim.role, "{}", e);
            } else {
                warn!(role = %claim.role, "{}", e);
            }
        }
        ClaimEvaluation {
            claim: claim.clone(),
            candidates,
            outcome,
        }
    }

    async fn try_evaluate(
        &self,
        resolver: &GrantResolver,
        auth_method: &str,
        subject: &Subject,
        claim: &RoleClaim,
        candidates: &mut Vec<EffectiveGrant>,
    ) -> Result<PolicyOutcome> {
        if let Some(tenant_uuid) = claim.tenant_uuid.as_deref().filter(|t| !t.is_empty()) {
            if !resolver.is_tenant_reachable(subject, tenant_uuid).await? {
                return Err(AuthzError::InvalidInput(format!(
                    "role claim for {} has invalid tenant_uuid {}",
                    claim.role, tenant_uuid
                )));
            }
        }

        let role = resolver.store().get_role(&claim.role).await?;
        let scope = ClaimScope::evaluate(&role, claim)?;

        let mut grants = resolver.resolve(subject, std::slice::from_ref(&claim.role)).await?;
        *candidates = grants
            .remove(&claim.role)
            .unwrap_or_default()
            .into_iter()
            .filter(|g| scope.covers(g))
            .collect();
        if candidates.is_empty() {
            warn!(
                subject = %subject,
                role = %claim.role,
                scope = %scope,
                "no role bindings found, login fails if the policy needs them"
            );
        }

        let program = self.registry.program_for_role(&claim.role).await?;
        if !program.accepts_auth_method(auth_method) {
            return Err(AuthzError::AuthMethodNotAllowed {
                role: claim.role.clone(),
                method: auth_method.to_string(),
            });
        }

        let user_data: Value = self.user_data.collect(subject, claim).await?;
        self.evaluator.evaluate(&program, subject, user_data, candidates, claim)
    }

    fn artifact_name(&self, max_ttl: Duration) -> Result<String> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(|c| char::from(c).to_ascii_lowercase())
            .collect();
        let max_ttl = chrono::Duration::from_std(max_ttl)
            .map_err(|e| AuthzError::InvalidInput(format!("max_ttl out of range: {}", e)))?;
        let valid_till = Utc::now()
            .checked_add_signed(max_ttl)
            .ok_or_else(|| AuthzError::InvalidInput("max_ttl out of range".into()))?;
        Ok(naming::with_valid_till(
            &format!("{}_{}", self.config.artifact_prefix, suffix),
            valid_till,
        ))
    }

    fn finish(&self, start: Instant, result: std::result::Result<bool, &AuthzError>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let outcome = match result {
            Ok(true) => DecisionOutcome::Allowed,
            Ok(false) => DecisionOutcome::Denied,
            Err(e) if e.is_denial() => DecisionOutcome::Denied,
            Err(_) => DecisionOutcome::Failed,
        };
        metrics.record(outcome, start.elapsed());
    }
}

fn decision_from(claim: RoleClaim, outcome: PolicyOutcome) -> Decision {
    Decision {
        claim,
        allow: outcome.allow,
        chosen_grant: outcome.chosen,
        rules: outcome.rules,
        ttl: outcome.ttl,
        max_ttl: outcome.max_ttl,
        errors: outcome.errors,
    }
}

fn denial_message(subject: &Subject, claim: &RoleClaim, errors: &[String]) -> String {
    let message = format!(
        "not allowed: subject={}, role={}, errors returned by policy: {:?}",
        subject, claim.role, errors
    );
    debug!("{}", message);
    message
}
