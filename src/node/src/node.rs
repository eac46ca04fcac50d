//! Node wiring the engine, the artifact registry and the credential vault

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use warden_authz::{
    ArtifactApi, ArtifactCollector, Authorization, AuthzEngine, EffectiveRoleReport, InMemoryPolicyRegistry,
    RoleClaimResult, SweepReport,
};
use warden_core::{InMemoryGrantStore, ProjectUuid, RoleName, Subject, TenantUuid};
use warden_vault::{JwtIssuer, MultipassService, SledCredentialStore};

use crate::config::NodeConfig;
use crate::fixtures::{self, CheckRequest};
use crate::registry::SledArtifactRegistry;

/// What `report` prints for one subject
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    pub subject: Subject,
    pub roles: Vec<EffectiveRoleReport>,
    pub tenants: BTreeSet<TenantUuid>,
    pub projects: BTreeSet<ProjectUuid>,
}

pub struct WardenNode {
    config: NodeConfig,
    engine: AuthzEngine,
    registry: Arc<SledArtifactRegistry>,
}

impl WardenNode {
    /// Load fixtures and open the artifact registry
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let storage_path = config.storage_path();
        std::fs::create_dir_all(&storage_path).context("Failed to create storage directory")?;

        let grants = Arc::new(InMemoryGrantStore::new(fixtures::load_grants(&config.grants_path())?));
        let policies = Arc::new(InMemoryPolicyRegistry::new());
        let programs = fixtures::load_policies(&config.policies_path())?;
        let program_count = programs.len();
        policies.replace_all(programs).await;
        info!("Loaded {} policy programs from {:?}", program_count, config.policies_path());

        let engine = AuthzEngine::new((&config.engine).into(), grants, policies)
            .context("Invalid engine configuration")?;

        let registry = SledArtifactRegistry::open(config.artifacts_path())
            .context("Failed to open artifact registry")?;
        info!("Artifact registry opened at {:?}", config.artifacts_path());

        Ok(Self {
            config,
            engine,
            registry: Arc::new(registry),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn engine(&self) -> &AuthzEngine {
        &self.engine
    }

    pub fn registry(&self) -> &SledArtifactRegistry {
        &self.registry
    }

    fn auth_method<'a>(&'a self, request: &'a CheckRequest) -> &'a str {
        request.auth_method.as_deref().unwrap_or(&self.config.node.auth_method)
    }

    /// Authorize every claim and record the resulting artifact downstream
    pub async fn check(&self, request: &CheckRequest) -> Result<Authorization> {
        let authorization = self
            .engine
            .authorize(self.auth_method(request), &request.subject, &request.claims)
            .await?;

        self.registry
            .create_artifact(&authorization.artifact)
            .await
            .context("Failed to record artifact")?;

        info!(
            subject = %request.subject,
            artifact = %authorization.artifact.name,
            "authorized {} claims",
            authorization.decisions.len()
        );
        Ok(authorization)
    }

    /// Per-claim report without creating an artifact
    pub async fn check_permissions(&self, request: &CheckRequest) -> Vec<RoleClaimResult> {
        self.engine
            .check_permissions(self.auth_method(request), &request.subject, &request.claims)
            .await
    }

    pub async fn report(&self, subject: &Subject, roles: &[RoleName]) -> Result<SubjectReport> {
        Ok(SubjectReport {
            subject: subject.clone(),
            roles: self.engine.check_effective_roles(subject, roles).await?,
            tenants: self.engine.list_available_tenants(subject).await?,
            projects: self.engine.list_available_projects(subject).await?,
        })
    }

    pub fn collector(&self) -> ArtifactCollector {
        ArtifactCollector::new(self.registry.clone(), self.config.gc.clone())
    }

    /// One GC cycle against the registry
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        Ok(self.collector().sweep_once(chrono::Utc::now()).await?)
    }

    /// Collect overdue artifacts until the future is dropped
    pub async fn run_gc(&self) {
        self.collector().run().await
    }

    /// Revocation service over the on-disk credential store
    pub fn multipass(&self) -> Result<MultipassService> {
        let store = SledCredentialStore::open(self.config.credentials_path())
            .context("Failed to open credential store")?;
        let issuer = JwtIssuer::new(self.config.jwt_config()?).context("Invalid multipass signing key")?;
        Ok(MultipassService::new(Arc::new(store), issuer))
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down node");
        if let Some(metrics) = self.engine.metrics() {
            info!(
                "Engine served {} requests ({} allowed, {} denied, {} errors), avg {:.2} ms, max {:.2} ms",
                metrics.total_requests,
                metrics.allowed_decisions,
                metrics.denied_decisions,
                metrics.error_count,
                metrics.avg_latency_ms,
                metrics.max_latency_ms
            );
        }
        Ok(())
    }
}
