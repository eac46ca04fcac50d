//! In-memory downstream artifact registry

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::gc::ArtifactApi;
use super::rule::ArtifactPolicy;
use crate::error::{AuthzError, Result};

/// Artifact store kept in process memory
///
/// Names listed in `failing` refuse deletion, and an unreachable registry
/// refuses every call.
#[derive(Default)]
pub struct InMemoryArtifactRegistry {
    artifacts: Arc<RwLock<BTreeMap<String, ArtifactPolicy>>>,
    failing: Arc<RwLock<BTreeSet<String>>>,
    unreachable: Arc<RwLock<bool>>,
    deletions: Arc<RwLock<Vec<String>>>,
}

impl InMemoryArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bare name without rules
    pub async fn insert(&self, name: String) {
        let artifact = ArtifactPolicy {
            name: name.clone(),
            rules: Vec::new(),
        };
        self.artifacts.write().await.insert(name, artifact);
    }

    pub async fn names(&self) -> Vec<String> {
        self.artifacts.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Option<ArtifactPolicy> {
        self.artifacts.read().await.get(name).cloned()
    }

    /// Names deleted so far, in deletion order
    pub async fn deletions(&self) -> Vec<String> {
        self.deletions.read().await.clone()
    }

    pub async fn fail_deletion_of(&self, name: impl Into<String>) {
        self.failing.write().await.insert(name.into());
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write().await = unreachable;
    }

    async fn ensure_reachable(&self) -> Result<()> {
        if *self.unreachable.read().await {
            return Err(AuthzError::DownstreamUnavailable("artifact registry unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactApi for InMemoryArtifactRegistry {
    async fn list_artifact_names(&self) -> Result<Vec<String>> {
        self.ensure_reachable().await?;
        Ok(self.names().await)
    }

    async fn delete_artifact(&self, name: &str) -> Result<()> {
        self.ensure_reachable().await?;
        if self.failing.read().await.contains(name) {
            return Err(AuthzError::DownstreamUnavailable(format!("refused to delete {}", name)));
        }
        self.artifacts.write().await.remove(name);
        self.deletions.write().await.push(name.to_string());
        Ok(())
    }

    async fn create_artifact(&self, artifact: &ArtifactPolicy) -> Result<()> {
        self.ensure_reachable().await?;
        if artifact.name.is_empty() {
            return Err(AuthzError::InvalidInput("artifact without a name".into()));
        }
        self.artifacts
            .write()
            .await
            .insert(artifact.name.clone(), artifact.clone());
        Ok(())
    }
}
