//! sled-backed downstream artifact registry
//!
//! Stands in for the system that enforces artifacts. Each artifact is one
//! JSON record keyed by its name, so listing yields names in byte order.

use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use tracing::{debug, warn};
use warden_authz::{ArtifactApi, ArtifactPolicy, AuthzError, Result};

pub struct SledArtifactRegistry {
    db: Db,
}

fn unavailable(e: sled::Error) -> AuthzError {
    AuthzError::DownstreamUnavailable(format!("artifact registry: {}", e))
}

impl SledArtifactRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).map_err(unavailable)?;
        Ok(Self { db })
    }

    pub fn get(&self, name: &str) -> Result<Option<ArtifactPolicy>> {
        match self.db.get(name.as_bytes()).map_err(unavailable)? {
            Some(record) => serde_json::from_slice(&record)
                .map(Some)
                .map_err(|e| AuthzError::InvalidInput(format!("artifact {}: {}", name, e))),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

#[async_trait]
impl ArtifactApi for SledArtifactRegistry {
    async fn list_artifact_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.db.len());
        for key in self.db.iter().keys() {
            let key = key.map_err(unavailable)?;
            match String::from_utf8(key.to_vec()) {
                Ok(name) => names.push(name),
                Err(_) => warn!(key = %hex::encode(&key), "skipping artifact key that is not UTF-8"),
            }
        }
        Ok(names)
    }

    async fn delete_artifact(&self, name: &str) -> Result<()> {
        self.db.remove(name.as_bytes()).map_err(unavailable)?;
        self.db.flush_async().await.map_err(unavailable)?;
        debug!(artifact = name, "artifact removed");
        Ok(())
    }

    async fn create_artifact(&self, artifact: &ArtifactPolicy) -> Result<()> {
        if artifact.name.is_empty() {
            return Err(AuthzError::InvalidInput("artifact without a name".into()));
        }
        let record = serde_json::to_vec(artifact)
            .map_err(|e| AuthzError::InvalidInput(format!("artifact {}: {}", artifact.name, e)))?;
        self.db
            .insert(artifact.name.as_bytes(), record)
            .map_err(unavailable)?;
        self.db.flush_async().await.map_err(unavailable)?;
        debug!(artifact = %artifact.name, rules = artifact.rules.len(), "artifact stored");
        Ok(())
    }
}
