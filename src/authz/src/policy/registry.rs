//! Policy program registry

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::program::PolicyProgram;
use crate::error::{AuthzError, Result};

/// Read access to configured policy programs
#[async_trait]
pub trait PolicyRegistry: Send + Sync {
    /// All programs, ordered by name
    async fn list_programs(&self) -> Result<Vec<PolicyProgram>>;

    /// The single program bound to `role`
    ///
    /// Zero matches is `PolicyNotFound`; more than one is a configuration
    /// error reported as `PolicyEvaluationFailed`.
    async fn program_for_role(&self, role: &str) -> Result<PolicyProgram> {
        let mut bound: Vec<PolicyProgram> = self
            .list_programs()
            .await?
            .into_iter()
            .filter(|p| p.is_bound_to(role))
            .collect();
        match bound.len() {
            0 => Err(AuthzError::PolicyNotFound(format!("no policy program for role {}", role))),
            1 => Ok(bound.remove(0)),
            n => Err(AuthzError::PolicyEvaluationFailed(format!(
                "{} policy programs are bound to role {}",
                n, role
            ))),
        }
    }
}

/// In-memory policy registry
#[derive(Default)]
pub struct InMemoryPolicyRegistry {
    programs: Arc<RwLock<BTreeMap<String, PolicyProgram>>>,
}

impl InMemoryPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, program: PolicyProgram) {
        let mut programs = self.programs.write().await;
        programs.insert(program.name.clone(), program);
    }

    pub async fn delete(&self, name: &str) -> Option<PolicyProgram> {
        self.programs.write().await.remove(name)
    }

    /// Swap the whole program set in one step
    pub async fn replace_all(&self, programs: impl IntoIterator<Item = PolicyProgram>) {
        let next: BTreeMap<String, PolicyProgram> = programs.into_iter().map(|p| (p.name.clone(), p)).collect();
        *self.programs.write().await = next;
    }
}

#[async_trait]
impl PolicyRegistry for InMemoryPolicyRegistry {
    async fn list_programs(&self) -> Result<Vec<PolicyProgram>> {
        Ok(self.programs.read().await.values().cloned().collect())
    }
}
