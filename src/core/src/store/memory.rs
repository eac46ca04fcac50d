//! In-memory grant store publishing immutable snapshots
//!
//! Writers replace the whole [`GrantData`] behind an `Arc`; readers take a
//! [`GrantSnapshot`] that keeps the version they started with alive for the
//! rest of their request.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{GrantSource, GrantStore};
use crate::types::{
    Group, GroupUuid, IdentitySharing, Project, ProjectUuid, Role, RoleBinding, Subject, Tenant, TenantUuid,
};

/// Full contents of a grant store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantData {
    #[serde(default)]
    pub tenants: Vec<Tenant>,

    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub role_bindings: Vec<RoleBinding>,

    #[serde(default)]
    pub identity_sharings: Vec<IdentitySharing>,
}

impl GrantData {
    /// Groups containing the subject, transitively through nested groups
    fn parent_groups_of(&self, subject: &Subject) -> Vec<GroupUuid> {
        let mut found: Vec<GroupUuid> = self
            .groups
            .iter()
            .filter(|g| g.has_direct_member(subject))
            .map(|g| g.uuid.clone())
            .collect();
        let mut seen: HashSet<GroupUuid> = found.iter().cloned().collect();

        let mut cursor = 0;
        while cursor < found.len() {
            let child = found[cursor].clone();
            cursor += 1;
            for group in &self.groups {
                if group.groups.contains(&child) && seen.insert(group.uuid.clone()) {
                    found.push(group.uuid.clone());
                }
            }
        }

        found
    }
}

/// Read-only view over one version of [`GrantData`]
#[derive(Debug, Clone)]
pub struct GrantSnapshot {
    data: Arc<GrantData>,
}

impl GrantSnapshot {
    pub fn new(data: Arc<GrantData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &GrantData {
        &self.data
    }
}

#[async_trait]
impl GrantStore for GrantSnapshot {
    async fn role_bindings_for_subject(&self, subject: &Subject) -> StoreResult<Vec<RoleBinding>> {
        Ok(self
            .data
            .role_bindings
            .iter()
            .filter(|rb| rb.has_direct_member(subject))
            .cloned()
            .collect())
    }

    async fn parent_groups(&self, subject: &Subject) -> StoreResult<Vec<GroupUuid>> {
        Ok(self.data.parent_groups_of(subject))
    }

    async fn role_bindings_for_groups(&self, groups: &[GroupUuid]) -> StoreResult<Vec<RoleBinding>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .data
            .role_bindings
            .iter()
            .filter(|rb| rb.groups.iter().any(|g| groups.contains(g)))
            .cloned()
            .collect())
    }

    async fn list_project_ids(&self, tenant_uuid: &str) -> StoreResult<Vec<ProjectUuid>> {
        if !self.data.tenants.iter().any(|t| t.uuid == tenant_uuid) {
            return Err(StoreError::not_found("tenant", tenant_uuid));
        }
        Ok(self
            .data
            .projects
            .iter()
            .filter(|p| p.tenant_uuid == tenant_uuid)
            .map(|p| p.uuid.clone())
            .collect())
    }

    async fn get_tenant(&self, uuid: &str) -> StoreResult<Tenant> {
        self.data
            .tenants
            .iter()
            .find(|t| t.uuid == uuid)
            .cloned()
            .ok_or_else(|| StoreError::not_found("tenant", uuid))
    }

    async fn get_project(&self, uuid: &str) -> StoreResult<Project> {
        self.data
            .projects
            .iter()
            .find(|p| p.uuid == uuid)
            .cloned()
            .ok_or_else(|| StoreError::not_found("project", uuid))
    }

    async fn get_role(&self, name: &str) -> StoreResult<Role> {
        self.data
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("role", name))
    }

    async fn shared_tenants(&self, groups: &[GroupUuid]) -> StoreResult<Vec<TenantUuid>> {
        let mut tenants = Vec::new();
        for sharing in &self.data.identity_sharings {
            if sharing.groups.iter().any(|g| groups.contains(g))
                && !tenants.contains(&sharing.destination_tenant_uuid)
            {
                tenants.push(sharing.destination_tenant_uuid.clone());
            }
        }
        Ok(tenants)
    }
}

/// Grant store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    current: RwLock<Arc<GrantData>>,
}

impl InMemoryGrantStore {
    pub fn new(data: GrantData) -> Self {
        Self {
            current: RwLock::new(Arc::new(data)),
        }
    }

    /// Current version as a concrete snapshot
    pub fn current(&self) -> GrantSnapshot {
        GrantSnapshot::new(self.current.read().clone())
    }

    /// Apply a change and publish it as a new version
    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut GrantData),
    {
        let mut guard = self.current.write();
        let mut next = GrantData::clone(&guard);
        change(&mut next);
        *guard = Arc::new(next);
        debug!("published new grant store version");
    }
}

impl GrantSource for InMemoryGrantStore {
    fn snapshot(&self) -> Arc<dyn GrantStore> {
        Arc::new(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundRole;

    fn sample() -> GrantData {
        GrantData {
            tenants: vec![Tenant { uuid: "t1".into(), identifier: "acme".into() }],
            projects: vec![
                Project { uuid: "p1".into(), tenant_uuid: "t1".into(), identifier: "web".into() },
                Project { uuid: "p2".into(), tenant_uuid: "t1".into(), identifier: "db".into() },
            ],
            groups: vec![
                Group {
                    uuid: "g-inner".into(),
                    tenant_uuid: "t1".into(),
                    users: vec!["u1".into()],
                    service_accounts: vec![],
                    groups: vec![],
                },
                Group {
                    uuid: "g-outer".into(),
                    tenant_uuid: "t1".into(),
                    users: vec![],
                    service_accounts: vec![],
                    groups: vec!["g-inner".into()],
                },
            ],
            role_bindings: vec![
                RoleBinding::new("rb1", "t1").with_user("u1").with_role(BoundRole::new("ssh.open")),
                RoleBinding::new("rb2", "t1").with_group("g-outer").with_role(BoundRole::new("ssh.open")),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_parent_groups_are_transitive() {
        let snapshot = InMemoryGrantStore::new(sample()).current();
        let groups = snapshot.parent_groups(&Subject::user("u1", "t1")).await.unwrap();
        assert_eq!(groups, vec!["g-inner".to_string(), "g-outer".to_string()]);
    }

    #[tokio::test]
    async fn test_bindings_for_groups() {
        let snapshot = InMemoryGrantStore::new(sample()).current();
        let rbs = snapshot.role_bindings_for_groups(&["g-outer".to_string()]).await.unwrap();
        assert_eq!(rbs.len(), 1);
        assert_eq!(rbs[0].uuid, "rb2");
        assert!(snapshot.role_bindings_for_groups(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_list_project_ids_unknown_tenant() {
        let snapshot = InMemoryGrantStore::new(sample()).current();
        tokio_test::block_on(async {
            let err = snapshot.list_project_ids("nope").await.unwrap_err();
            assert_eq!(err, StoreError::not_found("tenant", "nope"));
            assert_eq!(snapshot.list_project_ids("t1").await.unwrap().len(), 2);
        });
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_updates() {
        let store = InMemoryGrantStore::new(sample());
        let before = store.snapshot();

        store.update(|data| data.role_bindings.clear());

        let subject = Subject::user("u1", "t1");
        assert_eq!(before.role_bindings_for_subject(&subject).await.unwrap().len(), 1);
        assert!(store.snapshot().role_bindings_for_subject(&subject).await.unwrap().is_empty());
    }
}
