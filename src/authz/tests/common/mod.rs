//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_core::{
    BoundRole, Group, GrantData, GrantStore, GroupUuid, IdentitySharing, InMemoryGrantStore, Project, ProjectUuid,
    Role, RoleBinding, RoleScope, StoreResult, Subject, Tenant, TenantUuid,
};

/// Two tenants, three projects, a nested group and the `ssh` and `iam.read` roles
///
/// u1 lives in t1 and belongs to `admins` through `ops`. t2 shares itself
/// with `ops`.
pub fn base_data() -> GrantData {
    GrantData {
        tenants: vec![
            Tenant { uuid: "t1".into(), identifier: "acme".into() },
            Tenant { uuid: "t2".into(), identifier: "globex".into() },
        ],
        projects: vec![
            Project { uuid: "p1".into(), tenant_uuid: "t1".into(), identifier: "web".into() },
            Project { uuid: "p2".into(), tenant_uuid: "t1".into(), identifier: "db".into() },
            Project { uuid: "p3".into(), tenant_uuid: "t2".into(), identifier: "billing".into() },
        ],
        roles: vec![
            Role::new("ssh", RoleScope::Project),
            Role::new("iam.read", RoleScope::Tenant),
        ],
        groups: vec![
            Group {
                uuid: "ops".into(),
                tenant_uuid: "t1".into(),
                users: vec!["u1".into()],
                service_accounts: vec![],
                groups: vec![],
            },
            Group {
                uuid: "admins".into(),
                tenant_uuid: "t1".into(),
                users: vec![],
                service_accounts: vec![],
                groups: vec!["ops".into()],
            },
        ],
        role_bindings: vec![],
        identity_sharings: vec![IdentitySharing {
            uuid: "share1".into(),
            source_tenant_uuid: "t1".into(),
            destination_tenant_uuid: "t2".into(),
            groups: vec!["ops".into()],
        }],
    }
}

/// Direct ssh binding on t1/p1 with ttl options, plus an `admins` binding on
/// the same target that needs MFA and one approval
pub fn ssh_scenario() -> GrantData {
    let mut data = base_data();
    data.role_bindings = vec![
        RoleBinding::new("rb-direct", "t1")
            .with_user("u1")
            .with_project("p1")
            .with_role(BoundRole::new("ssh").with_option("ttl", "100s").with_option("max_ttl", "200s")),
        RoleBinding::new("rb-group", "t1")
            .with_group("admins")
            .with_project("p1")
            .with_mfa()
            .with_approvals(1)
            .with_role(BoundRole::new("ssh")),
    ];
    data
}

pub fn store(data: GrantData) -> Arc<InMemoryGrantStore> {
    Arc::new(InMemoryGrantStore::new(data))
}

pub fn alice() -> Subject {
    Subject::user("u1", "t1")
}

/// Grant store counting the project listings it serves
pub struct CountingStore {
    inner: Arc<dyn GrantStore>,
    pub project_listings: AtomicUsize,
}

impl CountingStore {
    pub fn new(data: GrantData) -> Self {
        Self {
            inner: Arc::new(InMemoryGrantStore::new(data).current()),
            project_listings: AtomicUsize::new(0),
        }
    }

    pub fn listings(&self) -> usize {
        self.project_listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GrantStore for CountingStore {
    async fn role_bindings_for_subject(&self, subject: &Subject) -> StoreResult<Vec<RoleBinding>> {
        self.inner.role_bindings_for_subject(subject).await
    }

    async fn parent_groups(&self, subject: &Subject) -> StoreResult<Vec<GroupUuid>> {
        self.inner.parent_groups(subject).await
    }

    async fn role_bindings_for_groups(&self, groups: &[GroupUuid]) -> StoreResult<Vec<RoleBinding>> {
        self.inner.role_bindings_for_groups(groups).await
    }

    async fn list_project_ids(&self, tenant_uuid: &str) -> StoreResult<Vec<ProjectUuid>> {
        self.project_listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_project_ids(tenant_uuid).await
    }

    async fn get_tenant(&self, uuid: &str) -> StoreResult<Tenant> {
        self.inner.get_tenant(uuid).await
    }

    async fn get_project(&self, uuid: &str) -> StoreResult<Project> {
        self.inner.get_project(uuid).await
    }

    async fn get_role(&self, name: &str) -> StoreResult<Role> {
        self.inner.get_role(name).await
    }

    async fn shared_tenants(&self, groups: &[GroupUuid]) -> StoreResult<Vec<TenantUuid>> {
        self.inner.shared_tenants(groups).await
    }
}
