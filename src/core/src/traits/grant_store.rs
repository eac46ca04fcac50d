//! Read-only grant store contract
//!
//! The authorization path never writes. One request reads one snapshot,
//! obtained from a [`GrantSource`], so no partial update is ever visible
//! mid-resolution.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::types::{GroupUuid, Project, ProjectUuid, Role, RoleBinding, Subject, Tenant, TenantUuid};

/// Queries over tenants, projects, roles, role bindings and group memberships
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Bindings that list the subject directly
    async fn role_bindings_for_subject(&self, subject: &Subject) -> StoreResult<Vec<RoleBinding>>;

    /// Every group that contains the subject, directly or through nested groups
    async fn parent_groups(&self, subject: &Subject) -> StoreResult<Vec<GroupUuid>>;

    /// Bindings that list any of the given groups
    async fn role_bindings_for_groups(&self, groups: &[GroupUuid]) -> StoreResult<Vec<RoleBinding>>;

    /// Current project ids of a tenant
    async fn list_project_ids(&self, tenant_uuid: &str) -> StoreResult<Vec<ProjectUuid>>;

    async fn get_tenant(&self, uuid: &str) -> StoreResult<Tenant>;

    async fn get_project(&self, uuid: &str) -> StoreResult<Project>;

    async fn get_role(&self, name: &str) -> StoreResult<Role>;

    /// Destination tenants shared with any of the given groups
    async fn shared_tenants(&self, groups: &[GroupUuid]) -> StoreResult<Vec<TenantUuid>>;
}

/// Hands out consistent read-only views of a grant store
pub trait GrantSource: Send + Sync {
    fn snapshot(&self) -> Arc<dyn GrantStore>;
}
