//! Tenants and projects a subject can see

use std::collections::BTreeSet;
use warden_core::{ProjectUuid, Subject, TenantUuid};

use super::grants::GrantResolver;
use super::projects::ProjectLister;
use crate::error::Result;

impl GrantResolver {
    /// Own tenant, tenants shared to any enclosing group, and tenants of live bindings
    pub async fn list_available_tenants(&self, subject: &Subject) -> Result<BTreeSet<TenantUuid>> {
        let mut tenants = BTreeSet::new();
        tenants.insert(subject.tenant_uuid.clone());

        let groups = self.store().parent_groups(subject).await?;
        tenants.extend(self.store().shared_tenants(&groups).await?);

        for binding in self.collect_bindings(subject).await? {
            tenants.insert(binding.tenant_uuid);
        }
        Ok(tenants)
    }

    /// Projects of live bindings, any-project bindings expanded once per tenant
    pub async fn list_available_projects(&self, subject: &Subject) -> Result<BTreeSet<ProjectUuid>> {
        let mut lister = ProjectLister::new();
        let mut projects = BTreeSet::new();

        for binding in self.collect_bindings(subject).await? {
            if binding.any_project {
                projects.extend(lister.list(self.store(), &binding.tenant_uuid).await?.iter().cloned());
            } else {
                projects.extend(binding.projects);
            }
        }
        Ok(projects)
    }

    /// Whether a claim may target `tenant_uuid`: own tenant or shared to the subject
    pub async fn is_tenant_reachable(&self, subject: &Subject, tenant_uuid: &str) -> Result<bool> {
        if subject.tenant_uuid == tenant_uuid {
            return Ok(true);
        }
        let groups = self.store().parent_groups(subject).await?;
        let shared = self.store().shared_tenants(&groups).await?;
        Ok(shared.iter().any(|t| t == tenant_uuid))
    }
}
