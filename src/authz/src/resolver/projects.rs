use std::collections::HashMap;
use warden_core::{GrantStore, ProjectUuid, TenantUuid};

use crate::error::Result;

/// Per-call memo of tenant project lists
///
/// Each tenant's list is fetched from the store at most once for the
/// lifetime of the lister, however many any-project bindings point at it.
#[derive(Debug, Default)]
pub struct ProjectLister {
    cache: HashMap<TenantUuid, Vec<ProjectUuid>>,
}

impl ProjectLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&mut self, store: &dyn GrantStore, tenant_uuid: &str) -> Result<&[ProjectUuid]> {
        if !self.cache.contains_key(tenant_uuid) {
            let projects = store.list_project_ids(tenant_uuid).await?;
            self.cache.insert(tenant_uuid.to_string(), projects);
        }
        Ok(self.cache.get(tenant_uuid).map(Vec::as_slice).unwrap_or_default())
    }
}
