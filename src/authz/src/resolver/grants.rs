//! Binding collection and per-target grant merging

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use warden_core::{unix_now, BoundRole, GrantStore, Role, RoleBinding, RoleName, RoleScope, Subject};

use super::projects::ProjectLister;
use crate::error::Result;
use crate::types::{EffectiveGrant, GrantMap, GrantTarget};

/// Resolves a subject's candidate grants against one grant store snapshot
///
/// The resolver only reads; every call works on the snapshot it was built
/// with, so concurrent store updates never show up mid-resolution.
pub struct GrantResolver {
    store: Arc<dyn GrantStore>,
    now: i64,
}

impl GrantResolver {
    pub fn new(store: Arc<dyn GrantStore>) -> Self {
        Self { store, now: unix_now() }
    }

    /// Evaluate binding validity against a fixed clock
    pub fn at(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    pub fn store(&self) -> &dyn GrantStore {
        self.store.as_ref()
    }

    /// Candidate grants per requested role
    ///
    /// Bindings reaching the same `(role, tenant, project)` target merge into
    /// one grant. Roles without any grant are left out of the map, so a
    /// subject with no matching bindings gets an empty map.
    pub async fn resolve(&self, subject: &Subject, roles: &[RoleName]) -> Result<GrantMap> {
        let requested: BTreeSet<&str> = roles.iter().map(String::as_str).collect();
        let bindings = self.collect_bindings(subject).await?;

        let mut lister = ProjectLister::new();
        let mut role_defs: HashMap<RoleName, Role> = HashMap::new();
        let mut merged = GrantMerger::default();

        for binding in &bindings {
            for bound in binding.roles.iter().filter(|r| requested.contains(r.name.as_str())) {
                let role = self.role_definition(&mut role_defs, &bound.name).await?;
                let targets = self.targets(&mut lister, &role, binding).await?;
                if targets.is_empty() {
                    debug!(binding = %binding.uuid, role = %bound.name, "binding reaches no project");
                }
                for target in targets {
                    merged.add(&bound.name, target, binding, bound);
                }
            }
        }

        let grants = merged.finish();
        debug!(
            subject = %subject,
            bindings = bindings.len(),
            roles = grants.len(),
            "resolved effective grants"
        );
        Ok(grants)
    }

    /// Direct bindings first, then bindings of every enclosing group
    ///
    /// Duplicates are dropped by uuid and expired bindings are skipped.
    pub async fn collect_bindings(&self, subject: &Subject) -> Result<Vec<RoleBinding>> {
        let (direct, groups) = futures::try_join!(
            self.store.role_bindings_for_subject(subject),
            self.store.parent_groups(subject)
        )?;
        let inherited = self.store.role_bindings_for_groups(&groups).await?;

        let mut seen = HashSet::new();
        let bindings = direct
            .into_iter()
            .chain(inherited)
            .filter(|rb| rb.is_alive(self.now))
            .filter(|rb| seen.insert(rb.uuid.clone()))
            .collect();
        Ok(bindings)
    }

    pub(crate) async fn role_definition(
        &self,
        cache: &mut HashMap<RoleName, Role>,
        name: &str,
    ) -> Result<Role> {
        if let Some(role) = cache.get(name) {
            return Ok(role.clone());
        }
        let role = self.store.get_role(name).await?;
        cache.insert(name.to_string(), role.clone());
        Ok(role)
    }

    async fn targets(
        &self,
        lister: &mut ProjectLister,
        role: &Role,
        binding: &RoleBinding,
    ) -> Result<Vec<GrantTarget>> {
        let tenant_uuid = binding.tenant_uuid.clone();
        if role.scope == RoleScope::Tenant {
            return Ok(vec![GrantTarget { tenant_uuid, project_uuid: None }]);
        }

        let projects: Vec<String> = if binding.any_project {
            lister.list(self.store.as_ref(), &binding.tenant_uuid).await?.to_vec()
        } else {
            binding.projects.clone()
        };
        Ok(projects
            .into_iter()
            .map(|p| GrantTarget {
                tenant_uuid: tenant_uuid.clone(),
                project_uuid: Some(p),
            })
            .collect())
    }
}

/// Accumulates contributions while preserving first-contribution order
#[derive(Default)]
struct GrantMerger {
    grants: Vec<EffectiveGrant>,
    index: HashMap<(RoleName, GrantTarget), usize>,
}

impl GrantMerger {
    fn add(&mut self, role: &str, target: GrantTarget, binding: &RoleBinding, bound: &BoundRole) {
        let key = (role.to_string(), target);
        match self.index.get(&key) {
            Some(&i) => merge_into(&mut self.grants[i], binding, bound),
            None => {
                let grant = new_grant(role, &key.1, binding, bound);
                self.index.insert(key, self.grants.len());
                self.grants.push(grant);
            }
        }
    }

    fn finish(self) -> GrantMap {
        let mut map = GrantMap::new();
        for grant in self.grants {
            map.entry(grant.role.clone()).or_default().push(grant);
        }
        map
    }
}

fn new_grant(role: &str, target: &GrantTarget, binding: &RoleBinding, bound: &BoundRole) -> EffectiveGrant {
    let mut grant = EffectiveGrant {
        role: role.to_string(),
        grant_id: binding.uuid.clone(),
        binding_ids: vec![binding.uuid.clone()],
        tenant_uuid: target.tenant_uuid.clone(),
        project_uuid: target.project_uuid.clone(),
        valid_till: binding.valid_till,
        require_mfa: binding.require_mfa,
        any_project: binding.any_project,
        projects: BTreeSet::new(),
        need_approvals: binding.need_approvals,
        options: Default::default(),
    };
    add_projects(&mut grant, binding);
    add_options(&mut grant, bound);
    grant
}

fn merge_into(grant: &mut EffectiveGrant, binding: &RoleBinding, bound: &BoundRole) {
    grant.binding_ids.push(binding.uuid.clone());
    grant.valid_till = if grant.valid_till == 0 || binding.valid_till == 0 {
        0
    } else {
        grant.valid_till.max(binding.valid_till)
    };
    grant.require_mfa = grant.require_mfa && binding.require_mfa;
    grant.any_project = grant.any_project || binding.any_project;
    grant.need_approvals = grant.need_approvals.min(binding.need_approvals);
    add_projects(grant, binding);
    add_options(grant, bound);
}

fn add_projects(grant: &mut EffectiveGrant, binding: &RoleBinding) {
    match &grant.project_uuid {
        Some(project) => {
            grant.projects.insert(project.clone());
        }
        None => grant.projects.extend(binding.projects.iter().cloned()),
    }
}

fn add_options(grant: &mut EffectiveGrant, bound: &BoundRole) {
    for (key, value) in &bound.options {
        grant.options.entry(key.clone()).or_default().push(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::{GrantData, InMemoryGrantStore, Project, Tenant};

    fn store_with(bindings: Vec<RoleBinding>) -> Arc<dyn GrantStore> {
        let data = GrantData {
            tenants: vec![Tenant { uuid: "t1".into(), identifier: "acme".into() }],
            projects: vec![
                Project { uuid: "p1".into(), tenant_uuid: "t1".into(), identifier: "web".into() },
                Project { uuid: "p2".into(), tenant_uuid: "t1".into(), identifier: "db".into() },
            ],
            roles: vec![
                Role::new("ssh", RoleScope::Project),
                Role::new("iam.read", RoleScope::Tenant),
            ],
            role_bindings: bindings,
            ..Default::default()
        };
        Arc::new(InMemoryGrantStore::new(data).current())
    }

    fn user() -> Subject {
        Subject::user("u1", "t1")
    }

    #[tokio::test]
    async fn test_merge_takes_best_achievable() {
        let store = store_with(vec![
            RoleBinding::new("rb1", "t1")
                .with_user("u1")
                .with_project("p1")
                .with_valid_till(500)
                .with_approvals(2)
                .with_role(BoundRole::new("ssh").with_option("ttl", "100s")),
            RoleBinding::new("rb2", "t1")
                .with_user("u1")
                .with_project("p1")
                .with_valid_till(900)
                .with_mfa()
                .with_approvals(1)
                .with_role(BoundRole::new("ssh").with_option("ttl", "50s")),
        ]);

        let grants = GrantResolver::new(store).at(100).resolve(&user(), &["ssh".into()]).await.unwrap();
        let ssh = &grants["ssh"];
        assert_eq!(ssh.len(), 1);

        let grant = &ssh[0];
        assert_eq!(grant.grant_id, "rb1");
        assert_eq!(grant.binding_ids, vec!["rb1".to_string(), "rb2".to_string()]);
        assert!(!grant.require_mfa);
        assert_eq!(grant.need_approvals, 1);
        assert_eq!(grant.valid_till, 900);
        assert_eq!(grant.options["ttl"], vec![json!("100s"), json!("50s")]);
    }

    #[tokio::test]
    async fn test_unbounded_contributor_wins_validity() {
        let store = store_with(vec![
            RoleBinding::new("rb1", "t1").with_user("u1").with_project("p1").with_valid_till(500)
                .with_role(BoundRole::new("ssh")),
            RoleBinding::new("rb2", "t1").with_user("u1").with_project("p1")
                .with_role(BoundRole::new("ssh")),
        ]);

        let grants = GrantResolver::new(store).at(100).resolve(&user(), &["ssh".into()]).await.unwrap();
        assert_eq!(grants["ssh"][0].valid_till, 0);
    }

    #[tokio::test]
    async fn test_expired_bindings_are_skipped() {
        let store = store_with(vec![RoleBinding::new("rb1", "t1")
            .with_user("u1")
            .with_project("p1")
            .with_valid_till(50)
            .with_role(BoundRole::new("ssh"))]);

        let grants = GrantResolver::new(store).at(100).resolve(&user(), &["ssh".into()]).await.unwrap();
        assert!(grants.is_empty());
    }

    #[tokio::test]
    async fn test_tenant_scoped_role_has_no_project() {
        let store = store_with(vec![RoleBinding::new("rb1", "t1")
            .with_user("u1")
            .with_role(BoundRole::new("iam.read"))
            .with_role(BoundRole::new("ssh"))]);

        let grants = GrantResolver::new(store).resolve(&user(), &["iam.read".into()]).await.unwrap();
        assert_eq!(grants.len(), 1);
        let grant = &grants["iam.read"][0];
        assert_eq!(grant.tenant_uuid, "t1");
        assert!(grant.project_uuid.is_none());
    }

    #[tokio::test]
    async fn test_any_project_expands_to_tenant_projects() {
        let store = store_with(vec![RoleBinding::new("rb1", "t1")
            .with_user("u1")
            .with_any_project()
            .with_role(BoundRole::new("ssh"))]);

        let grants = GrantResolver::new(store).resolve(&user(), &["ssh".into()]).await.unwrap();
        let projects: Vec<_> = grants["ssh"].iter().filter_map(|g| g.project_uuid.clone()).collect();
        assert_eq!(projects, vec!["p1".to_string(), "p2".to_string()]);
        assert!(grants["ssh"].iter().all(|g| g.any_project));
    }
}
