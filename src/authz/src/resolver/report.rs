//! Effective-role report: per role, the tenants and projects a user can reach

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use serde_json::{Map, Value};
use warden_core::{ProjectUuid, RoleBinding, RoleName, RoleScope, Subject, SubjectType, TenantUuid};

use super::grants::GrantResolver;
use super::projects::ProjectLister;
use crate::error::{AuthzError, Result};
use crate::types::GrantOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRoleReport {
    pub role: RoleName,
    pub tenants: Vec<TenantReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantReport {
    pub uuid: TenantUuid,
    pub identifier: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tenant_options: GrantOptions,

    pub projects: Vec<ProjectReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub uuid: ProjectUuid,
    pub identifier: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project_options: GrantOptions,

    /// True only while every contributing binding requires MFA
    #[serde(default)]
    pub require_mfa: bool,

    /// True only while every contributing binding needs approvals
    #[serde(default)]
    pub need_approvals: bool,
}

#[derive(Default)]
struct TenantAcc {
    options: GrantOptions,
    projects: BTreeMap<ProjectUuid, ProjectAcc>,
}

struct ProjectAcc {
    options: GrantOptions,
    require_mfa: bool,
    need_approvals: bool,
}

fn concat_options(target: &mut GrantOptions, options: &Map<String, Value>) {
    for (key, value) in options {
        target.entry(key.clone()).or_default().push(value.clone());
    }
}

impl GrantResolver {
    /// Build the effective-role report for a user
    ///
    /// Options of tenant-scoped roles and any-project bindings accumulate at
    /// tenant level, the rest per project. Tenants and projects are ordered
    /// by identifier; roles keep the requested order.
    pub async fn check_effective_roles(
        &self,
        subject: &Subject,
        roles: &[RoleName],
    ) -> Result<Vec<EffectiveRoleReport>> {
        if subject.subject_type != SubjectType::User {
            return Err(AuthzError::InvalidInput(
                "effective role report is available only for users".into(),
            ));
        }

        let bindings = self.collect_bindings(subject).await?;
        let mut lister = ProjectLister::new();
        let mut role_defs = HashMap::new();
        let mut reports = Vec::with_capacity(roles.len());

        for role_name in roles {
            let mut tenants: BTreeMap<TenantUuid, TenantAcc> = BTreeMap::new();
            for binding in &bindings {
                let Some(bound) = binding.bound_role(role_name) else {
                    continue;
                };
                let role = self.role_definition(&mut role_defs, role_name).await?;
                let tenant_level = role.scope == RoleScope::Tenant || binding.any_project;

                let tenant = tenants.entry(binding.tenant_uuid.clone()).or_default();
                if tenant_level {
                    concat_options(&mut tenant.options, &bound.options);
                }

                for project_uuid in self.binding_projects(&mut lister, binding).await? {
                    let project = tenant.projects.entry(project_uuid).or_insert_with(|| ProjectAcc {
                        options: GrantOptions::new(),
                        require_mfa: binding.require_mfa,
                        need_approvals: binding.need_approvals > 0,
                    });
                    if !binding.require_mfa {
                        project.require_mfa = false;
                    }
                    if binding.need_approvals == 0 {
                        project.need_approvals = false;
                    }
                    if !tenant_level {
                        concat_options(&mut project.options, &bound.options);
                    }
                }
            }
            reports.push(EffectiveRoleReport {
                role: role_name.clone(),
                tenants: self.tenant_reports(tenants).await?,
            });
        }
        Ok(reports)
    }

    async fn binding_projects(&self, lister: &mut ProjectLister, binding: &RoleBinding) -> Result<Vec<ProjectUuid>> {
        if binding.any_project {
            Ok(lister.list(self.store(), &binding.tenant_uuid).await?.to_vec())
        } else {
            Ok(binding.projects.clone())
        }
    }

    async fn tenant_reports(&self, tenants: BTreeMap<TenantUuid, TenantAcc>) -> Result<Vec<TenantReport>> {
        let mut reports = Vec::with_capacity(tenants.len());
        for (tenant_uuid, acc) in tenants {
            let tenant = self.store().get_tenant(&tenant_uuid).await?;
            let mut projects = Vec::with_capacity(acc.projects.len());
            for (project_uuid, p) in acc.projects {
                let project = self.store().get_project(&project_uuid).await?;
                projects.push(ProjectReport {
                    uuid: project_uuid,
                    identifier: project.identifier,
                    project_options: p.options,
                    require_mfa: p.require_mfa,
                    need_approvals: p.need_approvals,
                });
            }
            projects.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            reports.push(TenantReport {
                uuid: tenant_uuid,
                identifier: tenant.identifier,
                tenant_options: acc.options,
                projects,
            });
        }
        reports.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(reports)
    }
}
