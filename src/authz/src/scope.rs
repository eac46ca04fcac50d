//! Claim scope classification
//!
//! A role claim addresses a role globally, inside one tenant, or inside one
//! project. Which of these is legal depends on the role's scope and its
//! optional-tenant/optional-project flags.

use std::fmt;
use warden_core::{Role, RoleClaim, RoleScope};

use crate::error::{AuthzError, Result};
use crate::types::EffectiveGrant;

/// Level a claim addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimScope {
    Global,
    Tenant(String),
    Project { tenant_uuid: String, project_uuid: String },
}

impl ClaimScope {
    /// Classify a claim against its role definition
    pub fn evaluate(role: &Role, claim: &RoleClaim) -> Result<Self> {
        let tenant = claim.tenant_uuid.as_deref().filter(|t| !t.is_empty());
        let project = claim.project_uuid.as_deref().filter(|p| !p.is_empty());
        let project_role = role.scope == RoleScope::Project;

        let global_allowed = (project_role && role.tenant_is_optional && role.project_is_optional)
            || (!project_role && role.tenant_is_optional);
        let tenant_allowed = (project_role && role.project_is_optional) || !project_role;

        match (tenant, project) {
            (None, None) if global_allowed => Ok(ClaimScope::Global),
            (Some(t), None) if tenant_allowed => Ok(ClaimScope::Tenant(t.to_string())),
            (Some(t), Some(p)) if project_role => Ok(ClaimScope::Project {
                tenant_uuid: t.to_string(),
                project_uuid: p.to_string(),
            }),
            _ => Err(AuthzError::InvalidScope(format!(
                "role {} ({:?} scope) cannot be claimed with tenant_uuid={:?}, project_uuid={:?}",
                role.name, role.scope, tenant, project
            ))),
        }
    }

    /// Whether a candidate grant lies inside this scope
    pub fn covers(&self, grant: &EffectiveGrant) -> bool {
        match self {
            ClaimScope::Global => true,
            ClaimScope::Tenant(tenant_uuid) => &grant.tenant_uuid == tenant_uuid,
            ClaimScope::Project { tenant_uuid, project_uuid } => {
                &grant.tenant_uuid == tenant_uuid && grant.project_uuid.as_ref() == Some(project_uuid)
            }
        }
    }
}

impl fmt::Display for ClaimScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimScope::Global => write!(f, "global"),
            ClaimScope::Tenant(t) => write!(f, "tenant:{}", t),
            ClaimScope::Project { tenant_uuid, project_uuid } => {
                write!(f, "project:{}/{}", tenant_uuid, project_uuid)
            }
        }
    }
}
