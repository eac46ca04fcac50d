//! Resolved grant types shared by the resolver, evaluator and selector

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use warden_core::{ProjectUuid, RoleBindingUuid, RoleName, TenantUuid};

/// Options aggregated from every binding behind a grant; one entry per contributor
pub type GrantOptions = BTreeMap<String, Vec<Value>>;

/// Resolved, per-(role, tenant, project) entitlement derived from one or more role bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveGrant {
    pub role: RoleName,

    /// First contributing binding; stable across resolutions of the same snapshot
    pub grant_id: RoleBindingUuid,

    /// Every contributing binding, in contribution order
    #[serde(default)]
    pub binding_ids: Vec<RoleBindingUuid>,

    pub tenant_uuid: TenantUuid,

    /// Project the grant targets; `None` for tenant-level grants
    #[serde(default)]
    pub project_uuid: Option<ProjectUuid>,

    /// Unix seconds; 0 means no expiry
    #[serde(default)]
    pub valid_till: i64,

    #[serde(default)]
    pub require_mfa: bool,

    #[serde(default)]
    pub any_project: bool,

    #[serde(default)]
    pub projects: BTreeSet<ProjectUuid>,

    #[serde(default)]
    pub need_approvals: u32,

    #[serde(default)]
    pub options: GrantOptions,
}

impl EffectiveGrant {
    /// Key used to match a program's survivors back to the candidates
    pub fn match_key(&self) -> (&str, Option<&str>, &str) {
        (&self.tenant_uuid, self.project_uuid.as_deref(), &self.grant_id)
    }

    /// Grant usable without a second factor or approvals
    pub fn is_unconditional(&self) -> bool {
        !self.require_mfa && self.need_approvals == 0
    }
}

/// Tenant/project target of a grant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrantTarget {
    pub tenant_uuid: TenantUuid,
    pub project_uuid: Option<ProjectUuid>,
}

/// Resolution output, keyed by role name; roles without grants are absent
pub type GrantMap = BTreeMap<RoleName, Vec<EffectiveGrant>>;
