//! IAM records served by a grant store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{GroupUuid, ProjectUuid, RoleBindingUuid, RoleName, Subject, SubjectType, SubjectUuid, TenantUuid};

/// Tenant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub uuid: TenantUuid,
    pub identifier: String,
}

/// Project record, always owned by one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub uuid: ProjectUuid,
    pub tenant_uuid: TenantUuid,
    pub identifier: String,
}

/// Level at which a role is granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleScope {
    Tenant,
    Project,
}

/// Role definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,

    pub scope: RoleScope,

    #[serde(default)]
    pub tenant_is_optional: bool,

    #[serde(default)]
    pub project_is_optional: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, scope: RoleScope) -> Self {
        Self {
            name: name.into(),
            scope,
            tenant_is_optional: false,
            project_is_optional: false,
        }
    }

    pub fn with_optional_tenant(mut self) -> Self {
        self.tenant_is_optional = true;
        self
    }

    pub fn with_optional_project(mut self) -> Self {
        self.project_is_optional = true;
        self
    }
}

/// Group of users, service accounts and nested groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uuid: GroupUuid,
    pub tenant_uuid: TenantUuid,

    #[serde(default)]
    pub users: Vec<SubjectUuid>,

    #[serde(default)]
    pub service_accounts: Vec<SubjectUuid>,

    /// Member groups; members of a member group are members of this group
    #[serde(default)]
    pub groups: Vec<GroupUuid>,
}

impl Group {
    /// Whether the subject is a direct member
    pub fn has_direct_member(&self, subject: &Subject) -> bool {
        match subject.subject_type {
            SubjectType::User => self.users.contains(&subject.uuid),
            SubjectType::ServiceAccount => self.service_accounts.contains(&subject.uuid),
        }
    }
}

/// Grants members of source-tenant groups visibility into another tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySharing {
    pub uuid: String,
    pub source_tenant_uuid: TenantUuid,
    pub destination_tenant_uuid: TenantUuid,
    pub groups: Vec<GroupUuid>,
}

/// Role attached to a binding, with the options the binding sets for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundRole {
    pub name: RoleName,

    #[serde(default)]
    pub options: Map<String, Value>,
}

impl BoundRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Administrative record attaching roles to subjects and groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub uuid: RoleBindingUuid,
    pub tenant_uuid: TenantUuid,

    #[serde(default)]
    pub users: Vec<SubjectUuid>,

    #[serde(default)]
    pub service_accounts: Vec<SubjectUuid>,

    #[serde(default)]
    pub groups: Vec<GroupUuid>,

    pub roles: Vec<BoundRole>,

    /// Binding covers every project of its tenant
    #[serde(default)]
    pub any_project: bool,

    #[serde(default)]
    pub projects: Vec<ProjectUuid>,

    /// Unix seconds; 0 means no expiry
    #[serde(default)]
    pub valid_till: i64,

    #[serde(default)]
    pub require_mfa: bool,

    #[serde(default)]
    pub need_approvals: u32,
}

impl RoleBinding {
    pub fn new(uuid: impl Into<String>, tenant_uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            tenant_uuid: tenant_uuid.into(),
            users: Vec::new(),
            service_accounts: Vec::new(),
            groups: Vec::new(),
            roles: Vec::new(),
            any_project: false,
            projects: Vec::new(),
            valid_till: 0,
            require_mfa: false,
            need_approvals: 0,
        }
    }

    pub fn with_user(mut self, uuid: impl Into<String>) -> Self {
        self.users.push(uuid.into());
        self
    }

    pub fn with_service_account(mut self, uuid: impl Into<String>) -> Self {
        self.service_accounts.push(uuid.into());
        self
    }

    pub fn with_group(mut self, uuid: impl Into<String>) -> Self {
        self.groups.push(uuid.into());
        self
    }

    pub fn with_role(mut self, role: BoundRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_project(mut self, uuid: impl Into<String>) -> Self {
        self.projects.push(uuid.into());
        self
    }

    pub fn with_any_project(mut self) -> Self {
        self.any_project = true;
        self
    }

    pub fn with_valid_till(mut self, valid_till: i64) -> Self {
        self.valid_till = valid_till;
        self
    }

    pub fn with_mfa(mut self) -> Self {
        self.require_mfa = true;
        self
    }

    pub fn with_approvals(mut self, count: u32) -> Self {
        self.need_approvals = count;
        self
    }

    /// Whether the binding is still in force at `now`
    pub fn is_alive(&self, now: i64) -> bool {
        self.valid_till == 0 || self.valid_till > now
    }

    /// The bound role entry for `name`, if the binding carries it
    pub fn bound_role(&self, name: &str) -> Option<&BoundRole> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Whether the subject is listed directly on the binding
    pub fn has_direct_member(&self, subject: &Subject) -> bool {
        match subject.subject_type {
            SubjectType::User => self.users.contains(&subject.uuid),
            SubjectType::ServiceAccount => self.service_accounts.contains(&subject.uuid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binding_liveness() {
        let forever = RoleBinding::new("rb1", "t1");
        assert!(forever.is_alive(i64::MAX - 1));

        let bounded = RoleBinding::new("rb2", "t1").with_valid_till(100);
        assert!(bounded.is_alive(99));
        assert!(!bounded.is_alive(100));
    }

    #[test]
    fn test_binding_membership() {
        let rb = RoleBinding::new("rb1", "t1").with_user("u1").with_service_account("sa1");
        assert!(rb.has_direct_member(&Subject::user("u1", "t1")));
        assert!(rb.has_direct_member(&Subject::service_account("sa1", "t1")));
        assert!(!rb.has_direct_member(&Subject::service_account("u1", "t1")));
    }

    #[test]
    fn test_binding_deserialize_defaults() {
        let rb: RoleBinding = serde_json::from_value(json!({
            "uuid": "rb1",
            "tenant_uuid": "t1",
            "roles": [{"name": "ssh.open", "options": {"ttl": "100s"}}]
        }))
        .unwrap();

        assert_eq!(rb.valid_till, 0);
        assert!(!rb.any_project);
        assert_eq!(rb.bound_role("ssh.open").unwrap().options["ttl"], json!("100s"));
        assert!(rb.bound_role("iam.read").is_none());
    }

    #[test]
    fn test_role_scope_serde() {
        let role: Role = serde_json::from_value(json!({"name": "iam.read", "scope": "tenant"})).unwrap();
        assert_eq!(role.scope, RoleScope::Tenant);
        assert!(!role.tenant_is_optional);
    }
}
