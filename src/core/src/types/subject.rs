//! Authenticated subjects and the role claims they present

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{ProjectUuid, RoleName, SubjectUuid, TenantUuid};

/// Kind of identity behind a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    User,
    ServiceAccount,
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectType::User => write!(f, "user"),
            SubjectType::ServiceAccount => write!(f, "service_account"),
        }
    }
}

/// Already-authenticated identity, immutable for the duration of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "type")]
    pub subject_type: SubjectType,

    pub uuid: SubjectUuid,

    pub tenant_uuid: TenantUuid,
}

impl Subject {
    pub fn user(uuid: impl Into<String>, tenant_uuid: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::User,
            uuid: uuid.into(),
            tenant_uuid: tenant_uuid.into(),
        }
    }

    pub fn service_account(uuid: impl Into<String>, tenant_uuid: impl Into<String>) -> Self {
        Self {
            subject_type: SubjectType::ServiceAccount,
            uuid: uuid.into(),
            tenant_uuid: tenant_uuid.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.uuid)
    }
}

/// One requested role, with an opaque claim payload handed to the policy program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub role: RoleName,

    #[serde(default)]
    pub claim: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_uuid: Option<TenantUuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<ProjectUuid>,
}

impl RoleClaim {
    /// Claim without tenant or project
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            claim: Map::new(),
            tenant_uuid: None,
            project_uuid: None,
        }
    }

    pub fn at_tenant(mut self, tenant_uuid: impl Into<String>) -> Self {
        self.tenant_uuid = Some(tenant_uuid.into());
        self
    }

    pub fn at_project(mut self, tenant_uuid: impl Into<String>, project_uuid: impl Into<String>) -> Self {
        self.tenant_uuid = Some(tenant_uuid.into());
        self.project_uuid = Some(project_uuid.into());
        self
    }

    /// Add a key to the claim payload
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claim.insert(key.into(), value.into());
        self
    }
}
