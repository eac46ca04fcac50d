//! Core data model

pub mod subject;
pub mod iam;

pub use subject::{RoleClaim, Subject, SubjectType};
pub use iam::{BoundRole, Group, IdentitySharing, Project, Role, RoleBinding, RoleScope, Tenant};

/// Tenant identifier
pub type TenantUuid = String;

/// Project identifier
pub type ProjectUuid = String;

/// Group identifier
pub type GroupUuid = String;

/// Role binding identifier
pub type RoleBindingUuid = String;

/// User or service account identifier
pub type SubjectUuid = String;

/// Role name (e.g. "ssh.open")
pub type RoleName = String;
