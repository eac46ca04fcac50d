//! # Warden Core
//!
//! Shared data model and collaborator traits for the Warden access broker.
//! The authorization engine and the credential vault both build on these
//! types; neither depends on the other.
//!
//! ## Modules
//!
//! - [`types`]: subjects, role claims and the IAM records a grant store serves
//! - [`traits`]: the read-only [`GrantStore`] contract and its snapshot source
//! - [`store`]: an in-memory, snapshot-publishing grant store

pub mod types;
pub mod traits;
pub mod store;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result, StoreError, StoreResult};
pub use types::{
    GroupUuid, ProjectUuid, RoleBindingUuid, RoleName, TenantUuid, SubjectUuid,
    BoundRole, Group, IdentitySharing, Project, Role, RoleBinding, RoleScope, Tenant,
    RoleClaim, Subject, SubjectType,
};
pub use traits::{GrantSource, GrantStore};
pub use store::{GrantData, GrantSnapshot, InMemoryGrantStore};

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
