//! Effective grant resolution
//!
//! Expands a subject's direct and group-inherited role bindings into
//! candidate grants, and derives the effective-role report and the
//! available tenant/project listings from the same bindings.

mod projects;
pub mod grants;
pub mod report;
pub mod available;

pub use grants::GrantResolver;
pub use projects::ProjectLister;
pub use report::{EffectiveRoleReport, ProjectReport, TenantReport};
