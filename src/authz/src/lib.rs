//! # Warden Authorization Engine
//!
//! Decides which role claims an authenticated subject may exercise and
//! builds the time-boxed artifact a downstream system enforces.
//!
//! ## Features
//!
//! - **Effective grant resolution** over direct and nested-group role bindings
//! - **Policy programs** written in CEL, compiled once and cached per engine
//! - **Best-grant selection** preferring grants with the fewest login hurdles
//! - **Self-expiring artifacts** whose names carry their own expiry
//! - **Garbage collection** of overdue artifacts, paced over a fixed period
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_authz::{AuthzEngine, EngineConfig, InMemoryPolicyRegistry};
//! use warden_core::{GrantData, InMemoryGrantStore, RoleClaim, Subject};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let grants = Arc::new(InMemoryGrantStore::new(GrantData::default()));
//!     let registry = Arc::new(InMemoryPolicyRegistry::new());
//!     let engine = AuthzEngine::new(EngineConfig::default(), grants, registry)?;
//!
//!     let subject = Subject::user("u1", "t1");
//!     let claims = [RoleClaim::new("ssh").at_project("t1", "p1")];
//!     let authorization = engine.authorize("okta", &subject, &claims).await?;
//!     println!("{}", authorization.artifact.name);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod cel;
pub mod duration;
pub mod engine;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod scope;
pub mod selector;
pub mod types;

// Re-export commonly used types
pub use artifact::{
    ArtifactApi, ArtifactCollector, ArtifactPolicy, GcConfig, InMemoryArtifactRegistry, Rule, SweepReport,
};
pub use engine::{Authorization, AuthzEngine, Decision, EngineConfig, EngineMetrics, RoleClaimResult};
pub use error::{AuthzError, Result};
pub use policy::{
    ClaimSchema, InMemoryPolicyRegistry, PolicyProgram, PolicyRegistry, ProgramSource, UserDataProvider,
};
pub use resolver::{EffectiveRoleReport, GrantResolver};
pub use scope::ClaimScope;
pub use selector::select_best;
pub use types::{EffectiveGrant, GrantMap, GrantTarget};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
