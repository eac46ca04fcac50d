//! Warden Node Library
//!
//! Operator-facing wiring of the authorization engine, a sled-backed
//! downstream artifact registry and the multipass vault, configured from
//! one TOML file and served from JSON fixtures.

pub mod config;
pub mod fixtures;
pub mod node;
pub mod registry;

pub use config::NodeConfig;
pub use fixtures::CheckRequest;
pub use node::{SubjectReport, WardenNode};
pub use registry::SledArtifactRegistry;
