//! Ephemeral authorization artifacts: rules, self-describing names and
//! garbage collection.

pub mod rule;
pub mod naming;
pub mod gc;
pub mod registry;

pub use gc::{ArtifactApi, ArtifactCollector, GcConfig, SweepReport};
pub use naming::{is_overdue, valid_till, with_valid_till, NamingError, VALID_TILL_SEPARATOR};
pub use registry::InMemoryArtifactRegistry;
pub use rule::{ArtifactPolicy, Rule};
