//! CEL (Common Expression Language) layer for policy programs
//!
//! Compiles expressions once per engine instance and evaluates them against
//! the `input`/`data` document of a policy evaluation.

pub mod engine;
pub mod functions;
pub mod context;
pub mod error;
pub mod convert;

pub use engine::{CacheStats, Engine};
pub use context::EvalContext;
pub use error::{CelError, Result};
