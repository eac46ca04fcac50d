//! Policy programs and their evaluation
//!
//! A [`PolicyProgram`] is a set of CEL expressions bound to one or more role
//! names. The [`PolicyEvaluator`] validates the caller's claim against the
//! program's schema, runs the program over the candidate grants and turns its
//! output into a [`PolicyOutcome`].

pub mod program;
pub mod registry;
pub mod schema;
pub mod user_data;
pub mod evaluator;

pub use program::{PolicyProgram, ProgramSource};
pub use registry::{InMemoryPolicyRegistry, PolicyRegistry};
pub use schema::{ClaimSchema, ClaimValidator, FieldSpec, FieldType, SchemaValidator};
pub use user_data::{EmptyUserData, UserDataProvider};
pub use evaluator::{PolicyEvaluator, PolicyOutcome};
