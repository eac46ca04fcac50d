//! Grant store implementations

pub mod memory;

pub use memory::{GrantData, GrantSnapshot, InMemoryGrantStore};
