//! Collaborator traits consumed by the Warden engine

pub mod grant_store;

pub use grant_store::{GrantSource, GrantStore};
