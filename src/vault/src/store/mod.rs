//! Credential stores for multipasses and their generation numbers

pub mod memory;
pub mod sled_store;

pub use memory::MemoryCredentialStore;
pub use sled_store::SledCredentialStore;

use crate::error::Result;
use crate::multipass::Multipass;

/// Storage for multipass records and generation counters
///
/// Every multipass has exactly one generation row, created with it and
/// removed with it.
pub trait CredentialStore: Send + Sync {
    /// Insert a multipass with its generation row set to 0
    fn create_multipass(&self, multipass: &Multipass) -> Result<()>;

    fn get_multipass(&self, uuid: &str) -> Result<Multipass>;

    fn list_multipasses(&self) -> Result<Vec<Multipass>>;

    /// Current generation, read from storage on every call
    fn get_generation(&self, uuid: &str) -> Result<u64>;

    /// Increment the generation and persist it before returning the new value
    ///
    /// Concurrent calls for the same uuid each observe a distinct value.
    fn advance_generation(&self, uuid: &str) -> Result<u64>;

    /// Remove a multipass together with its generation row
    fn delete_multipass(&self, uuid: &str) -> Result<()>;
}
