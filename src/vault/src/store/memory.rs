//! In-memory credential store

use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::CredentialStore;
use crate::error::{Result, VaultError};
use crate::multipass::Multipass;

#[derive(Default)]
struct Records {
    multipasses: BTreeMap<String, Multipass>,
    generations: BTreeMap<String, u64>,
}

/// Credential store kept in process memory
///
/// One mutex guards both tables, so a multipass and its generation row
/// always change together.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<Records>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn create_multipass(&self, multipass: &Multipass) -> Result<()> {
        let mut records = self.records.lock();
        if records.multipasses.contains_key(&multipass.uuid) {
            return Err(VaultError::InvalidMultipass(format!("{} already exists", multipass.uuid)));
        }
        records.multipasses.insert(multipass.uuid.clone(), multipass.clone());
        records.generations.insert(multipass.uuid.clone(), 0);
        Ok(())
    }

    fn get_multipass(&self, uuid: &str) -> Result<Multipass> {
        self.records
            .lock()
            .multipasses
            .get(uuid)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("multipass {}", uuid)))
    }

    fn list_multipasses(&self) -> Result<Vec<Multipass>> {
        Ok(self.records.lock().multipasses.values().cloned().collect())
    }

    fn get_generation(&self, uuid: &str) -> Result<u64> {
        self.records
            .lock()
            .generations
            .get(uuid)
            .copied()
            .ok_or_else(|| VaultError::NotFound(format!("generation of multipass {}", uuid)))
    }

    fn advance_generation(&self, uuid: &str) -> Result<u64> {
        let mut records = self.records.lock();
        let generation = records
            .generations
            .get_mut(uuid)
            .ok_or_else(|| VaultError::NotFound(format!("generation of multipass {}", uuid)))?;
        *generation += 1;
        Ok(*generation)
    }

    fn delete_multipass(&self, uuid: &str) -> Result<()> {
        let mut records = self.records.lock();
        if records.multipasses.remove(uuid).is_none() {
            return Err(VaultError::NotFound(format!("multipass {}", uuid)));
        }
        records.generations.remove(uuid);
        Ok(())
    }
}
