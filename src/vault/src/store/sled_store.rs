//! sled-backed credential store
//!
//! Multipasses are kept as JSON in one tree and generation numbers as
//! big-endian `u64` in another. Creation and deletion touch both trees in
//! one transaction; advancing a generation is a compare-and-swap loop
//! followed by a flush, so the new value is durable before it is returned.

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

use super::CredentialStore;
use crate::error::{Result, VaultError};
use crate::multipass::Multipass;

const MULTIPASS_TREE: &str = "multipasses";
const GENERATION_TREE: &str = "generations";

pub struct SledCredentialStore {
    db: Db,
    multipasses: Tree,
    generations: Tree,
}

impl SledCredentialStore {
    /// Open or create a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Store backed by a temporary directory, removed on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let multipasses = db.open_tree(MULTIPASS_TREE)?;
        let generations = db.open_tree(GENERATION_TREE)?;
        Ok(Self {
            db,
            multipasses,
            generations,
        })
    }
}

fn decode_generation(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| VaultError::Storage(format!("generation record has {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

fn transaction_error(e: TransactionError<VaultError>) -> VaultError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    }
}

impl CredentialStore for SledCredentialStore {
    fn create_multipass(&self, multipass: &Multipass) -> Result<()> {
        let record = serde_json::to_vec(multipass)?;
        let key = multipass.uuid.as_bytes();

        (&self.multipasses, &self.generations)
            .transaction(|(multipasses, generations)| {
                if multipasses.get(key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(VaultError::InvalidMultipass(format!(
                        "{} already exists",
                        multipass.uuid
                    ))));
                }
                multipasses.insert(key, record.as_slice())?;
                generations.insert(key, &0u64.to_be_bytes()[..])?;
                Ok(())
            })
            .map_err(transaction_error)?;
        self.db.flush()?;
        Ok(())
    }

    fn get_multipass(&self, uuid: &str) -> Result<Multipass> {
        let record = self
            .multipasses
            .get(uuid.as_bytes())?
            .ok_or_else(|| VaultError::NotFound(format!("multipass {}", uuid)))?;
        Ok(serde_json::from_slice(&record)?)
    }

    fn list_multipasses(&self) -> Result<Vec<Multipass>> {
        self.multipasses
            .iter()
            .values()
            .map(|record| -> Result<Multipass> { Ok(serde_json::from_slice(&record?)?) })
            .collect()
    }

    fn get_generation(&self, uuid: &str) -> Result<u64> {
        let record = self
            .generations
            .get(uuid.as_bytes())?
            .ok_or_else(|| VaultError::NotFound(format!("generation of multipass {}", uuid)))?;
        decode_generation(&record)
    }

    fn advance_generation(&self, uuid: &str) -> Result<u64> {
        let key = uuid.as_bytes();
        loop {
            let current = self
                .generations
                .get(key)?
                .ok_or_else(|| VaultError::NotFound(format!("generation of multipass {}", uuid)))?;
            let next = decode_generation(&current)?
                .checked_add(1)
                .ok_or_else(|| VaultError::Storage(format!("generation of {} overflowed", uuid)))?;

            let swapped = self
                .generations
                .compare_and_swap(key, Some(current), Some(&next.to_be_bytes()[..]))?;
            match swapped {
                Ok(()) => {
                    self.db.flush()?;
                    return Ok(next);
                }
                Err(_) => debug!(multipass = uuid, "generation changed concurrently, retrying"),
            }
        }
    }

    fn delete_multipass(&self, uuid: &str) -> Result<()> {
        let key = uuid.as_bytes();
        (&self.multipasses, &self.generations)
            .transaction(|(multipasses, generations)| {
                if multipasses.remove(key)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(VaultError::NotFound(format!(
                        "multipass {}",
                        uuid
                    ))));
                }
                generations.remove(key)?;
                Ok(())
            })
            .map_err(transaction_error)?;
        self.db.flush()?;
        Ok(())
    }
}
