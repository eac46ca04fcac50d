//! Multipass credentials and their generation counters

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use warden_core::{SubjectType, SubjectUuid, TenantUuid};

use crate::error::{Result, VaultError};

pub type MultipassUuid = String;

/// Long-lived credential descriptor
///
/// Tokens minted for a multipass stay valid only while their jti matches
/// the current generation, so bumping the generation revokes all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multipass {
    pub uuid: MultipassUuid,

    pub tenant_uuid: TenantUuid,

    pub owner_uuid: SubjectUuid,

    pub owner_type: SubjectType,

    #[serde(default)]
    pub description: String,

    /// Lifetime of each issued token, in seconds
    pub ttl: u64,

    /// Unix seconds after which no new generation is issued
    pub valid_till: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub salt: String,
}

impl Multipass {
    pub fn is_expired(&self, now: i64) -> bool {
        self.valid_till != 0 && self.valid_till <= now
    }

    /// Copy without the salt, safe to show to operators
    pub fn redacted(&self) -> Self {
        Self {
            salt: String::new(),
            ..self.clone()
        }
    }
}

/// Current generation of one multipass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationNumber {
    pub generation_number: u64,
}

/// Token identifier derived from a generation and the multipass salt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenJti {
    pub generation: u64,
    pub salt: String,
}

impl TokenJti {
    pub fn new(generation: u64, salt: impl Into<String>) -> Self {
        Self {
            generation,
            salt: salt.into(),
        }
    }

    /// `hex(sha256("<generation> <salt>"))`; an empty salt never yields a jti
    pub fn hash(&self) -> Result<String> {
        if self.salt.is_empty() {
            return Err(VaultError::InvalidMultipass("empty salt".into()));
        }
        let digest = Sha256::digest(format!("{} {}", self.generation, self.salt).as_bytes());
        Ok(hex::encode(digest))
    }
}
