//! Multipass revocation service
//!
//! Validity of every issued token hangs on the multipass generation
//! counter. Issuing persists `g + 1` before the token leaves the service;
//! verifying always re-reads the stored generation. Bumping the counter
//! once invalidates every earlier token without a blacklist.

use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};
use warden_core::Subject;

use crate::error::{Result, VaultError};
use crate::multipass::{GenerationNumber, Multipass, TokenJti};
use crate::store::CredentialStore;
use crate::token::{JwtIssuer, MultipassClaims};

pub struct MultipassService {
    store: Arc<dyn CredentialStore>,
    issuer: JwtIssuer,
}

impl MultipassService {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: JwtIssuer) -> Self {
        Self { store, issuer }
    }

    /// Create a multipass for `owner`, valid for `ttl` from now
    pub fn create(&self, owner: &Subject, description: impl Into<String>, ttl: Duration) -> Result<Multipass> {
        if ttl.is_zero() {
            return Err(VaultError::InvalidMultipass("ttl must be positive".into()));
        }
        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);

        let multipass = Multipass {
            uuid: uuid::Uuid::new_v4().to_string(),
            tenant_uuid: owner.tenant_uuid.clone(),
            owner_uuid: owner.uuid.clone(),
            owner_type: owner.subject_type,
            description: description.into(),
            ttl: ttl.as_secs(),
            valid_till: Utc::now().timestamp().saturating_add(ttl.as_secs() as i64),
            salt: hex::encode(salt),
        };
        self.store.create_multipass(&multipass)?;

        info!(multipass = %multipass.uuid, owner = %owner, "multipass created");
        Ok(multipass)
    }

    pub fn get(&self, uuid: &str) -> Result<Multipass> {
        Ok(self.store.get_multipass(uuid)?.redacted())
    }

    pub fn generation(&self, uuid: &str) -> Result<GenerationNumber> {
        Ok(GenerationNumber {
            generation_number: self.store.get_generation(uuid)?,
        })
    }

    pub fn list(&self) -> Result<Vec<Multipass>> {
        Ok(self.store.list_multipasses()?.iter().map(Multipass::redacted).collect())
    }

    /// Advance the generation and mint a token for it
    ///
    /// The new generation is durable before the token is returned. If minting
    /// fails after the advance, every earlier token is already revoked and no
    /// replacement is issued; the caller has to issue again.
    pub fn issue_new_generation(&self, uuid: &str) -> Result<String> {
        let multipass = self.store.get_multipass(uuid)?;
        let now = Utc::now().timestamp();
        if multipass.is_expired(now) {
            return Err(VaultError::InvalidMultipass(format!("multipass {} expired", uuid)));
        }
        if multipass.salt.is_empty() {
            error!(multipass = uuid, "refusing to issue for a multipass without salt");
            return Err(VaultError::InvalidMultipass("empty salt".into()));
        }

        let generation = self.store.advance_generation(uuid)?;
        let token = TokenJti::new(generation, multipass.salt.as_str())
            .hash()
            .and_then(|jti| self.issuer.mint(uuid, jti, now, multipass.ttl))
            .map_err(|e| {
                warn!(multipass = uuid, generation, "generation advanced but no token minted: {}", e);
                e
            })?;

        info!(multipass = uuid, generation, "issued multipass generation");
        Ok(token)
    }

    /// Check that `jti` belongs to the current generation
    ///
    /// Any mismatch is `RevocationMismatch`; a multipass without salt is
    /// rejected outright.
    pub fn ensure_current(&self, uuid: &str, jti: &str) -> Result<Multipass> {
        let multipass = self.store.get_multipass(uuid)?;
        if multipass.salt.is_empty() {
            error!(multipass = uuid, "got empty salt");
            return Err(VaultError::InvalidMultipass("jti is not valid".into()));
        }
        let generation = self.store.get_generation(uuid)?;
        let expected = TokenJti::new(generation, multipass.salt.as_str()).hash()?;

        if !bool::from(expected.as_bytes().ct_eq(jti.as_bytes())) {
            debug!(multipass = uuid, generation, "presented jti is not current");
            return Err(VaultError::RevocationMismatch {
                multipass_uuid: uuid.to_string(),
            });
        }
        Ok(multipass)
    }

    /// Whether `jti` is the current one; lookup failures stay errors
    pub fn verify(&self, uuid: &str, jti: &str) -> Result<bool> {
        match self.ensure_current(uuid, jti) {
            Ok(_) => Ok(true),
            Err(e) if e.is_invalid_credential() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Same check as [`verify`](Self::verify), also refusing expired multipasses
    pub fn can_renew(&self, uuid: &str, jti: &str) -> Result<bool> {
        if !self.verify(uuid, jti)? {
            return Ok(false);
        }
        let multipass = self.store.get_multipass(uuid)?;
        Ok(!multipass.is_expired(Utc::now().timestamp()))
    }

    /// Decode a presented token and check its jti against storage
    pub fn authenticate(&self, token: &str) -> Result<(MultipassClaims, Multipass)> {
        let claims = self.issuer.decode(token)?;
        let multipass = self.ensure_current(&claims.sub, &claims.jti)?;
        debug!(multipass = %claims.sub, owner = %multipass.owner_uuid, "multipass token accepted");
        Ok((claims, multipass.redacted()))
    }

    /// Invalidate every issued token without minting a new one
    pub fn revoke(&self, uuid: &str) -> Result<u64> {
        let generation = self.store.advance_generation(uuid)?;
        info!(multipass = uuid, generation, "multipass revoked");
        Ok(generation)
    }

    pub fn delete(&self, uuid: &str) -> Result<()> {
        self.store.delete_multipass(uuid)?;
        info!(multipass = uuid, "multipass deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use crate::token::JwtConfig;

    fn service() -> MultipassService {
        let issuer = JwtIssuer::new(JwtConfig::default().with_key("k".repeat(32))).unwrap();
        MultipassService::new(Arc::new(MemoryCredentialStore::new()), issuer)
    }

    #[test]
    fn test_create_sets_salt_and_generation() {
        let service = service();
        let multipass = service
            .create(&Subject::user("u1", "t1"), "laptop", Duration::from_secs(3600))
            .unwrap();
        assert_eq!(multipass.salt.len(), 64);
        assert_eq!(service.store.get_generation(&multipass.uuid).unwrap(), 0);
        assert!(service.get(&multipass.uuid).unwrap().salt.is_empty());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        assert!(matches!(
            service().create(&Subject::user("u1", "t1"), "", Duration::ZERO),
            Err(VaultError::InvalidMultipass(_))
        ));
    }

    #[test]
    fn test_authenticate_round() {
        let service = service();
        let multipass = service
            .create(&Subject::service_account("sa1", "t1"), "ci", Duration::from_secs(600))
            .unwrap();
        let token = service.issue_new_generation(&multipass.uuid).unwrap();

        let (claims, found) = service.authenticate(&token).unwrap();
        assert_eq!(claims.sub, multipass.uuid);
        assert_eq!(found.owner_uuid, "sa1");

        service.revoke(&multipass.uuid).unwrap();
        assert!(matches!(
            service.authenticate(&token),
            Err(VaultError::RevocationMismatch { .. })
        ));
    }

    #[test]
    fn test_jti_must_match_exactly() {
        let service = service();
        let multipass = service
            .create(&Subject::user("u1", "t1"), "laptop", Duration::from_secs(600))
            .unwrap();
        let token = service.issue_new_generation(&multipass.uuid).unwrap();
        let (claims, _) = service.authenticate(&token).unwrap();

        let mut altered = claims.jti.clone();
        let last = if altered.ends_with('0') { '1' } else { '0' };
        altered.pop();
        altered.push(last);

        assert!(service.verify(&multipass.uuid, &claims.jti).unwrap());
        assert!(!service.verify(&multipass.uuid, &altered).unwrap());
        assert!(!service.verify(&multipass.uuid, &claims.jti[..10]).unwrap());
        assert!(!service.verify(&multipass.uuid, "").unwrap());
    }

    #[test]
    fn test_issue_commits_generation_before_returning() {
        let service = service();
        let multipass = service
            .create(&Subject::user("u1", "t1"), "laptop", Duration::from_secs(600))
            .unwrap();

        let first = service.issue_new_generation(&multipass.uuid).unwrap();
        assert_eq!(service.generation(&multipass.uuid).unwrap().generation_number, 1);

        let second = service.issue_new_generation(&multipass.uuid).unwrap();
        assert_eq!(service.generation(&multipass.uuid).unwrap().generation_number, 2);
        assert!(matches!(
            service.authenticate(&first),
            Err(VaultError::RevocationMismatch { .. })
        ));
        assert!(service.authenticate(&second).is_ok());
    }

    #[test]
    fn test_unknown_multipass_is_an_error() {
        assert!(matches!(service().verify("nope", "jti"), Err(VaultError::NotFound(_))));
    }
}
