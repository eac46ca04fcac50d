//! HS256 tokens carrying a multipass jti

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Token issuer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub issuer: String,

    pub audience: String,

    /// HS256 signing key; never serialized
    #[serde(skip)]
    pub key: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "warden".to_string(),
            audience: "warden".to_string(),
            key: String::new(),
        }
    }
}

impl JwtConfig {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Claims of a multipass token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipassClaims {
    pub iss: String,
    pub aud: String,
    /// Multipass uuid
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks multipass tokens
pub struct JwtIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIssuer {
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.key.len() < 32 {
            return Err(VaultError::Token("signing key must be at least 32 bytes".into()));
        }
        let encoding_key = EncodingKey::from_secret(config.key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.key.as_bytes());
        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    pub fn mint(&self, multipass_uuid: &str, jti: String, issued_at: i64, ttl: u64) -> Result<String> {
        let claims = MultipassClaims {
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            sub: multipass_uuid.to_string(),
            jti,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl as i64),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Check signature, issuer, audience and expiry
    pub fn decode(&self, token: &str) -> Result<MultipassClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = 0;
        Ok(decode::<MultipassClaims>(token, &self.decoding_key, &validation)?.claims)
    }
}
