//! Error types for the multipass vault

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Presented jti does not belong to the current generation
    #[error("jti is not valid for multipass {multipass_uuid}")]
    RevocationMismatch { multipass_uuid: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid multipass: {0}")]
    InvalidMultipass(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Token error: {0}")]
    Token(String),
}

impl VaultError {
    /// Whether the error means the presented credential must be rejected
    pub fn is_invalid_credential(&self) -> bool {
        matches!(
            self,
            VaultError::RevocationMismatch { .. } | VaultError::InvalidMultipass(_) | VaultError::Token(_)
        )
    }
}

impl From<sled::Error> for VaultError {
    fn from(e: sled::Error) -> Self {
        VaultError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Storage(format!("malformed record: {}", e))
    }
}

impl From<jsonwebtoken::errors::Error> for VaultError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        VaultError::Token(e.to_string())
    }
}
