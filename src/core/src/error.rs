//! Error types shared across the Warden crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type for grant store lookups
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by grant store collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Backend failed to answer the query
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { kind, id: id.into() }
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    /// Grant store lookup failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input/state
    #[error("Invalid: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("tenant", "t1");
        assert_eq!(err.to_string(), "tenant not found: t1");
    }

    #[test]
    fn test_store_error_converts() {
        let err: CoreError = StoreError::Backend("down".into()).into();
        assert!(matches!(err, CoreError::Store(StoreError::Backend(_))));
    }
}
