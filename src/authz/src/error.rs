//! Error types for the authorization engine

use thiserror::Error;
use warden_core::StoreError;

use crate::cel::CelError;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Grant store lookup failed
    #[error("Lookup failed: {0}")]
    LookupFailed(#[from] StoreError),

    /// Claim payload rejected by the program's claim schema
    #[error("Claim schema invalid: {0}")]
    ClaimSchemaInvalid(String),

    /// Malformed or failing policy program
    #[error("Policy evaluation failed: {0}")]
    PolicyEvaluationFailed(String),

    /// Policy did not allow the request, or left no grant to use
    #[error("Denied: {}", reasons.join("; "))]
    Denied { reasons: Vec<String> },

    /// Downstream artifact API unreachable
    #[error("Downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// No program is bound to the role
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// Program exists but does not accept the login's auth method
    #[error("Auth method {method} is not allowed for role {role}")]
    AuthMethodNotAllowed { role: String, method: String },

    /// Claim's tenant/project combination does not fit the role scope
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AuthzError {
    /// Whether this is a normal denial rather than a failure
    pub fn is_denial(&self) -> bool {
        matches!(self, AuthzError::Denied { .. })
    }
}

impl From<CelError> for AuthzError {
    fn from(err: CelError) -> Self {
        AuthzError::PolicyEvaluationFailed(err.to_string())
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
