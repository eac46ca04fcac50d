//! Error types for CEL operations

use thiserror::Error;

/// CEL operation errors
#[derive(Error, Debug)]
pub enum CelError {
    #[error("CEL compilation failed for {name}: {message}")]
    CompilationError { name: String, message: String },

    #[error("CEL evaluation failed for {name}: {message}")]
    EvaluationError { name: String, message: String },
}

/// Result type for CEL operations
pub type Result<T> = std::result::Result<T, CelError>;
