//! Error types for tcm-diag
//!
//! Only two things can fail: the caller hands over a request of the wrong
//! shape, or a knowledge base cannot be loaded. Every numeric domain issue is
//! resolved by clamping and never surfaces here.

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// Request does not have the documented shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Knowledge base failed to parse or validate
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, DiagnosisError>;
