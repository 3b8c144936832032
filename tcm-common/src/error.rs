//! Common error types for the TCM diagnostic crates

use thiserror::Error;

/// Common result type for TCM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the engine and its tooling
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structured document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}
