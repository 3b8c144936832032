//! # TCM Common Library
//!
//! Shared code for the diagnostic engine crates:
//! - Common error type
//! - Bootstrap configuration loading (TOML)
//! - Knowledge-base path resolution

pub mod config;
pub mod error;

pub use config::{EngineToml, LoggingConfig, TomlConfig};
pub use error::{Error, Result};
