//! Bootstrap configuration loading and knowledge-base path resolution
//!
//! The bootstrap TOML is intentionally small: where the knowledge base lives,
//! how to log, and the engine switches that are fixed for the process lifetime.
//! Rule and recommendation tables live in the knowledge base itself, which is a
//! separate versioned document.
//!
//! # Resolution priority
//!
//! Config file:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`TCM_CONFIG`)
//! 3. `<user config dir>/tcm-diag/config.toml`
//! 4. `/etc/tcm-diag/config.toml` (Linux only)
//!
//! Knowledge base:
//! 1. Command-line argument (`--knowledge-base`)
//! 2. Environment variable (`TCM_KNOWLEDGE_BASE`)
//! 3. `knowledge_base` key in the TOML config
//! 4. Embedded default (caller's responsibility, signalled by `None`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TCM_CONFIG";

/// Environment variable naming an explicit knowledge-base file
pub const KNOWLEDGE_BASE_ENV_VAR: &str = "TCM_KNOWLEDGE_BASE";

const APP_DIR_NAME: &str = "tcm-diag";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional so an empty file (or no file at all) yields a
/// working configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the knowledge-base TOML (rules, weights, advice tables)
    #[serde(default)]
    pub knowledge_base: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Engine switches
    #[serde(default)]
    pub engine: EngineToml,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Engine switches read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineToml {
    /// Feed the best constitution rule match into fusion as an extra vote
    #[serde(default = "default_rule_votes")]
    pub rule_votes: bool,
}

impl Default for EngineToml {
    fn default() -> Self {
        Self {
            rule_votes: default_rule_votes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rule_votes() -> bool {
    true
}

/// Parse bootstrap configuration from TOML text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Parse(format!("Parse TOML failed: {}", e)))
}

/// Load bootstrap configuration from a TOML file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Locate the config file following the documented priority order
///
/// Returns `None` when no candidate exists; a missing config is not an error.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config (Linux)
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load configuration with graceful degradation
///
/// An explicitly requested file (CLI or `TCM_CONFIG`) must load; a discovered
/// file that fails to parse, or no file at all, falls back to defaults with a
/// warning.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    load_with_source(cli_arg).map(|(config, _)| config)
}

/// Like [`load_or_default`], also returning the file the config came from
///
/// The path is `None` when built-in defaults are in effect.
pub fn load_with_source(cli_arg: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    let explicit = cli_arg.is_some()
        || std::env::var(CONFIG_ENV_VAR)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

    let Some(path) = locate_config_file(cli_arg) else {
        debug!("No config file found, using built-in defaults");
        return Ok((TomlConfig::default(), None));
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            Ok((config, Some(path)))
        }
        Err(e) if explicit => Err(e),
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            Ok((TomlConfig::default(), None))
        }
    }
}

/// Resolve the knowledge-base path
///
/// `None` means "use the embedded default knowledge base".
pub fn resolve_knowledge_base_path(cli_arg: Option<&Path>, config: &TomlConfig) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(KNOWLEDGE_BASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config
    config.knowledge_base.clone()
}
