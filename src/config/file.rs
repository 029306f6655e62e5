//! Configuration file loading.
//!
//! This module handles loading acton-chain configuration from TOML files
//! at XDG-compliant locations.

use crate::config::types::ChainConfig;
use crate::error::ChainError;
use std::path::{Path, PathBuf};

/// Default configuration file name for project-local config.
const LOCAL_CONFIG_NAME: &str = "acton-chain.toml";

/// Default configuration file name within XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "acton-chain";

/// Loads configuration from the default search paths.
///
/// Search order:
/// 1. `./acton-chain.toml` (project-local)
/// 2. `~/.config/acton-chain/config.toml` (XDG config)
///
/// Returns the default configuration if no config file is found.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed or holds
/// unusable values.
pub fn load() -> Result<ChainConfig, ChainError> {
    match search_paths().into_iter().find(|path| path.exists()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            from_path(&path)
        }
        None => Ok(ChainConfig::default()),
    }
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file contains invalid TOML
/// - The TOML doesn't match the expected schema or fails validation
pub fn from_path(path: &Path) -> Result<ChainConfig, ChainError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ChainError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    let config: ChainConfig = toml::from_str(&contents).map_err(|e| {
        ChainError::configuration(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })?;
    config.validate()?;
    Ok(config)
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid, doesn't match the schema, or
/// fails validation.
///
/// # Example
///
/// ```rust
/// let config = acton_chain::config::from_str("[limits]\nmax_depth = 2\n").unwrap();
/// assert_eq!(config.limits.max_depth, 2);
/// assert_eq!(config.limits.max_iterations, 10);
/// ```
pub fn from_str(toml_str: &str) -> Result<ChainConfig, ChainError> {
    let config: ChainConfig = toml::from_str(toml_str)
        .map_err(|e| ChainError::configuration("config", format!("invalid TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Returns the paths that would be searched for configuration files, in
/// order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// Returns the path to the XDG config directory for acton-chain.
///
/// This is `~/.config/acton-chain` on most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
