//! Configuration loader.
//!
//! Pure data loading: read the file, parse TOML, map onto [`AppConfig`].
//! Defaults and validation belong to the consuming use case configs.

use std::path::Path;

use anyhow::Context;
use ld_core::config::AppConfig;

/// Load configuration from a TOML file.
///
/// Missing sections and keys are accepted and left empty.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}
