//! Configuration management for termrun
//!
//! Handles loading, saving, and validating the JSONC configuration file.
//! A missing config file yields the defaults; nothing is written on load.

pub mod paths;
pub mod schema;

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonc_parser::parse_to_serde_value;

pub use paths::{get_config_dir, get_config_path};
pub use schema::{Config, validate_protocol};

fn default_config_path() -> Result<PathBuf> {
    get_config_path().ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))
}

/// Load configuration from the default config file
pub fn load_config() -> Result<Config> {
    load_config_from(&default_config_path()?)
}

/// Load configuration from `path`
///
/// Supports JSONC (JSON with comments).
/// Rejects unknown fields for strict validation.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let mut file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let parsed_value = parse_to_serde_value(&contents, &Default::default())
        .map_err(|e| anyhow::anyhow!("Invalid JSONC in config file: {}", e))?
        .ok_or_else(|| anyhow::anyhow!("Config file is empty"))?;

    // deny_unknown_fields rejects unknown keys here
    let config: Config = serde_json::from_value(parsed_value).with_context(|| {
        format!(
            "Invalid configuration in {}. Check for unknown fields or invalid values.",
            path.display()
        )
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration in {}: {}", path.display(), e))?;

    Ok(config)
}

/// Save configuration to the default config file
pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &default_config_path()?)
}

/// Save configuration to `path`
///
/// Creates a backup of the existing config (config.json.bak) before overwriting.
/// Creates the parent directory if needed.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
            tracing::info!("Created config directory: {}", dir.display());
        }
    }

    if path.exists() {
        let backup_path = path.with_extension("json.bak");
        fs::copy(path, &backup_path)
            .with_context(|| format!("Failed to create backup at: {}", backup_path.display()))?;
        tracing::debug!("Created config backup: {}", backup_path.display());
    }

    let json = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create config file: {}", path.display()))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    tracing::debug!("Saved config to: {}", path.display());

    Ok(())
}
