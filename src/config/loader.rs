// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::presets;
use crate::errors::ConfigError;
use crate::types::Preset;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (references, cycles, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

pub fn parse_str(contents: &str) -> Result<RawConfigFile, ConfigError> {
    Ok(toml::from_str(contents)?)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Where the configuration came from; printed by `--dry-run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Preset(Preset),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Preset(preset) => write!(f, "preset '{preset}'"),
        }
    }
}

/// Resolve the configuration for a CLI invocation.
///
/// - An explicit preset always wins.
/// - Otherwise the file at `path` is loaded.
/// - If that file does not exist, the `full` preset is used.
pub fn resolve(
    path: &Path,
    preset: Option<Preset>,
) -> Result<(ConfigFile, ConfigSource), ConfigError> {
    if let Some(preset) = preset {
        return Ok((presets::load(preset)?, ConfigSource::Preset(preset)));
    }

    if path.exists() {
        return Ok((load_and_validate(path)?, ConfigSource::File(path.to_path_buf())));
    }

    info!(
        path = %path.display(),
        "config file not found; using the built-in 'full' preset"
    );
    Ok((presets::load(Preset::Full)?, ConfigSource::Preset(Preset::Full)))
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetflow.toml")
}

/// Figure out the project root that globs and output paths are relative to.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
