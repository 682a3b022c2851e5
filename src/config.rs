use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::proc::DEFAULT_PROC_ROOT;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub sampling: SamplingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `tracing` filter directive, e.g. `info` or `statkeeper=debug`.
    pub log_level: String,
    /// `text` or `json`.
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database_path: PathBuf::from("statkeeper.db"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub proc_root: PathBuf,
    pub persist_on_read_error: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            persist_on_read_error: false,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("statkeeper").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

/// Falls back to defaults if the file is unreadable or invalid. Runs before
/// logging is set up, so a rejected file is reported on stderr.
pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents).unwrap_or_else(|e| {
            eprintln!("warning: ignoring invalid config {}: {e}", path.display());
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}
