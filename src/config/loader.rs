// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles locating, reading and writing the YAML config file and reading
//! API keys from key files.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::ConfigFile;

/// Config directory name under the home directory.
pub const CONFIG_DIR: &str = ".parley";

/// Config file name.
pub const CONFIG_FILE: &str = "config.yaml";

/// History directory name under the config directory.
pub const HISTORY_DIR: &str = "history";

/// Overrides the config directory.
pub const CONFIG_HOME_ENV: &str = "PARLEY_CONFIG_HOME";

/// Overrides the history directory.
pub const DATA_HOME_ENV: &str = "PARLEY_DATA_HOME";

/// Largest API key file accepted.
pub const MAX_API_KEY_FILE_BYTES: u64 = 10 * 1024;

/// Get the config directory path.
pub fn get_config_home() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(CONFIG_DIR))
}

/// Get the config file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_home().map(|dir| dir.join(CONFIG_FILE))
}

/// Get the directory holding one history file per thread.
pub fn get_data_home() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    get_config_home().map(|dir| dir.join(HISTORY_DIR))
}

/// Load a configuration file, `None` when it does not exist.
pub fn load_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Some(ConfigFile::default()));
    }

    serde_yaml::from_str(&content).map(Some).map_err(ConfigError::from)
}

/// Save a configuration file, creating its directory.
pub fn save_config_file(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;

    Ok(())
}

/// Read an API key from a file.
///
/// The file must be a regular file of at most [`MAX_API_KEY_FILE_BYTES`];
/// surrounding whitespace is trimmed and the key must not be empty.
pub fn read_api_key_file(path: &Path) -> Result<String, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        field: "api_key_file".to_string(),
        message,
    };

    let file = std::fs::File::open(path)
        .map_err(|e| invalid(format!("failed to open {}: {}", path.display(), e)))?;
    let metadata = file
        .metadata()
        .map_err(|e| invalid(format!("failed to stat {}: {}", path.display(), e)))?;

    if !metadata.is_file() {
        return Err(invalid("api key file must be a regular file".to_string()));
    }
    if metadata.len() > MAX_API_KEY_FILE_BYTES {
        return Err(invalid(format!(
            "api key file too large (max {} bytes)",
            MAX_API_KEY_FILE_BYTES
        )));
    }

    let mut content = String::new();
    file.take(MAX_API_KEY_FILE_BYTES + 1)
        .read_to_string(&mut content)
        .map_err(|e| invalid(format!("failed to read {}: {}", path.display(), e)))?;
    if content.len() as u64 > MAX_API_KEY_FILE_BYTES {
        return Err(invalid(format!(
            "api key file too large (max {} bytes)",
            MAX_API_KEY_FILE_BYTES
        )));
    }

    let key = content.trim();
    if key.is_empty() {
        return Err(invalid("api key file is empty".to_string()));
    }

    Ok(key.to_string())
}
