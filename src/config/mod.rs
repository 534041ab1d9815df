// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for Parley.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Provider defaults
//! - Config file: ~/.parley/config.yaml
//! - Environment: `<NAME>_<FIELD>` variables such as `OPENAI_API_KEY`
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > environment > file > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    get_config_home, get_config_path, get_data_home, load_config_file, read_api_key_file,
    save_config_file, CONFIG_DIR, CONFIG_FILE, CONFIG_HOME_ENV, DATA_HOME_ENV, HISTORY_DIR,
    MAX_API_KEY_FILE_BYTES,
};

pub use merger::{default_config, merge_config, CliOptions, DEFAULT_PROVIDER};

pub use types::{ConfigFile, ResolvedConfig};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources.
///
/// This is the main entry point for configuration loading.
pub fn load_config(cli_options: CliOptions) -> Result<ResolvedConfig, ConfigError> {
    let path = get_config_path()
        .ok_or_else(|| ConfigError::NotFound("home directory".to_string()))?;
    load_config_from(&path, |key| std::env::var(key).ok(), cli_options)
}

/// Load configuration from an explicit file path and environment lookup.
pub fn load_config_from<F>(
    path: &Path,
    env: F,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = load_config_file(path)?;
    let mut config = merge_config(file, env, cli_options);
    resolve_api_key(&mut config)?;
    Ok(config)
}

/// Fill in the API key from `api_key_file` when no key was given directly.
pub fn resolve_api_key(config: &mut ResolvedConfig) -> Result<(), ConfigError> {
    if config.api_key.is_some() {
        return Ok(());
    }

    if let Some(ref path) = config.api_key_file {
        let expanded = expand_home(path);
        config.api_key = Some(read_api_key_file(&expanded)?);
    }

    Ok(())
}

fn expand_home(path: &str) -> std::path::PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.into()),
        None => path.into(),
    }
}
