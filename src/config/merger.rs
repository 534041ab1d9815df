// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.
//! Every field is listed explicitly in each layer.

use std::str::FromStr;

use tracing::debug;

use super::types::{ConfigFile, ResolvedConfig};

/// Provider used when nothing selects one.
pub const DEFAULT_PROVIDER: &str = "openai";

const DEFAULT_CONTEXT_WINDOW: u32 = 8192;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_ROLE: &str = "You are a helpful assistant.";
const DEFAULT_THREAD: &str = "default";
const DEFAULT_AUTH_HEADER: &str = "Authorization";
const DEFAULT_AUTH_TOKEN_PREFIX: &str = "Bearer ";
const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub thread: Option<String>,
}

/// Default configuration values for a provider.
pub fn default_config(name: &str) -> ResolvedConfig {
    let name = name.to_lowercase();
    let (model, url, completions_path, models_path) = match name.as_str() {
        "cohere" => ("command-r", "https://api.cohere.com", "/v1/chat", "/v1/models"),
        _ => ("gpt-4o", "https://api.openai.com", "/v1/chat/completions", "/v1/models"),
    };

    ResolvedConfig {
        name,
        model: model.to_string(),
        api_key: None,
        api_key_file: None,
        context_window: DEFAULT_CONTEXT_WINDOW,
        max_tokens: DEFAULT_MAX_TOKENS,
        temperature: 1.0,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        role: DEFAULT_ROLE.to_string(),
        thread: DEFAULT_THREAD.to_string(),
        omit_history: false,
        url: url.to_string(),
        completions_path: completions_path.to_string(),
        models_path: models_path.to_string(),
        auth_header: DEFAULT_AUTH_HEADER.to_string(),
        auth_token_prefix: DEFAULT_AUTH_TOKEN_PREFIX.to_string(),
        timeout_ms: DEFAULT_TIMEOUT_MS,
    }
}

/// Merge all configuration layers with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Environment (`<NAME>_<FIELD>`, e.g. `OPENAI_MODEL`)
/// 3. Config file
/// 4. Provider defaults
///
/// `env` looks up a single variable so callers can substitute the process
/// environment.
pub fn merge_config<F>(file: Option<ConfigFile>, env: F, cli: CliOptions) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let name = cli
        .provider
        .clone()
        .or_else(|| file.as_ref().and_then(|f| f.name.clone()))
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

    let mut result = default_config(&name);

    if let Some(ref config) = file {
        apply_config_file(&mut result, config);
    }

    apply_environment(&mut result, env);
    apply_cli_options(&mut result, &cli);

    result
}

fn apply_config_file(result: &mut ResolvedConfig, config: &ConfigFile) {
    if let Some(ref model) = config.model {
        result.model = model.clone();
    }

    if config.api_key.is_some() {
        result.api_key = config.api_key.clone();
    }

    if config.api_key_file.is_some() {
        result.api_key_file = config.api_key_file.clone();
    }

    if let Some(window) = config.context_window {
        result.context_window = window;
    }

    if let Some(max_tokens) = config.max_tokens {
        result.max_tokens = max_tokens;
    }

    if let Some(temperature) = config.temperature {
        result.temperature = temperature;
    }

    if let Some(top_p) = config.top_p {
        result.top_p = top_p;
    }

    if let Some(penalty) = config.frequency_penalty {
        result.frequency_penalty = penalty;
    }

    if let Some(penalty) = config.presence_penalty {
        result.presence_penalty = penalty;
    }

    if let Some(ref role) = config.role {
        result.role = role.clone();
    }

    if let Some(ref thread) = config.thread {
        result.thread = thread.clone();
    }

    if let Some(omit) = config.omit_history {
        result.omit_history = omit;
    }

    if let Some(ref url) = config.url {
        result.url = url.clone();
    }

    if let Some(ref path) = config.completions_path {
        result.completions_path = path.clone();
    }

    if let Some(ref path) = config.models_path {
        result.models_path = path.clone();
    }

    if let Some(ref header) = config.auth_header {
        result.auth_header = header.clone();
    }

    if let Some(ref prefix) = config.auth_token_prefix {
        result.auth_token_prefix = prefix.clone();
    }

    if let Some(timeout) = config.timeout_ms {
        result.timeout_ms = timeout;
    }
}

fn apply_environment<F>(result: &mut ResolvedConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = result.name.to_uppercase();
    let var = |field: &str| env(&format!("{}_{}", prefix, field)).filter(|v| !v.is_empty());

    if let Some(model) = var("MODEL") {
        result.model = model;
    }

    if let Some(key) = var("API_KEY") {
        result.api_key = Some(key);
    }

    if let Some(path) = var("API_KEY_FILE") {
        result.api_key_file = Some(path);
    }

    if let Some(window) = parse_var(&var, "CONTEXT_WINDOW") {
        result.context_window = window;
    }

    if let Some(max_tokens) = parse_var(&var, "MAX_TOKENS") {
        result.max_tokens = max_tokens;
    }

    if let Some(temperature) = parse_var(&var, "TEMPERATURE") {
        result.temperature = temperature;
    }

    if let Some(top_p) = parse_var(&var, "TOP_P") {
        result.top_p = top_p;
    }

    if let Some(penalty) = parse_var(&var, "FREQUENCY_PENALTY") {
        result.frequency_penalty = penalty;
    }

    if let Some(penalty) = parse_var(&var, "PRESENCE_PENALTY") {
        result.presence_penalty = penalty;
    }

    if let Some(role) = var("ROLE") {
        result.role = role;
    }

    if let Some(thread) = var("THREAD") {
        result.thread = thread;
    }

    if let Some(omit) = parse_var(&var, "OMIT_HISTORY") {
        result.omit_history = omit;
    }

    if let Some(url) = var("URL") {
        result.url = url;
    }

    if let Some(path) = var("COMPLETIONS_PATH") {
        result.completions_path = path;
    }

    if let Some(path) = var("MODELS_PATH") {
        result.models_path = path;
    }

    if let Some(header) = var("AUTH_HEADER") {
        result.auth_header = header;
    }

    if let Some(prefix) = var("AUTH_TOKEN_PREFIX") {
        result.auth_token_prefix = prefix;
    }

    if let Some(timeout) = parse_var(&var, "TIMEOUT_MS") {
        result.timeout_ms = timeout;
    }
}

fn parse_var<T, F>(var: &F, field: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(field)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(field, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref model) = cli.model {
        result.model = model.clone();
    }

    if let Some(ref thread) = cli.thread {
        result.thread = thread.clone();
    }
}
