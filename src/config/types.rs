// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`ConfigFile`] mirrors the YAML file on disk, where every key is optional.
//! [`ResolvedConfig`] is the fully merged record the rest of the crate reads.

use serde::{Deserialize, Serialize};

/// Configuration file contents (`~/.parley/config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Provider to use (openai, cohere)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Model name to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// File to read the API key from when `api_key` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,

    /// Token capacity of a single request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// System prompt placed at the head of every history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Active conversation thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,

    /// Neither read nor write persisted history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit_history: Option<bool>,

    /// Base URL for the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token_prefix: Option<String>,

    /// Request timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Fully resolved configuration after merging all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    pub context_window: u32,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub role: String,
    pub thread: String,
    pub omit_history: bool,
    pub url: String,
    pub completions_path: String,
    pub models_path: String,
    pub auth_header: String,
    pub auth_token_prefix: String,
    pub timeout_ms: u64,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        super::merger::default_config(super::merger::DEFAULT_PROVIDER)
    }
}

impl ResolvedConfig {
    /// Environment variable holding the API key for the active provider.
    pub fn api_key_env_var(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase())
    }

    /// Full URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Copy with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api_key.is_some() {
            copy.api_key = Some("********".to_string());
        }
        copy
    }
}
