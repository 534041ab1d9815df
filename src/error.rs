// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the Parley chat client.
//!
//! This module provides strongly-typed errors for different parts of the application,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation.

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced a response (connect, TLS, body read).
    #[error("failed to make request: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("http status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("empty response")]
    EmptyResponse,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no responses returned")]
    NoChoices,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Errors that can occur while reading or writing persisted history.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("no history for thread: {0}")]
    NotFound(String),

    #[error("history corrupted: {0}")]
    Corrupted(String),

    #[error("invalid thread pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

/// Errors surfaced by the session engine.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Output(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_messages() {
        assert_eq!(ProviderError::EmptyResponse.to_string(), "empty response");
        assert_eq!(ProviderError::NoChoices.to_string(), "no responses returned");
        assert_eq!(
            ProviderError::UnknownRole("tool".to_string()).to_string(),
            "unknown role: tool"
        );
        assert_eq!(
            ProviderError::http(401, "Incorrect API key provided").to_string(),
            "http status 401: Incorrect API key provided"
        );
    }

    #[test]
    fn test_provider_error_status_code() {
        assert_eq!(ProviderError::http(429, "slow down").status_code(), Some(429));
        assert_eq!(ProviderError::EmptyResponse.status_code(), None);
    }

    #[test]
    fn test_decode_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let err: ProviderError = result.unwrap_err().into();
        assert!(matches!(err, ProviderError::Decode(_)));
        assert!(err.to_string().starts_with("failed to decode response: "));
    }

    #[test]
    fn test_history_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HistoryError = io_err.into();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }

    #[test]
    fn test_session_error_is_transparent() {
        let err: SessionError = ProviderError::NoChoices.into();
        assert_eq!(err.to_string(), "no responses returned");
        assert!(matches!(err, SessionError::Provider(ProviderError::NoChoices)));
    }
}
