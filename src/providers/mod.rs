// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chat provider implementations for Parley.
//!
//! This module provides implementations of the [`Provider`](crate::types::Provider)
//! trait for the supported chat backends:
//!
//! - [`openai::OpenAIProvider`] - OpenAI and OpenAI-compatible APIs
//! - [`cohere::CohereProvider`] - Cohere chat models
//!
//! Both share one [`Transport`] and the line-oriented [`StreamDecoder`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley::providers::{create_provider, ReqwestTransport};
//!
//! let transport = Arc::new(ReqwestTransport::from_config(&config)?);
//! let provider = create_provider(&config, transport)?;
//! let completion = provider.generate(&history, &config).await?;
//! ```

pub mod cohere;
pub mod openai;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use cohere::CohereProvider;
pub use openai::OpenAIProvider;
pub use stream::{StreamDecoder, StreamFormat};
pub use transport::{request_headers, ByteStream, Headers, ReqwestTransport, Timeouts, Transport};

use std::sync::Arc;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::BoxedProvider;

/// Supported provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI GPT models
    OpenAI,
    /// Cohere Command models
    Cohere,
}

impl std::str::FromStr for ProviderType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "cohere" => Ok(Self::Cohere),
            other => Err(ProviderError::NotConfigured(format!(
                "unsupported provider: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "OpenAI"),
            Self::Cohere => write!(f, "Cohere"),
        }
    }
}

/// Create the provider named by `config.name`.
///
/// # Errors
///
/// Returns [`ProviderError::NotConfigured`] for an unknown provider name or
/// when no API key was resolved.
pub fn create_provider(
    config: &ResolvedConfig,
    transport: Arc<dyn Transport>,
) -> Result<BoxedProvider, ProviderError> {
    let provider_type: ProviderType = config.name.parse()?;

    if config.api_key.is_none() {
        return Err(ProviderError::NotConfigured(format!(
            "API key required for {} (set {})",
            provider_type,
            config.api_key_env_var()
        )));
    }

    Ok(match provider_type {
        ProviderType::OpenAI => Box::new(OpenAIProvider::new(transport)),
        ProviderType::Cohere => Box::new(CohereProvider::new(transport)),
    })
}
