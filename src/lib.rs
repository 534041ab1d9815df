// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parley - a conversational command-line client for chat models.
//!
//! Parley keeps a rolling, per-thread conversation history, trims it to the
//! model's context window, and sends it to OpenAI or Cohere, either waiting
//! for the full reply or streaming it to the terminal as it is produced.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (Message, HistoryEntry, Completion, Provider)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`history`] - Persisted conversation threads
//! - [`session`] - Token budgeting and the session engine
//! - [`providers`] - Chat provider implementations (OpenAI, Cohere)
//! - [`telemetry`] - Logging setup
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley::config::{load_config, CliOptions};
//! use parley::history::FileHistoryStore;
//! use parley::providers::{create_provider, ReqwestTransport};
//! use parley::session::SessionEngine;
//!
//! let config = load_config(CliOptions::default())?;
//! let transport = Arc::new(ReqwestTransport::from_config(&config)?);
//! let provider = create_provider(&config, transport)?;
//! let store = FileHistoryStore::open(&config.thread)?;
//!
//! let mut engine = SessionEngine::new(provider, Box::new(store), config);
//! let completion = engine.query("Hello, Parley!").await?;
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, HistoryError, ProviderError, Result, SessionError};
pub use history::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
pub use providers::{create_provider, ProviderType, ReqwestTransport, Transport};
pub use session::SessionEngine;
pub use types::{BoxedProvider, Completion, FragmentStream, HistoryEntry, Message, Provider, Role};

/// Parley version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let _msg = Message::user("test");
        let _completion = Completion::new("reply", 0);
        let _store = MemoryHistoryStore::new("default");
    }
}
