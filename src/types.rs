// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the Parley chat client.
//!
//! This module defines the fundamental data structures used throughout the application:
//! conversation messages, persisted history entries, completed replies, and the
//! [`Provider`] trait every chat backend implements.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::error::ProviderError;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message sender in a conversation.
///
/// Histories are read back from disk, so a role string outside the known
/// vocabulary is kept as [`Role::Other`] instead of failing deserialization.
/// Providers decide what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Other(String),
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a message with an arbitrary role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Whether this is the system prompt.
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// A message as persisted by a history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub message: Message,
    /// When the message was first persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Wrap a message without a timestamp.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            timestamp: None,
        }
    }

    /// Wrap a message stamped with the current time.
    pub fn now(message: Message) -> Self {
        Self {
            message,
            timestamp: Some(Utc::now()),
        }
    }
}

impl From<Message> for HistoryEntry {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

impl AsRef<Message> for Message {
    fn as_ref(&self) -> &Message {
        self
    }
}

impl AsRef<Message> for HistoryEntry {
    fn as_ref(&self) -> &Message {
        &self.message
    }
}

// ============================================================================
// Provider Response
// ============================================================================

/// A fully materialized reply from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Assistant text
    pub text: String,
    /// Total tokens billed for the exchange, 0 when the provider did not say
    pub usage: u32,
}

impl Completion {
    pub fn new(text: impl Into<String>, usage: u32) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// Lazy, finite sequence of reply fragments produced by a streaming call.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

// ============================================================================
// Provider Trait
// ============================================================================

/// Trait that all chat providers must implement.
///
/// A provider translates the generic history into its own request format,
/// issues it through a [`Transport`](crate::providers::Transport), and
/// normalizes the reply back into plain text.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the full history and wait for the complete reply.
    async fn generate(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<Completion, ProviderError>;

    /// Send the full history and return the reply as it is produced.
    ///
    /// The caller drains the stream to its end and concatenates the fragments.
    async fn stream(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<FragmentStream, ProviderError>;

    /// List chat models, marking the configured one.
    async fn list_models(&self, config: &ResolvedConfig) -> Result<Vec<String>, ProviderError>;

    /// Get the name of this provider for display purposes.
    fn name(&self) -> &str;
}

/// A boxed provider for dynamic dispatch.
pub type BoxedProvider = Box<dyn Provider>;

/// Format a model listing line the way every provider marks the active model.
pub fn format_model_entry(id: &str, current: &str) -> String {
    if id == current {
        format!("* {} (current)", id)
    } else {
        format!("- {}", id)
    }
}
