// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversation sessions and context windowing.
//!
//! - **Context**: token estimation, truncation to the context window,
//!   splitting piped text into context messages
//! - **Engine**: the [`SessionEngine`] driving query and stream exchanges
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    SessionEngine                       │
//! │     (provide_context, query, stream, list_models)      │
//! └───────────────────────────────────────────────────────┘
//!                            │
//!          ┌─────────────────┼─────────────────┐
//!          ▼                 ▼                 ▼
//! ┌─────────────────┐ ┌─────────────┐ ┌─────────────────┐
//! │  HistoryStore   │ │   context   │ │    Provider     │
//! │ (thread files)  │ │  (tokens)   │ │ (OpenAI/Cohere) │
//! └─────────────────┘ └─────────────┘ └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use parley::session::SessionEngine;
//!
//! let mut engine = SessionEngine::new(provider, Box::new(store), config);
//! engine.provide_context(&piped_input);
//! let reply = engine.stream("what does this do?", &mut std::io::stdout()).await?;
//! ```

pub mod context;
pub mod engine;

pub use context::{
    effective_budget, estimate_message_tokens, estimate_messages_tokens, estimate_text_tokens,
    split_into_context_messages, truncate_history, CONTEXT_CHUNK_WORDS,
    MAX_TOKEN_BUFFER_PERCENTAGE,
};
pub use engine::SessionEngine;
