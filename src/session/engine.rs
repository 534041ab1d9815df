// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The session engine: one rolling conversation per process.
//!
//! The engine owns the in-memory history. It reads the active thread on first
//! use, appends each user turn, trims the oldest turns to fit the context
//! window, dispatches to the provider and writes the thread back after every
//! completed exchange.

use std::io::Write;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::error::SessionError;
use crate::history::HistoryStore;
use crate::types::{BoxedProvider, Completion, HistoryEntry, Message, Role};

use super::context::{split_into_context_messages, truncate_history, MAX_TOKEN_BUFFER_PERCENTAGE};

/// Drives exchanges between a [`HistoryStore`] and a provider.
pub struct SessionEngine {
    provider: BoxedProvider,
    store: Box<dyn HistoryStore>,
    config: ResolvedConfig,
    history: Vec<HistoryEntry>,
    initialized: bool,
}

impl SessionEngine {
    pub fn new(provider: BoxedProvider, store: Box<dyn HistoryStore>, config: ResolvedConfig) -> Self {
        Self {
            provider,
            store,
            config,
            history: Vec::new(),
            initialized: false,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Current history, including the system message once initialized.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Current history as plain messages.
    pub fn messages(&self) -> Vec<Message> {
        self.history.iter().map(|entry| entry.message.clone()).collect()
    }

    pub fn store(&self) -> &dyn HistoryStore {
        self.store.as_ref()
    }

    /// Prime the history with free text, one user message per 100 words.
    pub fn provide_context(&mut self, text: &str) {
        self.init_history();
        self.history.extend(
            split_into_context_messages(text)
                .into_iter()
                .map(HistoryEntry::now),
        );
    }

    /// Send `input` and wait for the complete reply.
    pub async fn query(&mut self, input: &str) -> Result<Completion, SessionError> {
        let snapshot = self.prepare_query(input);
        let messages = self.messages();

        debug!(thread = %self.config.thread, messages = messages.len(), "Dispatching query");

        let result = self.provider.generate(&messages, &self.config).await;
        match result {
            Ok(completion) => {
                self.update_history(&completion.text);
                Ok(completion)
            }
            Err(e) => {
                self.history = snapshot;
                Err(e.into())
            }
        }
    }

    /// Send `input` and copy the reply to `out` as it arrives.
    ///
    /// Every fragment is written and flushed before it is added to the reply;
    /// a newline follows the last one. Returns the reply without that newline.
    /// On failure nothing is persisted and the history is left as it was.
    pub async fn stream<W: Write>(&mut self, input: &str, out: &mut W) -> Result<String, SessionError> {
        let snapshot = self.prepare_query(input);

        let result = self.stream_reply(out).await;
        match result {
            Ok(reply) => {
                self.update_history(&reply);
                Ok(reply)
            }
            Err(e) => {
                self.history = snapshot;
                Err(e)
            }
        }
    }

    /// List the provider's models, marking the configured one.
    pub async fn list_models(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.provider.list_models(&self.config).await?)
    }

    async fn stream_reply<W: Write>(&mut self, out: &mut W) -> Result<String, SessionError> {
        let messages = self.messages();

        debug!(thread = %self.config.thread, messages = messages.len(), "Dispatching stream");

        let mut fragments = self.provider.stream(&messages, &self.config).await?;
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            out.write_all(fragment.as_bytes())?;
            out.flush()?;
            reply.push_str(&fragment);
        }

        out.write_all(b"\n")?;
        out.flush()?;
        Ok(reply)
    }

    /// Append the user turn and truncate. Returns the prior history.
    fn prepare_query(&mut self, input: &str) -> Vec<HistoryEntry> {
        self.init_history();
        let snapshot = self.history.clone();

        self.history.push(HistoryEntry::now(Message::user(input)));
        let before = self.history.len();
        self.history = truncate_history(
            std::mem::take(&mut self.history),
            self.config.context_window,
            MAX_TOKEN_BUFFER_PERCENTAGE,
        );
        if self.history.len() < before {
            debug!(dropped = before - self.history.len(), "Dropped oldest messages");
        }

        snapshot
    }

    fn update_history(&mut self, reply: &str) {
        self.history.push(HistoryEntry::now(Message::assistant(reply)));
        self.persist();
    }

    fn persist(&mut self) {
        if self.config.omit_history {
            return;
        }
        if let Err(e) = self.store.write(&self.history) {
            warn!(thread = %self.config.thread, error = %e, "Failed to persist history");
        }
    }

    fn init_history(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let system = || HistoryEntry::now(Message::system(self.config.role.clone()));

        if self.config.omit_history {
            self.history = vec![system()];
            return;
        }

        self.history = match self.store.read() {
            Ok(mut entries) => {
                match entries.first_mut() {
                    Some(first) if first.message.role == Role::System => {
                        first.message.content = self.config.role.clone();
                    }
                    _ => entries.insert(0, system()),
                }
                entries
            }
            Err(e) => {
                debug!(thread = %self.config.thread, error = %e, "Starting new history");
                vec![system()]
            }
        };
    }
}
