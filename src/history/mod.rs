// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persisted conversation history.
//!
//! A [`HistoryStore`] keeps one ordered list of [`HistoryEntry`] per named
//! thread. The session engine reads the active thread once at startup and
//! writes it back after every completed exchange.
//!
//! - [`FileHistoryStore`] - one JSON file per thread under `~/.parley/history`
//! - [`MemoryHistoryStore`] - in-process store for tests

mod store;

pub use store::{FileHistoryStore, HISTORY_EXTENSION};

use std::collections::HashMap;

use globset::{Glob, GlobMatcher};

use crate::error::HistoryError;
use crate::types::{HistoryEntry, Role};

/// Storage for conversation threads.
#[cfg_attr(test, mockall::automock)]
pub trait HistoryStore: Send {
    /// Read the active thread.
    fn read(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        self.read_thread(&self.thread())
    }

    /// Read a named thread. Fails with [`HistoryError::NotFound`] when nothing
    /// was persisted for it.
    fn read_thread(&self, thread: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Replace the active thread's contents.
    fn write(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryError>;

    /// Name of the active thread.
    fn thread(&self) -> String;

    fn set_thread(&mut self, thread: &str);

    /// Names of all persisted threads, sorted.
    fn list_threads(&self) -> Result<Vec<String>, HistoryError>;

    /// Delete a thread by exact name, or every thread matching a glob such
    /// as `work-*`. See [`ThreadPattern`].
    fn delete_thread(&mut self, pattern: &str) -> Result<(), HistoryError>;
}

/// Threads selected by a `delete_thread` pattern.
///
/// A pattern without `*` names one thread exactly. Anything else is a glob
/// over thread names, so `work-*` and `a*b` both work.
#[derive(Debug, Clone)]
pub enum ThreadPattern {
    Exact(String),
    Glob(GlobMatcher),
}

impl ThreadPattern {
    pub fn parse(pattern: &str) -> Result<Self, HistoryError> {
        if !pattern.contains('*') {
            return Ok(Self::Exact(pattern.to_string()));
        }
        Glob::new(pattern)
            .map(|glob| Self::Glob(glob.compile_matcher()))
            .map_err(|e| HistoryError::InvalidPattern(e.to_string()))
    }

    pub fn matches(&self, thread: &str) -> bool {
        match self {
            Self::Exact(name) => name == thread,
            Self::Glob(matcher) => matcher.is_match(thread),
        }
    }
}

/// In-memory history store.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    thread: String,
    threads: HashMap<String, Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new(thread: impl Into<String>) -> Self {
        Self {
            thread: thread.into(),
            threads: HashMap::new(),
        }
    }

    /// Seed a thread with entries.
    pub fn with_thread(mut self, thread: impl Into<String>, entries: Vec<HistoryEntry>) -> Self {
        self.threads.insert(thread.into(), entries);
        self
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn read_thread(&self, thread: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        self.threads
            .get(thread)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(thread.to_string()))
    }

    fn write(&mut self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        self.threads.insert(self.thread.clone(), entries.to_vec());
        Ok(())
    }

    fn thread(&self) -> String {
        self.thread.clone()
    }

    fn set_thread(&mut self, thread: &str) {
        self.thread = thread.to_string();
    }

    fn list_threads(&self) -> Result<Vec<String>, HistoryError> {
        let mut names: Vec<String> = self.threads.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_thread(&mut self, pattern: &str) -> Result<(), HistoryError> {
        let selected = ThreadPattern::parse(pattern)?;
        let before = self.threads.len();
        self.threads.retain(|name, _| !selected.matches(name));

        if self.threads.len() == before {
            return Err(HistoryError::NotFound(pattern.to_string()));
        }
        Ok(())
    }
}

/// Render a thread as a readable transcript.
///
/// Consecutive user entries (context chunks followed by the question) are
/// shown as a single block.
pub fn format_transcript(entries: &[HistoryEntry]) -> String {
    let mut result = String::new();
    let mut pending_user: Option<(String, &HistoryEntry)> = None;

    for entry in entries {
        if entry.message.role == Role::User {
            if let Some((content, _)) = pending_user.as_mut() {
                content.push(' ');
                content.push_str(&entry.message.content);
            } else {
                pending_user = Some((entry.message.content.clone(), entry));
            }
            continue;
        }

        if let Some((content, first)) = pending_user.take() {
            result.push_str(&format_block(&Role::User, &content, first));
        }
        result.push_str(&format_block(&entry.message.role, &entry.message.content, entry));
    }

    if let Some((content, first)) = pending_user {
        result.push_str(&format_block(&Role::User, &content, first));
    }

    result
}

fn format_block(role: &Role, content: &str, entry: &HistoryEntry) -> String {
    let (prefix, emoji) = match role {
        Role::System => ("\n", "💻"),
        Role::User => ("---\n", "👤"),
        Role::Assistant => ("\n", "🤖"),
        Role::Other(_) => ("\n", "❔"),
    };

    let timestamp = match (role, entry.timestamp) {
        (Role::User, Some(ts)) => format!(" [{}]", ts.format("%Y-%m-%d %H:%M:%S")),
        _ => String::new(),
    };

    format!(
        "{}**{}** {}{}:\n{}\n",
        prefix,
        role.as_str().to_uppercase(),
        emoji,
        timestamp,
        content
    )
}
