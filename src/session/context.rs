// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Token estimation and context window management.
//!
//! Provides functionality for:
//! - Token counting for messages
//! - Dropping the oldest non-system messages when a history outgrows the
//!   context window
//! - Splitting free text into user messages for priming a history

use tracing::debug;

use crate::types::Message;

/// Share of the context window kept free for the model's reply.
pub const MAX_TOKEN_BUFFER_PERCENTAGE: u32 = 20;

/// Words per message produced by [`split_into_context_messages`].
pub const CONTEXT_CHUNK_WORDS: usize = 100;

/// Estimate tokens in a message.
///
/// Half the sum of codepoints and whitespace-separated words, floored. This
/// is a heuristic; existing truncation thresholds depend on it exactly.
pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_text_tokens(&message.content)
}

/// Estimate tokens in raw text.
pub fn estimate_text_tokens(text: &str) -> usize {
    let (chars, words) = text
        .split_whitespace()
        .fold((0, 0), |(chars, words), word| (chars + word.chars().count(), words + 1));
    (chars + words) / 2
}

/// Estimate tokens for a sequence of messages.
///
/// Returns the total and the per-message estimates in order.
pub fn estimate_messages_tokens<M: AsRef<Message>>(messages: &[M]) -> (usize, Vec<usize>) {
    let per_message: Vec<usize> = messages
        .iter()
        .map(|m| estimate_message_tokens(m.as_ref()))
        .collect();
    (per_message.iter().sum(), per_message)
}

/// Token budget left after reserving `buffer_percent` of the window.
pub fn effective_budget(context_window: u32, buffer_percent: u32) -> usize {
    let kept = 100u64.saturating_sub(u64::from(buffer_percent));
    (u64::from(context_window) * kept / 100) as usize
}

/// Drop the oldest non-system messages until the history fits the budget.
///
/// Index 0 is never removed. Messages `1..=i` are dropped for the smallest
/// `i` whose running estimate exceeds the excess over the budget; when no
/// such `i` exists only index 0 survives. Histories within the budget are
/// returned unchanged.
pub fn truncate_history<M: AsRef<Message>>(
    mut history: Vec<M>,
    context_window: u32,
    buffer_percent: u32,
) -> Vec<M> {
    let budget = effective_budget(context_window, buffer_percent);
    let (total, per_message) = estimate_messages_tokens(&history);

    if total <= budget {
        return history;
    }

    let excess = total - budget;
    let mut running = 0;
    let mut drop_through = None;
    for (i, tokens) in per_message.iter().enumerate().skip(1) {
        running += tokens;
        if running > excess {
            drop_through = Some(i);
            break;
        }
    }

    let end = match drop_through {
        Some(i) => i + 1,
        None => history.len(),
    };
    let dropped = end.saturating_sub(1);
    if dropped > 0 {
        history.drain(1..end);
    }

    debug!(total, budget, dropped, "Truncated history");
    history
}

/// Split free text into user messages of at most [`CONTEXT_CHUNK_WORDS`]
/// words, joined by single spaces.
pub fn split_into_context_messages(text: &str) -> Vec<Message> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(CONTEXT_CHUNK_WORDS)
        .map(|chunk| Message::user(chunk.join(" ")))
        .collect()
}
