// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI chat completions provider.
//!
//! Also works with any API that speaks the `/v1/chat/completions` wire
//! format; point `url` at it in the config file.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::{format_model_entry, Completion, FragmentStream, Message, Provider};

use super::stream::{StreamDecoder, StreamFormat};
use super::transport::{request_headers, Transport};

/// Only models with this prefix are listed.
const CHAT_MODEL_PREFIX: &str = "gpt";

/// OpenAI provider.
pub struct OpenAIProvider {
    transport: Arc<dyn Transport>,
}

impl OpenAIProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn build_request<'a>(
        history: &'a [Message],
        config: &'a ResolvedConfig,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model,
            messages: history.iter().map(ChatMessage::from).collect(),
            temperature: config.temperature,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            max_tokens: config.max_tokens,
            stream,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn generate(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<Completion, ProviderError> {
        let body = serde_json::to_vec(&Self::build_request(history, config, false))?;

        debug!(model = %config.model, messages = history.len(), "Sending chat request");

        let raw = self
            .transport
            .post(
                &config.endpoint(&config.completions_path),
                &request_headers(config),
                body,
            )
            .await?;

        parse_chat_response(&raw)
    }

    async fn stream(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<FragmentStream, ProviderError> {
        let body = serde_json::to_vec(&Self::build_request(history, config, true))?;

        debug!(model = %config.model, messages = history.len(), "Sending streaming chat request");

        let reader = self
            .transport
            .post_stream(
                &config.endpoint(&config.completions_path),
                &request_headers(config),
                body,
            )
            .await?;

        Ok(StreamDecoder::new(reader, StreamFormat::ServerSentEvents).into_stream())
    }

    async fn list_models(&self, config: &ResolvedConfig) -> Result<Vec<String>, ProviderError> {
        let raw = self
            .transport
            .get(&config.endpoint(&config.models_path), &request_headers(config))
            .await?;

        if raw.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        let response: ModelsResponse = serde_json::from_slice(&raw)?;

        Ok(response
            .data
            .iter()
            .filter(|m| m.id.starts_with(CHAT_MODEL_PREFIX))
            .map(|m| format_model_entry(&m.id, &config.model))
            .collect())
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

fn parse_chat_response(raw: &[u8]) -> Result<Completion, ProviderError> {
    if raw.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let response: ChatResponse = serde_json::from_slice(raw)?;
    let usage = response.usage.map(|u| u.total_tokens).unwrap_or(0);

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ProviderError::NoChoices)?;

    Ok(Completion::new(choice.message.content.unwrap_or_default(), usage))
}

// ============================================================================
// API Types
// ============================================================================

/// Chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ChatMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

/// Models list response.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelData>,
}

#[derive(Debug, Deserialize)]
struct ModelData {
    id: String,
}
