// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cohere chat provider (v1 chat API).
//!
//! Cohere takes the newest message separately from the earlier turns and
//! uses its own role names. A role outside the generic vocabulary aborts the
//! request with [`ProviderError::UnknownRole`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::{format_model_entry, Completion, FragmentStream, Message, Provider, Role};

use super::stream::{StreamDecoder, StreamFormat};
use super::transport::{request_headers, Transport};

/// Cohere provider.
pub struct CohereProvider {
    transport: Arc<dyn Transport>,
}

impl CohereProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn build_request<'a>(
        history: &'a [Message],
        config: &'a ResolvedConfig,
        stream: bool,
    ) -> Result<ChatRequest<'a>, ProviderError> {
        let mut chat_history = history
            .iter()
            .map(ChatMessage::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let message = chat_history.pop().map(|m| m.message).unwrap_or_default();

        Ok(ChatRequest {
            model: &config.model,
            message,
            chat_history,
            temperature: config.temperature,
            p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            max_tokens: config.max_tokens,
            stream,
        })
    }
}

/// Cohere's name for a generic role.
fn cohere_role(role: &Role) -> Result<&'static str, ProviderError> {
    match role {
        Role::User => Ok("USER"),
        Role::Assistant => Ok("CHATBOT"),
        Role::System => Ok("SYSTEM"),
        Role::Other(name) => Err(ProviderError::UnknownRole(name.clone())),
    }
}

#[async_trait]
impl Provider for CohereProvider {
    async fn generate(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<Completion, ProviderError> {
        let body = serde_json::to_vec(&Self::build_request(history, config, false)?)?;

        debug!(model = %config.model, messages = history.len(), "Sending chat request");

        let raw = self
            .transport
            .post(
                &config.endpoint(&config.completions_path),
                &request_headers(config),
                body,
            )
            .await?;

        if raw.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        let response: ChatResponse = serde_json::from_slice(&raw)?;

        let usage = response
            .meta
            .and_then(|meta| meta.billed_units)
            .map(|units| units.input_tokens + units.output_tokens)
            .unwrap_or(0.0);

        Ok(Completion::new(response.text, usage as u32))
    }

    async fn stream(
        &self,
        history: &[Message],
        config: &ResolvedConfig,
    ) -> Result<FragmentStream, ProviderError> {
        let body = serde_json::to_vec(&Self::build_request(history, config, true)?)?;

        debug!(model = %config.model, messages = history.len(), "Sending streaming chat request");

        let reader = self
            .transport
            .post_stream(
                &config.endpoint(&config.completions_path),
                &request_headers(config),
                body,
            )
            .await?;

        Ok(StreamDecoder::new(reader, StreamFormat::JsonLines).into_stream())
    }

    async fn list_models(&self, config: &ResolvedConfig) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}?endpoint=chat", config.endpoint(&config.models_path));
        let raw = self.transport.get(&url, &request_headers(config)).await?;

        if raw.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        let response: ModelsResponse = serde_json::from_slice(&raw)?;

        Ok(response
            .models
            .iter()
            .map(|m| format_model_entry(&m.name, &config.model))
            .collect())
    }

    fn name(&self) -> &str {
        "Cohere"
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    chat_history: Vec<ChatMessage<'a>>,
    temperature: f64,
    p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    message: &'a str,
}

impl<'a> TryFrom<&'a Message> for ChatMessage<'a> {
    type Error = ProviderError;

    fn try_from(msg: &'a Message) -> Result<Self, Self::Error> {
        Ok(Self {
            role: cohere_role(&msg.role)?,
            message: &msg.content,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    meta: Option<ResponseMeta>,
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    #[serde(default)]
    billed_units: Option<BilledUnits>,
}

/// Cohere reports billed units as numbers that may carry a fraction.
#[derive(Debug, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: f64,
    #[serde(default)]
    output_tokens: f64,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelData>,
}

#[derive(Debug, Deserialize)]
struct ModelData {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::FakeTransport;
    use futures::StreamExt;

    fn config() -> ResolvedConfig {
        ResolvedConfig {
            api_key: Some("co-test".to_string()),
            ..crate::config::default_config("cohere")
        }
    }

    #[tokio::test]
    async fn test_generate_maps_roles_and_usage() {
        let transport = Arc::new(FakeTransport::with_body(
            r#"{"response_id":"r","text":"Bonjour","generation_id":"g","meta":{"billed_units":{"input_tokens":12,"output_tokens":3}}}"#,
        ));
        let history = vec![
            Message::system("system prompt"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("translate"),
        ];

        let completion = CohereProvider::new(transport.clone())
            .generate(&history, &config())
            .await
            .unwrap();
        assert_eq!(completion, Completion::new("Bonjour", 15));

        let request = transport.last_request();
        assert_eq!(request.url, "https://api.cohere.com/v1/chat");
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer co-test".to_string())));

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["model"], "command-r");
        assert_eq!(body["message"], "translate");
        assert_eq!(body["p"], 1.0);
        assert_eq!(body["stream"], false);
        assert_eq!(
            body["chat_history"],
            serde_json::json!([
                {"role": "SYSTEM", "message": "system prompt"},
                {"role": "USER", "message": "hi"},
                {"role": "CHATBOT", "message": "hello"}
            ])
        );
    }

    #[tokio::test]
    async fn test_unknown_role_fails_before_sending() {
        let transport = Arc::new(FakeTransport::with_body(r#"{"text":"unused"}"#));
        let history = vec![
            Message::system("s"),
            Message::new(Role::from("tool"), "output"),
            Message::user("q"),
        ];

        let err = CohereProvider::new(transport.clone())
            .generate(&history, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownRole(ref r) if r == "tool"));
        assert_eq!(err.to_string(), "unknown role: tool");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_empty_response() {
        let transport = Arc::new(FakeTransport::with_body(""));
        let err = CohereProvider::new(transport)
            .generate(&[Message::user("q")], &config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_stream_decodes_json_lines() {
        let transport = Arc::new(FakeTransport::with_body(concat!(
            "{\"event_type\":\"stream-start\",\"generation_id\":\"g\"}\n",
            "{\"event_type\":\"text-generation\",\"text\":\"Hel\"}\n",
            "{\"event_type\":\"text-generation\",\"text\":\"lo\"}\n",
            "{\"event_type\":\"stream-end\",\"finish_reason\":\"COMPLETE\"}\n",
        )));

        let fragments: Vec<String> = CohereProvider::new(transport.clone())
            .stream(&[Message::system("s"), Message::user("q")], &config())
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments.concat(), "Hello");

        let body: serde_json::Value = serde_json::from_slice(&transport.last_request().body).unwrap();
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn test_list_models_keeps_api_order() {
        let transport = Arc::new(FakeTransport::with_body(
            r#"{"models":[{"name":"command-r-plus","endpoints":["chat"]},{"name":"command-r"},{"name":"command-light"}]}"#,
        ));

        let models = CohereProvider::new(transport.clone())
            .list_models(&config())
            .await
            .unwrap();
        assert_eq!(
            models,
            vec!["- command-r-plus", "* command-r (current)", "- command-light"]
        );
        assert_eq!(
            transport.last_request().url,
            "https://api.cohere.com/v1/models?endpoint=chat"
        );
    }
}
