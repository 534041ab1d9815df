// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP transport used by the providers.
//!
//! Providers only build URLs, headers and JSON bodies; the [`Transport`]
//! issues the request, turns non-2xx statuses into
//! [`ProviderError::Http`] and hands back either the whole body or a
//! buffered reader over the live body.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;

/// Live response body, read line by line by the stream decoder.
pub type ByteStream = Box<dyn AsyncBufRead + Send + Unpin>;

/// Header name/value pairs sent with a request.
pub type Headers = Vec<(String, String)>;

/// Issues HTTP requests on behalf of a provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the full body.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Vec<u8>, ProviderError>;

    /// POST `body` to `url` and return the full response body.
    async fn post(&self, url: &str, headers: &Headers, body: Vec<u8>)
        -> Result<Vec<u8>, ProviderError>;

    /// POST `body` to `url` and return the response body as it arrives.
    async fn post_stream(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<ByteStream, ProviderError>;
}

/// Headers for a request under `config`: JSON content type plus the auth
/// header when an API key is set.
pub fn request_headers(config: &ResolvedConfig) -> Headers {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(ref key) = config.api_key {
        headers.push((
            config.auth_header.clone(),
            format!("{}{}", config.auth_token_prefix, key),
        ));
    }
    headers
}

/// Connect and read limits for a [`ReqwestTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole-request deadline for `get` and `post`.
    pub request: Duration,
    /// Time allowed to establish a connection.
    pub connect: Duration,
    /// Longest idle gap between body chunks of a stream. Streams have no
    /// whole-request deadline.
    pub stream_idle: Duration,
}

impl Timeouts {
    /// Every limit set to `timeout_ms`.
    pub fn from_millis(timeout_ms: u64) -> Self {
        let timeout = Duration::from_millis(timeout_ms);
        Self {
            request: timeout,
            connect: timeout,
            stream_idle: timeout,
        }
    }
}

/// [`Transport`] backed by `reqwest` clients.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    stream_client: Client,
    timeouts: Timeouts,
}

impl ReqwestTransport {
    /// Create a transport whose limits are all `timeout_ms`.
    pub fn new(timeout_ms: u64) -> Result<Self, ProviderError> {
        Self::with_timeouts(Timeouts::from_millis(timeout_ms))
    }

    pub fn with_timeouts(timeouts: Timeouts) -> Result<Self, ProviderError> {
        let build_error = |e: reqwest::Error| ProviderError::Network(e.to_string());

        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(build_error)?;
        let stream_client = Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.stream_idle)
            .build()
            .map_err(build_error)?;

        Ok(Self {
            client,
            stream_client,
            timeouts,
        })
    }

    /// Create a transport from resolved configuration.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, ProviderError> {
        Self::new(config.timeout_ms)
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> Result<Response, ProviderError> {
        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name.as_str(), value.as_str()));

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(response)
    }

    async fn read_body(response: Response) -> Result<Vec<u8>, ProviderError> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ProviderError::Network(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Vec<u8>, ProviderError> {
        debug!(url, "GET");
        let response = self.send(self.client.get(url), headers).await?;
        Self::read_body(response).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, ProviderError> {
        debug!(url, bytes = body.len(), "POST");
        let response = self.send(self.client.post(url).body(body), headers).await?;
        Self::read_body(response).await
    }

    async fn post_stream(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<ByteStream, ProviderError> {
        debug!(url, bytes = body.len(), "POST (streaming)");
        let response = self
            .send(self.stream_client.post(url).body(body), headers)
            .await?;

        let byte_stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = BufReader::new(StreamReader::new(Box::pin(byte_stream)));
        Ok(Box::new(reader))
    }
}

/// Error body shapes used by the supported APIs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiError {
    Nested { error: ApiErrorDetail },
    Flat { message: String },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    ProviderError::http(status.as_u16(), error_message(body, status.canonical_reason()))
}

/// Message for a non-2xx response: the API's own error message, else the
/// raw body, else the reason phrase.
fn error_message(body: &str, reason: Option<&str>) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError::Nested { error }) => error.message,
        Ok(ApiError::Flat { message }) => message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => reason.unwrap_or("unknown error").to_string(),
    }
}
