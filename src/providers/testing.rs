// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recording transport for provider tests.

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::BufReader;

use crate::error::ProviderError;

use super::transport::{ByteStream, Headers, Transport};

/// A request seen by [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Returns the same canned body for every call, or a one-shot error.
#[derive(Debug, Default)]
pub struct FakeTransport {
    body: Vec<u8>,
    error: Mutex<Option<ProviderError>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: body.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    pub fn with_error(error: ProviderError) -> Self {
        Self {
            error: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn respond(&self, url: &str, headers: &Headers, body: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
        match self.error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(self.body.clone()),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Vec<u8>, ProviderError> {
        self.respond(url, headers, Vec::new())
    }

    async fn post(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, ProviderError> {
        self.respond(url, headers, body)
    }

    async fn post_stream(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<ByteStream, ProviderError> {
        let bytes = self.respond(url, headers, body)?;
        Ok(Box::new(BufReader::new(Cursor::new(bytes))))
    }
}
