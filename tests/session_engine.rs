// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests of the session engine against the real providers and
//! file history store, with canned HTTP bodies in place of the network.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncRead, BufReader, ReadBuf};

use parley::config::{default_config, ResolvedConfig};
use parley::history::{FileHistoryStore, HistoryStore};
use parley::providers::{create_provider, ByteStream, Headers, Transport};
use parley::session::SessionEngine;
use parley::telemetry::{init_telemetry, TelemetryConfig};
use parley::types::{HistoryEntry, Message, Role};
use parley::{ProviderError, SessionError};

enum Reply {
    Body(&'static str),
    /// Stream body that fails with a read error after the given bytes.
    FailingStream(&'static str),
}

/// Hands out queued replies in order and records request bodies.
#[derive(Default)]
struct QueuedTransport {
    replies: Mutex<VecDeque<Reply>>,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl QueuedTransport {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    fn next(&self, body: &[u8]) -> Reply {
        if !body.is_empty() {
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_slice(body).unwrap());
        }
        self.replies.lock().unwrap().pop_front().expect("unexpected request")
    }

    fn sent_messages(&self, request: usize) -> Vec<(String, String)> {
        self.bodies.lock().unwrap()[request]["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| {
                (
                    m["role"].as_str().unwrap().to_string(),
                    m["content"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }
}

/// Reader that yields its bytes and then a connection error.
struct FailAfter {
    data: Cursor<Vec<u8>>,
}

impl AsyncRead for FailAfter {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = std::pin::Pin::new(&mut self.data).poll_read(cx, buf);
        if buf.filled().len() == before {
            return std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        poll
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    async fn get(&self, _url: &str, _headers: &Headers) -> Result<Vec<u8>, ProviderError> {
        match self.next(&[]) {
            Reply::Body(body) => Ok(body.as_bytes().to_vec()),
            Reply::FailingStream(_) => Err(ProviderError::Network("reset".to_string())),
        }
    }

    async fn post(
        &self,
        _url: &str,
        _headers: &Headers,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, ProviderError> {
        match self.next(&body) {
            Reply::Body(body) => Ok(body.as_bytes().to_vec()),
            Reply::FailingStream(_) => Err(ProviderError::Network("reset".to_string())),
        }
    }

    async fn post_stream(
        &self,
        _url: &str,
        _headers: &Headers,
        body: Vec<u8>,
    ) -> Result<ByteStream, ProviderError> {
        Ok(match self.next(&body) {
            Reply::Body(body) => Box::new(BufReader::new(Cursor::new(body.as_bytes().to_vec()))),
            Reply::FailingStream(body) => Box::new(BufReader::new(FailAfter {
                data: Cursor::new(body.as_bytes().to_vec()),
            })),
        })
    }
}

const STREAM_FIXTURE: &str = r#"data: {"id":"id-1","object":"chat.completion.chunk","created":1,"model":"model-1","choices":[{"delta":{"role":"assistant"},"index":0,"finish_reason":null}]}

data: {"id":"id-2","object":"chat.completion.chunk","created":2,"model":"model-1","choices":[{"delta":{"content":"a"},"index":0,"finish_reason":null}]}

data: {"id":"id-3","object":"chat.completion.chunk","created":3,"model":"model-1","choices":[{"delta":{"content":" b"},"index":0,"finish_reason":null}]}

data: {"id":"id-4","object":"chat.completion.chunk","created":4,"model":"model-1","choices":[{"delta":{"content":" c"},"index":0,"finish_reason":null}]}

data: {"id":"id-5","object":"chat.completion.chunk","created":5,"model":"model-1","choices":[{"delta":{},"index":0,"finish_reason":"stop"}]}

data: [DONE]
"#;

const COMPLETION: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Rust is a systems language."},"finish_reason":"stop","index":0}],"usage":{"prompt_tokens":20,"completion_tokens":6,"total_tokens":26}}"#;

fn test_config() -> ResolvedConfig {
    let _ = init_telemetry(&TelemetryConfig::testing());
    ResolvedConfig {
        api_key: Some("sk-test".to_string()),
        thread: "integration".to_string(),
        ..default_config("openai")
    }
}

fn engine_with(
    transport: Arc<QueuedTransport>,
    dir: &TempDir,
    config: ResolvedConfig,
) -> SessionEngine {
    let provider = create_provider(&config, transport).unwrap();
    let store = FileHistoryStore::open_at(dir.path(), &config.thread).unwrap();
    SessionEngine::new(provider, Box::new(store), config)
}

#[tokio::test]
async fn test_query_persists_and_next_session_reads_it_back() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body(COMPLETION), Reply::Body(COMPLETION)]);

    let mut first = engine_with(transport.clone(), &dir, test_config());
    let completion = first.query("What is Rust?").await.unwrap();
    assert_eq!(completion.text, "Rust is a systems language.");
    assert_eq!(completion.usage, 26);

    let store = FileHistoryStore::open_at(dir.path(), "integration").unwrap();
    let persisted = store.read().unwrap();
    assert_eq!(persisted, first.history());
    assert!(persisted.iter().skip(1).all(|entry| entry.timestamp.is_some()));

    let mut second = engine_with(transport.clone(), &dir, test_config());
    second.query("And Go?").await.unwrap();

    assert_eq!(
        transport.sent_messages(1),
        vec![
            ("system".to_string(), "You are a helpful assistant.".to_string()),
            ("user".to_string(), "What is Rust?".to_string()),
            ("assistant".to_string(), "Rust is a systems language.".to_string()),
            ("user".to_string(), "And Go?".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_stream_writes_fragments_and_persists_reply() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body(STREAM_FIXTURE)]);
    let mut engine = engine_with(transport.clone(), &dir, test_config());
    let mut out = Vec::new();

    let reply = engine.stream("say a b c", &mut out).await.unwrap();

    assert_eq!(reply, "a b c");
    assert_eq!(String::from_utf8(out).unwrap(), "a b c\n");
    assert_eq!(transport.bodies.lock().unwrap()[0]["stream"], true);

    let persisted = FileHistoryStore::open_at(dir.path(), "integration")
        .unwrap()
        .read()
        .unwrap();
    let last = persisted.last().unwrap();
    assert_eq!(last.message, Message::assistant("a b c"));
}

#[tokio::test]
async fn test_malformed_stream_degrades_to_error_fragment() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body("data: {\"invalid\":\"json\"\n")]);
    let mut engine = engine_with(transport, &dir, test_config());
    let mut out = Vec::new();

    let reply = engine.stream("hi", &mut out).await.unwrap();

    assert_eq!(reply, "Error: unexpected end of JSON input\n");
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Error: unexpected end of JSON input\n\n"
    );
}

#[tokio::test]
async fn test_mid_stream_failure_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::FailingStream(
        "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n",
    )]);
    let mut engine = engine_with(transport, &dir, test_config());
    let mut out = Vec::new();

    let err = engine.stream("hi", &mut out).await.unwrap_err();

    assert!(matches!(err, SessionError::Provider(ProviderError::Network(_))));
    assert_eq!(String::from_utf8(out).unwrap(), "partial");
    assert_eq!(engine.history().len(), 1);
    assert!(FileHistoryStore::open_at(dir.path(), "integration")
        .unwrap()
        .read()
        .is_err());
}

#[tokio::test]
async fn test_empty_and_no_choice_replies_fail() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body(""), Reply::Body(r#"{"choices":[]}"#)]);
    let mut engine = engine_with(transport, &dir, test_config());

    let err = engine.query("one").await.unwrap_err();
    assert_eq!(err.to_string(), "empty response");

    let err = engine.query("two").await.unwrap_err();
    assert_eq!(err.to_string(), "no responses returned");

    // failed exchanges leave only the system message behind
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.history()[0].message.role, Role::System);
}

#[tokio::test]
async fn test_omit_history_neither_reads_nor_writes() {
    let dir = TempDir::new().unwrap();
    let mut seeded = FileHistoryStore::open_at(dir.path(), "integration").unwrap();
    seeded
        .write(&[HistoryEntry::new(Message::user("old question"))])
        .unwrap();

    let transport = QueuedTransport::new(vec![Reply::Body(COMPLETION)]);
    let config = ResolvedConfig {
        omit_history: true,
        ..test_config()
    };
    let mut engine = engine_with(transport.clone(), &dir, config);
    engine.query("fresh").await.unwrap();

    assert_eq!(transport.sent_messages(0).len(), 2);
    assert_eq!(seeded.read().unwrap().len(), 1);
}

#[tokio::test]
async fn test_piped_context_precedes_query() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body(COMPLETION)]);
    let mut engine = engine_with(transport.clone(), &dir, test_config());

    engine.provide_context("fn main() {\n    println!(\"hi\");\n}\n");
    engine.query("explain").await.unwrap();

    let sent = transport.sent_messages(0);
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1], ("user".to_string(), "fn main() { println!(\"hi\"); }".to_string()));
    assert_eq!(sent[2].1, "explain");
}

#[tokio::test]
async fn test_list_models_through_engine() {
    let dir = TempDir::new().unwrap();
    let transport = QueuedTransport::new(vec![Reply::Body(
        r#"{"data":[{"id":"gpt-4o"},{"id":"text-embedding-3-small"},{"id":"gpt-4o-mini"}]}"#,
    )]);
    let engine = engine_with(transport, &dir, test_config());

    assert_eq!(
        engine.list_models().await.unwrap(),
        vec!["* gpt-4o (current)", "- gpt-4o-mini"]
    );
}
