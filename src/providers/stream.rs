// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Incremental decoding of streamed replies.
//!
//! A [`StreamDecoder`] pulls one line at a time from a live response body and
//! turns it into reply fragments. Two framings are understood:
//!
//! - [`StreamFormat::ServerSentEvents`]: `data: {...}` frames ending with
//!   `data: [DONE]` (OpenAI chat completions)
//! - [`StreamFormat::JsonLines`]: one JSON event per line ending with a
//!   `stream-end` event (Cohere chat)
//!
//! A frame that is not valid UTF-8 or JSON ends the stream with a single
//! `"Error: <message>\n"` fragment instead of an `Err`.

use futures::stream;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::trace;

use crate::error::ProviderError;
use crate::types::FragmentStream;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// Framing of a streamed response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    ServerSentEvents,
    JsonLines,
}

/// Outcome of decoding one line.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Fragment(String),
    Skip,
    Done,
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    AwaitingFrame,
    Finished,
}

/// Forward-only decoder over one response body.
pub struct StreamDecoder<R> {
    reader: R,
    format: StreamFormat,
    line: Vec<u8>,
    state: DecoderState,
}

impl<R> StreamDecoder<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, format: StreamFormat) -> Self {
        Self {
            reader,
            format,
            line: Vec::new(),
            state: DecoderState::AwaitingFrame,
        }
    }

    /// Pull the next fragment. `None` once the stream has ended.
    pub async fn next_fragment(&mut self) -> Option<Result<String, ProviderError>> {
        while self.state == DecoderState::AwaitingFrame {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line).await {
                Ok(0) => self.state = DecoderState::Finished,
                Ok(_) => {
                    let frame = match std::str::from_utf8(&self.line) {
                        Ok(line) => decode_line(self.format, line.trim_end_matches(['\r', '\n'])),
                        Err(e) => Frame::Malformed(e.to_string()),
                    };
                    match frame {
                        Frame::Fragment(text) => return Some(Ok(text)),
                        Frame::Skip => trace!(bytes = self.line.len(), "Skipping stream frame"),
                        Frame::Done => self.state = DecoderState::Finished,
                        Frame::Malformed(message) => {
                            self.state = DecoderState::Finished;
                            return Some(Ok(format!("Error: {}\n", message)));
                        }
                    }
                }
                Err(e) => {
                    self.state = DecoderState::Finished;
                    return Some(Err(ProviderError::Network(e.to_string())));
                }
            }
        }
        None
    }

    /// Convert into a boxed fragment stream.
    pub fn into_stream(self) -> FragmentStream
    where
        R: 'static,
    {
        Box::pin(stream::unfold(self, |mut decoder| async move {
            decoder
                .next_fragment()
                .await
                .map(|fragment| (fragment, decoder))
        }))
    }
}

fn decode_line(format: StreamFormat, line: &str) -> Frame {
    match format {
        StreamFormat::ServerSentEvents => decode_sse_line(line),
        StreamFormat::JsonLines => decode_json_line(line),
    }
}

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

fn decode_sse_line(line: &str) -> Frame {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim() == DONE_MARKER {
        return Frame::Done;
    }
    if payload.trim().is_empty() {
        return Frame::Skip;
    }

    match serde_json::from_str::<ChunkEvent>(payload) {
        Ok(event) => {
            let text: String = event
                .choices
                .into_iter()
                .filter_map(|choice| choice.delta.content)
                .collect();
            if text.is_empty() {
                Frame::Skip
            } else {
                Frame::Fragment(text)
            }
        }
        Err(e) => Frame::Malformed(json_error_message(&e)),
    }
}

#[derive(Debug, Deserialize)]
struct CohereEvent {
    event_type: String,
    #[serde(default)]
    text: Option<String>,
}

fn decode_json_line(line: &str) -> Frame {
    if line.trim().is_empty() {
        return Frame::Skip;
    }

    match serde_json::from_str::<CohereEvent>(line) {
        Ok(event) => match event.event_type.as_str() {
            "text-generation" => match event.text {
                Some(text) if !text.is_empty() => Frame::Fragment(text),
                _ => Frame::Skip,
            },
            "stream-end" => Frame::Done,
            _ => Frame::Skip,
        },
        Err(e) => Frame::Malformed(json_error_message(&e)),
    }
}

/// Text for a JSON parse failure. Input cut off mid-value reads the same
/// regardless of where it stopped.
fn json_error_message(err: &serde_json::Error) -> String {
    if err.is_eof() {
        "unexpected end of JSON input".to_string()
    } else {
        err.to_string()
    }
}
