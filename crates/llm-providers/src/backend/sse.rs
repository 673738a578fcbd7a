//! SSE decoding for `/v1/chat/completions` streams
//!
//! All parser state (partial-line buffer, tool-call accumulator) lives in the
//! returned stream, so concurrent streams on one adapter never share it. The
//! response body is owned by the stream too: it is released when the stream
//! ends, errors, is cancelled, or is dropped early.

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::chat_wire::{error_message, parse_arguments, ChatCompletionChunk, ToolCallDelta};
use super::tool_repair::new_call_id;
use super::{ChunkStream, ProviderError};
use crate::types::{Part, Role, StopReason, StreamChunk, Turn};

/// Tool-call fragments collected across deltas, keyed by call index
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<u32, PendingCall>,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn absorb(&mut self, deltas: Vec<ToolCallDelta>) {
        for delta in deltas {
            let pending = self.calls.entry(delta.index).or_default();
            if delta.id.is_some() {
                pending.id = delta.id;
            }
            let Some(function) = delta.function else {
                continue;
            };
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                pending.name = name;
            }
            match function.arguments {
                Some(Value::String(fragment)) => pending.arguments.push_str(&fragment),
                Some(Value::Null) | None => {}
                Some(whole) => pending.arguments = whole.to_string(),
            }
        }
    }

    /// Drain accumulated calls into function-call parts
    fn finish(&mut self) -> Result<Vec<Part>, ProviderError> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|call| {
                let args = parse_arguments(&call.name, Value::String(call.arguments))?;
                Ok(Part::FunctionCall {
                    id: Some(call.id.unwrap_or_else(new_call_id)),
                    name: call.name,
                    args,
                })
            })
            .collect()
    }
}

enum Read<B> {
    Bytes(B),
    End,
    Cancelled,
    Failed(reqwest::Error),
}

struct SseState<S> {
    provider: &'static str,
    body: Pin<Box<S>>,
    cancel: Option<CancellationToken>,
    buffer: Vec<u8>,
    tool_calls: ToolCallAccumulator,
    body_finished: bool,
    terminated: bool,
}

impl<S, B> SseState<S>
where
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]>,
{
    async fn next_item(&mut self) -> Option<Result<StreamChunk, ProviderError>> {
        loop {
            if self.terminated {
                return None;
            }
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                log::debug!("{} stream cancelled", self.provider);
                return None;
            }

            if let Some(line) = self.take_line() {
                if let Some(item) = self.process_line(&line) {
                    return Some(item);
                }
                continue;
            }

            if self.body_finished {
                self.terminated = true;
                if !self.buffer.is_empty() {
                    let rest = std::mem::take(&mut self.buffer);
                    let line = String::from_utf8_lossy(&rest).into_owned();
                    if let Some(item) = self.process_line(&line) {
                        return Some(item);
                    }
                }
                return self.flush_unfinished_calls();
            }

            match self.read().await {
                Read::Bytes(bytes) => self.buffer.extend_from_slice(bytes.as_ref()),
                Read::End => self.body_finished = true,
                Read::Cancelled => {
                    log::debug!("{} stream cancelled", self.provider);
                    return None;
                }
                Read::Failed(e) => {
                    self.terminated = true;
                    return Some(Err(ProviderError::Http(e)));
                }
            }
        }
    }

    async fn read(&mut self) -> Read<B> {
        let next = self.body.next();
        let result = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Read::Cancelled,
                result = next => result,
            },
            None => next.await,
        };
        match result {
            Some(Ok(bytes)) => Read::Bytes(bytes),
            Some(Err(e)) => Read::Failed(e),
            None => Read::End,
        }
    }

    /// Pop one complete line off the buffer
    fn take_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
        let line = String::from_utf8_lossy(&raw[..newline]);
        Some(line.trim_end_matches('\r').to_string())
    }

    /// Decode one SSE line; `None` means the line yields nothing
    fn process_line(&mut self, line: &str) -> Option<Result<StreamChunk, ProviderError>> {
        let data = line.strip_prefix("data:")?.trim();
        if data.is_empty() {
            return None;
        }
        if data == "[DONE]" {
            self.terminated = true;
            return self.flush_unfinished_calls();
        }

        match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(mut chunk) => match chunk.error.take() {
                Some(error) => {
                    self.terminated = true;
                    let message = error_message(&error);
                    log::warn!("{} stream failed: {}", self.provider, message);
                    Some(Err(ProviderError::StreamFailed {
                        provider: self.provider.to_string(),
                        message,
                    }))
                }
                None => Some(self.convert_chunk(chunk)),
            },
            Err(e) => {
                log::debug!("{}: skipping malformed stream line: {}", self.provider, e);
                None
            }
        }
    }

    fn convert_chunk(&mut self, chunk: ChatCompletionChunk) -> Result<StreamChunk, ProviderError> {
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(delta_chunk(vec![Part::text("")], None, 0));
        };

        if let Some(deltas) = choice.delta.tool_calls {
            self.tool_calls.absorb(deltas);
        }

        let stop_reason = choice
            .finish_reason
            .as_deref()
            .map(StopReason::from_finish_reason);

        let mut parts = vec![Part::text(choice.delta.content.unwrap_or_default())];
        if stop_reason.is_some() && !self.tool_calls.is_empty() {
            let calls = self.tool_calls.finish()?;
            if parts[0].as_text() == Some("") {
                parts.clear();
            }
            parts.extend(calls);
        }

        Ok(delta_chunk(parts, stop_reason, choice.index))
    }

    /// Emit calls that never saw a `finish_reason`
    fn flush_unfinished_calls(&mut self) -> Option<Result<StreamChunk, ProviderError>> {
        if self.tool_calls.is_empty() {
            return None;
        }
        Some(
            self.tool_calls
                .finish()
                .map(|calls| delta_chunk(calls, Some(StopReason::Stop), 0)),
        )
    }
}

fn delta_chunk(parts: Vec<Part>, stop_reason: Option<StopReason>, index: u32) -> StreamChunk {
    StreamChunk {
        output_turn: Turn::new(Role::Assistant, parts),
        stop_reason,
        index,
    }
}

/// Turn a chat-completions SSE body into a [`ChunkStream`]
pub(crate) fn decode_sse<S, B>(
    provider: &'static str,
    body: S,
    cancel: Option<CancellationToken>,
) -> ChunkStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        provider,
        body: Box::pin(body),
        cancel,
        buffer: Vec::new(),
        tool_calls: ToolCallAccumulator::default(),
        body_finished: false,
        terminated: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        let item = state.next_item().await?;
        Some((item, state))
    }))
}

/// Decode a streaming HTTP response
pub(crate) fn decode_response(
    provider: &'static str,
    response: reqwest::Response,
    cancel: Option<CancellationToken>,
) -> ChunkStream {
    decode_sse(provider, response.bytes_stream(), cancel)
}
