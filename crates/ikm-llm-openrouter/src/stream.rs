//! SSE chunk parser for the chat completions API.
//!
//! Frames here are unnamed; every `data:` line is a JSON chunk except the
//! `[DONE]` sentinel. Tool calls arrive as fragments keyed by `index`.

use std::ops::ControlFlow;

use ikm_llm::error::{LlmError, StreamError};
use ikm_llm::event::Event;
use ikm_llm::usage::Usage;
use ikm_llm::wire::{SseFrame, ToolCallBuffer};
use serde_json::Value;
use tracing::warn;

use crate::types::{StreamChunk, StreamErrorDetail, StreamToolCall};

/// Maximum number of parallel tool calls in one turn.
pub(crate) const TOOL_CALL_SLOTS: usize = 10;

const DONE: &str = "[DONE]";

/// Per-turn parser state.
#[derive(Debug)]
pub struct StreamState {
    tools: ToolCallBuffer,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            tools: ToolCallBuffer::new(TOOL_CALL_SLOTS),
        }
    }
}

/// Parse one frame into `out`. Returns `Break` on `[DONE]`, on an in-band
/// error, or on a tool-call fragment the buffer rejects.
pub(crate) fn parse_frame(
    frame: &SseFrame,
    state: &mut StreamState,
    out: &mut Vec<Event>,
) -> ControlFlow<()> {
    let data = frame.data.trim();
    if data == DONE {
        out.extend(state.tools.flush());
        return ControlFlow::Break(());
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!(error = %e, "skipping unparseable OpenRouter chunk");
            return ControlFlow::Continue(());
        }
    };

    if let Some(error) = chunk.error {
        out.push(Event::Error(stream_error(error).into()));
        return ControlFlow::Break(());
    }

    if let Some(usage) = chunk.usage {
        out.push(Event::Usage(Usage::new(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.cost,
        )));
    }

    let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
        return ControlFlow::Continue(());
    };

    if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
        out.push(Event::ContentDelta(content));
    }

    for call in delta.tool_calls.unwrap_or_default() {
        if let Err(err) = buffer_fragment(&mut state.tools, call) {
            out.push(Event::Error(err));
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Releases any buffered calls when the body ends without `[DONE]`.
pub(crate) fn finish(state: &mut StreamState, out: &mut Vec<Event>) {
    out.extend(state.tools.flush());
}

fn buffer_fragment(tools: &mut ToolCallBuffer, call: StreamToolCall) -> Result<(), LlmError> {
    if let Some(kind) = call.call_type.as_deref() {
        if kind != "function" {
            return Err(LlmError::UnsupportedToolCallType(kind.to_owned()));
        }
    }
    let index = usize::try_from(call.index).map_err(|_| {
        LlmError::Protocol(format!("negative tool call index {}", call.index))
    })?;
    let (name, arguments) = call
        .function
        .map(|f| (f.name, f.arguments))
        .unwrap_or_default();
    tools.upsert(
        index,
        call.id.as_deref().unwrap_or_default(),
        name.as_deref().unwrap_or_default(),
        arguments.as_deref().unwrap_or_default(),
    )
}

fn stream_error(detail: StreamErrorDetail) -> StreamError {
    let code = match detail.code {
        Value::String(code) => code,
        Value::Null => "unknown".to_owned(),
        other => other.to_string(),
    };
    let error = StreamError::new(code, detail.message);
    match detail.metadata {
        Some(metadata) => error.with_metadata(metadata),
        None => error,
    }
}
