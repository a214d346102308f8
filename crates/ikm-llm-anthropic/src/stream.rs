//! SSE frame parser for the Anthropic Messages API.
//!
//! Frames are dispatched on their `event:` name, falling back to the
//! payload's `type` field. Tool-use blocks are buffered per content block
//! and released, after usage, on `message_stop`.

use std::collections::HashMap;
use std::ops::ControlFlow;

use ikm_llm::cost::{PricingTable, TokenCounts};
use ikm_llm::error::{LlmError, StreamError};
use ikm_llm::event::{Event, ThinkingDelta};
use ikm_llm::usage::Usage;
use ikm_llm::wire::{SseFrame, ToolCallBuffer};
use tracing::warn;

use crate::types::{ErrorDetail, ResponseUsage, StreamResponse};

/// Maximum number of tool-use blocks buffered in one turn.
pub(crate) const TOOL_CALL_SLOTS: usize = 32;

/// Per-turn parser state.
#[derive(Debug)]
pub struct StreamState {
    usage: Option<ResponseUsage>,
    tools: ToolCallBuffer,
    /// Content block index to buffer slot.
    blocks: HashMap<u32, usize>,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            usage: None,
            tools: ToolCallBuffer::new(TOOL_CALL_SLOTS),
            blocks: HashMap::new(),
        }
    }
}

/// Parse one frame into `out`. Returns `Break` on `message_stop`, on an
/// in-band error, or when buffering a tool call fails.
pub(crate) fn parse_frame(
    frame: &SseFrame,
    state: &mut StreamState,
    pricing: &PricingTable,
    model: &str,
    out: &mut Vec<Event>,
) -> ControlFlow<()> {
    let mut response: StreamResponse = match serde_json::from_str(&frame.data) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "skipping unparseable Anthropic frame");
            return ControlFlow::Continue(());
        }
    };
    let kind = frame
        .event
        .clone()
        .unwrap_or_else(|| std::mem::take(&mut response.event_type));

    match kind.as_str() {
        "message_start" => {
            state.usage = response.message.and_then(|m| m.usage);
        }
        "content_block_start" => {
            if let Err(err) = handle_block_start(&response, state) {
                out.push(Event::Error(err));
                return ControlFlow::Break(());
            }
        }
        "content_block_delta" => {
            if let Err(err) = handle_block_delta(response, state, out) {
                out.push(Event::Error(err));
                return ControlFlow::Break(());
            }
        }
        "message_delta" => {
            if let Some(delta) = response.usage {
                let usage = state.usage.get_or_insert_with(ResponseUsage::default);
                usage.output_tokens = usage.output_tokens.saturating_add(delta.output_tokens);
            }
        }
        "message_stop" => {
            if let Some(usage) = state.usage.take() {
                out.push(Event::Usage(convert_usage(&usage, pricing, model)));
            }
            out.extend(state.tools.flush());
            return ControlFlow::Break(());
        }
        "error" => {
            let detail = response.error.unwrap_or_else(|| ErrorDetail {
                error_type: "unknown".into(),
                message: frame.data.clone(),
            });
            out.push(Event::Error(
                StreamError::new(detail.error_type, detail.message).into(),
            ));
            return ControlFlow::Break(());
        }
        "content_block_stop" | "ping" => {}
        other => warn!(event = other, "ignoring unknown Anthropic event"),
    }
    ControlFlow::Continue(())
}

/// Releases any buffered tool calls when the body ends early.
pub(crate) fn finish(state: &mut StreamState, out: &mut Vec<Event>) {
    out.extend(state.tools.flush());
}

fn handle_block_start(response: &StreamResponse, state: &mut StreamState) -> Result<(), LlmError> {
    let (Some(index), Some(block)) = (response.index, &response.content_block) else {
        return Ok(());
    };
    if block.block_type != "tool_use" {
        return Ok(());
    }
    let slot = state.tools.open(
        block.id.as_deref().unwrap_or_default(),
        block.name.as_deref().unwrap_or_default(),
    )?;
    state.blocks.insert(index, slot);
    Ok(())
}

fn handle_block_delta(
    response: StreamResponse,
    state: &mut StreamState,
    out: &mut Vec<Event>,
) -> Result<(), LlmError> {
    let Some(delta) = response.delta else {
        return Ok(());
    };
    match delta.delta_type.as_deref() {
        Some("text_delta") => {
            if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                out.push(Event::ContentDelta(text));
            }
        }
        Some("thinking_delta") => {
            if let Some(text) = delta.thinking.filter(|t| !t.is_empty()) {
                out.push(Event::ThinkingDelta(ThinkingDelta::Text(text)));
            }
        }
        Some("signature_delta") => {
            if let Some(signature) = delta.signature.filter(|s| !s.is_empty()) {
                out.push(Event::ThinkingDelta(ThinkingDelta::Signature(signature)));
            }
        }
        Some("input_json_delta") => {
            let Some(partial_json) = delta.partial_json else {
                return Ok(());
            };
            let slot = response
                .index
                .and_then(|index| state.blocks.get(&index).copied())
                .ok_or_else(|| {
                    LlmError::Protocol(format!(
                        "input_json_delta for unknown content block {:?}",
                        response.index
                    ))
                })?;
            state.tools.append(slot, &partial_json)?;
        }
        _ => {}
    }
    Ok(())
}

/// Prompt tokens include cache reads and writes; the cost is the cached
/// estimate.
fn convert_usage(usage: &ResponseUsage, pricing: &PricingTable, model: &str) -> Usage {
    let estimate = pricing.estimate(
        model,
        &TokenCounts {
            input: usage.input_tokens,
            cache_read: usage.cache_read_input_tokens,
            cache_write: usage.cache_creation_input_tokens,
            output: usage.output_tokens,
        },
    );
    Usage::new(
        usage
            .input_tokens
            .saturating_add(usage.cache_creation_input_tokens)
            .saturating_add(usage.cache_read_input_tokens),
        usage.output_tokens,
        estimate.with_cache,
    )
}
