//! Conversion from `ikm-llm` messages to Anthropic API types.
//!
//! This module is internal; callers interact only with `ikm-llm` types.

use ikm_llm::chat::{ContentPart, Message as CoreMessage, Role};
use ikm_llm::config::{ReasoningEffort, StreamConfig};
use ikm_llm::error::LlmError;
use ikm_llm::tool::ToolSpec;
use serde_json::Value;

use crate::config::AnthropicConfig;
use crate::types::{CacheControl, ContentBlock, Message, Request, ThinkingConfig, Tool};

// ── Request conversion ───────────────────────────────────────────────

/// Build a streaming Messages API request.
///
/// The system message becomes the top-level `system` field. Cache markers
/// are placed on the converted copy only.
pub(crate) fn build_request<'a>(
    messages: &[CoreMessage],
    tools: &'a [ToolSpec],
    stream_config: &StreamConfig,
    config: &'a AnthropicConfig,
) -> Result<Request<'a>, LlmError> {
    let mut system = None;
    let mut converted = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::System {
            system = Some(message.text());
            continue;
        }
        converted.push(convert_message(message)?);
    }
    inject_cache_control(&mut converted);

    let tools = (!tools.is_empty()).then(|| {
        tools
            .iter()
            .map(|t| Tool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.parameters,
            })
            .collect()
    });
    let thinking = thinking_budget(stream_config.reasoning_effort, stream_config.max_tokens)
        .map(|budget_tokens| ThinkingConfig {
            thinking_type: "enabled",
            budget_tokens,
        });

    Ok(Request {
        model: &config.model,
        messages: converted,
        max_tokens: stream_config.max_tokens,
        temperature: stream_config.temperature,
        system,
        stream: true,
        tools,
        thinking,
    })
}

/// Reasoning budget as a share of `max_tokens`: 20%, 50% or 80%.
pub(crate) fn thinking_budget(effort: ReasoningEffort, max_tokens: u32) -> Option<u32> {
    let share = match effort {
        ReasoningEffort::Off => return None,
        ReasoningEffort::Low => 0.2,
        ReasoningEffort::Medium => 0.5,
        ReasoningEffort::High => 0.8,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let budget = (f64::from(max_tokens) * share).round() as u32;
    Some(budget)
}

/// Convert one canonical message. Tool results become user turns with a
/// single `tool_result` block.
fn convert_message(message: &CoreMessage) -> Result<Message, LlmError> {
    if message.role == Role::Tool {
        return Ok(Message {
            role: "user",
            content: vec![ContentBlock::ToolResult {
                tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                content: message.text(),
                cache_control: None,
            }],
        });
    }

    let mut content = Vec::with_capacity(message.content.len() + message.tool_calls.len());
    for part in &message.content {
        content.push(match part {
            ContentPart::Thinking { text, signature } => ContentBlock::Thinking {
                thinking: text.clone(),
                signature: signature.clone(),
            },
            ContentPart::Text { text } => ContentBlock::Text {
                text: text.clone(),
                cache_control: None,
            },
            ContentPart::Image { .. } | ContentPart::File { .. } => {
                return Err(LlmError::UnsupportedContent(format!(
                    "{} content part is not supported in Anthropic messages",
                    part.kind()
                )));
            }
        });
    }
    for call in &message.tool_calls {
        let arguments = if call.function.arguments.is_empty() {
            "{}"
        } else {
            call.function.arguments.as_str()
        };
        let input: Value = serde_json::from_str(arguments).map_err(|e| {
            LlmError::InvalidRequest(format!(
                "tool call {} has invalid JSON arguments: {e}",
                call.id
            ))
        })?;
        content.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.function.name.clone(),
            input,
        });
    }

    Ok(Message {
        role: match message.role {
            Role::Assistant => "assistant",
            _ => "user",
        },
        content,
    })
}

/// Mark the last user text block and the last user tool result as
/// cacheable.
pub(crate) fn inject_cache_control(messages: &mut [Message]) {
    let last_text = messages
        .iter_mut()
        .rev()
        .filter(|m| m.role == "user")
        .find_map(|m| {
            m.content.iter_mut().rev().find_map(|block| match block {
                ContentBlock::Text { cache_control, .. } => Some(cache_control),
                _ => None,
            })
        });
    if let Some(cache_control) = last_text {
        *cache_control = Some(CacheControl::EPHEMERAL);
    }

    let last_result = messages
        .iter_mut()
        .rev()
        .filter(|m| m.role == "user")
        .find_map(|m| {
            m.content.iter_mut().rev().find_map(|block| match block {
                ContentBlock::ToolResult { cache_control, .. } => Some(cache_control),
                _ => None,
            })
        });
    if let Some(cache_control) = last_result {
        *cache_control = Some(CacheControl::EPHEMERAL);
    }
}
