//! Anthropic Messages API request and stream types.
//!
//! Serde shapes for the request body and the SSE payloads. They stay
//! crate-private; [`convert`](crate::convert) and [`stream`](crate::stream)
//! translate to and from the core model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a streaming `/v1/messages` call.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
}

/// One wire turn; tool results travel as `user` turns.
#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    pub content: Vec<ContentBlock>,
}

/// Marks the end of a cacheable prompt prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct CacheControl {
    #[serde(rename = "type")]
    pub control_type: &'static str,
}

impl CacheControl {
    pub const EPHEMERAL: Self = Self {
        control_type: "ephemeral",
    };
}

/// Typed block inside a wire turn.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "thinking")]
    Thinking { thinking: String, signature: String },
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

/// Advertised tool, borrowed from a [`ToolSpec`](ikm_llm::tool::ToolSpec).
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub input_schema: &'a Value,
}

/// `thinking: {type: "enabled", budget_tokens}`.
#[derive(Debug, Serialize)]
pub(crate) struct ThinkingConfig {
    #[serde(rename = "type")]
    pub thinking_type: &'static str,
    pub budget_tokens: u32,
}

/// Union of every SSE payload shape; unused fields stay `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamResponse {
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// Block position, on `content_block_*` payloads.
    pub index: Option<u32>,
    /// Opened block, on `content_block_start`.
    pub content_block: Option<StreamContentBlock>,
    /// Block or message delta.
    pub delta: Option<StreamDelta>,
    /// Carries the opening usage on `message_start`.
    pub message: Option<StreamMessage>,
    /// Output-token increment on `message_delta`.
    pub usage: Option<ResponseUsage>,
    /// Payload of an `error` event.
    pub error: Option<ErrorDetail>,
}

/// The block announced by `content_block_start`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// `text_delta`, `thinking_delta`, `signature_delta` or `input_json_delta`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(rename = "type")]
    pub delta_type: Option<String>,
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub signature: Option<String>,
    pub partial_json: Option<String>,
}

/// The `message` object of `message_start`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamMessage {
    pub usage: Option<ResponseUsage>,
}

/// Raw token counts, cache reads and writes included.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// `{type, message}` of an in-band error.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_omits_optional_fields() {
        let req = Request {
            model: "claude-sonnet-4-20250514",
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock::Text {
                    text: "Hello".into(),
                    cache_control: None,
                }],
            }],
            max_tokens: 1024,
            temperature: 1.0,
            system: None,
            stream: true,
            tools: None,
            thinking: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["stream"], true);
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
        assert!(json["messages"][0]["content"][0].get("cache_control").is_none());
    }

    #[test]
    fn test_cache_control_serialization() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "ok".into(),
            cache_control: Some(CacheControl::EPHEMERAL),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["cache_control"]["type"], "ephemeral");
    }

    #[test]
    fn test_message_delta_usage_defaults() {
        let event: StreamResponse = serde_json::from_str(
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":15}}"#,
        )
        .unwrap();
        let usage = event.usage.unwrap();
        assert_eq!(usage.output_tokens, 15);
        assert_eq!(usage.input_tokens, 0);
    }
}
