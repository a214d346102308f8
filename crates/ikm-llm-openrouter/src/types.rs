//! `OpenRouter` chat completions request and stream types.
//!
//! These types mirror the wire format and are not part of the public API.
//! Conversion from `ikm-llm` types happens in [`convert`](crate::convert).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderPreferences;

/// Top-level request body for `POST /api/v1/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a ProviderPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    pub stream: bool,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool<'a>>>,
    pub usage: UsageRequest,
}

/// One history entry in chat-completions form.
#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Message content: either a plain string or an array of typed parts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// User and system content parts.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum ContentPart {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    #[serde(rename = "file")]
    File { file: FileData },
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

/// Image by URL or data URL.
#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

/// Inline file.
#[derive(Debug, Serialize)]
pub(crate) struct FileData {
    pub filename: String,
    pub file_data: String,
}

/// A call replayed on an assistant entry.
#[derive(Debug, Serialize)]
pub(crate) struct ToolCallRequest {
    pub index: u32,
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: &'static str,
    pub function: FunctionCallRequest,
}

/// Name and raw argument string of a replayed call.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionCallRequest {
    pub name: String,
    pub arguments: String,
}

/// `{type: "function", function: {...}}` wrapper.
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionDef<'a>,
}

/// Borrowed view of a [`ToolSpec`](ikm_llm::tool::ToolSpec).
#[derive(Debug, Serialize)]
pub(crate) struct FunctionDef<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

/// Reasoning effort request.
#[derive(Debug, Serialize)]
pub(crate) struct Reasoning {
    pub effort: &'static str,
}

/// Asks for usage and cost in the stream.
#[derive(Debug, Serialize)]
pub(crate) struct UsageRequest {
    pub include: bool,
}

/// One `data:` payload. Usage and errors ride along with any chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    pub usage: Option<StreamUsage>,
    pub error: Option<StreamErrorDetail>,
}

/// Only the first choice is read.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    pub delta: Option<StreamDelta>,
}

/// Delta content in a streaming chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<StreamToolCall>>,
}

/// A tool-call fragment, keyed by `index`.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamToolCall {
    #[serde(default)]
    pub index: i64,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub call_type: Option<String>,
    pub function: Option<StreamFunction>,
}

/// Function fragment within a streaming tool call.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Usage and cost, reported inline.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub cost: f64,
}

/// An in-band error. `code` may be a number or a string.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamErrorDetail {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub message: String,
    pub metadata: Option<Value>,
}
