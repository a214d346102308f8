//! `OpenAI` Responses API request and stream types.
//!
//! These types mirror the Responses wire format and are not part of the
//! public API. Conversion from `ikm-llm` types happens in
//! [`convert`](crate::convert).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level request body for `POST /v1/responses`.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub include: [&'static str; 1],
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub max_output_tokens: u32,
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    pub store: bool,
    pub stream: bool,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

/// One conversation item. Each item carries at most one function call.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum InputItem {
    /// A user turn.
    User {
        role: &'static str,
        content: Vec<InputText>,
    },
    /// A prior assistant message, replayed as a completed output item.
    Assistant {
        id: String,
        #[serde(rename = "type")]
        item_type: &'static str,
        role: &'static str,
        status: &'static str,
        content: Vec<OutputText>,
    },
    /// A prior function call.
    FunctionCall {
        #[serde(rename = "type")]
        item_type: &'static str,
        call_id: String,
        name: String,
        arguments: String,
    },
    /// The output of a function call.
    FunctionCallOutput {
        #[serde(rename = "type")]
        item_type: &'static str,
        call_id: String,
        output: String,
    },
}

/// `input_text` content of a user item.
#[derive(Debug, Serialize)]
pub(crate) struct InputText {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

/// `output_text` content of an assistant item.
#[derive(Debug, Serialize)]
pub(crate) struct OutputText {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
    pub annotations: [Value; 0],
}

/// Reasoning effort request.
#[derive(Debug, Serialize)]
pub(crate) struct Reasoning {
    pub effort: &'static str,
}

/// Function tool definition.
#[derive(Debug, Serialize)]
pub(crate) struct Tool<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

/// The `type` field every stream payload carries.
#[derive(Debug, Deserialize)]
pub(crate) struct EventType {
    #[serde(rename = "type", default)]
    pub event_type: String,
}

/// `response.output_item.done`.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputItemDone {
    pub item: OutputItem,
}

/// A finished output item.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub call_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub encrypted_content: Option<String>,
}

/// `response.output_text.delta`.
#[derive(Debug, Deserialize)]
pub(crate) struct OutputTextDelta {
    #[serde(default)]
    pub delta: String,
}

/// `response.completed` and `response.failed`.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope {
    pub response: ResponseBody,
}

/// The response object inside a lifecycle event.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBody {
    pub usage: Option<ResponseUsage>,
    pub error: Option<ErrorDetail>,
}

/// Token usage.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub input_tokens_details: Option<InputTokensDetails>,
}

/// Cached share of the input.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct InputTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
}

/// An error object, either top-level (`error` events) or inside a failed
/// response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}
