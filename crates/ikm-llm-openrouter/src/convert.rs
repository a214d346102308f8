//! Conversion from `ikm-llm` messages to chat completions messages.
//!
//! This module is internal; callers interact only with `ikm-llm` types.

use ikm_llm::chat::{ContentPart as CorePart, Message as CoreMessage, Role};
use ikm_llm::config::StreamConfig;
use ikm_llm::error::LlmError;
use ikm_llm::tool::ToolSpec;

use crate::config::OpenRouterConfig;
use crate::types::{
    CacheControl, ContentPart, FileData, FunctionCallRequest, FunctionDef, ImageUrl, Message,
    MessageContent, Reasoning, Request, Tool, ToolCallRequest, UsageRequest,
};

/// Build a streaming chat completions request.
pub(crate) fn build_request<'a>(
    messages: &[CoreMessage],
    tools: &'a [ToolSpec],
    stream_config: &StreamConfig,
    config: &'a OpenRouterConfig,
) -> Result<Request<'a>, LlmError> {
    let messages = messages
        .iter()
        .map(convert_message)
        .collect::<Result<Vec<_>, _>>()?;

    let tools = (!tools.is_empty()).then(|| {
        tools
            .iter()
            .map(|t| Tool {
                tool_type: "function",
                function: FunctionDef {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    });

    Ok(Request {
        max_tokens: stream_config.max_tokens,
        messages,
        model: &config.model,
        provider: config.provider.as_ref(),
        reasoning: stream_config
            .reasoning_effort
            .as_effort_str()
            .map(|effort| Reasoning { effort }),
        stream: true,
        temperature: stream_config.temperature,
        tools,
        usage: UsageRequest { include: true },
    })
}

/// Assistant and tool content is flattened to a string; user and system
/// content keeps its typed parts. A cache breakpoint forces the parts form
/// so the marker has a text part to sit on.
fn convert_message(message: &CoreMessage) -> Result<Message, LlmError> {
    let flatten = matches!(message.role, Role::Assistant | Role::Tool);
    let mut text = String::new();
    let mut parts: Vec<ContentPart> = Vec::new();

    for part in &message.content {
        match part {
            CorePart::Text { text: t } if flatten => text.push_str(t),
            CorePart::Text { text: t } => append_text(&mut parts, t),
            CorePart::Image { url } if message.role == Role::User => {
                parts.push(ContentPart::ImageUrl {
                    image_url: ImageUrl { url: url.clone() },
                });
            }
            CorePart::File { name, data } if message.role == Role::User => {
                parts.push(ContentPart::File {
                    file: FileData {
                        filename: name.clone(),
                        file_data: data.clone(),
                    },
                });
            }
            CorePart::Image { .. } | CorePart::File { .. } => {
                return Err(LlmError::UnsupportedContent(format!(
                    "{} content part can only be used in user messages, got role: {}",
                    part.kind(),
                    message.role.as_str()
                )));
            }
            CorePart::Thinking { .. } => {}
        }
    }

    if message.cache_breakpoint {
        if !text.is_empty() {
            append_text(&mut parts, &std::mem::take(&mut text));
        }
        mark_last_text(&mut parts);
    }

    let content = if !parts.is_empty() {
        Some(MessageContent::Parts(parts))
    } else if !text.is_empty() || message.role == Role::Assistant {
        Some(MessageContent::Text(text))
    } else {
        None
    };

    let tool_calls = (!message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| ToolCallRequest {
                index: call.index,
                id: call.id.clone(),
                call_type: "function",
                function: FunctionCallRequest {
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                },
            })
            .collect()
    });

    let is_tool = message.role == Role::Tool;
    Ok(Message {
        role: message.role.as_str(),
        content,
        tool_calls,
        name: is_tool.then(|| message.name.clone().unwrap_or_default()),
        tool_call_id: is_tool.then(|| message.tool_call_id.clone().unwrap_or_default()),
    })
}

fn append_text(parts: &mut Vec<ContentPart>, text: &str) {
    if let Some(ContentPart::Text { text: last, .. }) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(ContentPart::Text {
            text: text.to_owned(),
            cache_control: None,
        });
    }
}

fn mark_last_text(parts: &mut [ContentPart]) {
    let last = parts.iter_mut().rev().find_map(|part| match part {
        ContentPart::Text { cache_control, .. } => Some(cache_control),
        _ => None,
    });
    if let Some(cache_control) = last {
        *cache_control = Some(CacheControl::EPHEMERAL);
    }
}

#[cfg(test)]
mod tests {
    use ikm_llm::chat::ToolCall;
    use ikm_llm::config::ReasoningEffort;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::ProviderPreferences;

    fn request_json(messages: &[CoreMessage], stream_config: &StreamConfig) -> Value {
        let config = OpenRouterConfig::default();
        let req = build_request(messages, &[], stream_config, &config).unwrap();
        serde_json::to_value(&req).unwrap()
    }

    #[test]
    fn test_build_request_minimal() {
        let json = request_json(
            &[CoreMessage::system("Be terse."), CoreMessage::user("Hello")],
            &StreamConfig::default(),
        );
        assert_eq!(json["max_tokens"], 8192);
        assert_eq!(json["stream"], true);
        assert_eq!(json["usage"], json!({"include": true}));
        assert!(json.get("provider").is_none());
        assert!(json.get("reasoning").is_none());
        assert_eq!(
            json["messages"],
            json!([
                {"role": "system", "content": [{"type": "text", "text": "Be terse."}]},
                {"role": "user", "content": [{"type": "text", "text": "Hello"}]}
            ])
        );
    }

    #[test]
    fn test_provider_and_reasoning() {
        let config = OpenRouterConfig {
            provider: Some(ProviderPreferences {
                order: vec!["anthropic".into()],
                allow_fallbacks: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let req = build_request(
            &[CoreMessage::user("hi")],
            &[],
            &StreamConfig::default().with_reasoning_effort(ReasoningEffort::Low),
            &config,
        )
        .unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["provider"],
            json!({"order": ["anthropic"], "allow_fallbacks": false})
        );
        assert_eq!(json["reasoning"], json!({"effort": "low"}));
    }

    #[test]
    fn test_assistant_and_tool_messages() {
        let assistant = CoreMessage::assistant("")
            .with_tool_call(ToolCall::new("call_1", 0, "bash", "{\"cmd\":\"ls\"}"));
        let json = request_json(
            &[assistant, CoreMessage::tool_result("call_1", "bash", "a.txt")],
            &StreamConfig::default(),
        );
        assert_eq!(
            json["messages"][0],
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "index": 0,
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "bash", "arguments": "{\"cmd\":\"ls\"}"}
                }]
            })
        );
        assert_eq!(
            json["messages"][1],
            json!({"role": "tool", "content": "a.txt", "name": "bash", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn test_user_image_and_file_parts() {
        let message = CoreMessage::user_parts(vec![
            CorePart::text("look"),
            CorePart::image("https://x/cat.png"),
            CorePart::file("a.pdf", "data:application/pdf;base64,AA"),
        ]);
        let json = request_json(&[message], &StreamConfig::default());
        let content = &json["messages"][0]["content"];
        assert_eq!(content[1], json!({"type": "image_url", "image_url": {"url": "https://x/cat.png"}}));
        assert_eq!(content[2]["file"]["filename"], "a.pdf");
    }

    #[test]
    fn test_image_outside_user_rejected() {
        let mut message = CoreMessage::system("");
        message.content = vec![CorePart::image("https://x/cat.png")].into();
        let err = build_request(
            &[message],
            &[],
            &StreamConfig::default(),
            &OpenRouterConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedContent(_)));
    }

    #[test]
    fn test_cache_breakpoint_on_assistant() {
        let mut assistant = CoreMessage::assistant("Done.");
        assistant.cache_breakpoint = true;
        let mut user = CoreMessage::user_parts(vec![
            CorePart::text("a"),
            CorePart::image("https://x/y.png"),
        ]);
        user.cache_breakpoint = true;
        let json = request_json(&[user, assistant], &StreamConfig::default());
        assert_eq!(
            json["messages"][0]["content"][0],
            json!({"type": "text", "text": "a", "cache_control": {"type": "ephemeral"}})
        );
        assert_eq!(
            json["messages"][1]["content"],
            json!([{"type": "text", "text": "Done.", "cache_control": {"type": "ephemeral"}}])
        );
    }

    #[test]
    fn test_thinking_parts_omitted() {
        let mut assistant = CoreMessage::assistant("");
        assistant.content = vec![
            CorePart::Thinking {
                text: "hmm".into(),
                signature: String::new(),
            },
            CorePart::text("ok"),
        ]
        .into();
        let json = request_json(&[assistant], &StreamConfig::default());
        assert_eq!(json["messages"][0]["content"], "ok");
    }
}
