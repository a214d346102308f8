//! Conversion from `ikm-llm` messages to Responses API items.
//!
//! This module is internal; callers interact only with `ikm-llm` types.

use ikm_llm::chat::{ContentPart, Message as CoreMessage, Role, ToolCall};
use ikm_llm::config::StreamConfig;
use ikm_llm::error::LlmError;
use ikm_llm::tool::ToolSpec;
use rand::Rng;

use crate::config::OpenAiConfig;
use crate::types::{InputItem, InputText, OutputText, Reasoning, Request, Tool};

/// Build a streaming Responses API request.
///
/// The system message becomes `instructions`. Every assistant tool call
/// is split into its own `function_call` item, after the message text.
pub(crate) fn build_request<'a>(
    messages: &[CoreMessage],
    tools: &'a [ToolSpec],
    stream_config: &StreamConfig,
    config: &'a OpenAiConfig,
) -> Result<Request<'a>, LlmError> {
    let mut instructions = None;
    let mut input = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => instructions = Some(message.text()),
            Role::Tool => input.push(InputItem::FunctionCallOutput {
                item_type: "function_call_output",
                call_id: message.tool_call_id.clone().unwrap_or_default(),
                output: message.text(),
            }),
            Role::User | Role::Assistant => {
                if !message.text().is_empty() {
                    input.push(convert_content(message)?);
                }
                input.extend(message.tool_calls.iter().map(function_call));
            }
        }
    }

    let tools = (!tools.is_empty()).then(|| {
        tools
            .iter()
            .map(|t| Tool {
                tool_type: "function",
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            })
            .collect()
    });

    Ok(Request {
        include: ["reasoning.encrypted_content"],
        input,
        instructions,
        max_output_tokens: stream_config.max_tokens,
        model: &config.model,
        reasoning: stream_config
            .reasoning_effort
            .as_effort_str()
            .map(|effort| Reasoning { effort }),
        store: false,
        stream: true,
        temperature: stream_config.temperature,
        tools,
        user: config.user.as_deref(),
    })
}

/// The text of a user or assistant message. Thinking parts are dropped.
fn convert_content(message: &CoreMessage) -> Result<InputItem, LlmError> {
    if message.role == Role::Assistant {
        let content = message
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(OutputText {
                    content_type: "output_text",
                    text: text.clone(),
                    annotations: [],
                }),
                _ => None,
            })
            .collect();
        return Ok(InputItem::Assistant {
            id: message_id(),
            item_type: "message",
            role: "assistant",
            status: "completed",
            content,
        });
    }

    let mut content = Vec::with_capacity(message.content.len());
    for part in &message.content {
        match part {
            ContentPart::Text { text } => content.push(InputText {
                content_type: "input_text",
                text: text.clone(),
            }),
            ContentPart::Image { .. } | ContentPart::File { .. } => {
                return Err(LlmError::UnsupportedContent(format!(
                    "{} content part is not supported in OpenAI messages",
                    part.kind()
                )));
            }
            ContentPart::Thinking { .. } => {}
        }
    }
    Ok(InputItem::User {
        role: "user",
        content,
    })
}

fn function_call(call: &ToolCall) -> InputItem {
    InputItem::FunctionCall {
        item_type: "function_call",
        call_id: call.id.clone(),
        name: call.function.name.clone(),
        arguments: call.function.arguments.clone(),
    }
}

/// A fresh `msg_` identifier with 48 hex digits.
fn message_id() -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..48)
        .map(|_| char::from(HEX[rng.gen_range(0..HEX.len())]))
        .collect();
    format!("msg_{suffix}")
}

#[cfg(test)]
mod tests {
    use ikm_llm::config::ReasoningEffort;
    use serde_json::{json, Value};

    use super::*;

    fn request_json(messages: &[CoreMessage], stream_config: &StreamConfig) -> Value {
        let config = OpenAiConfig {
            user: Some("42".into()),
            ..Default::default()
        };
        let req = build_request(messages, &[], stream_config, &config).unwrap();
        serde_json::to_value(&req).unwrap()
    }

    #[test]
    fn test_build_request_minimal() {
        let json = request_json(
            &[CoreMessage::system("Be terse."), CoreMessage::user("Hello")],
            &StreamConfig::default(),
        );
        assert_eq!(json["include"], json!(["reasoning.encrypted_content"]));
        assert_eq!(json["instructions"], "Be terse.");
        assert_eq!(json["max_output_tokens"], 8192);
        assert_eq!(json["model"], "o3");
        assert_eq!(json["store"], false);
        assert_eq!(json["stream"], true);
        assert_eq!(json["user"], "42");
        assert!(json.get("reasoning").is_none());
        assert!(json.get("tools").is_none());
        assert_eq!(
            json["input"],
            json!([{"role": "user", "content": [{"type": "input_text", "text": "Hello"}]}])
        );
    }

    #[test]
    fn test_reasoning_effort() {
        let json = request_json(
            &[CoreMessage::user("hi")],
            &StreamConfig::default().with_reasoning_effort(ReasoningEffort::Medium),
        );
        assert_eq!(json["reasoning"], json!({"effort": "medium"}));
    }

    #[test]
    fn test_tool_calls_split_into_items() {
        let assistant = CoreMessage::assistant("Running both.")
            .with_tool_call(ToolCall::new("call_a", 0, "bash", "{\"cmd\":\"ls\"}"))
            .with_tool_call(ToolCall::new("call_b", 1, "todo", "{}"));
        let json = request_json(
            &[
                CoreMessage::user("go"),
                assistant,
                CoreMessage::tool_result("call_a", "bash", "a.txt"),
                CoreMessage::tool_result("call_b", "todo", "done"),
            ],
            &StreamConfig::default(),
        );
        let input = json["input"].as_array().unwrap();
        assert_eq!(input.len(), 6);

        let message = &input[1];
        assert_eq!(message["type"], "message");
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["status"], "completed");
        assert_eq!(
            message["content"],
            json!([{"type": "output_text", "text": "Running both.", "annotations": []}])
        );
        let id = message["id"].as_str().unwrap();
        assert!(id.starts_with("msg_"));
        assert_eq!(id.len(), 52);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(
            input[2],
            json!({"type": "function_call", "call_id": "call_a", "name": "bash", "arguments": "{\"cmd\":\"ls\"}"})
        );
        assert_eq!(input[3]["call_id"], "call_b");
        assert_eq!(
            input[4],
            json!({"type": "function_call_output", "call_id": "call_a", "output": "a.txt"})
        );
    }

    #[test]
    fn test_tool_only_assistant_has_no_message_item() {
        let assistant =
            CoreMessage::assistant("").with_tool_call(ToolCall::new("call_a", 0, "bash", "{}"));
        let json = request_json(&[assistant], &StreamConfig::default());
        let input = json["input"].as_array().unwrap();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0]["type"], "function_call");
    }

    #[test]
    fn test_thinking_parts_dropped() {
        let mut assistant = CoreMessage::assistant("");
        assistant.content = vec![
            ContentPart::Thinking {
                text: String::new(),
                signature: "gAAAA".into(),
            },
            ContentPart::text("Answer."),
        ]
        .into();
        let json = request_json(&[assistant], &StreamConfig::default());
        assert_eq!(json["input"][0]["content"].as_array().unwrap().len(), 1);
        assert_eq!(json["input"][0]["content"][0]["text"], "Answer.");
    }

    #[test]
    fn test_user_file_rejected() {
        let message = CoreMessage::user_parts(vec![ContentPart::file("a.pdf", "data:...")]);
        let err = build_request(
            &[message],
            &[],
            &StreamConfig::default(),
            &OpenAiConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedContent(_)));
    }

    #[test]
    fn test_tools_advertised() {
        let tools = vec![ToolSpec::new(
            "bash",
            "Run a command",
            json!({"type": "object"}),
        )];
        let config = OpenAiConfig::default();
        let req = build_request(
            &[CoreMessage::user("hi")],
            &tools,
            &StreamConfig::default(),
            &config,
        )
        .unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["tools"],
            json!([{"type": "function", "name": "bash", "description": "Run a command", "parameters": {"type": "object"}}])
        );
    }
}
