//! SSE frame parser for the `OpenAI` Responses API.
//!
//! Only finished output items matter for tool calls: each
//! `response.output_item.done` of type `function_call` carries the whole
//! call, which is buffered until `response.completed`.

use std::ops::ControlFlow;

use ikm_llm::cost::{PricingTable, TokenCounts};
use ikm_llm::error::StreamError;
use ikm_llm::event::{Event, ThinkingDelta};
use ikm_llm::usage::Usage;
use ikm_llm::wire::{SseFrame, ToolCallBuffer};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::types::{
    ErrorDetail, EventType, OutputItemDone, OutputTextDelta, ResponseEnvelope, ResponseUsage,
};

/// Maximum number of function calls buffered in one turn.
pub(crate) const TOOL_CALL_SLOTS: usize = 32;

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

/// Parse one frame into `out`. Returns `Break` on `response.completed`,
/// on a failure event, or when the call buffer overflows.
pub(crate) fn parse_frame(
    frame: &SseFrame,
    state: &mut StreamState,
    pricing: &PricingTable,
    model: &str,
    out: &mut Vec<Event>,
) -> ControlFlow<()> {
    let kind = match &frame.event {
        Some(event) => event.clone(),
        None => match decode::<EventType>(frame) {
            Some(payload) => payload.event_type,
            None => return ControlFlow::Continue(()),
        },
    };

    match kind.as_str() {
        "response.output_item.done" => {
            let Some(done) = decode::<OutputItemDone>(frame) else {
                return ControlFlow::Continue(());
            };
            let item = done.item;
            match item.item_type.as_str() {
                "reasoning" => {
                    if let Some(blob) = item.encrypted_content.filter(|b| !b.is_empty()) {
                        out.push(Event::ThinkingDelta(ThinkingDelta::Signature(blob)));
                    }
                }
                "function_call" => {
                    if let Err(err) = state
                        .tools
                        .push_complete(&item.call_id, &item.name, &item.arguments)
                    {
                        out.push(Event::Error(err));
                        return ControlFlow::Break(());
                    }
                }
                _ => {}
            }
        }
        "response.output_text.delta" => {
            if let Some(delta) = decode::<OutputTextDelta>(frame) {
                if !delta.delta.is_empty() {
                    out.push(Event::ContentDelta(delta.delta));
                }
            }
        }
        "response.completed" => {
            let Some(envelope) = decode::<ResponseEnvelope>(frame) else {
                return ControlFlow::Continue(());
            };
            if let Some(usage) = envelope.response.usage {
                out.push(Event::Usage(convert_usage(&usage, pricing, model)));
            }
            out.extend(state.tools.flush());
            return ControlFlow::Break(());
        }
        "response.failed" => {
            let detail = decode::<ResponseEnvelope>(frame).and_then(|e| e.response.error);
            out.push(Event::Error(stream_error(detail, "response_failed").into()));
            return ControlFlow::Break(());
        }
        "error" => {
            let detail = decode::<ErrorDetail>(frame);
            out.push(Event::Error(stream_error(detail, "error").into()));
            return ControlFlow::Break(());
        }
        // Lifecycle and partial-item events carry nothing the finished
        // items do not.
        other if other.starts_with("response.") => {}
        other => warn!(event = other, "ignoring unknown OpenAI event"),
    }
    ControlFlow::Continue(())
}

/// Releases any buffered calls when the body ends early.
pub(crate) fn finish(state: &mut StreamState, out: &mut Vec<Event>) {
    out.extend(state.tools.flush());
}

fn decode<T: DeserializeOwned>(frame: &SseFrame) -> Option<T> {
    match serde_json::from_str(&frame.data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, event = ?frame.event, "skipping unparseable OpenAI frame");
            None
        }
    }
}

fn stream_error(detail: Option<ErrorDetail>, fallback_code: &str) -> StreamError {
    let detail = detail.unwrap_or(ErrorDetail {
        code: None,
        message: String::new(),
    });
    StreamError::new(
        detail.code.unwrap_or_else(|| fallback_code.to_owned()),
        detail.message,
    )
}

/// Cached tokens are part of `input_tokens` and billed at the cached rate.
fn convert_usage(usage: &ResponseUsage, pricing: &PricingTable, model: &str) -> Usage {
    let cached = usage
        .input_tokens_details
        .map_or(0, |d| d.cached_tokens)
        .min(usage.input_tokens);
    let estimate = pricing.estimate(
        model,
        &TokenCounts {
            input: usage.input_tokens - cached,
            cache_read: cached,
            cache_write: 0,
            output: usage.output_tokens,
        },
    );
    Usage::new(usage.input_tokens, usage.output_tokens, estimate.with_cache)
}

#[cfg(test)]
mod tests {
    use ikm_llm::error::LlmError;
    use ikm_llm::wire::SseDecoder;

    use super::*;
    use crate::pricing::default_pricing;

    fn run(raw: &str, state: &mut StreamState) -> (Vec<Event>, bool) {
        let frames = SseDecoder::new().push(raw.as_bytes()).unwrap();
        let pricing = default_pricing();
        let mut out = Vec::new();
        for frame in &frames {
            if parse_frame(frame, state, &pricing, "o3", &mut out).is_break() {
                return (out, true);
            }
        }
        (out, false)
    }

    #[test]
    fn test_parse_text_delta() {
        let stream = r#"event: response.output_text.delta
data: {"type":"response.output_text.delta","item_id":"msg_1","output_index":0,"content_index":0,"delta":"Hel"}

event: response.output_text.delta
data: {"type":"response.output_text.delta","item_id":"msg_1","output_index":0,"content_index":0,"delta":"lo"}

"#;
        let (events, done) = run(stream, &mut StreamState::default());
        assert_eq!(
            events,
            vec![Event::ContentDelta("Hel".into()), Event::ContentDelta("lo".into())]
        );
        assert!(!done);
    }

    #[test]
    fn test_reasoning_item_becomes_signature() {
        let stream = r#"event: response.output_item.done
data: {"type":"response.output_item.done","output_index":0,"item":{"id":"rs_1","type":"reasoning","summary":[],"encrypted_content":"gAAAAB"}}

"#;
        let (events, _) = run(stream, &mut StreamState::default());
        assert_eq!(
            events,
            vec![Event::ThinkingDelta(ThinkingDelta::Signature("gAAAAB".into()))]
        );
    }

    #[test]
    fn test_function_calls_flush_after_usage() {
        let stream = r#"event: response.output_item.done
data: {"type":"response.output_item.done","output_index":1,"item":{"id":"fc_1","type":"function_call","status":"completed","arguments":"{\"cmd\":\"ls\"}","call_id":"call_1","name":"bash"}}

event: response.output_item.done
data: {"type":"response.output_item.done","output_index":2,"item":{"id":"fc_2","type":"function_call","status":"completed","arguments":"{}","call_id":"call_2","name":"todo"}}

event: response.completed
data: {"type":"response.completed","response":{"id":"resp_1","status":"completed","usage":{"input_tokens":1000000,"input_tokens_details":{"cached_tokens":400000},"output_tokens":1000000,"total_tokens":2000000}}}

"#;
        let (events, done) = run(stream, &mut StreamState::default());
        assert!(done);
        assert_eq!(events.len(), 3);
        let Event::Usage(usage) = &events[0] else {
            panic!("expected usage first, got {events:?}");
        };
        assert_eq!(usage.prompt_tokens, 1_000_000);
        assert_eq!(usage.completion_tokens, 1_000_000);
        assert!((usage.total_cost - (1.2 + 0.2 + 8.0)).abs() < 1e-9);
        assert_eq!(events[1], Event::tool_use("call_1", 0, "bash", "{\"cmd\":\"ls\"}"));
        assert_eq!(events[2], Event::tool_use("call_2", 1, "todo", "{}"));
    }

    #[test]
    fn test_response_failed_is_terminal() {
        let stream = r#"event: response.failed
data: {"type":"response.failed","response":{"status":"failed","error":{"code":"server_error","message":"The model failed."}}}

"#;
        let (events, done) = run(stream, &mut StreamState::default());
        assert!(done);
        match &events[0] {
            Event::Error(LlmError::Stream(err)) => {
                assert_eq!(err.code, "server_error");
                assert_eq!(err.message, "The model failed.");
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_event_is_terminal() {
        let stream = r#"event: error
data: {"type":"error","code":"rate_limit_exceeded","message":"Slow down","param":null}

"#;
        let (events, done) = run(stream, &mut StreamState::default());
        assert!(done);
        assert!(matches!(
            &events[0],
            Event::Error(LlmError::Stream(err)) if err.code == "rate_limit_exceeded"
        ));
    }

    #[test]
    fn test_lifecycle_events_and_garbage_skipped() {
        let stream = r#"event: response.created
data: {"type":"response.created","response":{"id":"resp_1"}}

event: response.output_text.delta
data: {not json

event: response.in_progress
data: {"type":"response.in_progress"}

"#;
        let (events, done) = run(stream, &mut StreamState::default());
        assert!(events.is_empty());
        assert!(!done);
    }

    #[test]
    fn test_dispatch_by_payload_type() {
        let stream = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"x\"}\n\n";
        let (events, _) = run(stream, &mut StreamState::default());
        assert_eq!(events, vec![Event::ContentDelta("x".into())]);
    }
}
