//! Pre-built helpers for testing code that uses `ikm-llm` types.
//!
//! Available when the `test-utils` feature is enabled, allowing adapter
//! crates to reuse these utilities in their own test suites. Also
//! compiled during `#[cfg(test)]` for this crate's own tests.

use futures::StreamExt;
use serde_json::{json, Value};

use crate::chat::Message;
use crate::event::{Event, EventStream};

/// Encodes each payload as one `data:` frame.
pub fn sse_body(payloads: &[Value]) -> String {
    payloads.iter().map(|p| format!("data: {p}\n\n")).collect()
}

/// Encodes `(event, payload)` pairs as `event:` + `data:` frames.
pub fn sse_named_body(frames: &[(&str, Value)]) -> String {
    frames
        .iter()
        .map(|(event, payload)| format!("event: {event}\ndata: {payload}\n\n"))
        .collect()
}

/// Drains a run into a vector.
pub async fn collect_events(events: EventStream) -> Vec<Event> {
    events.collect().await
}

/// Concatenates every [`Event::ContentDelta`].
pub fn content_text(events: &[Event]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ContentDelta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Mock frame: a text delta.
pub fn text_frame(text: &str) -> Value {
    json!({"type": "text", "text": text})
}

/// Mock frame: a tool-call fragment.
pub fn tool_use_frame(id: &str, index: u32, name: &str, arguments: &str) -> Value {
    json!({"type": "tool_use", "id": id, "index": index, "name": name, "arguments": arguments})
}

/// Mock frame: per-turn usage.
pub fn usage_frame(prompt_tokens: u64, completion_tokens: u64) -> Value {
    json!({"type": "usage", "prompt_tokens": prompt_tokens, "completion_tokens": completion_tokens, "cost": 0.0})
}

/// Mock frame: end of stream.
pub fn done_frame() -> Value {
    json!({"type": "done"})
}

/// Shorthand for [`Message::user`].
pub fn user_msg(text: &str) -> Message {
    Message::user(text)
}

/// Shorthand for [`Message::assistant`].
pub fn assistant_msg(text: &str) -> Message {
    Message::assistant(text)
}

/// Shorthand for [`Message::system`].
pub fn system_msg(text: &str) -> Message {
    Message::system(text)
}

/// Shorthand for [`Message::tool_result`].
pub fn tool_result_msg(tool_call_id: &str, name: &str, content: &str) -> Message {
    Message::tool_result(tool_call_id, name, content)
}
