//! Event-stream to message reconstruction.
//!
//! [`MessageBuilder`] is a pure reducer: feed it every [`Event`] of a turn
//! (or of a whole run) in order and [`finish`](MessageBuilder::finish) it
//! to get the reconstructed messages and summed usage. [`rollup`] does the
//! same for a whole [`EventStream`](crate::EventStream), for callers that
//! only need the final result.
//!
//! ```rust
//! use ikm_llm::{Event, MessageBuilder};
//!
//! let mut builder = MessageBuilder::new();
//! builder.process(&Event::ContentDelta("He".into()));
//! builder.process(&Event::ContentDelta("llo".into()));
//! let rollup = builder.finish().unwrap();
//! assert_eq!(rollup.messages.len(), 1);
//! assert_eq!(rollup.messages[0].text(), "Hello");
//! ```

use futures::{Stream, StreamExt};

use crate::chat::{Message, Role, ToolCall, ToolCallFunction};
use crate::error::LlmError;
use crate::event::{Event, ThinkingDelta};
use crate::usage::Usage;

/// Messages and usage reconstructed from an event sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rollup {
    /// Assistant and tool messages, in order.
    pub messages: Vec<Message>,
    /// Sum of every usage event.
    pub usage: Usage,
}

/// Folds events into messages.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    messages: Vec<Message>,
    usage: Usage,
    // True while deltas extend the last assistant message.
    open: bool,
    error: Option<LlmError>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage summed so far.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Whether an error was recorded.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Folds one event. After the first error all events are ignored.
    pub fn process(&mut self, event: &Event) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::ContentDelta(text) => self.assistant().content.append_text(text),
            Event::ThinkingDelta(ThinkingDelta::Text(text)) => {
                self.assistant().content.append_thinking(text);
            }
            Event::ThinkingDelta(ThinkingDelta::Signature(signature)) => {
                self.assistant().content.append_signature(signature);
            }
            Event::ToolUse {
                id,
                index,
                name,
                arguments,
            } => self.tool_use(id, *index, name, arguments),
            Event::ToolResult { id, result } => {
                self.open = false;
                if let Err(err) = self.tool_result(id, result) {
                    self.error = Some(err);
                }
            }
            Event::Usage(usage) => self.usage += usage,
            Event::Error(err) => self.error = Some(err.clone()),
        }
    }

    /// Returns the reconstructed messages, or the first recorded error.
    pub fn finish(self) -> Result<Rollup, LlmError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Rollup {
                messages: self.messages,
                usage: self.usage,
            }),
        }
    }

    fn assistant(&mut self) -> &mut Message {
        if !self.open || self.messages.is_empty() {
            self.open = true;
            self.messages.push(Message {
                role: Role::Assistant,
                ..Message::default()
            });
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    fn tool_use(&mut self, id: &str, index: u32, name: &str, arguments: &str) {
        let message = self.assistant();
        if let Some(call) = message.tool_calls.iter_mut().find(|c| c.index == index) {
            if call.id.is_empty() {
                id.clone_into(&mut call.id);
            }
            if call.function.name.is_empty() {
                name.clone_into(&mut call.function.name);
            }
            call.function.arguments.push_str(arguments);
        } else {
            message.tool_calls.push(ToolCall {
                id: id.to_owned(),
                index,
                function: ToolCallFunction {
                    name: name.to_owned(),
                    arguments: arguments.to_owned(),
                },
            });
        }
    }

    fn tool_result(
        &mut self,
        id: &str,
        result: &Result<String, crate::tool::ToolError>,
    ) -> Result<(), LlmError> {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Err(LlmError::Protocol(format!(
                "tool result event without assistant message: {id}"
            )));
        };
        let Some(call) = self.messages[position]
            .tool_calls
            .iter()
            .find(|c| c.id == id)
        else {
            return Err(LlmError::Protocol(format!(
                "tool result event without matching tool call: {id}"
            )));
        };
        let name = call.function.name.clone();
        let answered = self.messages[position + 1..]
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some(id));
        if answered {
            return Err(LlmError::Protocol(format!(
                "duplicate tool result event: {id}"
            )));
        }
        let content = match result {
            Ok(output) => output.clone(),
            Err(err) => format!("Error: {err}"),
        };
        self.messages.push(Message::tool_result(id, name, content));
        Ok(())
    }
}

/// Drains `events` and reconstructs the resulting messages.
///
/// The whole stream is consumed even after an error, so the producing
/// task always runs to completion.
pub async fn rollup<S>(events: S) -> Result<Rollup, LlmError>
where
    S: Stream<Item = Event>,
{
    let mut builder = MessageBuilder::new();
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        builder.process(&event);
    }
    builder.finish()
}
