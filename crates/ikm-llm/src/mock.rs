//! Mock adapter and tool for testing.
//!
//! [`MockAdapter`] is a [`WireAdapter`] whose SSE frames encode canonical
//! events directly, so orchestrator tests can script a vendor stream with
//! a local HTTP server and nothing else. [`MockTool`] is a [`Tool`] with a
//! scripted result, an optional delay and a log of the arguments it was
//! called with.
//!
//! # Frame format
//!
//! Each `data:` payload is one JSON object:
//!
//! | `type` | Fields | Event |
//! |--------|--------|-------|
//! | `text` | `text` | [`Event::ContentDelta`] |
//! | `thinking` | `text` | [`ThinkingDelta::Text`] |
//! | `signature` | `signature` | [`ThinkingDelta::Signature`] |
//! | `tool_use` | `id`, `index`, `name`, `arguments` | [`Event::ToolUse`] |
//! | `usage` | `prompt_tokens`, `completion_tokens`, `cost` | [`Event::Usage`] |
//! | `error` | `code`, `message` | [`Event::Error`], terminal |
//! | `done` | | terminates the stream |
//!
//! The [`test_helpers`](crate::test_helpers) module builds bodies in this
//! format.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::chat::Message;
use crate::config::StreamConfig;
use crate::error::{LlmError, StreamError};
use crate::event::{Event, ThinkingDelta};
use crate::tool::{Tool, ToolError, ToolFuture, ToolSpec};
use crate::usage::Usage;
use crate::wire::{SseFrame, WireAdapter, WireRequest};

/// Path the mock adapter posts to.
pub const MOCK_PATH: &str = "/v1/mock";

/// A [`WireAdapter`] speaking the canonical-event frame format.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    base_url: String,
    model: String,
    client: reqwest::Client,
    checkpoint_interval: Option<u64>,
}

impl MockAdapter {
    /// Creates an adapter posting to `{base_url}/v1/mock`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: "mock-model".into(),
            client: reqwest::Client::new(),
            checkpoint_interval: None,
        }
    }

    /// Enables the cache checkpoint heuristic with `interval` tokens.
    #[must_use]
    pub fn with_cache_checkpoints(mut self, interval: u64) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MockFrame {
    Text {
        text: String,
    },
    Thinking {
        text: String,
    },
    Signature {
        signature: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        index: u32,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: String,
    },
    Usage {
        #[serde(default)]
        prompt_tokens: u64,
        #[serde(default)]
        completion_tokens: u64,
        #[serde(default)]
        cost: f64,
    },
    Error {
        code: String,
        message: String,
    },
    Done,
}

impl WireAdapter for MockAdapter {
    type State = ();

    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        config: &StreamConfig,
    ) -> Result<WireRequest, LlmError> {
        Ok(WireRequest {
            url: format!("{}{MOCK_PATH}", self.base_url.trim_end_matches('/')),
            headers: HeaderMap::new(),
            body: json!({
                "model": self.model,
                "messages": messages,
                "tools": tools,
                "max_tokens": config.max_tokens,
                "stream": true,
            }),
        })
    }

    fn parse_frame(&self, frame: &SseFrame, _state: &mut (), out: &mut Vec<Event>) -> ControlFlow<()> {
        let Ok(parsed) = serde_json::from_str::<MockFrame>(&frame.data) else {
            return ControlFlow::Continue(());
        };
        match parsed {
            MockFrame::Text { text } => out.push(Event::ContentDelta(text)),
            MockFrame::Thinking { text } => out.push(Event::ThinkingDelta(ThinkingDelta::Text(text))),
            MockFrame::Signature { signature } => {
                out.push(Event::ThinkingDelta(ThinkingDelta::Signature(signature)));
            }
            MockFrame::ToolUse {
                id,
                index,
                name,
                arguments,
            } => out.push(Event::ToolUse {
                id,
                index,
                name,
                arguments,
            }),
            MockFrame::Usage {
                prompt_tokens,
                completion_tokens,
                cost,
            } => out.push(Event::Usage(Usage::new(prompt_tokens, completion_tokens, cost))),
            MockFrame::Error { code, message } => {
                out.push(Event::Error(StreamError::new(code, message).into()));
                return ControlFlow::Break(());
            }
            MockFrame::Done => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn cache_checkpoint_interval(&self) -> Option<u64> {
        self.checkpoint_interval
    }
}

/// A scripted [`Tool`].
///
/// Sleeps for the configured delay (returning early with an error if its
/// token is cancelled), records the arguments, then returns the scripted
/// result.
#[derive(Clone)]
pub struct MockTool {
    spec: ToolSpec,
    result: Result<String, ToolError>,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl fmt::Debug for MockTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTool")
            .field("name", &self.spec.name)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl MockTool {
    /// A tool named `name` that returns `output`.
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            spec: ToolSpec::new(name, format!("mock tool {name}"), json!({"type": "object"})),
            result: Ok(output.to_owned()),
            delay: Duration::ZERO,
            calls: Arc::default(),
        }
    }

    /// A tool named `name` that fails with `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            result: Err(ToolError::new(message)),
            ..Self::new(name, "")
        }
    }

    /// Delays every call by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Arguments of every call so far, in start order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The advertised [`ToolSpec`] as JSON, for asserting advertised tools.
    pub fn spec_json(&self) -> Value {
        serde_json::to_value(&self.spec).unwrap_or_default()
    }
}

impl Tool for MockTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    fn call<'a>(&'a self, arguments: &'a str, cancel: CancellationToken) -> ToolFuture<'a> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(arguments.to_owned());
            }
            if !self.delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => return Err(ToolError::new("cancelled")),
                    () = tokio::time::sleep(self.delay) => {}
                }
            }
            self.result.clone()
        })
    }
}
