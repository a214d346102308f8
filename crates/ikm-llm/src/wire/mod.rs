//! The narrow seam between the orchestrator and one vendor protocol.
//!
//! A vendor adapter implements [`WireAdapter`]: it turns the canonical
//! history into one HTTP request and parses each SSE frame of the reply
//! into [`Event`]s. Everything else (the turn loop, tool dispatch,
//! cancellation, HTTP transport and SSE framing) lives here in the core
//! and is shared by every adapter.
//!
//! ```text
//!   build_request ──► send ──► SseDecoder ──► parse_frame ──► Event
//!                                                  │
//!                                      ToolCallBuffer (per turn)
//! ```

mod buffer;
mod sse;
pub(crate) mod transport;

use std::ops::ControlFlow;

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::chat::Message;
use crate::config::StreamConfig;
use crate::error::LlmError;
use crate::event::Event;
use crate::tool::ToolSpec;

pub use buffer::ToolCallBuffer;
pub use sse::{SseDecoder, SseFrame};

/// One fully built vendor request.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Endpoint URL.
    pub url: String,
    /// Request headers, authentication included.
    pub headers: HeaderMap,
    /// JSON body; always requests a streaming response.
    pub body: Value,
}

/// A vendor protocol: request shaping and stream parsing.
///
/// One value of [`State`](Self::State) is created per wire call and
/// threaded through every [`parse_frame`](Self::parse_frame) call of that
/// turn, typically holding a [`ToolCallBuffer`] and partial usage.
pub trait WireAdapter: Send + Sync + 'static {
    /// Per-turn parser state.
    type State: Default + Send;

    /// Short provider name, used in tracing spans.
    fn name(&self) -> &'static str;

    /// The configured model identifier.
    fn model(&self) -> &str;

    /// The HTTP client requests are sent with.
    fn http_client(&self) -> &reqwest::Client;

    /// Converts the history and tool specs into one streaming request.
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        config: &StreamConfig,
    ) -> Result<WireRequest, LlmError>;

    /// Parses one SSE frame, pushing zero or more events to `out`.
    ///
    /// Returns [`ControlFlow::Break`] when the frame terminates the
    /// stream: the vendor's completion signal, an in-band error, or an
    /// [`Event::Error`] pushed by the adapter. Malformed payloads are
    /// skipped, not errors.
    fn parse_frame(
        &self,
        frame: &SseFrame,
        state: &mut Self::State,
        out: &mut Vec<Event>,
    ) -> ControlFlow<()>;

    /// Called when the body ends without a terminating frame.
    fn finish(&self, _state: &mut Self::State, _out: &mut Vec<Event>) {}

    /// Maps a non-2xx response to an error.
    fn convert_error(&self, status: http::StatusCode, body: &str) -> LlmError {
        LlmError::from_status(status, body)
    }

    /// Token interval of the cache checkpoint heuristic, if the vendor
    /// takes cache markers on conversation history.
    fn cache_checkpoint_interval(&self) -> Option<u64> {
        None
    }
}
