//! Streaming events.
//!
//! An orchestration run yields a sequence of [`Event`]s through an
//! [`EventStream`]. Content and thinking arrive as small deltas, tool
//! calls as [`ToolUse`](Event::ToolUse) events (argument fragments for
//! the same `index` concatenate), then the orchestrator's
//! [`ToolResult`](Event::ToolResult)s, [`Usage`](Event::Usage) per turn,
//! and at most one terminal [`Error`](Event::Error).
//!
//! # Consuming a stream
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use ikm_llm::{Event, EventStream};
//!
//! async fn print_stream(mut events: EventStream) {
//!     while let Some(event) = events.next().await {
//!         match event {
//!             Event::ContentDelta(text) => print!("{text}"),
//!             Event::Error(err) if err.is_cancelled() => eprintln!("\n[cancelled]"),
//!             Event::Error(err) => eprintln!("\n[failed: {err}]"),
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use futures::channel::mpsc;

use crate::error::LlmError;
use crate::tool::ToolError;
use crate::usage::Usage;

/// The receiving half of an orchestration run.
///
/// The channel closes when the run ends, whatever the reason. Dropping it
/// stops the run.
pub type EventStream = mpsc::Receiver<Event>;

/// A reasoning fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinkingDelta {
    /// Readable reasoning text.
    Text(String),
    /// Opaque signature or encrypted reasoning blob.
    Signature(String),
}

/// One unit of streaming output.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A fragment of the model's text.
    ContentDelta(String),
    /// A fragment of the model's reasoning.
    ThinkingDelta(ThinkingDelta),
    /// A tool call, or a further argument fragment for the call at `index`.
    ToolUse {
        /// Vendor call identifier (may be empty on continuation fragments).
        id: String,
        /// Position in the vendor's parallel tool-call stream.
        index: u32,
        /// Tool name (may be empty on continuation fragments).
        name: String,
        /// JSON argument fragment.
        arguments: String,
    },
    /// The outcome of one tool call.
    ToolResult {
        /// The answered call.
        id: String,
        /// Tool output, or the tool's error.
        result: Result<String, ToolError>,
    },
    /// Token usage for one turn.
    Usage(Usage),
    /// A terminal error; nothing follows it.
    Error(LlmError),
}

impl Event {
    /// Convenience constructor for a [`ToolUse`](Event::ToolUse) event.
    pub fn tool_use(
        id: impl Into<String>,
        index: u32,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::ToolUse {
            id: id.into(),
            index,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Whether this is an [`Error`](Event::Error).
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
