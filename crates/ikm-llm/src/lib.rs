//! # ikm-llm
//!
//! Vendor-neutral messages, streaming events and a multi-turn,
//! tool-calling orchestrator for streaming LLM APIs.
//!
//! This crate contains **no** vendor-specific code. Each vendor protocol
//! lives in a sibling crate that implements [`WireAdapter`]; wrapping it
//! in an [`Orchestrator`] yields a [`Model`] that streams [`Event`]s and
//! runs registered [`Tool`]s between turns.
//!
//! # Adapter crates
//!
//! | Crate | Wire protocol |
//! |-------|---------------|
//! | `ikm-llm-openai` | Responses-style (`/v1/responses`) |
//! | `ikm-llm-anthropic` | Messages-style (`/v1/messages`), prompt-cache markers |
//! | `ikm-llm-openrouter` | Chat-completions-style (OpenRouter), per-chunk usage |
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐ ┌──────────────────┐ ┌────────────────────┐
//!  │  ikm-llm-openai  │ │ ikm-llm-anthropic│ │ ikm-llm-openrouter │
//!  └────────┬─────────┘ └────────┬─────────┘ └─────────┬──────────┘
//!           └──────── impl WireAdapter ────────────────┘
//!                                ▼
//!             ┌─────────────────────────────────────┐
//!             │               ikm-llm               │
//!             │ Orchestrator, MessageBuilder, Tool  │
//!             └─────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use ikm_llm::{rollup, CancellationToken, Message, Model, StreamConfig};
//!
//! let events = model.stream(
//!     &[Message::user("Explain ownership in Rust")],
//!     StreamConfig::default().with_max_tokens(1024),
//!     CancellationToken::new(),
//! );
//! let result = rollup(events).await?;
//! println!("{}", result.messages[0].text());
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chat`] | Messages, content parts, tool calls |
//! | [`event`] | Streaming [`Event`]s and the [`EventStream`] alias |
//! | [`builder`] | Event-to-message reconstruction and [`rollup`] |
//! | [`orchestrator`] | The turn loop and the [`Model`] trait |
//! | [`tool`] | The [`Tool`] capability, registry and concurrent dispatch |
//! | [`wire`] | The [`WireAdapter`] seam, SSE decoding, tool-call buffers |
//! | [`cache`] | Token-boundary cache checkpoints |
//! | [`cost`] | Per-model pricing tables |
//! | [`config`] | Per-call [`StreamConfig`] |
//! | [`error`] | Unified [`LlmError`] |
//! | [`usage`] | Token and cost accounting |

#![warn(missing_docs)]

pub mod builder;
pub mod cache;
pub mod chat;
pub mod config;
pub mod cost;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod tool;
pub mod usage;
pub mod wire;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use builder::{rollup, MessageBuilder, Rollup};
pub use chat::{ContentPart, ContentParts, Message, Role, ToolCall, ToolCallFunction};
pub use config::{ReasoningEffort, StreamConfig};
pub use error::{LlmError, StreamError};
pub use event::{Event, EventStream, ThinkingDelta};
pub use orchestrator::{Model, Orchestrator};
pub use tool::{Tool, ToolError, ToolRegistry, ToolSpec};
pub use usage::Usage;
pub use wire::WireAdapter;

pub use tokio_util::sync::CancellationToken;
