//! Messages-style (Anthropic) adapter for `ikm-llm`.
//!
//! This crate implements [`WireAdapter`](ikm_llm::WireAdapter) for
//! Anthropic's streaming Messages API, with extended thinking, parallel
//! tool use and prompt-cache markers.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ikm_llm::{rollup, CancellationToken, Message, Model, StreamConfig};
//! use ikm_llm_anthropic::{AnthropicAdapter, AnthropicConfig, AnthropicModel};
//!
//! # async fn example() -> Result<(), ikm_llm::LlmError> {
//! let model = AnthropicModel::new(AnthropicAdapter::new(AnthropicConfig {
//!     api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
//!     ..Default::default()
//! })?);
//!
//! let events = model.stream(
//!     &[Message::user("Hello!")],
//!     StreamConfig::default(),
//!     CancellationToken::new(),
//! );
//! let result = rollup(events).await?;
//! println!("{}", result.messages[0].text());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod adapter;
mod config;
mod convert;
pub mod pricing;
mod stream;
mod types;

pub use adapter::{AnthropicAdapter, AnthropicModel};
pub use config::AnthropicConfig;
