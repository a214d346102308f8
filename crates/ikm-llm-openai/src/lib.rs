//! Responses-style (`OpenAI`) adapter for `ikm-llm`.
//!
//! This crate implements [`WireAdapter`](ikm_llm::WireAdapter) for the
//! streaming `/v1/responses` API, with reasoning effort, encrypted
//! reasoning carry-over and function calling.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ikm_llm::{rollup, CancellationToken, Message, Model, StreamConfig};
//! use ikm_llm_openai::{OpenAiAdapter, OpenAiConfig, OpenAiModel};
//!
//! # async fn example() -> Result<(), ikm_llm::LlmError> {
//! let model = OpenAiModel::new(OpenAiAdapter::new(OpenAiConfig {
//!     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
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

pub use adapter::{OpenAiAdapter, OpenAiModel};
pub use config::OpenAiConfig;
