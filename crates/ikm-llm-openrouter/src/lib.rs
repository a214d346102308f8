//! Chat-completions-style (`OpenRouter`) adapter for `ikm-llm`.
//!
//! This crate implements [`WireAdapter`](ikm_llm::WireAdapter) for the
//! streaming `/api/v1/chat/completions` API, with index-keyed tool-call
//! fragments, vendor-reported cost and history cache checkpoints.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ikm_llm::{rollup, CancellationToken, Message, Model, StreamConfig};
//! use ikm_llm_openrouter::{OpenRouterAdapter, OpenRouterConfig, OpenRouterModel};
//!
//! # async fn example() -> Result<(), ikm_llm::LlmError> {
//! let model = OpenRouterModel::new(OpenRouterAdapter::new(OpenRouterConfig {
//!     api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
//!     model: "openai/gpt-4o".into(),
//!     ..Default::default()
//! })?);
//!
//! let events = model.stream(
//!     &[Message::user("Hello!")],
//!     StreamConfig::default(),
//!     CancellationToken::new(),
//! );
//! let result = rollup(events).await?;
//! println!("{} (${:.4})", result.messages[0].text(), result.usage.total_cost);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod adapter;
mod config;
mod convert;
mod stream;
mod types;

pub use adapter::{OpenRouterAdapter, OpenRouterModel};
pub use config::{OpenRouterConfig, ProviderPreferences};
