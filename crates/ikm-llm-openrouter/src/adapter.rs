//! `OpenRouter` [`WireAdapter`] implementation.

use std::ops::ControlFlow;

use ikm_llm::chat::Message;
use ikm_llm::config::StreamConfig;
use ikm_llm::error::LlmError;
use ikm_llm::event::Event;
use ikm_llm::orchestrator::Orchestrator;
use ikm_llm::tool::ToolSpec;
use ikm_llm::wire::{SseFrame, WireAdapter, WireRequest};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::instrument;

use crate::config::OpenRouterConfig;
use crate::convert;
use crate::stream::{self, StreamState};

/// A tool-calling model served through `OpenRouter`.
pub type OpenRouterModel = Orchestrator<OpenRouterAdapter>;

/// Chat-completions-style wire protocol for `OpenRouter`.
///
/// Usage and cost are reported by the vendor in the stream, so no local
/// pricing table is consulted. History cache checkpoints are enabled by
/// default.
#[derive(Debug)]
pub struct OpenRouterAdapter {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterAdapter {
    /// Create a new adapter from configuration.
    ///
    /// If `config.client` is `Some`, that client is reused for connection
    /// pooling. Otherwise a new client is built with the configured timeout.
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let client = match config.client.clone() {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    LlmError::InvalidRequest(format!("failed to build HTTP client: {e}"))
                })?
            }
        };
        Ok(Self { config, client })
    }

    /// The adapter's configuration.
    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    fn default_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/api/v1/chat/completions")
    }
}

impl WireAdapter for OpenRouterAdapter {
    type State = StreamState;

    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    #[instrument(skip_all, fields(model = %self.config.model, messages = messages.len()))]
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        config: &StreamConfig,
    ) -> Result<WireRequest, LlmError> {
        let request = convert::build_request(messages, tools, config, &self.config)?;
        let body = serde_json::to_value(&request).map_err(|e| {
            LlmError::InvalidRequest(format!("failed to encode OpenRouter request: {e}"))
        })?;
        Ok(WireRequest {
            url: self.completions_url(),
            headers: self.default_headers()?,
            body,
        })
    }

    fn parse_frame(
        &self,
        frame: &SseFrame,
        state: &mut StreamState,
        out: &mut Vec<Event>,
    ) -> ControlFlow<()> {
        stream::parse_frame(frame, state, out)
    }

    fn finish(&self, state: &mut StreamState, out: &mut Vec<Event>) {
        stream::finish(state, out);
    }

    fn cache_checkpoint_interval(&self) -> Option<u64> {
        self.config.cache_checkpoint_tokens
    }
}
