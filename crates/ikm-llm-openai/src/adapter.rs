//! `OpenAI` [`WireAdapter`] implementation.

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

use crate::config::OpenAiConfig;
use crate::convert;
use crate::stream::{self, StreamState};

/// A tool-calling `OpenAI` model.
pub type OpenAiModel = Orchestrator<OpenAiAdapter>;

/// Responses-style wire protocol for `OpenAI`.
///
/// Requests never store state server-side (`store: false`); reasoning is
/// carried between turns as encrypted content.
///
/// # Example
///
/// ```rust,no_run
/// use ikm_llm_openai::{OpenAiAdapter, OpenAiConfig, OpenAiModel};
///
/// # fn example() -> Result<(), ikm_llm::LlmError> {
/// let model = OpenAiModel::new(OpenAiAdapter::new(OpenAiConfig {
///     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
///     model: "o4-mini".into(),
///     ..Default::default()
/// })?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenAiAdapter {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    /// Create a new adapter from configuration.
    ///
    /// If `config.client` is `Some`, that client is reused for connection
    /// pooling. Otherwise a new client is built with the configured timeout.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
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
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build the default headers for `OpenAI` API requests.
    fn default_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        if let Some(org) = &self.config.organization {
            headers.insert(
                "openai-organization",
                HeaderValue::from_str(org).map_err(|_| {
                    LlmError::InvalidRequest(
                        "Organization ID contains invalid header characters".into(),
                    )
                })?,
            );
        }

        Ok(headers)
    }

    /// Build the full URL for the responses endpoint.
    fn responses_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/v1/responses")
    }
}

impl WireAdapter for OpenAiAdapter {
    type State = StreamState;

    fn name(&self) -> &'static str {
        "openai"
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
            LlmError::InvalidRequest(format!("failed to encode OpenAI request: {e}"))
        })?;
        Ok(WireRequest {
            url: self.responses_url(),
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
        stream::parse_frame(frame, state, &self.config.pricing, &self.config.model, out)
    }

    fn finish(&self, state: &mut StreamState, out: &mut Vec<Event>) {
        stream::finish(state, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responses_url() {
        let adapter = OpenAiAdapter::new(OpenAiConfig {
            base_url: "http://localhost:1234/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(adapter.responses_url(), "http://localhost:1234/v1/responses");
        assert_eq!(adapter.name(), "openai");
    }

    #[test]
    fn test_default_headers() {
        let adapter = OpenAiAdapter::new(OpenAiConfig {
            api_key: "sk-test".into(),
            organization: Some("org-1".into()),
            ..Default::default()
        })
        .unwrap();
        let headers = adapter.default_headers().unwrap();
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(headers["openai-organization"], "org-1");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn test_invalid_api_key() {
        let adapter = OpenAiAdapter::new(OpenAiConfig {
            api_key: "bad\nkey".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            adapter.default_headers(),
            Err(LlmError::Auth(_))
        ));
    }
}
