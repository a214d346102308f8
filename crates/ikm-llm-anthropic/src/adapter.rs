//! Anthropic [`WireAdapter`] implementation.

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

use crate::config::AnthropicConfig;
use crate::convert;
use crate::stream::{self, StreamState};

/// A tool-calling Anthropic model.
pub type AnthropicModel = Orchestrator<AnthropicAdapter>;

/// Messages-style wire protocol for Anthropic Claude.
///
/// Supports extended thinking, parallel tool use and prompt-cache
/// markers on the latest user content.
///
/// # Example
///
/// ```rust,no_run
/// use ikm_llm::{Model, Orchestrator};
/// use ikm_llm_anthropic::{AnthropicAdapter, AnthropicConfig};
///
/// # fn example() -> Result<(), ikm_llm::LlmError> {
/// let adapter = AnthropicAdapter::new(AnthropicConfig {
///     api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
///     ..Default::default()
/// })?;
/// let model = Orchestrator::new(adapter);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AnthropicAdapter {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicAdapter {
    /// Create a new adapter from configuration.
    ///
    /// If `config.client` is `Some`, that client is reused for connection
    /// pooling. Otherwise a new client is built with the configured timeout.
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
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
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    /// Build the default headers for Anthropic API requests.
    fn default_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&self.config.api_version).map_err(|_| {
                LlmError::InvalidRequest("API version contains invalid header characters".into())
            })?,
        );
        if let Some(beta) = &self.config.beta {
            headers.insert(
                "anthropic-beta",
                HeaderValue::from_str(beta).map_err(|_| {
                    LlmError::InvalidRequest("beta header contains invalid characters".into())
                })?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Build the full URL for the messages endpoint.
    fn messages_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/v1/messages")
    }
}

impl WireAdapter for AnthropicAdapter {
    type State = StreamState;

    fn name(&self) -> &'static str {
        "anthropic"
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
            LlmError::InvalidRequest(format!("failed to encode Anthropic request: {e}"))
        })?;
        Ok(WireRequest {
            url: self.messages_url(),
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

    fn adapter(config: AnthropicConfig) -> AnthropicAdapter {
        AnthropicAdapter::new(config).unwrap()
    }

    #[test]
    fn test_messages_url_trims_slash() {
        let adapter = adapter(AnthropicConfig {
            base_url: "http://localhost:8080/".into(),
            ..Default::default()
        });
        assert_eq!(adapter.messages_url(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_default_headers() {
        let adapter = adapter(AnthropicConfig {
            api_key: "sk-ant-test".into(),
            ..Default::default()
        });
        let headers = adapter.default_headers().unwrap();
        assert_eq!(headers["x-api-key"], "sk-ant-test");
        assert_eq!(headers["anthropic-version"], "2023-06-01");
        assert_eq!(headers["anthropic-beta"], "interleaved-thinking-2025-05-14");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn test_beta_header_optional() {
        let adapter = adapter(AnthropicConfig {
            beta: None,
            ..Default::default()
        });
        let headers = adapter.default_headers().unwrap();
        assert!(headers.get("anthropic-beta").is_none());
    }

    #[test]
    fn test_invalid_api_key_is_auth_error() {
        let adapter = adapter(AnthropicConfig {
            api_key: "bad\nkey".into(),
            ..Default::default()
        });
        let err = adapter
            .build_request(&[Message::user("hi")], &[], &StreamConfig::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[test]
    fn test_reuses_supplied_client() {
        let adapter = adapter(AnthropicConfig {
            client: Some(reqwest::Client::new()),
            timeout: None,
            ..Default::default()
        });
        assert_eq!(adapter.name(), "anthropic");
        assert_eq!(adapter.model(), "claude-sonnet-4-20250514");
    }
}
