//! Messages-style adapter configuration.

use std::time::Duration;

use ikm_llm::cost::PricingTable;

use crate::pricing;

/// Configuration for [`AnthropicAdapter`](crate::AnthropicAdapter).
///
/// Defaults target the public endpoint with interleaved thinking enabled.
/// Drop the beta header for models that reject it:
///
/// ```rust
/// use ikm_llm_anthropic::AnthropicConfig;
///
/// let opus = AnthropicConfig {
///     model: "claude-opus-4-20250514".into(),
///     beta: None,
///     ..Default::default()
/// };
/// assert_eq!(opus.api_version, "2023-06-01");
/// ```
#[derive(Clone)]
pub struct AnthropicConfig {
    /// Sent as `x-api-key`.
    pub api_key: String,
    /// Model identifier, also the key into `pricing`.
    pub model: String,
    /// Scheme and host; `/v1/messages` is appended.
    pub base_url: String,
    /// `anthropic-version` header.
    pub api_version: String,
    /// `anthropic-beta` header, if any.
    pub beta: Option<String>,
    /// Client-level request timeout, a hard bound on every wire call.
    pub timeout: Option<Duration>,
    /// Pre-configured HTTP client for connection pooling across adapters.
    /// When `None`, a new client is created with `timeout`.
    pub client: Option<reqwest::Client>,
    /// Per-model prices used for [`Usage::total_cost`](ikm_llm::Usage).
    pub pricing: PricingTable,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("beta", &self.beta)
            .field("timeout", &self.timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-sonnet-4-20250514".into(),
            base_url: "https://api.anthropic.com".into(),
            api_version: "2023-06-01".into(),
            beta: Some("interleaved-thinking-2025-05-14".into()),
            timeout: Some(Duration::from_secs(300)),
            client: None,
            pricing: pricing::default_pricing(),
        }
    }
}
