//! Chat-completions-style adapter configuration.

use std::time::Duration;

use ikm_llm::cache::DEFAULT_CHECKPOINT_TOKENS;
use serde::Serialize;

/// Upstream provider routing, sent as the request's `provider` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderPreferences {
    /// Restrict requests to these providers (e.g. `["anthropic"]`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<String>,
    /// Preferred provider order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    /// Whether providers outside `order` may serve the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_fallbacks: Option<bool>,
}

/// Configuration for [`OpenRouterAdapter`](crate::OpenRouterAdapter).
///
/// ```rust
/// use ikm_llm_openrouter::{OpenRouterConfig, ProviderPreferences};
///
/// let config = OpenRouterConfig {
///     api_key: "sk-or-...".into(),
///     model: "anthropic/claude-sonnet-4".into(),
///     provider: Some(ProviderPreferences {
///         order: vec!["anthropic".into()],
///         allow_fallbacks: Some(false),
///         ..Default::default()
///     }),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// `OpenRouter` API key. Required.
    pub api_key: String,
    /// Model identifier (e.g. `"anthropic/claude-sonnet-4"`).
    pub model: String,
    /// Base URL for the API. Override for proxies or testing.
    pub base_url: String,
    /// Provider routing preferences.
    pub provider: Option<ProviderPreferences>,
    /// Token interval for moving the history cache checkpoint. `None`
    /// disables checkpoints.
    pub cache_checkpoint_tokens: Option<u64>,
    /// Client-level request timeout, a hard bound on every wire call.
    pub timeout: Option<Duration>,
    /// Pre-configured HTTP client for connection pooling across adapters.
    /// When `None`, a new client is created with `timeout`.
    pub client: Option<reqwest::Client>,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("provider", &self.provider)
            .field("cache_checkpoint_tokens", &self.cache_checkpoint_tokens)
            .field("timeout", &self.timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "anthropic/claude-sonnet-4".into(),
            base_url: "https://openrouter.ai".into(),
            provider: None,
            cache_checkpoint_tokens: Some(DEFAULT_CHECKPOINT_TOKENS),
            timeout: Some(Duration::from_secs(300)),
            client: None,
        }
    }
}
