//! Responses-style adapter configuration.

use std::time::Duration;

use ikm_llm::cost::PricingTable;

use crate::pricing;

/// Configuration for [`OpenAiAdapter`](crate::OpenAiAdapter).
///
/// ```rust
/// use ikm_llm_openai::OpenAiConfig;
///
/// let config = OpenAiConfig {
///     model: "codex-mini-latest".into(),
///     user: Some("session-42".into()),
///     ..Default::default()
/// };
/// assert_eq!(config.base_url, "https://api.openai.com");
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Sent as a bearer token.
    pub api_key: String,
    /// Model identifier (e.g. `"o3"`, `"codex-mini-latest"`).
    pub model: String,
    /// Base URL for the API. Override for proxies or local servers.
    pub base_url: String,
    /// Sent as `openai-organization` when set.
    pub organization: Option<String>,
    /// End-user identifier sent as `user`.
    pub user: Option<String>,
    /// Client-level request timeout, a hard bound on every wire call.
    pub timeout: Option<Duration>,
    /// Pre-configured HTTP client for connection pooling across adapters.
    /// When `None`, a new client is created with `timeout`.
    pub client: Option<reqwest::Client>,
    /// Per-model prices used for [`Usage::total_cost`](ikm_llm::Usage).
    pub pricing: PricingTable,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "o3".into(),
            base_url: "https://api.openai.com".into(),
            organization: None,
            user: None,
            timeout: Some(Duration::from_secs(300)),
            client: None,
            pricing: pricing::default_pricing(),
        }
    }
}
