//! Default `OpenAI` prices, in US dollars per million tokens.
//!
//! The Responses API reports no cache writes, so `cache_write` is billed
//! at the input rate.

use ikm_llm::cost::{ModelPricing, PricingTable};

/// `codex-mini-latest`.
pub const CODEX_MINI: ModelPricing = ModelPricing::new(1.5, 0.375, 1.5, 6.0);

/// `o3`.
pub const O3: ModelPricing = ModelPricing::new(2.0, 0.5, 2.0, 8.0);

/// `o4-mini`.
pub const O4_MINI: ModelPricing = ModelPricing::new(1.1, 0.275, 1.1, 4.4);

/// Ten times `o3`, for models missing from the table.
pub const FALLBACK: ModelPricing = ModelPricing::new(20.0, 5.0, 20.0, 80.0);

/// The table [`OpenAiConfig`](crate::OpenAiConfig) uses by default.
pub fn default_pricing() -> PricingTable {
    PricingTable::new(FALLBACK)
        .with_model("codex-mini-latest", CODEX_MINI)
        .with_model("o3", O3)
        .with_model("o4-mini", O4_MINI)
}
