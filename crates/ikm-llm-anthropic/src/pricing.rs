//! Default Anthropic prices, in US dollars per million tokens.

use ikm_llm::cost::{ModelPricing, PricingTable};

/// Claude Sonnet 4.
pub const SONNET_4: ModelPricing = ModelPricing::new(3.0, 0.3, 3.75, 15.0);

/// Claude Opus 4.
pub const OPUS_4: ModelPricing = ModelPricing::new(15.0, 1.5, 18.75, 75.0);

/// Unknown models are priced at twice Opus so spend is never under-reported.
pub const FALLBACK: ModelPricing = ModelPricing::new(30.0, 3.0, 37.5, 150.0);

/// The table [`AnthropicConfig`](crate::AnthropicConfig) uses by default.
pub fn default_pricing() -> PricingTable {
    PricingTable::new(FALLBACK)
        .with_model("claude-sonnet-4-20250514", SONNET_4)
        .with_model("claude-opus-4-20250514", OPUS_4)
}

#[cfg(test)]
mod tests {
    use ikm_llm::cost::TokenCounts;

    use super::*;

    #[test]
    fn test_sonnet_estimate_with_cache() {
        let table = default_pricing();
        let estimate = table.estimate(
            "claude-sonnet-4-20250514",
            &TokenCounts {
                input: 1_000_000,
                cache_read: 1_000_000,
                cache_write: 1_000_000,
                output: 1_000_000,
            },
        );
        assert!((estimate.with_cache - (3.0 + 0.3 + 3.75 + 15.0)).abs() < 1e-9);
        assert!((estimate.without_cache - (9.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let table = default_pricing();
        let estimate = table.estimate(
            "claude-unknown",
            &TokenCounts {
                output: 1_000_000,
                ..TokenCounts::default()
            },
        );
        assert!((estimate.with_cache - 150.0).abs() < 1e-9);
    }
}
