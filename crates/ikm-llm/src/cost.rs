//! Table-driven cost estimation.
//!
//! Adapters for vendors that do not report a price per response own a
//! [`PricingTable`] (passed in their config) and convert the vendor's raw
//! token counts into a [`TokenCounts`] before calling
//! [`PricingTable::estimate`]. Unknown models are priced with the table's
//! fallback entry, which vendors set deliberately high so spend is never
//! under-reported.

use std::collections::HashMap;

use tracing::{debug, warn};

const PER_MILLION: f64 = 1_000_000.0;

/// Prices in US dollars per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Uncached prompt tokens.
    pub input: f64,
    /// Prompt tokens served from the cache.
    pub cache_read: f64,
    /// Prompt tokens written to the cache.
    pub cache_write: f64,
    /// Completion tokens.
    pub output: f64,
}

impl ModelPricing {
    /// Creates a pricing entry.
    pub const fn new(input: f64, cache_read: f64, cache_write: f64, output: f64) -> Self {
        Self {
            input,
            cache_read,
            cache_write,
            output,
        }
    }

    /// Multiplies every rate by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            input: self.input * factor,
            cache_read: self.cache_read * factor,
            cache_write: self.cache_write * factor,
            output: self.output * factor,
        }
    }
}

/// Raw token counts split by how they are billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenCounts {
    /// Prompt tokens billed at the full input rate.
    pub input: u64,
    /// Prompt tokens read from the cache.
    pub cache_read: u64,
    /// Prompt tokens written to the cache.
    pub cache_write: u64,
    /// Completion tokens.
    pub output: u64,
}

/// Cost of one response with and without cache credit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostEstimate {
    /// What the response costs with cache rates applied.
    pub with_cache: f64,
    /// What it would have cost if every prompt token were billed as input.
    pub without_cache: f64,
}

impl CostEstimate {
    /// Dollars saved by the cache.
    pub fn savings(&self) -> f64 {
        self.without_cache - self.with_cache
    }
}

/// Model name to pricing, with a fallback for unknown models.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
    fallback: ModelPricing,
}

impl PricingTable {
    /// Creates an empty table that prices everything at `fallback`.
    pub fn new(fallback: ModelPricing) -> Self {
        Self {
            models: HashMap::new(),
            fallback,
        }
    }

    /// Adds or replaces the entry for `model`.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.models.insert(model.into(), pricing);
        self
    }

    /// The exact entry for `model`, if any.
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    /// The fallback entry.
    pub fn fallback(&self) -> &ModelPricing {
        &self.fallback
    }

    /// Estimates the cost of one response.
    pub fn estimate(&self, model: &str, tokens: &TokenCounts) -> CostEstimate {
        let pricing = self.get(model).unwrap_or_else(|| {
            warn!(model, "no pricing for model, using fallback rates");
            &self.fallback
        });

        #[allow(clippy::cast_precision_loss)]
        let millions = |n: u64| n as f64 / PER_MILLION;
        let output = millions(tokens.output) * pricing.output;
        let with_cache = millions(tokens.input) * pricing.input
            + millions(tokens.cache_read) * pricing.cache_read
            + millions(tokens.cache_write) * pricing.cache_write
            + output;
        let prompt = tokens
            .input
            .saturating_add(tokens.cache_read)
            .saturating_add(tokens.cache_write);
        let without_cache = millions(prompt) * pricing.input + output;

        let estimate = CostEstimate {
            with_cache,
            without_cache,
        };
        debug!(
            model,
            with_cache = estimate.with_cache,
            without_cache = estimate.without_cache,
            saved = estimate.savings(),
            "cost estimate"
        );
        estimate
    }
}
