//! Built-in pricing table for common LLM models.
//!
//! Prices are in USD per 1 million tokens. Each model has an input and
//! output price. Custom pricing can be added at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── Anthropic ──────────────────────────────────────────────
        prices.insert(
            "anthropic/claude-sonnet-4".into(),
            ModelPricing::new(3.0, 15.0),
        );
        prices.insert(
            "anthropic/claude-3.5-haiku".into(),
            ModelPricing::new(0.8, 4.0),
        );

        // ── OpenAI ─────────────────────────────────────────────────
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));

        // ── Google ─────────────────────────────────────────────────
        prices.insert(
            "google/gemini-2.0-flash".into(),
            ModelPricing::new(0.1, 0.4),
        );

        // ── Meta (via OpenRouter) ──────────────────────────────────
        prices.insert(
            "meta-llama/llama-3.1-8b".into(),
            ModelPricing::new(0.055, 0.055),
        );

        // ── DeepSeek ───────────────────────────────────────────────
        prices.insert("deepseek/deepseek-v3".into(), ModelPricing::new(0.27, 1.1));

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Look up pricing for a model. Returns None if not found.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        let prices = self.prices.read().unwrap();
        prices.get(model).cloned()
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap();
        prices.insert(model.into(), pricing);
    }

    /// Compute cost for a model call, returning 0.0 if the model is not in
    /// the table. Local models (Ollama) are free and simply stay unlisted.
    ///
    /// Matching is flexible: exact name first, then with common provider
    /// prefixes, then prefix matching so a versioned model id
    /// ("gpt-4o-mini-2024-07-18") still resolves ("openai/gpt-4o-mini").
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let prices = self.prices.read().unwrap();

        // 1. Exact match
        if let Some(p) = prices.get(model) {
            return p.cost(input_tokens, output_tokens);
        }

        // 2. Try with common provider prefixes
        for prefix in ["openai", "anthropic", "google", "deepseek", "meta-llama"] {
            if let Some(p) = prices.get(format!("{prefix}/{model}").as_str()) {
                return p.cost(input_tokens, output_tokens);
            }
        }

        // 3. Prefix match — model ids often carry a version suffix. The
        //    longest known name wins so "gpt-4o-mini-..." resolves to
        //    gpt-4o-mini, not gpt-4o.
        let bare = model.rsplit('/').next().unwrap_or(model).to_lowercase();
        prices
            .iter()
            .filter(|(name, _)| {
                let known_bare = name.rsplit('/').next().unwrap_or(name);
                bare.starts_with(known_bare)
            })
            .max_by_key(|(name, _)| name.rsplit('/').next().unwrap_or(name).len())
            .map(|(_, p)| p.cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_per_million() {
        let pricing = ModelPricing::new(3.0, 15.0);
        let cost = pricing.cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);
    }

    #[test]
    fn exact_match_wins() {
        let table = PricingTable::with_defaults();
        let cost = table.compute_cost("openai/gpt-4o", 1_000_000, 0);
        assert!((cost - 2.5).abs() < 1e-9);
    }

    #[test]
    fn bare_name_resolves_through_prefixes() {
        let table = PricingTable::with_defaults();
        let cost = table.compute_cost("gpt-4o-mini", 1_000_000, 0);
        assert!((cost - 0.15).abs() < 1e-9);
    }

    #[test]
    fn versioned_name_prefix_matches() {
        let table = PricingTable::with_defaults();
        let cost = table.compute_cost("gpt-4o-mini-2024-07-18", 1_000_000, 0);
        assert!((cost - 0.15).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_is_free() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.compute_cost("llama3.1:8b", 1_000_000, 0), 0.0);
    }

    #[test]
    fn overrides_replace_defaults() {
        let table = PricingTable::with_defaults();
        table.set("openai/gpt-4o", ModelPricing::new(1.0, 1.0));
        let cost = table.compute_cost("openai/gpt-4o", 1_000_000, 0);
        assert!((cost - 1.0).abs() < 1e-9);
    }
}
