//! Per-turn metric accumulation.

use crate::pricing::PricingTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics gathered over one user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMetrics {
    /// When the turn started.
    pub started_at: DateTime<Utc>,

    /// Completion rounds performed.
    pub iterations: u32,

    /// Tool calls executed across all rounds.
    pub tool_calls: u32,

    /// Prompt tokens summed across rounds.
    pub prompt_tokens: u32,

    /// Completion tokens summed across rounds.
    pub completion_tokens: u32,

    /// Estimated cost in USD for the whole turn.
    pub estimated_cost_usd: f64,
}

impl TurnMetrics {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            iterations: 0,
            tool_calls: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            estimated_cost_usd: 0.0,
        }
    }

    /// Record one completion round's token usage.
    pub fn record_round(&mut self, prompt_tokens: u32, completion_tokens: u32) {
        self.iterations += 1;
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
    }

    /// Total tokens consumed this turn.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Milliseconds elapsed since the turn started.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Price the accumulated usage through the table.
    pub fn finalize_cost(&mut self, table: &PricingTable, model: &str) {
        self.estimated_cost_usd =
            table.compute_cost(model, self.prompt_tokens, self.completion_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelPricing;

    #[test]
    fn rounds_accumulate() {
        let mut metrics = TurnMetrics::start();
        metrics.record_round(100, 20);
        metrics.record_round(150, 30);
        metrics.tool_calls += 2;

        assert_eq!(metrics.iterations, 2);
        assert_eq!(metrics.prompt_tokens, 250);
        assert_eq!(metrics.completion_tokens, 50);
        assert_eq!(metrics.total_tokens(), 300);
    }

    #[test]
    fn cost_finalization_uses_table() {
        let table = PricingTable::empty();
        table.set("test-model", ModelPricing::new(1.0, 2.0));

        let mut metrics = TurnMetrics::start();
        metrics.record_round(1_000_000, 500_000);
        metrics.finalize_cost(&table, "test-model");

        assert!((metrics.estimated_cost_usd - 2.0).abs() < 1e-9);
    }
}
