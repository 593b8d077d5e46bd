//! Token budget allocation.
//!
//! Given an assembled prompt, compute how many output tokens the generator
//! may spend: whatever remains of the context window after the prompt and a
//! safety buffer, bounded to the configured output range. When the prompt
//! leaves less than the minimum, the planner degrades to a conservative
//! floor instead of failing — a degraded cycle still generates.

use logbard_config::BudgetConfig;
use logbard_core::token::{HeuristicCounter, TokenCounter};
use std::sync::Arc;
use tracing::{debug, warn};

/// The outcome of planning one generation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GenerationBudget {
    /// Tokens counted in the prompt.
    pub prompt_tokens: usize,

    /// Context window minus prompt minus safety buffer. May be negative.
    pub available: i64,

    /// Output token ceiling handed to the generator.
    pub num_predict: u32,

    /// True when the floor fallback was applied (limited headroom).
    pub degraded: bool,
}

/// Plans generation budgets. Pure over its inputs; reusable.
pub struct BudgetPlanner {
    cfg: BudgetConfig,
    counter: Arc<dyn TokenCounter>,
}

impl BudgetPlanner {
    pub fn new(cfg: BudgetConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { cfg, counter }
    }

    /// The counter used for prompt accounting — the same one summary
    /// records must be counted with.
    pub fn counter(&self) -> Arc<dyn TokenCounter> {
        self.counter.clone()
    }

    /// Compute the generation ceiling for `prompt`.
    pub fn plan(&self, prompt: &str) -> GenerationBudget {
        let prompt_tokens = self.counter.count(prompt);
        let window = self.cfg.context_window as i64;
        let available = window - prompt_tokens as i64 - self.cfg.safety_buffer as i64;

        let (num_predict, degraded) = if available >= self.cfg.min_output_tokens as i64 {
            (
                (available as usize).min(self.cfg.max_output_tokens),
                false,
            )
        } else {
            let floor = self
                .cfg
                .min_output_tokens
                .min(self.cfg.context_window / 8)
                .max(8);
            let capped = floor.min(self.cfg.max_output_tokens);
            warn!(
                "Limited context space: prompt={prompt_tokens}, available={available}, \
                 falling back to {capped} output tokens"
            );
            (capped, true)
        };

        debug!(
            "Token allocation: prompt={prompt_tokens}, ctx={}, buffer={}, num_predict={num_predict}",
            self.cfg.context_window, self.cfg.safety_buffer
        );

        GenerationBudget {
            prompt_tokens,
            available,
            num_predict: num_predict as u32,
            degraded,
        }
    }
}

/// Build the deployment's token counter from configuration.
///
/// Prefers the exact tokenizer when the `hf-tokenizer` feature is enabled
/// and a tokenizer file is configured; any load failure logs the
/// degradation and falls back to the heuristic. Never fails.
pub fn build_counter(cfg: &BudgetConfig) -> Arc<dyn TokenCounter> {
    #[cfg(feature = "hf-tokenizer")]
    if let Some(path) = &cfg.tokenizer_file {
        match crate::exact::HfTokenCounter::from_file(path) {
            Ok(counter) => {
                tracing::info!("Using exact tokenizer from {path}");
                return Arc::new(counter);
            }
            Err(e) => {
                warn!("Failed to load tokenizer from {path}: {e}; using heuristic counting");
            }
        }
    }

    #[cfg(not(feature = "hf-tokenizer"))]
    if cfg.tokenizer_file.is_some() {
        warn!("tokenizer_file configured but the hf-tokenizer feature is off; using heuristic counting");
    }

    Arc::new(HeuristicCounter)
}
