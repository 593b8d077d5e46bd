//! The context assembler — merges every tier into one bounded prompt.
//!
//! Per request: classify the new event lines into entity profiles, gather
//! the three retrieval tiers concurrently (each under its own timeout),
//! merge in a fixed order, and compute the generation budget for the
//! result. A failed tier contributes nothing; the only hard error is a
//! request with nothing to assemble at all.

use crate::budget::{BudgetPlanner, GenerationBudget};
use logbard_config::AssemblerConfig;
use logbard_core::summary::{NewSummary, SummaryStore};
use logbard_core::tier::TierOutcome;
use logbard_history::ThreadManager;
use logbard_memory::SemanticMemory;
use logbard_profiles::ProfileManager;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Instruction placed between the gathered context and the new events.
const NON_REPETITION_INSTRUCTION: &str =
    "Above are my previous responses and what I know about the players. \
     Write something new - do not repeat jokes or phrasing from earlier responses.";

/// Errors from context assembly. Tier failures are not errors; this fires
/// only when no prompt can be built at all.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("nothing to assemble: empty owner key and no event lines")]
    NothingToAssemble,
}

/// The assembled prompt plus everything the caller needs to act on it.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    /// The merged prompt text.
    pub prompt: String,

    /// Entities extracted from the new event lines, for keying the
    /// eventual response write-back.
    pub entities: BTreeSet<String>,

    /// The computed generation budget.
    pub budget: GenerationBudget,

    /// Per-tier accounting for logs and diagnostics.
    pub tiers: TierReport,
}

/// What each tier contributed to the prompt.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TierReport {
    pub history_items: usize,
    pub memory_items: usize,
    pub entity_block_chars: usize,
    /// Reasons for any tier that failed or timed out.
    pub degraded: Vec<String>,
}

/// Composes history, semantic memory, and entity profiles into prompts.
pub struct ContextAssembler {
    history: Arc<ThreadManager>,
    memory: Arc<SemanticMemory>,
    profiles: Arc<ProfileManager>,
    summaries: Arc<dyn SummaryStore>,
    planner: BudgetPlanner,
    tier_timeout: Duration,
    blurb_max_chars: usize,
}

impl ContextAssembler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        history: Arc<ThreadManager>,
        memory: Arc<SemanticMemory>,
        profiles: Arc<ProfileManager>,
        summaries: Arc<dyn SummaryStore>,
        planner: BudgetPlanner,
        assembler_cfg: &AssemblerConfig,
        blurb_max_chars: usize,
    ) -> Self {
        Self {
            history,
            memory,
            profiles,
            summaries,
            planner,
            tier_timeout: Duration::from_secs(assembler_cfg.tier_timeout_secs),
            blurb_max_chars,
        }
    }

    /// Assemble a prompt for `new_event_lines` on `owner_key`.
    ///
    /// `total_token_budget` bounds the history tier; the semantic tier is
    /// bounded by its top-k and the entity tier by its character cap.
    pub async fn assemble(
        &self,
        owner_key: &str,
        new_event_lines: &[String],
        total_token_budget: usize,
    ) -> Result<AssembledPrompt, AssemblyError> {
        if owner_key.trim().is_empty() && new_event_lines.is_empty() {
            return Err(AssemblyError::NothingToAssemble);
        }

        // Profile mutation happens before retrieval so the blurbs below see
        // this batch. A retry that repeats this step only re-increments
        // counters — accepted, bounded inaccuracy.
        let entities = self.profiles.ingest(new_event_lines, owner_key).await;
        let entity_list: Vec<String> = entities.iter().cloned().collect();
        let query_text = new_event_lines.join("\n");

        // The three tiers have no mutual dependency; issue them together
        // and let each one degrade independently on timeout.
        let (history_result, memory_result, entity_result) = tokio::join!(
            timeout(
                self.tier_timeout,
                self.history.contextual_history(owner_key, total_token_budget),
            ),
            timeout(self.tier_timeout, self.memory.search(&query_text, owner_key)),
            timeout(
                self.tier_timeout,
                self.profiles.entity_summaries(&entity_list, self.blurb_max_chars),
            ),
        );

        let history_outcome =
            history_result.unwrap_or_else(|_| TierOutcome::degraded("history tier timed out"));
        let memory_outcome =
            memory_result.unwrap_or_else(|_| TierOutcome::degraded("semantic tier timed out"));
        let entity_outcome = match entity_result {
            Ok(block) if block.is_empty() => TierOutcome::Empty,
            Ok(block) => TierOutcome::Full(block),
            Err(_) => TierOutcome::degraded("entity tier timed out"),
        };

        let mut report = TierReport::default();
        for (name, outcome) in [
            ("history", history_outcome.is_degraded()),
            ("semantic", memory_outcome.is_degraded()),
            ("entities", entity_outcome.is_degraded()),
        ] {
            if outcome {
                warn!("{name} tier degraded for {owner_key}");
                report.degraded.push(name.to_string());
            }
        }

        let history_texts = history_outcome.unwrap_or_default();
        let memory_texts = memory_outcome.unwrap_or_default();
        let entity_block = entity_outcome.into_value().unwrap_or_default();
        report.history_items = history_texts.len();
        report.memory_items = memory_texts.len();
        report.entity_block_chars = entity_block.chars().count();

        // Fixed merge order: long-term context first, the freshest material
        // last, so the model reads history the way it happened.
        let mut sections: Vec<String> = Vec::new();
        if !history_texts.is_empty() {
            sections.push(format!(
                "My previous responses for this server:\n{}",
                history_texts.join("\n")
            ));
        }
        if !memory_texts.is_empty() {
            sections.push(format!(
                "Moments I remember from similar events:\n{}",
                memory_texts.join("\n")
            ));
        }
        if !entity_block.is_empty() {
            sections.push(format!("Players involved:\n{entity_block}"));
        }
        sections.push(NON_REPETITION_INSTRUCTION.to_string());
        sections.push(format!(
            "New events:\n---\n{}\n---",
            new_event_lines.join("\n")
        ));

        let prompt = sections.join("\n\n");
        let budget = self.planner.plan(&prompt);

        debug!(
            "Assembled prompt for {owner_key}: {} tokens, num_predict {}, {} history / {} memories",
            budget.prompt_tokens, budget.num_predict, report.history_items, report.memory_items
        );

        Ok(AssembledPrompt {
            prompt,
            entities,
            budget,
            tiers: report,
        })
    }

    /// Write a generated response back into both stores so future cycles
    /// can retrieve it.
    ///
    /// The summary write is the ordering-critical one and propagates its
    /// error; the semantic write is best-effort.
    pub async fn record_response(
        &self,
        owner_key: &str,
        response_text: &str,
        source_lines: &[String],
    ) -> logbard_core::Result<()> {
        let counter = self.planner.counter();
        let summary = NewSummary::counted(owner_key, response_text, counter.as_ref());
        self.summaries
            .append(summary)
            .await
            .map_err(logbard_core::Error::History)?;

        let stored = self
            .memory
            .store(
                owner_key,
                response_text,
                &source_lines.join("\n"),
                json!({ "log_count": source_lines.len() }),
            )
            .await;
        debug!("Recorded response for {owner_key} (semantic stored: {stored})");

        Ok(())
    }
}
