//! Thread-aware history retrieval under a token budget.
//!
//! The budget is split between the freshest exchange (conversation flow)
//! and older context. Both portions use the same greedy accounting over the
//! `token_count` stored on each record, so selection can never drift from
//! the budget math used elsewhere.

use crate::threading::{group_threads, ConversationThread};
use chrono::{DateTime, Duration, Utc};
use logbard_config::{HistoryConfig, ThreadingConfig};
use logbard_core::error::HistoryError;
use logbard_core::summary::{SummaryRecord, SummaryStore};
use logbard_core::tier::TierOutcome;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Retrieves bounded, thread-aware history for one owner.
pub struct ThreadManager {
    store: Arc<dyn SummaryStore>,
    history: HistoryConfig,
    threading: ThreadingConfig,
}

/// Statistics about the history available for an owner.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContextStatistics {
    pub owner_key: String,
    pub total_summaries: usize,
    pub recent_summaries_7d: usize,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl ThreadManager {
    pub fn new(
        store: Arc<dyn SummaryStore>,
        history: HistoryConfig,
        threading: ThreadingConfig,
    ) -> Self {
        Self {
            store,
            history,
            threading,
        }
    }

    /// Retrieve history texts for `owner_key` within `total_token_budget`.
    ///
    /// The result is ordered oldest-to-newest overall: long-term context
    /// first, then the freshest exchange, so the model reads history the
    /// way it happened. Storage trouble degrades the affected portion to
    /// empty; the whole call degrades only when nothing was retrievable.
    pub async fn contextual_history(
        &self,
        owner_key: &str,
        total_token_budget: usize,
    ) -> TierOutcome<Vec<String>> {
        let conversation_budget =
            (total_token_budget as f32 * self.history.conversation_weight) as usize;
        let historical_budget = total_token_budget - conversation_budget;

        let mut failures: Vec<String> = Vec::new();

        // Conversation portion: the newest few records, greedily accepted
        // newest-first, then re-reversed into chronological order.
        let mut conversation: Vec<String> = Vec::new();
        match self
            .store
            .newest_first(owner_key, self.history.conversation_depth)
            .await
        {
            Ok(records) => {
                let mut used = 0usize;
                for record in &records {
                    if used + record.token_count > conversation_budget {
                        break;
                    }
                    used += record.token_count;
                    conversation.push(record.text.clone());
                }
                conversation.reverse();
            }
            Err(e) => {
                warn!("Conversation portion failed for {owner_key}: {e}");
                failures.push(e.to_string());
            }
        }

        // Historical portion: an independent, deeper greedy walk. Records
        // already chosen for the conversation portion are skipped without
        // charging the historical budget, so older material can still fill
        // the window behind them.
        let chosen: HashSet<&str> = conversation.iter().map(String::as_str).collect();
        let mut historical: Vec<String> = Vec::new();
        match self
            .store
            .newest_first(owner_key, self.history.historical_scan_depth)
            .await
        {
            Ok(records) => {
                let mut used = 0usize;
                for record in &records {
                    if chosen.contains(record.text.as_str()) {
                        continue;
                    }
                    if used + record.token_count > historical_budget {
                        break;
                    }
                    used += record.token_count;
                    historical.push(record.text.clone());
                }
                historical.reverse();
            }
            Err(e) => {
                warn!("Historical portion failed for {owner_key}: {e}");
                failures.push(e.to_string());
            }
        }

        debug!(
            "History for {owner_key}: {} historical + {} conversation items (budget {total_token_budget})",
            historical.len(),
            conversation.len()
        );

        let mut combined = historical;
        combined.extend(conversation);

        if combined.is_empty() && !failures.is_empty() {
            TierOutcome::degraded(failures.join("; "))
        } else {
            TierOutcome::from_items(combined)
        }
    }

    /// Recent summaries grouped into conversation threads, oldest first.
    pub async fn threads(
        &self,
        owner_key: &str,
    ) -> Result<Vec<ConversationThread>, HistoryError> {
        let mut records = self
            .store
            .newest_first(owner_key, self.history.historical_scan_depth)
            .await?;
        records.reverse();
        Ok(group_threads(&records, &self.threading))
    }

    /// Summaries from the last `days` days, oldest first.
    pub async fn recent_window(
        &self,
        owner_key: &str,
        days: i64,
    ) -> Result<Vec<SummaryRecord>, HistoryError> {
        self.store
            .since(owner_key, Utc::now() - Duration::days(days))
            .await
    }

    /// Statistics about available context for `owner_key`.
    pub async fn statistics(&self, owner_key: &str) -> Result<ContextStatistics, HistoryError> {
        let total = self.store.count(owner_key).await?;
        let recent = self
            .store
            .since(owner_key, Utc::now() - Duration::days(7))
            .await?
            .len();
        let range = self.store.date_range(owner_key).await?;

        Ok(ContextStatistics {
            owner_key: owner_key.to_string(),
            total_summaries: total,
            recent_summaries_7d: recent,
            earliest: range.map(|(earliest, _)| earliest),
            latest: range.map(|(_, latest)| latest),
        })
    }
}
