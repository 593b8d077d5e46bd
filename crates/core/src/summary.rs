//! Summary records — one per successful generation, append-only.
//!
//! An `owner_key` identifies one logical stream of history (one monitored
//! server, or one named group of servers). Records are immutable once
//! written and ordered per owner by their storage id, so "most recent N"
//! is always well-defined.

use crate::error::HistoryError;
use crate::token::TokenCounter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored summary (a previous generated response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Storage id. Monotonic per owner; assigned by the store.
    pub id: i64,

    /// The history stream this summary belongs to.
    pub owner_key: String,

    /// When this summary was written.
    pub timestamp: DateTime<Utc>,

    /// The response text.
    pub text: String,

    /// Token count of `text`, computed at write time with the deployment's
    /// shared counter. Always >= 1.
    pub token_count: usize,
}

/// A summary about to be written. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub owner_key: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub token_count: usize,
}

impl NewSummary {
    /// Build a record for `text`, counting tokens with the shared counter.
    ///
    /// The count is floored at 1: an empty response still occupies a slot
    /// in greedy budget accounting.
    pub fn counted(owner_key: impl Into<String>, text: impl Into<String>, counter: &dyn TokenCounter) -> Self {
        let text = text.into();
        let token_count = counter.count(&text).max(1);
        Self {
            owner_key: owner_key.into(),
            timestamp: Utc::now(),
            text,
            token_count,
        }
    }
}

/// Append-only storage for summary records.
///
/// Implementations: SQLite (production), in-memory (tests).
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// The store name (e.g., "sqlite").
    fn name(&self) -> &str;

    /// Append a summary; returns the assigned id.
    async fn append(&self, summary: NewSummary) -> std::result::Result<i64, HistoryError>;

    /// The newest `limit` records for `owner_key`, newest first.
    async fn newest_first(
        &self,
        owner_key: &str,
        limit: usize,
    ) -> std::result::Result<Vec<SummaryRecord>, HistoryError>;

    /// Records for `owner_key` no older than `cutoff`, oldest first.
    async fn since(
        &self,
        owner_key: &str,
        cutoff: DateTime<Utc>,
    ) -> std::result::Result<Vec<SummaryRecord>, HistoryError>;

    /// Total records stored for `owner_key`.
    async fn count(&self, owner_key: &str) -> std::result::Result<usize, HistoryError>;

    /// Earliest and latest timestamps for `owner_key`, if any records exist.
    async fn date_range(
        &self,
        owner_key: &str,
    ) -> std::result::Result<Option<(DateTime<Utc>, DateTime<Utc>)>, HistoryError>;
}
