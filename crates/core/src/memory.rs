//! Semantic memory records — embedded response/context pairs.
//!
//! Each record pairs a generated response with the log lines that prompted
//! it, plus a fixed-dimension embedding of the combined text. Records are
//! content-addressed: the same `(owner_key, combined text)` written twice
//! stores exactly one record.

use crate::error::MemoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single semantic memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique id for this memory.
    pub id: String,

    /// The history stream this memory belongs to.
    pub owner_key: String,

    /// The generated response text.
    pub response_text: String,

    /// The log lines that prompted the response, joined.
    pub source_text: String,

    /// Embedding of the combined response+context text. Fixed length per
    /// deployment; mismatched lengths are rejected at write time.
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// When this memory was stored.
    pub timestamp: DateTime<Utc>,

    /// Free-form metadata (log count, model name, ...).
    pub metadata: serde_json::Value,

    /// Content hash over owner key + combined text, for de-duplication.
    pub content_hash: String,
}

impl MemoryRecord {
    /// The combined text the embedding was computed over.
    pub fn combined_text(&self) -> String {
        combined_text(&self.response_text, &self.source_text)
    }
}

/// Build the canonical combined text for embedding and hashing.
pub fn combined_text(response_text: &str, source_text: &str) -> String {
    format!("Response: {response_text}\n\nContext: {source_text}")
}

/// Persistent storage for memory records.
#[async_trait]
pub trait MemoryArchive: Send + Sync {
    /// The archive name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Insert a record. Returns `false` (and stores nothing) when a record
    /// with the same `(owner_key, content_hash)` already exists.
    async fn insert(&self, record: MemoryRecord) -> std::result::Result<bool, MemoryError>;

    /// All records for `owner_key`, newest first.
    async fn for_owner(
        &self,
        owner_key: &str,
    ) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Total records across all owners.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;

    /// Per-owner record counts.
    async fn counts_by_owner(
        &self,
    ) -> std::result::Result<Vec<(String, usize)>, MemoryError>;

    /// Delete records older than `cutoff`; returns the number removed.
    async fn prune_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> std::result::Result<usize, MemoryError>;
}
