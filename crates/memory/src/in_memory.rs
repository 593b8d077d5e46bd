//! In-memory archive — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logbard_core::error::MemoryError;
use logbard_core::memory::{MemoryArchive, MemoryRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An archive that keeps records in a Vec. Nothing survives a restart.
pub struct InMemoryArchive {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryArchive for InMemoryArchive {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, record: MemoryRecord) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        let duplicate = records
            .iter()
            .any(|r| r.owner_key == record.owner_key && r.content_hash == record.content_hash);
        if duplicate {
            return Ok(false);
        }
        records.push(record);
        Ok(true)
    }

    async fn for_owner(&self, owner_key: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        let mut owned: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| r.owner_key == owner_key)
            .cloned()
            .collect();
        owned.reverse(); // insertion order -> newest first
        Ok(owned)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.records.read().await.len())
    }

    async fn counts_by_owner(&self) -> Result<Vec<(String, usize)>, MemoryError> {
        let records = self.records.read().await;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in records.iter() {
            *counts.entry(record.owner_key.clone()).or_insert(0) += 1;
        }
        let mut out: Vec<(String, usize)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(out)
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, MemoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff);
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(owner: &str, hash: &str) -> MemoryRecord {
        MemoryRecord {
            id: hash.into(),
            owner_key: owner.into(),
            response_text: "resp".into(),
            source_text: "src".into(),
            embedding: vec![1.0, 0.0],
            timestamp: Utc::now(),
            metadata: serde_json::json!({}),
            content_hash: hash.into(),
        }
    }

    #[tokio::test]
    async fn insert_deduplicates() {
        let archive = InMemoryArchive::new();
        assert!(archive.insert(make_record("island", "h1")).await.unwrap());
        assert!(!archive.insert(make_record("island", "h1")).await.unwrap());
        assert_eq!(archive.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn for_owner_newest_first() {
        let archive = InMemoryArchive::new();
        archive.insert(make_record("island", "h1")).await.unwrap();
        archive.insert(make_record("island", "h2")).await.unwrap();

        let records = archive.for_owner("island").await.unwrap();
        assert_eq!(records[0].content_hash, "h2");
        assert_eq!(records[1].content_hash, "h1");
    }
}
