//! The semantic memory engine.
//!
//! Wraps an embedding collaborator and a memory archive behind the two
//! operations the assembler needs: `store` a response/context pair, and
//! `search` for past responses similar to new event text. Both operations
//! are total — backend trouble degrades to "no memories," it never
//! propagates.

use crate::vector::{cosine_similarity, interpret_similarity, rank_by_similarity};
use chrono::Utc;
use logbard_core::collaborator::Embedder;
use logbard_core::error::{MemoryError, ProviderError};
use logbard_core::memory::{combined_text, MemoryArchive, MemoryRecord};
use logbard_core::tier::TierOutcome;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Semantic memory over an archive and an optional embedding backend.
///
/// Constructed without an embedder (or after the backend reports itself
/// unavailable) the engine runs in disabled mode: `store` returns `false`
/// and `search` returns `Empty`, indistinguishable at the call site from
/// "nothing relevant found."
pub struct SemanticMemory {
    archive: Arc<dyn MemoryArchive>,
    embedder: Option<Arc<dyn Embedder>>,
    relevance_threshold: f32,
    top_k: usize,

    /// Latched when the backend reports itself unavailable. One-way.
    disabled: AtomicBool,

    /// Embedding dimension, fixed by the first successful embed.
    dimension: OnceLock<usize>,
}

/// Diagnostic report for `explain` — used to tune the relevance threshold.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimilarityReport {
    pub embedding_dimensions: usize,
    pub magnitude_a: f64,
    pub magnitude_b: f64,
    pub dot_product: f64,
    pub cosine_similarity: f32,
    pub interpretation: &'static str,
    pub passes_threshold: bool,
    pub threshold: f32,
}

/// Aggregate statistics over stored memories.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryStats {
    pub enabled: bool,
    pub total_memories: usize,
    pub per_owner: Vec<(String, usize)>,
    pub dimension: Option<usize>,
}

impl SemanticMemory {
    /// Create an engine. Pass `None` for the embedder to run disabled.
    pub fn new(
        archive: Arc<dyn MemoryArchive>,
        embedder: Option<Arc<dyn Embedder>>,
        relevance_threshold: f32,
        top_k: usize,
    ) -> Self {
        if embedder.is_none() {
            info!("Semantic memory disabled - no embedding backend configured");
        }

        // Backends that already know their dimensionality fix the
        // deployment dimension up front; the rest set it on first embed.
        let dimension = OnceLock::new();
        if let Some(d) = embedder.as_ref().and_then(|e| e.dimension()) {
            let _ = dimension.set(d);
        }

        Self {
            archive,
            embedder,
            relevance_threshold,
            top_k,
            disabled: AtomicBool::new(false),
            dimension,
        }
    }

    /// Whether the semantic tier is currently operational.
    pub fn enabled(&self) -> bool {
        self.embedder.is_some() && !self.disabled.load(Ordering::Relaxed)
    }

    /// Embed a text, absorbing every failure mode.
    ///
    /// A `NotConfigured` error latches the disabled state for the rest of
    /// the process lifetime and is logged exactly once; transient errors
    /// just fail this one call.
    async fn embed_guarded(&self, text: &str) -> Option<Vec<f32>> {
        if !self.enabled() {
            return None;
        }
        let embedder = self.embedder.as_ref()?;

        match embedder.embed(text).await {
            Ok(embedding) => {
                self.dimension.get_or_init(|| embedding.len());
                Some(embedding)
            }
            Err(ProviderError::NotConfigured(reason)) => {
                if !self.disabled.swap(true, Ordering::Relaxed) {
                    warn!("Embedding backend unavailable, semantic memory disabled: {reason}");
                }
                None
            }
            Err(e) => {
                debug!("Embedding failed: {e}");
                None
            }
        }
    }

    /// Store a response/context pair.
    ///
    /// Returns `false` — a no-op, not an error — on duplicate content,
    /// disabled mode, embedding failure, or dimension mismatch.
    pub async fn store(
        &self,
        owner_key: &str,
        response_text: &str,
        source_text: &str,
        metadata: serde_json::Value,
    ) -> bool {
        let combined = combined_text(response_text, source_text);
        let Some(embedding) = self.embed_guarded(&combined).await else {
            return false;
        };

        if let Some(&expected) = self.dimension.get() {
            if embedding.len() != expected {
                warn!(
                    "Rejecting memory write: embedding dimension {} != deployment dimension {expected}",
                    embedding.len()
                );
                return false;
            }
        }

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            owner_key: owner_key.to_string(),
            response_text: response_text.to_string(),
            source_text: source_text.to_string(),
            embedding,
            timestamp: Utc::now(),
            metadata,
            content_hash: content_hash(owner_key, &combined),
        };

        match self.archive.insert(record).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to store memory for {owner_key}: {e}");
                false
            }
        }
    }

    /// Find past responses semantically similar to `query_text`.
    ///
    /// Returns response texts sorted by descending similarity, at most
    /// `top_k`, all at or above the relevance threshold. Disabled mode is
    /// `Empty`; backend or storage trouble is `Degraded`.
    pub async fn search(&self, query_text: &str, owner_key: &str) -> TierOutcome<Vec<String>> {
        if !self.enabled() {
            return TierOutcome::Empty;
        }

        let Some(query_embedding) = self.embed_guarded(query_text).await else {
            // embed_guarded may have just latched disabled mode
            if !self.enabled() {
                return TierOutcome::Empty;
            }
            return TierOutcome::degraded("query embedding failed");
        };

        let records = match self.archive.for_owner(owner_key).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Memory search storage error for {owner_key}: {e}");
                return TierOutcome::degraded(e);
            }
        };

        if records.is_empty() {
            return TierOutcome::Empty;
        }

        let ranked = rank_by_similarity(
            &records,
            &query_embedding,
            self.top_k,
            self.relevance_threshold,
        );

        info!(
            "Vector search for {owner_key}: {} similar memories from {} stored (threshold {})",
            ranked.len(),
            records.len(),
            self.relevance_threshold
        );

        TierOutcome::from_items(ranked.into_iter().map(|(_, r)| r.response_text).collect())
    }

    /// Explain the similarity calculation between two raw texts.
    pub async fn explain(
        &self,
        text_a: &str,
        text_b: &str,
    ) -> Result<SimilarityReport, MemoryError> {
        if !self.enabled() {
            return Err(MemoryError::EmbeddingUnavailable(
                "semantic memory is disabled".into(),
            ));
        }

        let a = self
            .embed_guarded(text_a)
            .await
            .ok_or_else(|| MemoryError::EmbeddingFailed("first text".into()))?;
        let b = self
            .embed_guarded(text_b)
            .await
            .ok_or_else(|| MemoryError::EmbeddingFailed("second text".into()))?;

        let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
        let magnitude_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let magnitude_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let similarity = cosine_similarity(&a, &b);

        Ok(SimilarityReport {
            embedding_dimensions: a.len(),
            magnitude_a,
            magnitude_b,
            dot_product: dot,
            cosine_similarity: similarity,
            interpretation: interpret_similarity(similarity),
            passes_threshold: similarity >= self.relevance_threshold,
            threshold: self.relevance_threshold,
        })
    }

    /// Aggregate statistics about stored memories.
    pub async fn stats(&self) -> Result<MemoryStats, MemoryError> {
        Ok(MemoryStats {
            enabled: self.enabled(),
            total_memories: self.archive.count().await?,
            per_owner: self.archive.counts_by_owner().await?,
            dimension: self.dimension.get().copied(),
        })
    }

    /// Delete memories older than `cutoff`; returns the number removed.
    pub async fn prune_older_than(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<usize, MemoryError> {
        self.archive.prune_older_than(cutoff).await
    }
}

/// Content hash for de-duplication: SHA-256 over owner key and combined
/// text, truncated to 16 hex characters.
fn content_hash(owner_key: &str, combined: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner_key.as_bytes());
    hasher.update(b"\0");
    hasher.update(combined.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryArchive;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Deterministic embedder: looks texts up in a fixed table, with a
    /// fallback vector for anything else.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        fallback: Vec<f32>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        fn name(&self) -> &str {
            "table"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            for (key, vec) in &self.table {
                if text.contains(key.as_str()) {
                    return Ok(vec.clone());
                }
            }
            Ok(self.fallback.clone())
        }

        fn dimension(&self) -> Option<usize> {
            Some(self.fallback.len())
        }
    }

    /// Embedder whose backend is permanently gone.
    struct UnavailableEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for UnavailableEmbedder {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(ProviderError::NotConfigured("model missing".into()))
        }

        fn dimension(&self) -> Option<usize> {
            None
        }
    }

    fn engine_with(
        embedder: Option<Arc<dyn Embedder>>,
        threshold: f32,
        top_k: usize,
    ) -> SemanticMemory {
        SemanticMemory::new(Arc::new(InMemoryArchive::new()), embedder, threshold, top_k)
    }

    #[tokio::test]
    async fn store_then_search_round_trip() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(
            &[
                ("stone castle", vec![1.0, 0.0]),
                ("fortress", vec![1.0, 0.0]),
            ],
            vec![0.0, 1.0],
        ));
        let memory = engine_with(Some(embedder), 0.5, 5);

        assert!(
            memory
                .store("island", "Player built a stone castle", "log", serde_json::json!({}))
                .await
        );

        let results = memory.search("constructing a fortress", "island").await;
        let texts = results.into_value().unwrap();
        assert_eq!(texts, vec!["Player built a stone castle".to_string()]);
    }

    #[tokio::test]
    async fn threshold_excludes_dissimilar_memories() {
        // Query embeds to [1, 0]. Castle memory has cosine 0.85 against it,
        // raptor memory 0.2 — with threshold 0.7 only the castle survives.
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(
            &[
                ("fortress", vec![1.0, 0.0]),
                ("stone castle", vec![0.85, (1.0f32 - 0.85 * 0.85).sqrt()]),
                ("Raptor pack", vec![0.2, (1.0f32 - 0.2 * 0.2).sqrt()]),
            ],
            vec![0.0, 1.0],
        ));
        let memory = engine_with(Some(embedder), 0.7, 5);

        memory
            .store("island", "Player built a stone castle", "log a", serde_json::json!({}))
            .await;
        memory
            .store("island", "Raptor pack attacked", "log b", serde_json::json!({}))
            .await;

        let texts = memory
            .search("constructing a fortress", "island")
            .await
            .into_value()
            .unwrap();
        assert_eq!(texts, vec!["Player built a stone castle".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_store_is_noop() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(&[], vec![1.0, 0.0]));
        let memory = engine_with(Some(embedder), 0.5, 5);

        assert!(memory.store("island", "resp", "src", serde_json::json!({})).await);
        assert!(!memory.store("island", "resp", "src", serde_json::json!({})).await);
        assert_eq!(memory.stats().await.unwrap().total_memories, 1);
    }

    #[tokio::test]
    async fn disabled_mode_is_silent() {
        let memory = engine_with(None, 0.7, 5);
        assert!(!memory.enabled());
        assert!(!memory.store("island", "resp", "src", serde_json::json!({})).await);
        assert!(matches!(
            memory.search("anything", "island").await,
            TierOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn unavailable_backend_latches_disabled() {
        let embedder = Arc::new(UnavailableEmbedder {
            calls: AtomicUsize::new(0),
        });
        let calls_handle = embedder.clone();
        let dyn_embedder: Arc<dyn Embedder> = embedder;
        let memory = engine_with(Some(dyn_embedder), 0.7, 5);

        assert!(!memory.store("island", "resp", "src", serde_json::json!({})).await);
        assert!(!memory.enabled());

        // Subsequent operations never touch the backend again.
        assert!(matches!(
            memory.search("anything", "island").await,
            TierOutcome::Empty
        ));
        assert!(!memory.store("island", "other", "src", serde_json::json!({})).await);
        assert_eq!(calls_handle.calls.load(Ordering::Relaxed), 1);
    }

    /// Declares one dimension but produces another.
    struct LyingEmbedder;

    #[async_trait]
    impl Embedder for LyingEmbedder {
        fn name(&self) -> &str {
            "lying"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> Option<usize> {
            Some(3)
        }
    }

    #[tokio::test]
    async fn mismatched_dimension_rejected_at_write() {
        let memory = engine_with(Some(Arc::new(LyingEmbedder)), 0.5, 5);
        assert!(!memory.store("island", "resp", "src", serde_json::json!({})).await);
        assert_eq!(memory.stats().await.unwrap().total_memories, 0);
    }

    #[tokio::test]
    async fn search_with_no_memories_is_empty() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(&[], vec![1.0, 0.0]));
        let memory = engine_with(Some(embedder), 0.7, 5);
        assert!(matches!(
            memory.search("anything", "island").await,
            TierOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn search_scoped_to_owner() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(&[], vec![1.0, 0.0]));
        let memory = engine_with(Some(embedder), 0.5, 5);
        memory.store("island", "island resp", "src", serde_json::json!({})).await;
        memory.store("ragnarok", "ragnarok resp", "src", serde_json::json!({})).await;

        let texts = memory.search("query", "island").await.into_value().unwrap();
        assert_eq!(texts, vec!["island resp".to_string()]);
    }

    #[tokio::test]
    async fn explain_reports_components() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder::new(
            &[("alpha", vec![1.0, 0.0]), ("beta", vec![1.0, 0.0])],
            vec![0.0, 1.0],
        ));
        let memory = engine_with(Some(embedder), 0.7, 5);

        let report = memory.explain("alpha", "beta").await.unwrap();
        assert_eq!(report.embedding_dimensions, 2);
        assert!((report.cosine_similarity - 1.0).abs() < 1e-6);
        assert!(report.passes_threshold);
        assert_eq!(report.interpretation, "Nearly identical semantic meaning");
    }

    #[tokio::test]
    async fn explain_errors_when_disabled() {
        let memory = engine_with(None, 0.7, 5);
        assert!(memory.explain("a", "b").await.is_err());
    }

    #[test]
    fn content_hash_is_stable_and_owner_scoped() {
        let h1 = content_hash("island", "combined");
        let h2 = content_hash("island", "combined");
        let h3 = content_hash("ragnarok", "combined");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 16);
    }
}
