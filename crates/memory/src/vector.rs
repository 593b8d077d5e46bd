//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and threshold-filtered ranking over stored
//! memory records.

use logbard_core::memory::MemoryRecord;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical direction, 0 = orthogonal.
/// Returns 0.0 for mismatched lengths, empty vectors, or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to a query embedding.
///
/// Keeps records at or above `min_score`, sorted by descending similarity,
/// truncated to `limit`. Each result carries its similarity score.
pub fn rank_by_similarity(
    records: &[MemoryRecord],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<(f32, MemoryRecord)> {
    let mut scored: Vec<(f32, MemoryRecord)> = records
        .iter()
        .filter_map(|record| {
            let sim = cosine_similarity(&record.embedding, query_embedding);
            if sim >= min_score {
                Some((sim, record.clone()))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Qualitative bucket for a similarity score, used when tuning the
/// relevance threshold.
pub fn interpret_similarity(similarity: f32) -> &'static str {
    if similarity >= 0.9 {
        "Nearly identical semantic meaning"
    } else if similarity >= 0.8 {
        "Very high semantic similarity"
    } else if similarity >= 0.7 {
        "High semantic similarity"
    } else if similarity >= 0.6 {
        "Moderate semantic similarity"
    } else if similarity >= 0.5 {
        "Some semantic similarity"
    } else if similarity >= 0.3 {
        "Low semantic similarity"
    } else {
        "Very low or no semantic similarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord {
            id: id.into(),
            owner_key: "island".into(),
            response_text: format!("Response {id}"),
            source_text: format!("Source {id}"),
            embedding,
            timestamp: Utc::now(),
            metadata: serde_json::json!({}),
            content_hash: id.into(),
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_empty_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let a = vec![1.0, 1.0];
        let b = vec![1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_by_similarity() {
        let query = vec![1.0, 0.0, 0.0];
        let records = vec![
            record("orthogonal", vec![0.0, 1.0, 0.0]),
            record("identical", vec![1.0, 0.0, 0.0]),
            record("partial", vec![0.5, 0.5, 0.0]),
        ];

        let results = rank_by_similarity(&records, &query, 10, 0.0);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1.id, "identical");
        assert_eq!(results[1].1.id, "partial");
        assert_eq!(results[2].1.id, "orthogonal");
    }

    #[test]
    fn rank_respects_threshold() {
        let query = vec![1.0, 0.0];
        let records = vec![
            record("close", vec![1.0, 0.0]),
            record("far", vec![0.0, 1.0]),
        ];

        let results = rank_by_similarity(&records, &query, 10, 0.5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.id, "close");
    }

    #[test]
    fn rank_respects_limit() {
        let query = vec![1.0, 0.0];
        let records: Vec<_> = (0..10)
            .map(|i| record(&format!("r{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();

        let results = rank_by_similarity(&records, &query, 3, 0.0);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn interpretation_buckets() {
        assert_eq!(interpret_similarity(0.95), "Nearly identical semantic meaning");
        assert_eq!(interpret_similarity(0.65), "Moderate semantic similarity");
        assert_eq!(interpret_similarity(0.1), "Very low or no semantic similarity");
    }
}
