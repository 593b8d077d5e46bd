//! Conversation threading.
//!
//! Two summaries belong to the same thread when they are close in time,
//! share an owner, overlap in vocabulary, or mention the same names. The
//! relatedness score is a weighted sum of those signals; grouping walks the
//! chronological sequence and splits whenever consecutive relatedness drops
//! below the configured threshold.

use logbard_config::ThreadingConfig;
use logbard_core::summary::SummaryRecord;
use std::collections::HashSet;

/// Words ignored by the vocabulary-overlap signal.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "was", "are", "were", "be", "been", "have", "has", "had", "do", "does", "did",
];

/// An ordered group of summaries treated as one continuous exchange.
/// Derived at query time; never persisted.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub summaries: Vec<SummaryRecord>,
}

impl ConversationThread {
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Score how strongly two summaries read as one conversation, in [0, 1].
pub fn relatedness(a: &SummaryRecord, b: &SummaryRecord, cfg: &ThreadingConfig) -> f32 {
    let mut score = 0.0f32;

    // Temporal proximity: stepped decay over the gap between the records.
    let gap_minutes = (a.timestamp - b.timestamp).num_seconds().abs() as f32 / 60.0;
    let temporal = if gap_minutes <= 5.0 {
        1.0
    } else if gap_minutes <= 15.0 {
        0.8
    } else if gap_minutes <= 60.0 {
        0.6
    } else if gap_minutes <= 240.0 {
        0.3
    } else {
        0.1
    };
    score += temporal * cfg.temporal_weight;

    // Stream relationship: same owner reads as the same conversation,
    // different owners are still loosely related history.
    if a.owner_key == b.owner_key {
        score += cfg.same_owner_bonus;
    } else {
        score += cfg.cross_owner_bonus;
    }

    // Vocabulary overlap: Jaccard similarity over non-stopword tokens.
    let words_a = significant_words(&a.text);
    let words_b = significant_words(&b.text);
    if !words_a.is_empty() && !words_b.is_empty() {
        let intersection = words_a.intersection(&words_b).count();
        let union = words_a.union(&words_b).count();
        if union > 0 {
            score += (intersection as f32 / union as f32) * cfg.content_weight;
        }
    }

    // Shared capitalized tokens — a cheap proxy for shared entity names.
    let names_a = capitalized_words(&a.text);
    let names_b = capitalized_words(&b.text);
    let shared_names = names_a.intersection(&names_b).count();
    score += shared_names as f32 * cfg.shared_name_bonus;

    score.clamp(0.0, 1.0)
}

/// Group chronologically ordered summaries into threads.
///
/// A new thread starts whenever the relatedness between consecutive records
/// drops below `cfg.relatedness_threshold`.
pub fn group_threads(records: &[SummaryRecord], cfg: &ThreadingConfig) -> Vec<ConversationThread> {
    let mut threads: Vec<ConversationThread> = Vec::new();
    let mut current: Vec<SummaryRecord> = Vec::new();

    for record in records {
        let start_new = match current.last() {
            Some(previous) => relatedness(previous, record, cfg) < cfg.relatedness_threshold,
            None => false,
        };
        if start_new {
            threads.push(ConversationThread {
                summaries: std::mem::take(&mut current),
            });
        }
        current.push(record.clone());
    }

    if !current.is_empty() {
        threads.push(ConversationThread { summaries: current });
    }

    threads
}

fn significant_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(String::from)
        .collect()
}

fn capitalized_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .filter(|w| {
            w.len() > 2
                && w.chars().all(|c| c.is_alphabetic())
                && w.chars().next().is_some_and(|c| c.is_uppercase())
        })
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(id: i64, owner: &str, text: &str, minutes_ago: i64) -> SummaryRecord {
        SummaryRecord {
            id,
            owner_key: owner.into(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            text: text.into(),
            token_count: 10,
        }
    }

    fn cfg() -> ThreadingConfig {
        ThreadingConfig::default()
    }

    #[test]
    fn close_records_score_high() {
        let a = record(1, "island", "Sletty tamed a Rex near the volcano", 0);
        let b = record(2, "island", "Sletty tamed another Rex near the volcano", 2);
        let score = relatedness(&a, &b, &cfg());
        // Within 5 minutes, same owner, heavy overlap, shared name.
        assert!(score > 0.7, "score was {score}");
    }

    #[test]
    fn distant_unrelated_records_score_low() {
        let a = record(1, "island", "quiet day with nothing happening", 600);
        let b = record(2, "ragnarok", "wyvern eggs stolen from trench", 0);
        let score = relatedness(&a, &b, &cfg());
        assert!(score < 0.3, "score was {score}");
    }

    #[test]
    fn shared_names_boost_score() {
        let base_a = record(1, "island", "a calm morning by the shore", 300);
        let base_b = record(2, "island", "another evening at the base", 0);
        let without = relatedness(&base_a, &base_b, &cfg());

        let named_a = record(3, "island", "Sletty had a calm morning by the shore", 300);
        let named_b = record(4, "island", "Sletty spent another evening at the base", 0);
        let with = relatedness(&named_a, &named_b, &cfg());

        assert!(with > without);
    }

    #[test]
    fn score_clamped_to_unit_interval() {
        let a = record(1, "island", "Sletty Bob Anna tamed Rex Giga Spino", 0);
        let b = record(2, "island", "Sletty Bob Anna tamed Rex Giga Spino", 0);
        let score = relatedness(&a, &b, &cfg());
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn grouping_splits_on_low_relatedness() {
        let records = vec![
            record(1, "island", "Sletty tamed a Rex at the volcano", 300),
            record(2, "island", "Sletty tamed a second Rex at the volcano", 298),
            // Five hours later, different vocabulary: new thread.
            record(3, "island", "quiet patch, nobody logged in", 0),
        ];
        // Same-owner records carry a 0.3 floor from the owner bonus, so a
        // split within one stream needs a threshold above it.
        let cfg = ThreadingConfig {
            relatedness_threshold: 0.4,
            ..ThreadingConfig::default()
        };
        let threads = group_threads(&records, &cfg);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].len(), 2);
        assert_eq!(threads[1].len(), 1);
    }

    #[test]
    fn grouping_keeps_continuous_exchange_together() {
        let records = vec![
            record(1, "island", "Bob built a stone tower", 10),
            record(2, "island", "Bob built stone walls around the tower", 8),
            record(3, "island", "Bob finished the stone tower gate", 5),
        ];
        let threads = group_threads(&records, &cfg());
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].len(), 3);
    }

    #[test]
    fn grouping_empty_input() {
        assert!(group_threads(&[], &cfg()).is_empty());
    }

    #[test]
    fn stopwords_do_not_create_overlap() {
        let a = record(1, "island", "the and was with by on", 600);
        let b = record(2, "ragnarok", "the and was with by on", 0);
        // Only the temporal floor and cross-owner bonus remain.
        let score = relatedness(&a, &b, &cfg());
        let expected = 0.1 * cfg().temporal_weight + cfg().cross_owner_bonus;
        assert!((score - expected).abs() < 1e-6);
    }
}
