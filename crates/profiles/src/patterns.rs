//! Entity name extraction.
//!
//! A fixed, ordered table of action-verb patterns pulls candidate names out
//! of free-text log lines. The table is data, not dispatch: adding a
//! pattern is a one-line change and the whole extractor stays
//! deterministic and unit-testable.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Candidate names shorter than this are discarded.
const MIN_NAME_LEN: usize = 3;

/// Frequent false positives that match the name position.
const STOPLIST: &[&str] = &["the", "and", "was", "you", "all", "any"];

/// Ordered extraction patterns. Group 1 is always the candidate name.
const NAME_PATTERNS: &[&str] = &[
    r"(?i)(\w+) tamed",
    r"(?i)(\w+) died",
    r"(?i)(\w+) was killed",
    r"(?i)(\w+) joined",
    r"(?i)(\w+) left",
    r"(?i)(\w+) said",
    r"(?i)(\w+) placed",
    r"(?i)(\w+) destroyed",
    r"(?i)Tribe (\w+)",
    r"(?i)Player (\w+)",
];

fn compiled_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        NAME_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("extraction pattern must compile"))
            .collect()
    })
}

/// Extract entity names from log text.
///
/// Applies every pattern to the whole text and collects all matches,
/// dropping stoplisted words and names shorter than three characters.
/// Returns a sorted set so downstream iteration order is deterministic.
pub fn extract_entities(text: &str) -> BTreeSet<String> {
    let mut entities = BTreeSet::new();

    for pattern in compiled_patterns() {
        for capture in pattern.captures_iter(text) {
            if let Some(name) = capture.get(1) {
                let name = name.as_str().trim();
                if name.len() >= MIN_NAME_LEN && !STOPLIST.contains(&name.to_lowercase().as_str())
                {
                    entities.insert(name.to_string());
                }
            }
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_names_from_action_lines() {
        let text = "Sletty tamed a Rex\nBob died\nAnna joined the server";
        let entities = extract_entities(text);
        assert!(entities.contains("Sletty"));
        assert!(entities.contains("Bob"));
        assert!(entities.contains("Anna"));
    }

    #[test]
    fn extracts_tribe_and_player_prefixes() {
        let text = "Tribe Ragnarok destroyed a wall\nPlayer Konrad connected";
        let entities = extract_entities(text);
        assert!(entities.contains("Ragnarok"));
        assert!(entities.contains("Konrad"));
    }

    #[test]
    fn short_names_dropped() {
        let entities = extract_entities("Bo died");
        assert!(entities.is_empty());
    }

    #[test]
    fn stoplist_words_dropped() {
        let entities = extract_entities("You died\nAll left\nThe placed");
        assert!(entities.is_empty());
    }

    #[test]
    fn stoplist_is_case_insensitive() {
        let entities = extract_entities("YOU died\nany left");
        assert!(entities.is_empty());
    }

    #[test]
    fn case_insensitive_verbs() {
        let entities = extract_entities("Sletty TAMED a Rex");
        assert!(entities.contains("Sletty"));
    }

    #[test]
    fn was_killed_captures_victim() {
        let entities = extract_entities("Konrad was killed by a Raptor");
        assert!(entities.contains("Konrad"));
    }

    #[test]
    fn no_match_no_entities() {
        let entities = extract_entities("server tick took 12ms");
        assert!(entities.is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let text = "Sletty tamed a Rex\nSletty tamed a Ptera\nSletty died";
        let entities = extract_entities(text);
        assert_eq!(entities.len(), 1);
    }
}
