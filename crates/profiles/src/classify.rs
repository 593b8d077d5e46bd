//! Event classification.
//!
//! A line is classified by keyword membership against per-category sets in
//! a fixed priority order — first match wins, anything else is `Unknown`.
//! Detail extraction per category is regex-based and best-effort: a missing
//! field is omitted, never fatal.

use logbard_core::profile::{ClassifiedEvent, EventKind};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

/// The classification table, in priority order.
const CLASSIFICATION_TABLE: &[(EventKind, &[&str])] = &[
    (EventKind::Taming, &["tamed", "tame completed", "dinosaur tamed"]),
    (EventKind::Death, &["died", "was killed", "death"]),
    (EventKind::Building, &["placed", "built", "constructed", "foundation"]),
    (EventKind::Pvp, &["destroyed", "killed", "raided", "attacked"]),
    (EventKind::Joining, &["joined", "connected"]),
    (EventKind::Leaving, &["left", "disconnected"]),
    (EventKind::Tribe, &["tribe", "invited", "promoted", "demoted"]),
    (EventKind::Chat, &["said", "chat", "global"]),
];

/// Creature categories, matched by substring against the tamed creature name.
const CREATURE_CATEGORIES: &[(&str, &[&str])] = &[
    ("utility", &["ankylo", "doedicurus", "beaver", "argentavis", "quetzal"]),
    ("combat", &["rex", "giga", "spino", "carno", "therizino"]),
    ("transport", &["argentavis", "quetzal", "wyvern", "griffin", "phoenix"]),
    ("gathering", &["ankylo", "doedicurus", "mammoth", "therizino"]),
    ("tek", &["tek parasaur", "tek raptor", "tek rex", "tek stego"]),
    ("rare", &["wyvern", "griffin", "phoenix", "reaper", "rock drake"]),
];

fn creature_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)tamed an? (\w+)").expect("creature pattern must compile"))
}

fn level_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)level (\d+)").expect("level pattern must compile"))
}

fn killer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)killed by (\w+)").expect("killer pattern must compile"))
}

fn structure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)placed an? (\w+)|placed (\w+)").expect("structure pattern must compile"))
}

/// Classify a single log line.
pub fn classify(line: &str) -> ClassifiedEvent {
    let lower = line.to_lowercase();

    for (kind, keywords) in CLASSIFICATION_TABLE {
        if keywords.iter().any(|keyword| lower.contains(keyword)) {
            return ClassifiedEvent {
                kind: *kind,
                details: extract_details(line, *kind),
            };
        }
    }

    ClassifiedEvent {
        kind: EventKind::Unknown,
        details: json!({}),
    }
}

/// Best-effort detail extraction for a classified line.
pub fn extract_details(line: &str, kind: EventKind) -> serde_json::Value {
    let mut details = serde_json::Map::new();

    match kind {
        EventKind::Taming => {
            if let Some(capture) = creature_regex().captures(line) {
                let creature = capture[1].to_string();
                details.insert("creature_category".into(), json!(categorize_creature(&creature)));
                details.insert("creature".into(), json!(creature));
            }
            if let Some(capture) = level_regex().captures(line) {
                if let Ok(level) = capture[1].parse::<u32>() {
                    details.insert("level".into(), json!(level));
                }
            }
        }
        EventKind::Death => {
            if let Some(capture) = killer_regex().captures(line) {
                details.insert("killed_by".into(), json!(capture[1].to_string()));
            }
        }
        EventKind::Building => {
            if let Some(capture) = structure_regex().captures(line) {
                let structure = capture
                    .get(1)
                    .or_else(|| capture.get(2))
                    .map(|m| m.as_str().to_string());
                if let Some(structure) = structure {
                    details.insert("structure".into(), json!(structure));
                }
            }
        }
        _ => {}
    }

    serde_json::Value::Object(details)
}

/// Categorize a creature name; `"other"` when no category matches.
pub fn categorize_creature(creature: &str) -> &'static str {
    let lower = creature.to_lowercase();
    for (category, names) in CREATURE_CATEGORIES {
        if names.iter().any(|name| lower.contains(name)) {
            return category;
        }
    }
    "other"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taming_line_with_details() {
        let event = classify("Sletty tamed a Rex level 145");
        assert_eq!(event.kind, EventKind::Taming);
        assert_eq!(event.details["creature"], "Rex");
        assert_eq!(event.details["creature_category"], "combat");
        assert_eq!(event.details["level"], 145);
    }

    #[test]
    fn taming_line_without_level() {
        let event = classify("Sletty tamed a Ptera");
        assert_eq!(event.kind, EventKind::Taming);
        assert_eq!(event.details["creature"], "Ptera");
        assert!(event.details.get("level").is_none());
    }

    #[test]
    fn death_line_with_killer() {
        let event = classify("Bob was killed by Anna");
        assert_eq!(event.kind, EventKind::Death);
        assert_eq!(event.details["killed_by"], "Anna");
    }

    #[test]
    fn death_line_without_killer() {
        let event = classify("Bob died");
        assert_eq!(event.kind, EventKind::Death);
        assert!(event.details.get("killed_by").is_none());
    }

    #[test]
    fn building_line_with_structure() {
        let event = classify("Anna placed a Foundation");
        // "placed" and "foundation" both land in the building keyword set.
        assert_eq!(event.kind, EventKind::Building);
        assert_eq!(event.details["structure"], "Foundation");
    }

    #[test]
    fn priority_order_first_match_wins() {
        // "destroyed" (pvp) and "foundation" (building) both match, but
        // building is tested first.
        let event = classify("Enemy destroyed Bob's foundation");
        assert_eq!(event.kind, EventKind::Building);
    }

    #[test]
    fn death_beats_pvp_for_killed() {
        // "was killed" matches death before "killed" matches pvp.
        let event = classify("Bob was killed in a raid");
        assert_eq!(event.kind, EventKind::Death);
    }

    #[test]
    fn join_leave_chat_tribe() {
        assert_eq!(classify("Anna joined the server").kind, EventKind::Joining);
        assert_eq!(classify("Anna disconnected").kind, EventKind::Leaving);
        assert_eq!(classify("Anna was promoted in her clan").kind, EventKind::Tribe);
        assert_eq!(classify("Anna said: hello everyone").kind, EventKind::Chat);
    }

    #[test]
    fn unmatched_line_is_unknown() {
        let event = classify("server tick took 12ms");
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("SLETTY TAMED A REX").kind, EventKind::Taming);
    }

    #[test]
    fn creature_categorization() {
        assert_eq!(categorize_creature("Rex"), "combat");
        assert_eq!(categorize_creature("Argentavis"), "utility");
        assert_eq!(categorize_creature("Dodo"), "other");
    }

    #[test]
    fn tamed_an_article_variant() {
        let event = classify("Sletty tamed an Ankylo");
        assert_eq!(event.details["creature"], "Ankylo");
        assert_eq!(event.details["creature_category"], "utility");
    }
}
