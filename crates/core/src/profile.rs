//! Entity behavior profiles — per-player accumulators of observed activity.
//!
//! A profile is created on first mention of an entity and mutated
//! incrementally on every batch that mentions it. The profile is the
//! authoritative cache; the append-only event log exists to reconstruct or
//! audit the aggregates.

use crate::error::ProfileError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classified event categories, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Taming,
    Death,
    Building,
    Pvp,
    Joining,
    Leaving,
    Tribe,
    Chat,
    /// Not classifiable; excluded from profile updates.
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taming => "taming",
            Self::Death => "death",
            Self::Building => "building",
            Self::Pvp => "pvp",
            Self::Joining => "joining",
            Self::Leaving => "leaving",
            Self::Tribe => "tribe",
            Self::Chat => "chat",
            Self::Unknown => "unknown",
        }
    }
}

/// Behavioral trait dimensions. Each accumulates in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    Tamer,
    Builder,
    Aggressive,
    Social,
    Explorer,
}

/// A classified event extracted from a single log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub kind: EventKind,

    /// Best-effort details (creature type, killer, structure, ...).
    /// Missing fields are simply absent.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// An entry in the append-only entity event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEvent {
    pub entity_name: String,
    pub kind: EventKind,
    pub details: serde_json::Value,
    pub owner_key: String,
    pub timestamp: DateTime<Utc>,
}

/// The accumulated behavior profile for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityProfile {
    pub entity_name: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    /// Per-category event tallies.
    #[serde(default)]
    pub counters: HashMap<EventKind, u32>,

    /// Subtype tallies (favorite tamed creatures, structure types, ...).
    #[serde(default)]
    pub favorite_subtypes: HashMap<String, u32>,

    /// Behavioral tendencies, each clamped to [0.0, 1.0].
    #[serde(default)]
    pub trait_vector: HashMap<TraitKind, f32>,
}

impl EntityProfile {
    /// A fresh profile for an entity seen now for the first time.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entity_name: entity_name.into(),
            first_seen: now,
            last_seen: now,
            counters: HashMap::new(),
            favorite_subtypes: HashMap::new(),
            trait_vector: HashMap::new(),
        }
    }

    /// Increment the tally for an event category.
    pub fn bump_counter(&mut self, kind: EventKind) {
        *self.counters.entry(kind).or_insert(0) += 1;
    }

    /// Increment a subtype tally.
    pub fn bump_subtype(&mut self, subtype: impl Into<String>) {
        *self.favorite_subtypes.entry(subtype.into()).or_insert(0) += 1;
    }

    /// Add `increment` to a trait, clamping the result to [0.0, 1.0].
    pub fn bump_trait(&mut self, kind: TraitKind, increment: f32) {
        let value = self.trait_vector.entry(kind).or_insert(0.0);
        *value = (*value + increment).clamp(0.0, 1.0);
    }

    /// Tally for one event category (0 when never seen).
    pub fn counter(&self, kind: EventKind) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    /// The trait with the highest value, if any traits are recorded.
    pub fn dominant_trait(&self) -> Option<(TraitKind, f32)> {
        self.trait_vector
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, v)| (*k, *v))
    }
}

/// Persistent storage for entity profiles and their event log.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The store name (e.g., "sqlite").
    fn name(&self) -> &str;

    /// Load a profile by entity name.
    async fn load(
        &self,
        entity_name: &str,
    ) -> std::result::Result<Option<EntityProfile>, ProfileError>;

    /// Insert or replace a profile.
    async fn upsert(&self, profile: &EntityProfile) -> std::result::Result<(), ProfileError>;

    /// Append classified events to the audit log.
    async fn append_events(
        &self,
        events: &[EntityEvent],
    ) -> std::result::Result<(), ProfileError>;

    /// Entities with the most logged events for `owner_key`, busiest first.
    async fn most_active(
        &self,
        owner_key: &str,
        limit: usize,
    ) -> std::result::Result<Vec<(String, usize)>, ProfileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_values_clamp_at_one() {
        let mut profile = EntityProfile::new("Sletty");
        for _ in 0..50 {
            profile.bump_trait(TraitKind::Tamer, 0.1);
        }
        let value = profile.trait_vector[&TraitKind::Tamer];
        assert!(value <= 1.0);
        assert!((value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn trait_values_clamp_at_zero() {
        let mut profile = EntityProfile::new("Sletty");
        profile.bump_trait(TraitKind::Social, -0.5);
        assert_eq!(profile.trait_vector[&TraitKind::Social], 0.0);
    }

    #[test]
    fn counters_accumulate() {
        let mut profile = EntityProfile::new("Bob");
        profile.bump_counter(EventKind::Death);
        profile.bump_counter(EventKind::Death);
        profile.bump_counter(EventKind::Taming);
        assert_eq!(profile.counter(EventKind::Death), 2);
        assert_eq!(profile.counter(EventKind::Taming), 1);
        assert_eq!(profile.counter(EventKind::Building), 0);
    }

    #[test]
    fn dominant_trait_picks_maximum() {
        let mut profile = EntityProfile::new("Bob");
        profile.bump_trait(TraitKind::Builder, 0.4);
        profile.bump_trait(TraitKind::Tamer, 0.7);
        let (kind, value) = profile.dominant_trait().unwrap();
        assert_eq!(kind, TraitKind::Tamer);
        assert!((value - 0.7).abs() < 1e-6);
    }

    #[test]
    fn empty_profile_has_no_dominant_trait() {
        let profile = EntityProfile::new("Newcomer");
        assert!(profile.dominant_trait().is_none());
    }

    #[test]
    fn profile_json_round_trip() {
        let mut profile = EntityProfile::new("Sletty");
        profile.bump_counter(EventKind::Taming);
        profile.bump_subtype("Rex");
        profile.bump_trait(TraitKind::Tamer, 0.1);

        let json = serde_json::to_string(&profile).unwrap();
        let back: EntityProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entity_name, "Sletty");
        assert_eq!(back.counter(EventKind::Taming), 1);
        assert_eq!(back.favorite_subtypes["Rex"], 1);
    }
}
