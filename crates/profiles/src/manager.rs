//! The profile manager — the component the assembler talks to.
//!
//! `ingest` mines a batch of log lines and mutates profiles; `context_for`
//! and `entity_summaries` read them back as prompt-ready blurbs. Reads go
//! through the injected cache; writes update store and cache together, and
//! the cache lock is never held across a storage call.

use crate::aggregate::{apply_event, context_blurb, favorite_activities, notable_stats, personality_label};
use crate::cache::ProfileCache;
use crate::classify::classify;
use crate::patterns::extract_entities;
use crate::store::event_now;
use chrono::Utc;
use logbard_config::ProfilesConfig;
use logbard_core::error::ProfileError;
use logbard_core::profile::{ClassifiedEvent, EntityEvent, EntityProfile, EventKind, ProfileStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Manages entity profiles over a store and a cache.
pub struct ProfileManager {
    store: Arc<dyn ProfileStore>,
    cache: Arc<dyn ProfileCache>,
    cfg: ProfilesConfig,
}

/// Prompt-ready context about one entity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityContext {
    pub entity_name: String,
    pub personality: String,
    pub favorite_activities: Vec<String>,
    pub notable_stats: Vec<String>,
    pub summary: String,
}

impl ProfileManager {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        cache: Arc<dyn ProfileCache>,
        cfg: ProfilesConfig,
    ) -> Self {
        Self { store, cache, cfg }
    }

    /// Mine a batch of log lines: extract entities, classify the lines that
    /// mention each one, and fold the classified events into profiles.
    ///
    /// Returns every extracted entity, including ones with no classifiable
    /// events. A failed update is logged and skipped; one bad entity never
    /// poisons the batch.
    pub async fn ingest(&self, lines: &[String], owner_key: &str) -> BTreeSet<String> {
        let joined = lines.join("\n");
        let entities = extract_entities(&joined);
        if entities.is_empty() {
            return entities;
        }

        for entity in &entities {
            let entity_lower = entity.to_lowercase();
            let events: Vec<ClassifiedEvent> = lines
                .iter()
                .filter(|line| line.to_lowercase().contains(&entity_lower))
                .map(|line| classify(line))
                .filter(|event| event.kind != EventKind::Unknown)
                .collect();

            if events.is_empty() {
                continue;
            }

            if let Err(e) = self.update_profile(entity, owner_key, &events).await {
                warn!("Profile update failed for {entity}: {e}");
            }
        }

        debug!("Processed {} lines for {} entities on {owner_key}", lines.len(), entities.len());
        entities
    }

    /// Apply classified events to one entity's profile and persist.
    pub async fn update_profile(
        &self,
        entity_name: &str,
        owner_key: &str,
        events: &[ClassifiedEvent],
    ) -> Result<(), ProfileError> {
        let mut profile = self
            .store
            .load(entity_name)
            .await?
            .unwrap_or_else(|| EntityProfile::new(entity_name));

        for event in events {
            apply_event(&mut profile, event, &self.cfg);
        }
        profile.last_seen = Utc::now();

        self.store.upsert(&profile).await?;

        let log_entries: Vec<EntityEvent> = events
            .iter()
            .map(|event| event_now(entity_name, event.kind, event.details.clone(), owner_key))
            .collect();
        self.store.append_events(&log_entries).await?;

        self.cache.put(profile);
        Ok(())
    }

    /// Contextual information about one entity, or `None` if unknown.
    pub async fn context_for(
        &self,
        entity_name: &str,
    ) -> Result<Option<EntityContext>, ProfileError> {
        let profile = match self.cache.get(entity_name) {
            Some(profile) => profile,
            None => match self.store.load(entity_name).await? {
                Some(profile) => {
                    self.cache.put(profile.clone());
                    profile
                }
                None => return Ok(None),
            },
        };

        Ok(Some(EntityContext {
            entity_name: profile.entity_name.clone(),
            personality: personality_label(&profile).to_string(),
            favorite_activities: favorite_activities(&profile),
            notable_stats: notable_stats(&profile),
            summary: context_blurb(&profile),
        }))
    }

    /// Blurbs for up to `max_entities` entities, capped at `max_chars`.
    ///
    /// Unknown entities still get a line — the generator deserves to know a
    /// new name is new. Lookup failures degrade to that same line.
    pub async fn entity_summaries(&self, entities: &[String], max_chars: usize) -> String {
        let mut summaries = Vec::new();

        for entity in entities.iter().take(self.cfg.max_entities) {
            match self.context_for(entity).await {
                Ok(Some(context)) => summaries.push(context.summary),
                Ok(None) => summaries.push(format!("{entity} (new player)")),
                Err(e) => {
                    warn!("Context lookup failed for {entity}: {e}");
                    summaries.push(format!("{entity} (new player)"));
                }
            }
        }

        truncate_chars(summaries.join("\n"), max_chars)
    }

    /// Entities with the most logged events for `owner_key`.
    pub async fn most_active(
        &self,
        owner_key: &str,
        limit: usize,
    ) -> Result<Vec<(String, usize)>, ProfileError> {
        self.store.most_active(owner_key, limit).await
    }
}

/// Truncate to `max_chars` characters, ellipsized. Char-boundary safe.
fn truncate_chars(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoopCache, TtlCache};
    use crate::store::SqliteProfileStore;
    use std::time::Duration;

    async fn manager_with_cache(cache: Arc<dyn ProfileCache>) -> ProfileManager {
        let store = Arc::new(SqliteProfileStore::new("sqlite::memory:").await.unwrap());
        ProfileManager::new(store, cache, ProfilesConfig::default())
    }

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn ingest_builds_profiles() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        let entities = manager
            .ingest(
                &lines(&["Sletty tamed a Rex level 100", "Bob died"]),
                "island",
            )
            .await;

        assert!(entities.contains("Sletty"));
        assert!(entities.contains("Bob"));

        let context = manager.context_for("Sletty").await.unwrap().unwrap();
        assert_eq!(context.personality, "casual player");
        assert!(context.summary.contains("Sletty"));
    }

    #[tokio::test]
    async fn repeated_taming_reaches_enthusiast() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        for _ in 0..10 {
            manager
                .ingest(&lines(&["Sletty tamed a Rex"]), "island")
                .await;
        }

        let context = manager.context_for("Sletty").await.unwrap().unwrap();
        assert_eq!(context.personality, "dinosaur enthusiast");
    }

    #[tokio::test]
    async fn unknown_entity_has_no_context() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        assert!(manager.context_for("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unclassifiable_lines_do_not_create_profiles() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        // "Player Konrad" extracts a name but the line classifies Unknown.
        let entities = manager
            .ingest(&lines(&["Player Konrad pinged the server"]), "island")
            .await;

        assert!(entities.contains("Konrad"));
        assert!(manager.context_for("Konrad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summaries_include_new_players() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        manager.ingest(&lines(&["Sletty tamed a Rex"]), "island").await;

        let text = manager
            .entity_summaries(&["Sletty".into(), "Stranger".into()], 500)
            .await;
        assert!(text.contains("Sletty is a"));
        assert!(text.contains("Stranger (new player)"));
    }

    #[tokio::test]
    async fn summaries_respect_entity_cap() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        let names: Vec<String> = (0..8).map(|i| format!("Player{i}")).collect();
        let text = manager.entity_summaries(&names, 10_000).await;
        // max_entities defaults to 5
        assert_eq!(text.lines().count(), 5);
    }

    #[tokio::test]
    async fn summaries_respect_char_cap() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        let names: Vec<String> = (0..5).map(|i| format!("VeryLongPlayerName{i}")).collect();
        let text = manager.entity_summaries(&names, 40).await;
        assert!(text.chars().count() <= 40);
        assert!(text.ends_with("..."));
    }

    #[tokio::test]
    async fn cache_serves_reads_and_updates_refresh_it() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let manager = manager_with_cache(cache.clone()).await;

        manager.ingest(&lines(&["Sletty tamed a Rex"]), "island").await;
        assert!(cache.get("Sletty").is_some());

        manager.ingest(&lines(&["Sletty tamed a Ptera"]), "island").await;
        let cached = cache.get("Sletty").unwrap();
        assert_eq!(cached.counter(EventKind::Taming), 2);
    }

    #[tokio::test]
    async fn expired_cache_reloads_from_store() {
        let cache = Arc::new(TtlCache::new(Duration::from_millis(0)));
        let manager = manager_with_cache(cache).await;

        manager.ingest(&lines(&["Sletty tamed a Rex"]), "island").await;
        // TTL of zero: every read must fall through to the store.
        let context = manager.context_for("Sletty").await.unwrap();
        assert!(context.is_some());
    }

    #[tokio::test]
    async fn most_active_ranks_by_event_volume() {
        let manager = manager_with_cache(Arc::new(NoopCache)).await;
        manager
            .ingest(
                &lines(&[
                    "Sletty tamed a Rex",
                    "Sletty tamed a Ptera",
                    "Bob died",
                ]),
                "island",
            )
            .await;

        let active = manager.most_active("island", 10).await.unwrap();
        assert_eq!(active[0].0, "Sletty");
    }

    #[test]
    fn truncation_is_char_safe() {
        let text = "αβγδε".repeat(20);
        let out = truncate_chars(text, 10);
        assert_eq!(out.chars().count(), 10);
    }
}
