//! SQLite profile store.
//!
//! Two tables: `entity_profiles` holds one JSON state blob per entity (the
//! authoritative aggregate), `entity_events` is the append-only audit log
//! the aggregates can be reconstructed from.

use async_trait::async_trait;
use chrono::Utc;
use logbard_core::error::ProfileError;
use logbard_core::profile::{EntityEvent, EntityProfile, ProfileStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite profile store.
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    /// Create a new store from a file path.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (tests).
    pub async fn new(path: &str) -> Result<Self, ProfileError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| ProfileError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ProfileError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite profile store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), ProfileError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entity_profiles (
                entity_name TEXT PRIMARY KEY,
                first_seen  TEXT NOT NULL,
                last_seen   TEXT NOT NULL,
                profile     TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::MigrationFailed(format!("entity_profiles table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entity_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_name TEXT NOT NULL,
                kind        TEXT NOT NULL,
                details     TEXT NOT NULL DEFAULT '{}',
                owner_key   TEXT NOT NULL,
                timestamp   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::MigrationFailed(format!("entity_events table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entity_events_owner
             ON entity_events(owner_key, entity_name)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::MigrationFailed(format!("events index: {e}")))?;

        debug!("SQLite profile migrations complete");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, entity_name: &str) -> Result<Option<EntityProfile>, ProfileError> {
        let row = sqlx::query("SELECT profile FROM entity_profiles WHERE entity_name = ?1")
            .bind(entity_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ProfileError::QueryFailed(format!("load: {e}")))?;

        match row {
            Some(row) => {
                let blob: String = row
                    .try_get("profile")
                    .map_err(|e| ProfileError::QueryFailed(format!("profile column: {e}")))?;
                let profile = serde_json::from_str(&blob)
                    .map_err(|e| ProfileError::QueryFailed(format!("profile blob: {e}")))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn upsert(&self, profile: &EntityProfile) -> Result<(), ProfileError> {
        let blob = serde_json::to_string(profile)
            .map_err(|e| ProfileError::Storage(format!("profile serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO entity_profiles (entity_name, first_seen, last_seen, profile)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(entity_name) DO UPDATE SET
                last_seen = excluded.last_seen,
                profile = excluded.profile
            "#,
        )
        .bind(&profile.entity_name)
        .bind(profile.first_seen.to_rfc3339())
        .bind(profile.last_seen.to_rfc3339())
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(|e| ProfileError::Storage(format!("upsert: {e}")))?;

        debug!("Upserted profile for {}", profile.entity_name);
        Ok(())
    }

    async fn append_events(&self, events: &[EntityEvent]) -> Result<(), ProfileError> {
        for event in events {
            let details = serde_json::to_string(&event.details)
                .map_err(|e| ProfileError::Storage(format!("details serialization: {e}")))?;

            sqlx::query(
                "INSERT INTO entity_events (entity_name, kind, details, owner_key, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&event.entity_name)
            .bind(event.kind.as_str())
            .bind(&details)
            .bind(&event.owner_key)
            .bind(event.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ProfileError::Storage(format!("append event: {e}")))?;
        }
        Ok(())
    }

    async fn most_active(
        &self,
        owner_key: &str,
        limit: usize,
    ) -> Result<Vec<(String, usize)>, ProfileError> {
        let rows = sqlx::query(
            r#"
            SELECT entity_name, COUNT(*) AS cnt
            FROM entity_events
            WHERE owner_key = ?1
            GROUP BY entity_name
            ORDER BY cnt DESC
            LIMIT ?2
            "#,
        )
        .bind(owner_key)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ProfileError::QueryFailed(format!("most_active: {e}")))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("entity_name")
                    .map_err(|e| ProfileError::QueryFailed(format!("entity_name column: {e}")))?;
                let cnt: i64 = row
                    .try_get("cnt")
                    .map_err(|e| ProfileError::QueryFailed(format!("cnt column: {e}")))?;
                Ok((name, cnt as usize))
            })
            .collect()
    }
}

/// Build an event-log entry stamped now.
pub fn event_now(
    entity_name: &str,
    kind: logbard_core::profile::EventKind,
    details: serde_json::Value,
    owner_key: &str,
) -> EntityEvent {
    EntityEvent {
        entity_name: entity_name.to_string(),
        kind,
        details,
        owner_key: owner_key.to_string(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbard_core::profile::{EventKind, TraitKind};

    async fn test_store() -> SqliteProfileStore {
        SqliteProfileStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn load_missing_profile_is_none() {
        let store = test_store().await;
        assert!(store.load("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_and_load_round_trip() {
        let store = test_store().await;
        let mut profile = EntityProfile::new("Sletty");
        profile.bump_counter(EventKind::Taming);
        profile.bump_subtype("Rex");
        profile.bump_trait(TraitKind::Tamer, 0.1);
        store.upsert(&profile).await.unwrap();

        let loaded = store.load("Sletty").await.unwrap().unwrap();
        assert_eq!(loaded.entity_name, "Sletty");
        assert_eq!(loaded.counter(EventKind::Taming), 1);
        assert_eq!(loaded.favorite_subtypes["Rex"], 1);
        assert!((loaded.trait_vector[&TraitKind::Tamer] - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_profile() {
        let store = test_store().await;
        let mut profile = EntityProfile::new("Sletty");
        store.upsert(&profile).await.unwrap();

        profile.bump_counter(EventKind::Death);
        store.upsert(&profile).await.unwrap();

        let loaded = store.load("Sletty").await.unwrap().unwrap();
        assert_eq!(loaded.counter(EventKind::Death), 1);
    }

    #[tokio::test]
    async fn events_feed_most_active() {
        let store = test_store().await;
        let events = vec![
            event_now("Sletty", EventKind::Taming, serde_json::json!({}), "island"),
            event_now("Sletty", EventKind::Taming, serde_json::json!({}), "island"),
            event_now("Bob", EventKind::Death, serde_json::json!({}), "island"),
            event_now("Anna", EventKind::Chat, serde_json::json!({}), "ragnarok"),
        ];
        store.append_events(&events).await.unwrap();

        let active = store.most_active("island", 10).await.unwrap();
        assert_eq!(active[0], ("Sletty".into(), 2));
        assert_eq!(active[1], ("Bob".into(), 1));
        assert_eq!(active.len(), 2);
    }
}
