//! SQLite summary store.
//!
//! Append-only `summaries` table. The autoincrement id carries the per-owner
//! write order, so "newest first" retrieval is always well-defined even when
//! two summaries land in the same second.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logbard_core::error::HistoryError;
use logbard_core::summary::{NewSummary, SummaryRecord, SummaryStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite summary store.
pub struct SqliteSummaryStore {
    pool: SqlitePool,
}

impl SqliteSummaryStore {
    /// Create a new store from a file path.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (tests).
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite summary store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_key   TEXT NOT NULL,
                timestamp   TEXT NOT NULL,
                text        TEXT NOT NULL,
                token_count INTEGER NOT NULL CHECK (token_count >= 1)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("summaries table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_summaries_owner ON summaries(owner_key, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("owner index: {e}")))?;

        debug!("SQLite summary migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<SummaryRecord, HistoryError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| HistoryError::QueryFailed(format!("id column: {e}")))?;
        let owner_key: String = row
            .try_get("owner_key")
            .map_err(|e| HistoryError::QueryFailed(format!("owner_key column: {e}")))?;
        let timestamp_str: String = row
            .try_get("timestamp")
            .map_err(|e| HistoryError::QueryFailed(format!("timestamp column: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| HistoryError::QueryFailed(format!("text column: {e}")))?;
        let token_count: i64 = row
            .try_get("token_count")
            .map_err(|e| HistoryError::QueryFailed(format!("token_count column: {e}")))?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(SummaryRecord {
            id,
            owner_key,
            timestamp,
            text,
            token_count: token_count.max(1) as usize,
        })
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, summary: NewSummary) -> Result<i64, HistoryError> {
        let result = sqlx::query(
            "INSERT INTO summaries (owner_key, timestamp, text, token_count)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&summary.owner_key)
        .bind(summary.timestamp.to_rfc3339())
        .bind(&summary.text)
        .bind(summary.token_count.max(1) as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!("Stored summary {id} for {}", summary.owner_key);
        Ok(id)
    }

    async fn newest_first(
        &self,
        owner_key: &str,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>, HistoryError> {
        let rows = sqlx::query(
            "SELECT * FROM summaries WHERE owner_key = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(owner_key)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("newest_first: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn since(
        &self,
        owner_key: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SummaryRecord>, HistoryError> {
        let rows = sqlx::query(
            "SELECT * FROM summaries WHERE owner_key = ?1 AND timestamp >= ?2 ORDER BY id ASC",
        )
        .bind(owner_key)
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("since: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn count(&self, owner_key: &str) -> Result<usize, HistoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM summaries WHERE owner_key = ?1")
            .bind(owner_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| HistoryError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }

    async fn date_range(
        &self,
        owner_key: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, HistoryError> {
        let row = sqlx::query(
            "SELECT MIN(timestamp) AS earliest, MAX(timestamp) AS latest
             FROM summaries WHERE owner_key = ?1",
        )
        .bind(owner_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("date_range: {e}")))?;

        let earliest: Option<String> = row
            .try_get("earliest")
            .map_err(|e| HistoryError::QueryFailed(format!("earliest column: {e}")))?;
        let latest: Option<String> = row
            .try_get("latest")
            .map_err(|e| HistoryError::QueryFailed(format!("latest column: {e}")))?;

        let parse = |s: String| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        };

        Ok(match (earliest.and_then(parse), latest.and_then(parse)) {
            (Some(earliest), Some(latest)) => Some((earliest, latest)),
            _ => None,
        })
    }
}
