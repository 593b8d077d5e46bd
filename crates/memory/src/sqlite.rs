//! SQLite memory archive.
//!
//! One `memories` table with a little-endian f32 BLOB embedding column.
//! The `(owner_key, content_hash)` unique index makes writes idempotent:
//! re-storing an identical response/context pair is a no-op, not an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logbard_core::error::MemoryError;
use logbard_core::memory::{MemoryArchive, MemoryRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite memory archive.
pub struct SqliteMemoryArchive {
    pool: SqlitePool,
}

impl SqliteMemoryArchive {
    /// Create a new archive from a file path.
    ///
    /// The database and tables are created automatically. Pass
    /// `"sqlite::memory:"` for an in-process ephemeral database (tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let archive = Self { pool };
        archive.run_migrations().await?;
        info!("SQLite memory archive initialized at {path}");
        Ok(archive)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                iid           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT UNIQUE NOT NULL,
                owner_key     TEXT NOT NULL,
                response_text TEXT NOT NULL,
                source_text   TEXT NOT NULL,
                embedding     BLOB NOT NULL,
                timestamp     TEXT NOT NULL,
                metadata      TEXT NOT NULL DEFAULT '{}',
                content_hash  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("memories table: {e}")))?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_dedup
             ON memories(owner_key, content_hash)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("dedup index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_owner_time
             ON memories(owner_key, timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("owner/time index: {e}")))?;

        debug!("SQLite memory migrations complete");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryRecord, MemoryError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| MemoryError::QueryFailed(format!("id column: {e}")))?;
        let owner_key: String = row
            .try_get("owner_key")
            .map_err(|e| MemoryError::QueryFailed(format!("owner_key column: {e}")))?;
        let response_text: String = row
            .try_get("response_text")
            .map_err(|e| MemoryError::QueryFailed(format!("response_text column: {e}")))?;
        let source_text: String = row
            .try_get("source_text")
            .map_err(|e| MemoryError::QueryFailed(format!("source_text column: {e}")))?;
        let timestamp_str: String = row
            .try_get("timestamp")
            .map_err(|e| MemoryError::QueryFailed(format!("timestamp column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| MemoryError::QueryFailed(format!("metadata column: {e}")))?;
        let content_hash: String = row
            .try_get("content_hash")
            .map_err(|e| MemoryError::QueryFailed(format!("content_hash column: {e}")))?;
        let embedding_blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| MemoryError::QueryFailed(format!("embedding column: {e}")))?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let metadata = serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null);

        Ok(MemoryRecord {
            id,
            owner_key,
            response_text,
            source_text,
            embedding: blob_to_embedding(&embedding_blob),
            timestamp,
            metadata,
            content_hash,
        })
    }
}

/// Serialize an embedding vector to little-endian bytes.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a little-endian byte blob into an embedding vector.
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl MemoryArchive for SqliteMemoryArchive {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, record: MemoryRecord) -> Result<bool, MemoryError> {
        let metadata_json = serde_json::to_string(&record.metadata)
            .map_err(|e| MemoryError::Storage(format!("Metadata serialization: {e}")))?;
        let embedding_blob = embedding_to_blob(&record.embedding);

        let result = sqlx::query(
            r#"
            INSERT INTO memories
                (id, owner_key, response_text, source_text, embedding, timestamp, metadata, content_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(owner_key, content_hash) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_key)
        .bind(&record.response_text)
        .bind(&record.source_text)
        .bind(&embedding_blob)
        .bind(record.timestamp.to_rfc3339())
        .bind(&metadata_json)
        .bind(&record.content_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;

        let stored = result.rows_affected() > 0;
        if stored {
            debug!("Stored memory {} for {}", record.id, record.owner_key);
        } else {
            debug!("Duplicate memory for {} skipped", record.owner_key);
        }
        Ok(stored)
    }

    async fn for_owner(&self, owner_key: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let rows = sqlx::query("SELECT * FROM memories WHERE owner_key = ?1 ORDER BY iid DESC")
            .bind(owner_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("for_owner: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM memories")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }

    async fn counts_by_owner(&self) -> Result<Vec<(String, usize)>, MemoryError> {
        let rows = sqlx::query(
            "SELECT owner_key, COUNT(*) AS cnt FROM memories GROUP BY owner_key ORDER BY cnt DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("counts_by_owner: {e}")))?;

        rows.iter()
            .map(|row| {
                let owner: String = row
                    .try_get("owner_key")
                    .map_err(|e| MemoryError::QueryFailed(format!("owner_key column: {e}")))?;
                let cnt: i64 = row
                    .try_get("cnt")
                    .map_err(|e| MemoryError::QueryFailed(format!("cnt column: {e}")))?;
                Ok((owner, cnt as usize))
            })
            .collect()
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, MemoryError> {
        let result = sqlx::query("DELETE FROM memories WHERE timestamp < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("prune: {e}")))?;

        let removed = result.rows_affected() as usize;
        if removed > 0 {
            info!("Pruned {removed} old memories");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    async fn test_archive() -> SqliteMemoryArchive {
        SqliteMemoryArchive::new("sqlite::memory:").await.unwrap()
    }

    fn make_record(owner: &str, response: &str, hash: &str) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4().to_string(),
            owner_key: owner.into(),
            response_text: response.into(),
            source_text: "some log lines".into(),
            embedding: vec![0.1, 0.2, 0.3],
            timestamp: Utc::now(),
            metadata: serde_json::json!({"log_count": 2}),
            content_hash: hash.into(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let db = test_archive().await;
        let stored = db.insert(make_record("island", "What a day", "h1")).await.unwrap();
        assert!(stored);

        let records = db.for_owner("island").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response_text, "What a day");
        assert_eq!(records[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn duplicate_hash_is_noop() {
        let db = test_archive().await;
        assert!(db.insert(make_record("island", "Same", "dup")).await.unwrap());
        assert!(!db.insert(make_record("island", "Same", "dup")).await.unwrap());
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_hash_different_owner_both_stored() {
        let db = test_archive().await;
        assert!(db.insert(make_record("island", "Same", "dup")).await.unwrap());
        assert!(db.insert(make_record("ragnarok", "Same", "dup")).await.unwrap());
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn for_owner_filters_and_orders_newest_first() {
        let db = test_archive().await;
        db.insert(make_record("island", "first", "h1")).await.unwrap();
        db.insert(make_record("island", "second", "h2")).await.unwrap();
        db.insert(make_record("ragnarok", "other", "h3")).await.unwrap();

        let records = db.for_owner("island").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].response_text, "second");
        assert_eq!(records[1].response_text, "first");
    }

    #[tokio::test]
    async fn counts_by_owner_groups() {
        let db = test_archive().await;
        db.insert(make_record("island", "a", "h1")).await.unwrap();
        db.insert(make_record("island", "b", "h2")).await.unwrap();
        db.insert(make_record("ragnarok", "c", "h3")).await.unwrap();

        let counts = db.counts_by_owner().await.unwrap();
        assert_eq!(counts[0], ("island".into(), 2));
        assert_eq!(counts[1], ("ragnarok".into(), 1));
    }

    #[tokio::test]
    async fn prune_removes_only_old_records() {
        let db = test_archive().await;
        let mut old = make_record("island", "ancient", "h1");
        old.timestamp = Utc::now() - Duration::days(120);
        db.insert(old).await.unwrap();
        db.insert(make_record("island", "fresh", "h2")).await.unwrap();

        let removed = db
            .prune_older_than(Utc::now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let records = db.for_owner("island").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response_text, "fresh");
    }

    #[tokio::test]
    async fn embedding_blob_round_trip() {
        let blob = embedding_to_blob(&[0.25, -1.5, 3.75]);
        assert_eq!(blob.len(), 12);
        let back = blob_to_embedding(&blob);
        assert_eq!(back, vec![0.25, -1.5, 3.75]);
    }

    #[tokio::test]
    async fn metadata_round_trip() {
        let db = test_archive().await;
        db.insert(make_record("island", "resp", "h1")).await.unwrap();
        let records = db.for_owner("island").await.unwrap();
        assert_eq!(records[0].metadata["log_count"], 2);
    }
}
