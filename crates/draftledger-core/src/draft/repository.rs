//! Draft storage.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{Draft, DraftId};
use crate::Result;

/// Persistent storage of drafts.
///
/// The store is the only state shared between the compose session and
/// background work: both sides reload from it rather than sharing a `Draft`.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Load a draft by local ID.
    async fn get_draft(&self, id: DraftId) -> Result<Option<Draft>>;

    /// Insert or replace a draft.
    async fn upsert_draft(&self, draft: &Draft) -> Result<()>;

    /// Delete a draft. Deleting a missing draft is not an error.
    async fn delete_draft(&self, id: DraftId) -> Result<()>;

    /// All drafts with a pending action, oldest first.
    async fn drafts_with_action(&self) -> Result<Vec<Draft>>;
}

/// `SQLite` draft store.
pub struct SqliteDraftStore {
    pool: SqlitePool,
}

impl SqliteDraftStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS drafts (
                local_id TEXT PRIMARY KEY,
                remote_uuid TEXT,
                action TEXT,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_drafts_action ON drafts(action)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count stored drafts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM drafts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn get_draft(&self, id: DraftId) -> Result<Option<Draft>> {
        let row = sqlx::query(
            r"
            SELECT payload FROM drafts WHERE local_id = ?
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let payload: String = row.get("payload");
            serde_json::from_str(&payload).map_err(Into::into)
        })
        .transpose()
    }

    async fn upsert_draft(&self, draft: &Draft) -> Result<()> {
        let payload = serde_json::to_string(draft)?;

        sqlx::query(
            r"
            INSERT INTO drafts (local_id, remote_uuid, action, payload, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(local_id) DO UPDATE SET
                remote_uuid = excluded.remote_uuid,
                action = excluded.action,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(draft.id.to_string())
        .bind(draft.remote_uuid.as_deref())
        .bind(draft.action.map(|action| action.as_str()))
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_draft(&self, id: DraftId) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM drafts WHERE local_id = ?
            ",
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn drafts_with_action(&self) -> Result<Vec<Draft>> {
        let rows = sqlx::query(
            r"
            SELECT payload FROM drafts
            WHERE action IS NOT NULL
            ORDER BY updated_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let drafts = rows
            .iter()
            .filter_map(|row| {
                let payload: String = row.get("payload");
                match serde_json::from_str(&payload) {
                    Ok(draft) => Some(draft),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unreadable draft row");
                        None
                    }
                }
            })
            .collect();

        Ok(drafts)
    }
}
