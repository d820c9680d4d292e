//! History repository with the per-day dedup rule.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_entity::history::model::HistoryEntry;

/// Repository for the append-only audit history.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    /// Create a new history repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an action with same-calendar-day dedup: if an entry with the
    /// same `(file_id, user_id, action)` was created today, its metadata
    /// and timestamp are updated in place instead of inserting a
    /// duplicate.
    pub async fn record(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: &str,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<HistoryEntry> {
        let updated = sqlx::query_as::<_, HistoryEntry>(
            "UPDATE history_entries SET metadata = COALESCE($4, metadata), updated_at = NOW() \
             WHERE file_id = $1 AND user_id = $2 AND action = $3 \
               AND created_at::date = CURRENT_DATE \
             RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(action)
        .bind(&metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update history", e))?;

        if let Some(entry) = updated {
            return Ok(entry);
        }

        sqlx::query_as::<_, HistoryEntry>(
            "INSERT INTO history_entries (file_id, user_id, action, metadata) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(action)
        .bind(&metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert history", e))
    }

    /// Plain insert without dedup, for cascade paths where every deleted
    /// node gets its own row.
    pub async fn insert_on(
        conn: &mut PgConnection,
        file_id: Uuid,
        user_id: Uuid,
        action: &str,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<HistoryEntry> {
        sqlx::query_as::<_, HistoryEntry>(
            "INSERT INTO history_entries (file_id, user_id, action, metadata) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(action)
        .bind(&metadata)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert history", e))
    }

    /// A user's most recent entries for one action, newest first.
    pub async fn recent_for_user(
        &self,
        user_id: Uuid,
        action: &str,
        limit: i64,
    ) -> AppResult<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(
            "SELECT * FROM history_entries WHERE user_id = $1 AND action = $2 \
             ORDER BY updated_at DESC LIMIT $3",
        )
        .bind(user_id)
        .bind(action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list history", e))
    }

    /// The latest entries across all users and actions, newest first.
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(
            "SELECT * FROM history_entries ORDER BY updated_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list history", e))
    }
}
