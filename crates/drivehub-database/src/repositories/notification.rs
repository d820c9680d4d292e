//! Notification inbox repository.

use sqlx::PgPool;
use uuid::Uuid;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_entity::notification::model::Notification;

/// Repository for per-user notification inboxes.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification for a user.
    pub async fn insert(
        &self,
        user_id: Uuid,
        action: &str,
        file_id: Uuid,
        file_name: &str,
    ) -> AppResult<Notification> {
        let message = Notification::message_for(action, file_name);
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, action, file_id, file_name, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(user_id)
        .bind(action)
        .bind(file_id)
        .bind(file_name)
        .bind(&message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert notification", e)
        })
    }

    /// Unread notifications for a user, newest first.
    pub async fn find_unread(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 AND read_at IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list notifications", e)
        })
    }

    /// Mark a set of a user's notifications as read. Returns how many
    /// unread rows matched.
    pub async fn mark_read(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() \
             WHERE user_id = $1 AND id = ANY($2) AND read_at IS NULL",
        )
        .bind(user_id)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark notifications read", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Delete a set of a user's notifications. Returns how many matched.
    pub async fn delete(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete notifications", e)
            })?;
        Ok(result.rows_affected())
    }
}
