//! Durable key-value slot for the delta-sync cursor.

use sqlx::{PgConnection, PgPool};

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;

/// The key under which the drive delta cursor is stored.
pub const DELTA_CURSOR_KEY: &str = "onedrive_delta";

/// Repository for the sync-state slots.
#[derive(Debug, Clone)]
pub struct SyncCursorRepository {
    pool: PgPool,
}

impl SyncCursorRepository {
    /// Create a new sync-cursor repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a cursor value.
    pub async fn get(&self, key: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM sync_state WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read cursor", e))
    }

    /// Write a cursor value inside an existing transaction, so the new
    /// cursor commits atomically with the page it belongs to.
    pub async fn set_on(conn: &mut PgConnection, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sync_state (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write cursor", e))?;
        Ok(())
    }
}
