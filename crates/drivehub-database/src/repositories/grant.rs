//! Access grant repository.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_entity::permission::action::GrantKind;
use drivehub_entity::permission::model::AccessGrant;

/// Repository for access grant CRUD and lookups.
#[derive(Debug, Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    /// Create a new grant repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert keyed by `(file_id, user_id, permission)`.
    pub async fn upsert(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        permission: GrantKind,
    ) -> AppResult<AccessGrant> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        Self::upsert_on(&mut conn, file_id, user_id, permission).await
    }

    /// Transaction-scoped form of [`Self::upsert`].
    pub async fn upsert_on(
        conn: &mut PgConnection,
        file_id: Uuid,
        user_id: Uuid,
        permission: GrantKind,
    ) -> AppResult<AccessGrant> {
        sqlx::query_as::<_, AccessGrant>(
            "INSERT INTO access_grants (file_id, user_id, permission) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_grants_file_user_permission \
             DO UPDATE SET updated_at = NOW() \
             RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(permission)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert grant", e))
    }

    /// Idempotent delete. Returns whether a row was removed.
    pub async fn revoke(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        permission: GrantKind,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM access_grants WHERE file_id = $1 AND user_id = $2 AND permission = $3",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(permission)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke grant", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// All grants on a node.
    pub async fn find_for_node(&self, file_id: Uuid) -> AppResult<Vec<AccessGrant>> {
        sqlx::query_as::<_, AccessGrant>(
            "SELECT * FROM access_grants WHERE file_id = $1 ORDER BY created_at ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list grants", e))
    }

    /// All grants held by a user, across nodes.
    pub async fn find_for_user(&self, user_id: Uuid) -> AppResult<Vec<AccessGrant>> {
        sqlx::query_as::<_, AccessGrant>(
            "SELECT * FROM access_grants WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list user grants", e))
    }

    /// A user's grants on one node.
    pub async fn find_for_user_on(
        &self,
        file_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<AccessGrant>> {
        sqlx::query_as::<_, AccessGrant>(
            "SELECT * FROM access_grants WHERE file_id = $1 AND user_id = $2",
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load grants", e))
    }

    /// A user's grants across a set of nodes, fetched in one query for
    /// permission-filtering listings.
    pub async fn find_for_user_on_many(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
    ) -> AppResult<Vec<AccessGrant>> {
        sqlx::query_as::<_, AccessGrant>(
            "SELECT * FROM access_grants WHERE file_id = ANY($1) AND user_id = $2",
        )
        .bind(file_ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load grants", e))
    }

    /// Remove every grant on a set of nodes. Used by cascading deletes.
    pub async fn delete_for_files_on(conn: &mut PgConnection, file_ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM access_grants WHERE file_id = ANY($1)")
            .bind(file_ids)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete grants", e)
            })?;
        Ok(result.rows_affected())
    }
}
