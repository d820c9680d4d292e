//! Starred (favorites) association repository.

use sqlx::PgPool;
use uuid::Uuid;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_entity::node::model::Node;

/// Repository for the user↔node starred association. Independent of
/// grants: starring confers no access.
#[derive(Debug, Clone)]
pub struct StarredRepository {
    pool: PgPool,
}

impl StarredRepository {
    /// Create a new starred repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Star a node for a user. Idempotent; returns whether a row was added.
    pub async fn star(&self, user_id: Uuid, node_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO starred_nodes (user_id, node_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, node_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(node_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to star node", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Unstar a node for a user. Idempotent; returns whether a row was
    /// removed.
    pub async fn unstar(&self, user_id: Uuid, node_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM starred_nodes WHERE user_id = $1 AND node_id = $2")
            .bind(user_id)
            .bind(node_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unstar node", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// A user's starred nodes, excluding trashed ones.
    pub async fn find_for_user(&self, user_id: Uuid) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>(
            "SELECT n.* FROM nodes n \
             INNER JOIN starred_nodes s ON s.node_id = n.id \
             WHERE s.user_id = $1 AND NOT n.trashed \
             ORDER BY s.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list starred", e))
    }
}
