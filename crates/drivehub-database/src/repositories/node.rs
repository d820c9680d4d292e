//! Node repository: CRUD, tree queries, and the cascading mutations.
//!
//! Tree walks are iterative: each generation of children is fetched with
//! one `parent_id = ANY(..)` query, so depth never grows the call stack
//! and a wide subtree costs one round-trip per level.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_entity::node::model::{Node, NodeKind, StorageBackend, UpsertNode};

use super::grant::GrantRepository;
use super::history::HistoryRepository;

/// Repository for node CRUD and tree operations.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: PgPool,
}

impl NodeRepository {
    /// Create a new node repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a node by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find node", e))
    }

    /// Find several nodes by ID.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find nodes", e))
    }

    /// Find a node by its remote identity.
    pub async fn find_by_remote_id(&self, remote_id: &str) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE remote_id = $1")
            .bind(remote_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find node by remote id", e)
            })
    }

    /// Transaction-scoped form of [`Self::find_by_remote_id`].
    pub async fn find_by_remote_id_on(
        conn: &mut PgConnection,
        remote_id: &str,
    ) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE remote_id = $1")
            .bind(remote_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find node by remote id", e)
            })
    }

    /// Find a user's tree root (the one node with no parent).
    pub async fn find_root(&self, owner_id: Uuid) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE owner_id = $1 AND parent_id IS NULL")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find root", e))
    }

    /// List direct children of a node, excluding trashed ones by default.
    pub async fn find_children(&self, parent_id: Uuid, with_trashed: bool) -> AppResult<Vec<Node>> {
        let sql = if with_trashed {
            "SELECT * FROM nodes WHERE parent_id = $1 ORDER BY kind DESC, name ASC"
        } else {
            "SELECT * FROM nodes WHERE parent_id = $1 AND NOT trashed ORDER BY kind DESC, name ASC"
        };
        sqlx::query_as::<_, Node>(sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// Get the ancestor chain of a node, nearest first, self excluded.
    pub async fn ancestor_ids(&self, node_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "WITH RECURSIVE ancestors AS ( \
                SELECT id, parent_id, 0 AS level FROM nodes WHERE id = $1 \
                UNION ALL \
                SELECT n.id, n.parent_id, a.level + 1 FROM nodes n \
                INNER JOIN ancestors a ON n.id = a.parent_id \
             ) SELECT id FROM ancestors WHERE id != $1 ORDER BY level ASC",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find ancestors", e))
    }

    /// Breadth-wise id closure: the starting set unioned with every
    /// transitive child id.
    pub async fn descendant_ids(&self, start: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let mut conn = self.acquire().await?;
        let generations = Self::descendant_generations_on(&mut conn, start).await?;
        Ok(generations.into_iter().flatten().collect())
    }

    /// Frontier walk on an existing connection, returning one `Vec` per
    /// generation (the starting set is generation zero).
    pub async fn descendant_generations_on(
        conn: &mut PgConnection,
        start: &[Uuid],
    ) -> AppResult<Vec<Vec<Uuid>>> {
        let mut generations: Vec<Vec<Uuid>> = vec![start.to_vec()];
        let mut frontier = start.to_vec();

        while !frontier.is_empty() {
            let children = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM nodes WHERE parent_id = ANY($1)",
            )
            .bind(&frontier)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to fetch child frontier", e)
            })?;

            if children.is_empty() {
                break;
            }
            frontier = children.clone();
            generations.push(children);
        }

        Ok(generations)
    }

    /// Insert a user's implicit root folder, or return the existing one.
    ///
    /// Two concurrent first-calls race on the partial unique index
    /// `(owner_id) WHERE parent_id IS NULL`; the loser's insert affects no
    /// row and falls back to a re-read.
    pub async fn create_root(
        &self,
        owner_id: Uuid,
        name: &str,
        remote_id: &str,
        web_url: Option<&str>,
    ) -> AppResult<Node> {
        let inserted = sqlx::query_as::<_, Node>(
            "INSERT INTO nodes (owner_id, parent_id, name, kind, size_bytes, storage_backend, remote_id, web_url) \
             VALUES ($1, NULL, $2, 'folder', 0, 'remote', $3, $4) \
             ON CONFLICT (owner_id) WHERE parent_id IS NULL DO NOTHING \
             RETURNING *",
        )
        .bind(owner_id)
        .bind(name)
        .bind(remote_id)
        .bind(web_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create root", e))?;

        match inserted {
            Some(node) => Ok(node),
            None => self
                .find_root(owner_id)
                .await?
                .ok_or_else(|| AppError::internal("Root insert conflicted but no root row found")),
        }
    }

    /// Insert or update a node keyed on its remote identity, for
    /// user-initiated mirror operations.
    ///
    /// On conflict (a sync race already created the row for this remote
    /// item) the acting user claims ownership; the trash flag is left
    /// untouched. This path never touches root rows; mirror operations
    /// only produce children.
    pub async fn upsert_by_remote_id(&self, data: &UpsertNode) -> AppResult<Node> {
        sqlx::query_as::<_, Node>(
            "INSERT INTO nodes (owner_id, parent_id, name, kind, size_bytes, storage_backend, remote_id, web_url, download_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (remote_id) DO UPDATE SET \
                 owner_id = EXCLUDED.owner_id, \
                 parent_id = EXCLUDED.parent_id, \
                 name = EXCLUDED.name, \
                 size_bytes = EXCLUDED.size_bytes, \
                 web_url = EXCLUDED.web_url, \
                 download_url = EXCLUDED.download_url, \
                 updated_at = NOW() \
             RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(data.kind)
        .bind(data.size_bytes)
        .bind(data.storage_backend)
        .bind(&data.remote_id)
        .bind(&data.web_url)
        .bind(&data.download_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert node", e))
    }

    /// Sync-path upsert keyed on remote identity.
    ///
    /// Unlike [`Self::upsert_by_remote_id`], an existing row keeps its
    /// owner (the feed must not steal user-created nodes) and its trash
    /// flag (trash is a local concept the remote cannot revoke), and a
    /// root row keeps its null parent.
    pub async fn upsert_by_remote_id_on(
        conn: &mut PgConnection,
        data: &UpsertNode,
    ) -> AppResult<Node> {
        sqlx::query_as::<_, Node>(
            "INSERT INTO nodes (owner_id, parent_id, name, kind, size_bytes, storage_backend, remote_id, web_url, download_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (remote_id) DO UPDATE SET \
                 parent_id = CASE WHEN nodes.parent_id IS NULL THEN NULL ELSE EXCLUDED.parent_id END, \
                 name = EXCLUDED.name, \
                 size_bytes = EXCLUDED.size_bytes, \
                 web_url = EXCLUDED.web_url, \
                 download_url = EXCLUDED.download_url, \
                 updated_at = NOW() \
             RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(data.kind)
        .bind(data.size_bytes)
        .bind(data.storage_backend)
        .bind(&data.remote_id)
        .bind(&data.web_url)
        .bind(&data.download_url)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert node", e))
    }

    /// Move a node under a new parent, refreshing its browser URL.
    pub async fn set_parent(
        &self,
        node_id: Uuid,
        new_parent_id: Uuid,
        web_url: Option<&str>,
    ) -> AppResult<Node> {
        sqlx::query_as::<_, Node>(
            "UPDATE nodes SET parent_id = $2, web_url = COALESCE($3, web_url), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(node_id)
        .bind(new_parent_id)
        .bind(web_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move node", e))?
        .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))
    }

    /// Rename a node.
    pub async fn set_name(&self, node_id: Uuid, new_name: &str) -> AppResult<Node> {
        sqlx::query_as::<_, Node>(
            "UPDATE nodes SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(node_id)
        .bind(new_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename node", e))?
        .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))
    }

    /// Refresh the cached download URL of a node.
    pub async fn set_download_url(&self, node_id: Uuid, url: Option<&str>) -> AppResult<()> {
        sqlx::query("UPDATE nodes SET download_url = $2, updated_at = NOW() WHERE id = $1")
            .bind(node_id)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update download URL", e)
            })?;
        Ok(())
    }

    /// Flip the trash flag on a whole id set in one statement.
    pub async fn set_trashed_bulk(&self, ids: &[Uuid], trashed: bool) -> AppResult<u64> {
        let result = sqlx::query("UPDATE nodes SET trashed = $2, updated_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .bind(trashed)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update trash flags", e)
            })?;
        Ok(result.rows_affected())
    }

    /// Flip the trash flag on an id set, restricted to nodes the given
    /// user owns. Used by the bulk operations.
    pub async fn set_trashed_bulk_owned(
        &self,
        ids: &[Uuid],
        owner_id: Uuid,
        trashed: bool,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE nodes SET trashed = $3, updated_at = NOW() \
             WHERE id = ANY($1) AND owner_id = $2",
        )
        .bind(ids)
        .bind(owner_id)
        .bind(trashed)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update trash flags", e)
        })?;
        Ok(result.rows_affected())
    }

    /// Top-level trashed nodes for a user: trashed rows whose parent is
    /// absent or not itself trashed. Descendants of a trashed folder are
    /// not listed individually.
    pub async fn find_trashed_roots(&self, owner_id: Uuid) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>(
            "SELECT n.* FROM nodes n \
             LEFT JOIN nodes p ON p.id = n.parent_id \
             WHERE n.owner_id = $1 AND n.trashed AND (p.id IS NULL OR NOT p.trashed) \
             ORDER BY n.updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list trashed nodes", e)
        })
    }

    /// Delete a node and its whole subtree: grants removed, a history
    /// entry written per node, rows deleted children-first, all inside
    /// one transaction. Returns the deleted nodes, deepest first, so the
    /// caller can fan out notifications after commit.
    pub async fn hard_delete_subtree(
        &self,
        root_id: Uuid,
        acting_user: Uuid,
    ) -> AppResult<Vec<Node>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let deleted = Self::hard_delete_subtree_on(&mut tx, root_id, acting_user).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit hard delete", e)
        })?;

        Ok(deleted)
    }

    /// Transaction-scoped form of [`Self::hard_delete_subtree`]; the
    /// delta sync reuses it inside its page transaction.
    pub async fn hard_delete_subtree_on(
        conn: &mut PgConnection,
        root_id: Uuid,
        acting_user: Uuid,
    ) -> AppResult<Vec<Node>> {
        let generations = Self::descendant_generations_on(conn, &[root_id]).await?;
        let all_ids: Vec<Uuid> = generations.iter().flatten().copied().collect();

        let nodes = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ANY($1)")
            .bind(&all_ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load subtree", e)
            })?;

        GrantRepository::delete_for_files_on(conn, &all_ids).await?;

        // Deepest generation first, so each history entry precedes its
        // node's removal and rows always go children-before-parent.
        let mut deleted = Vec::with_capacity(nodes.len());
        for generation in generations.iter().rev() {
            for id in generation {
                if let Some(node) = nodes.iter().find(|n| n.id == *id) {
                    HistoryRepository::insert_on(
                        conn,
                        node.id,
                        acting_user,
                        "delete",
                        Some(serde_json::json!({ "name": node.name })),
                    )
                    .await?;
                    deleted.push(node.clone());
                }
            }

            sqlx::query("DELETE FROM nodes WHERE id = ANY($1)")
                .bind(generation)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete subtree rows", e)
                })?;
        }

        Ok(deleted)
    }

    /// Total bytes of non-trashed nodes owned by a user.
    pub async fn sum_sizes(&self, owner_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(size_bytes) FROM nodes WHERE owner_id = $1 AND NOT trashed",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map(|sum| sum.unwrap_or(0))
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sum sizes", e))
    }

    /// Count of non-trashed nodes owned by a user.
    pub async fn count_owned(&self, owner_id: Uuid) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM nodes WHERE owner_id = $1 AND NOT trashed",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count nodes", e))?;
        Ok(count as u64)
    }

    async fn acquire(&self) -> AppResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })
    }
}

/// Convenience constructor for the mirror path: build an [`UpsertNode`]
/// for a freshly mirrored remote item.
pub fn upsert_from_remote(
    owner_id: Uuid,
    parent_id: Option<Uuid>,
    name: &str,
    kind: NodeKind,
    size_bytes: i64,
    remote_id: &str,
    web_url: Option<String>,
    download_url: Option<String>,
) -> UpsertNode {
    UpsertNode {
        owner_id,
        parent_id,
        name: name.to_string(),
        kind,
        size_bytes,
        storage_backend: StorageBackend::Remote,
        remote_id: remote_id.to_string(),
        web_url,
        download_url,
    }
}
