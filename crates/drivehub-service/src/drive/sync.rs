//! Delta reconciliation loop.
//!
//! Pulls the remote change feed from the last durable cursor and applies
//! it to the local tree inside one transaction per page: deletions first
//! (with a defensive local cascade in case the provider omits nested
//! tombstones), then upserts keyed on remote identity, with parent
//! resolution deferred for items that arrive before their parent. The
//! new cursor is written in the same transaction, so cursor and page
//! commit atomically; a failed fetch leaves the old cursor in place and
//! the feed resumable.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{Acquire, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use drivehub_core::config::sync::SyncConfig;
use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_core::traits::remote::{RemoteItem, RemoteItemId, RemoteItemKind, RemoteStorage};
use drivehub_core::types::id::UserId;
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_database::repositories::sync_cursor::{DELTA_CURSOR_KEY, SyncCursorRepository};
use drivehub_entity::node::model::{Node, NodeKind, StorageBackend, UpsertNode};
use drivehub_entity::permission::action::GrantKind;

use crate::audit::AuditSink;
use crate::drive::DriveService;

/// Outcome of one sync run.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SyncReport {
    /// Items created or updated locally.
    pub synced: u64,
    /// Local nodes removed (including defensive descendant cascades).
    pub deleted: u64,
    /// Items that failed to apply and were skipped.
    pub skipped: u64,
}

/// Periodic delta-sync runner. One instance per process; overlapping
/// invocations are serialized on an internal lock so two runs never race
/// on the same cursor.
#[derive(Debug)]
pub struct SyncService {
    /// Remote storage gateway.
    gateway: Arc<dyn RemoteStorage>,
    /// Pool for the page transaction.
    pool: PgPool,
    /// Cursor slot.
    cursor_repo: Arc<SyncCursorRepository>,
    /// Used to ensure the sync principal's root exists.
    drive: Arc<DriveService>,
    /// Notifications.
    audit: Arc<AuditSink>,
    /// Sync settings.
    config: SyncConfig,
    /// Serializes overlapping runs.
    run_lock: Mutex<()>,
}

impl SyncService {
    /// Creates a new sync service.
    pub fn new(
        gateway: Arc<dyn RemoteStorage>,
        pool: PgPool,
        cursor_repo: Arc<SyncCursorRepository>,
        drive: Arc<DriveService>,
        audit: Arc<AuditSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            gateway,
            pool,
            cursor_repo,
            drive,
            audit,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass.
    pub async fn sync_drive(&self) -> AppResult<SyncReport> {
        let _guard = self.run_lock.lock().await;

        let cursor = self.cursor_repo.get(DELTA_CURSOR_KEY).await?;
        // A fetch failure propagates here, before any local write: the
        // stored cursor is untouched and the next run retries it.
        let page = self.gateway.fetch_changes(cursor.as_deref()).await?;

        let sync_user = self.config.principal_user_id;
        let principal = Principal::new(UserId::from_uuid(sync_user));
        let root = self.drive.ensure_user_root(&principal).await?;

        let mut report = SyncReport::default();
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin sync transaction", e)
        })?;

        // Deletions first. Each item runs in a savepoint so one bad
        // entry cannot poison the rest of the page.
        let mut removed: Vec<Node> = Vec::new();
        for remote_id in &page.deleted {
            match apply_deletion(&mut tx, remote_id, sync_user).await {
                Ok(nodes) => {
                    report.deleted += nodes.len() as u64;
                    removed.extend(nodes);
                }
                Err(e) => {
                    warn!(remote_id = %remote_id, error = %e, "Skipping delta deletion");
                    report.skipped += 1;
                }
            }
        }

        // Upserts, deferring items whose parent has not been seen yet
        // (a page may list a child before its folder).
        let mut resolved: HashMap<String, Uuid> = HashMap::new();
        if let Some(rid) = &root.remote_id {
            resolved.insert(rid.clone(), root.id);
        }

        let mut synced: Vec<Node> = Vec::new();
        let mut pending = page.items.clone();
        loop {
            let mut progressed = false;
            let mut deferred = Vec::new();

            for item in pending {
                let parent_local = match lookup_parent(&mut tx, &resolved, &item, root.id).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!(remote_id = %item.id, error = %e, "Skipping delta item");
                        report.skipped += 1;
                        continue;
                    }
                };
                let Some(parent_local) = parent_local else {
                    deferred.push(item);
                    continue;
                };

                match apply_upsert(&mut tx, &item, parent_local, sync_user).await {
                    Ok(node) => {
                        resolved.insert(item.id.as_str().to_string(), node.id);
                        synced.push(node);
                        report.synced += 1;
                        progressed = true;
                    }
                    Err(e) => {
                        warn!(remote_id = %item.id, error = %e, "Skipping delta item");
                        report.skipped += 1;
                    }
                }
            }

            if deferred.is_empty() || !progressed {
                // Anything still unresolved attaches under the sync
                // root; a later pass corrects it once the parent shows
                // up in the feed.
                for item in &deferred {
                    match apply_upsert(&mut tx, item, root.id, sync_user).await {
                        Ok(node) => {
                            resolved.insert(item.id.as_str().to_string(), node.id);
                            synced.push(node);
                            report.synced += 1;
                        }
                        Err(e) => {
                            warn!(remote_id = %item.id, error = %e, "Skipping delta item");
                            report.skipped += 1;
                        }
                    }
                }
                break;
            }
            pending = deferred;
        }

        SyncCursorRepository::set_on(&mut tx, DELTA_CURSOR_KEY, &page.next_cursor).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit sync page", e)
        })?;

        // Notifications only after the page is durable.
        self.audit.notify_all(sync_user, "synced", &synced).await;
        self.audit.notify_all(sync_user, "deleted", &removed).await;

        info!(
            synced = report.synced,
            deleted = report.deleted,
            skipped = report.skipped,
            "Drive sync pass complete"
        );
        Ok(report)
    }
}

/// Remove the local mirror of a deleted remote item, cascading over
/// local children in case the provider's feed omitted nested
/// tombstones. Runs in its own savepoint.
async fn apply_deletion(
    tx: &mut Transaction<'_, Postgres>,
    remote_id: &RemoteItemId,
    sync_user: Uuid,
) -> AppResult<Vec<Node>> {
    let mut sp = tx.begin().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to open savepoint", e)
    })?;

    let Some(node) = NodeRepository::find_by_remote_id_on(&mut sp, remote_id.as_str()).await?
    else {
        // Never mirrored locally; nothing to do.
        sp.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to release savepoint", e)
        })?;
        return Ok(Vec::new());
    };

    let deleted = NodeRepository::hard_delete_subtree_on(&mut sp, node.id, sync_user).await?;

    sp.commit().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to release savepoint", e)
    })?;
    Ok(deleted)
}

/// Resolve an item's local parent: the in-page map first, then the
/// store. `Ok(None)` means the parent has not been seen yet and the item
/// should be deferred. Items with no parent reference belong under the
/// sync root.
async fn lookup_parent(
    tx: &mut Transaction<'_, Postgres>,
    resolved: &HashMap<String, Uuid>,
    item: &RemoteItem,
    root_id: Uuid,
) -> AppResult<Option<Uuid>> {
    let Some(parent_remote) = &item.parent_id else {
        return Ok(Some(root_id));
    };
    if let Some(local) = resolved.get(parent_remote.as_str()) {
        return Ok(Some(*local));
    }
    let found = NodeRepository::find_by_remote_id_on(tx, parent_remote.as_str()).await?;
    Ok(found.map(|n| n.id))
}

/// Upsert one delta item in its own savepoint. The syncing user gets an
/// idempotent owner grant on every touched node.
async fn apply_upsert(
    tx: &mut Transaction<'_, Postgres>,
    item: &RemoteItem,
    parent_local: Uuid,
    sync_user: Uuid,
) -> AppResult<Node> {
    let mut sp = tx.begin().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to open savepoint", e)
    })?;

    let data = UpsertNode {
        owner_id: sync_user,
        parent_id: Some(parent_local),
        name: item.name.clone(),
        kind: if item.kind == RemoteItemKind::Folder {
            NodeKind::Folder
        } else {
            NodeKind::File
        },
        size_bytes: item.size_bytes,
        storage_backend: StorageBackend::Remote,
        remote_id: item.id.as_str().to_string(),
        web_url: item.web_url.clone(),
        download_url: item.download_url.clone(),
    };

    let node = NodeRepository::upsert_by_remote_id_on(&mut sp, &data).await?;
    GrantRepository::upsert_on(&mut sp, node.id, sync_user, GrantKind::Owner).await?;

    sp.commit().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to release savepoint", e)
    })?;
    Ok(node)
}
