//! Trash, restore, and hard-delete cascades.
//!
//! Authorization happens once at the entry point of each public
//! operation; descendants inherit the root's decision. The subtree id
//! closure is computed with bulk frontier queries and the flag flip is a
//! single statement, so concurrent readers never observe a
//! half-cascaded subtree.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;
use drivehub_core::types::id::NodeId;
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_entity::node::model::Node;
use drivehub_entity::permission::action::FileAction;

use crate::audit::AuditSink;
use crate::permission::PermissionService;

/// Local cascading operations: soft-delete (trash), restore, and hard
/// delete, each recursive over the whole subtree.
#[derive(Debug, Clone)]
pub struct TreeService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Permission checks.
    perms: Arc<PermissionService>,
    /// History + notifications.
    audit: Arc<AuditSink>,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(
        node_repo: Arc<NodeRepository>,
        perms: Arc<PermissionService>,
        audit: Arc<AuditSink>,
    ) -> Self {
        Self {
            node_repo,
            perms,
            audit,
        }
    }

    /// Soft-delete a node and every descendant. Local-only: the remote
    /// item is untouched, since trash is a visibility concept the remote
    /// store does not share.
    pub async fn trash(&self, node_id: NodeId, principal: &Principal) -> AppResult<()> {
        let node = self.load(node_id).await?;
        self.perms
            .require(&node, principal, FileAction::Delete)
            .await?;

        let ids = self.node_repo.descendant_ids(&[node.id]).await?;
        let affected = self.node_repo.set_trashed_bulk(&ids, true).await?;

        self.audit
            .record(
                node.id,
                principal.id.into_uuid(),
                "trash",
                Some(serde_json::json!({ "name": node.name, "nodes": affected })),
            )
            .await?;
        self.notify_subtree(principal, "trashed", &ids).await;

        info!(node_id = %node_id, affected, "Subtree trashed");
        Ok(())
    }

    /// Clear the trash flag on a node and every descendant.
    pub async fn restore(&self, node_id: NodeId, principal: &Principal) -> AppResult<()> {
        let node = self.load(node_id).await?;
        self.perms
            .require(&node, principal, FileAction::Restore)
            .await?;

        let ids = self.node_repo.descendant_ids(&[node.id]).await?;
        let affected = self.node_repo.set_trashed_bulk(&ids, false).await?;

        self.audit
            .record(
                node.id,
                principal.id.into_uuid(),
                "restore",
                Some(serde_json::json!({ "name": node.name, "nodes": affected })),
            )
            .await?;
        self.notify_subtree(principal, "restored", &ids).await;

        info!(node_id = %node_id, affected, "Subtree restored");
        Ok(())
    }

    /// Remove a subtree for good: grants deleted, a history entry per
    /// node, rows removed, all inside one transaction, so a failure
    /// mid-cascade leaves the pre-operation state intact. The caller has
    /// already authorized the root and mirrored the deletion remotely.
    pub async fn cascade_hard_delete(
        &self,
        node: &Node,
        principal: &Principal,
    ) -> AppResult<Vec<Node>> {
        let deleted = self
            .node_repo
            .hard_delete_subtree(node.id, principal.id.into_uuid())
            .await?;

        self.audit
            .notify_all(principal.id.into_uuid(), "deleted", &deleted)
            .await;

        info!(node_id = %node.id, count = deleted.len(), "Subtree hard-deleted");
        Ok(deleted)
    }

    /// Trash every node in an id set that the principal owns, plus their
    /// descendants (same ownership filter). Returns how many rows
    /// flipped.
    pub async fn bulk_trash(&self, node_ids: &[NodeId], principal: &Principal) -> AppResult<u64> {
        self.bulk_set_trashed(node_ids, principal, true, "trash", "trashed")
            .await
    }

    /// Restore every node in an id set that the principal owns, plus
    /// their descendants. Returns how many rows flipped.
    pub async fn bulk_restore(&self, node_ids: &[NodeId], principal: &Principal) -> AppResult<u64> {
        self.bulk_set_trashed(node_ids, principal, false, "restore", "restored")
            .await
    }

    /// Top-level trashed nodes for the principal. Descendants of a
    /// trashed folder are not listed individually; restoring the listed
    /// root brings the whole subtree back.
    pub async fn list_trashed(&self, principal: &Principal) -> AppResult<Vec<Node>> {
        self.node_repo
            .find_trashed_roots(principal.id.into_uuid())
            .await
    }

    async fn bulk_set_trashed(
        &self,
        node_ids: &[NodeId],
        principal: &Principal,
        trashed: bool,
        action: &str,
        notify_action: &str,
    ) -> AppResult<u64> {
        let start: Vec<Uuid> = node_ids.iter().map(|id| id.into_uuid()).collect();
        let ids = self.node_repo.descendant_ids(&start).await?;
        let owner = principal.id.into_uuid();
        let affected = self
            .node_repo
            .set_trashed_bulk_owned(&ids, owner, trashed)
            .await?;

        // History and notifications go to the requested roots the
        // principal actually owns, not every descendant.
        let roots = self.node_repo.find_by_ids(&start).await?;
        for root in roots.iter().filter(|n| n.owner_id == owner) {
            self.audit
                .record(
                    root.id,
                    owner,
                    action,
                    Some(serde_json::json!({ "name": root.name })),
                )
                .await?;
            self.audit.notify(owner, notify_action, root).await;
        }

        info!(requested = node_ids.len(), affected, action, "Bulk trash flag update");
        Ok(affected)
    }

    async fn notify_subtree(&self, principal: &Principal, action: &str, ids: &[Uuid]) {
        match self.node_repo.find_by_ids(ids).await {
            Ok(nodes) => {
                self.audit
                    .notify_all(principal.id.into_uuid(), action, &nodes)
                    .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load subtree for notifications");
            }
        }
    }

    async fn load(&self, node_id: NodeId) -> AppResult<Node> {
        self.node_repo
            .find_by_id(node_id.into_uuid())
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))
    }
}
