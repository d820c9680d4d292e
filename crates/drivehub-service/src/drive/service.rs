//! Remote-first mutations: every operation mirrors to the remote drive
//! before committing the local record, so callers never observe a local
//! node whose remote counterpart does not exist. The reverse drift
//! (remote exists, local stale) is an accepted transient state healed by
//! the delta sync.

use std::sync::Arc;

use tracing::info;

use drivehub_core::config::sync::SyncConfig;
use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;
use drivehub_core::traits::blob::UploadBlob;
use drivehub_core::traits::remote::{RemoteItemId, RemoteStorage, StorageQuota};
use drivehub_core::types::id::NodeId;
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::node::{NodeRepository, upsert_from_remote};
use drivehub_entity::node::model::{Node, NodeKind};
use drivehub_entity::permission::action::{FileAction, GrantKind};

use crate::audit::AuditSink;
use crate::permission::PermissionService;
use crate::tree::TreeService;

/// Storage usage summary for a user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageUsage {
    /// Bytes in non-trashed nodes the user owns.
    pub used_bytes: i64,
    /// Human-readable form of `used_bytes`.
    pub used_display: String,
    /// Non-trashed nodes the user owns.
    pub node_count: u64,
    /// The remote drive's quota.
    pub quota: StorageQuota,
}

/// Orchestrates a local mutation together with its remote counterpart.
#[derive(Debug, Clone)]
pub struct DriveService {
    /// Remote storage gateway.
    gateway: Arc<dyn RemoteStorage>,
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Grant repository.
    grant_repo: Arc<GrantRepository>,
    /// Permission checks.
    perms: Arc<PermissionService>,
    /// Local cascades.
    tree: Arc<TreeService>,
    /// History + notifications.
    audit: Arc<AuditSink>,
    /// Sync settings (root folder prefix).
    config: SyncConfig,
}

impl DriveService {
    /// Creates a new drive service.
    pub fn new(
        gateway: Arc<dyn RemoteStorage>,
        node_repo: Arc<NodeRepository>,
        grant_repo: Arc<GrantRepository>,
        perms: Arc<PermissionService>,
        tree: Arc<TreeService>,
        audit: Arc<AuditSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            gateway,
            node_repo,
            grant_repo,
            perms,
            tree,
            audit,
            config,
        }
    }

    /// Return the user's root folder, creating it remotely and locally
    /// exactly once. Subsequent calls are a pure lookup; two concurrent
    /// first-calls are resolved by the store's unique root constraint
    /// and the gateway's idempotent folder creation.
    pub async fn ensure_user_root(&self, principal: &Principal) -> AppResult<Node> {
        let owner = principal.id.into_uuid();
        if let Some(root) = self.node_repo.find_root(owner).await? {
            return Ok(root);
        }

        let name = format!("{}-{}", self.config.root_folder_prefix, principal.id);
        let item = self.gateway.create_folder(&name, None).await?;

        let root = self
            .node_repo
            .create_root(owner, &item.name, item.id.as_str(), item.web_url.as_deref())
            .await?;

        self.grant_repo
            .upsert(root.id, owner, GrantKind::Owner)
            .await?;
        self.audit
            .record(
                root.id,
                owner,
                "create_folder",
                Some(serde_json::json!({ "name": root.name, "remote_id": item.id.as_str() })),
            )
            .await?;
        self.audit.notify(owner, "created", &root).await;

        info!(user_id = %principal.id, root_id = %root.id, "User root created");
        Ok(root)
    }

    /// Create a folder under `parent_id` (the principal's root when
    /// omitted): remote first, then the local record with its owner
    /// grant.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<NodeId>,
        principal: &Principal,
    ) -> AppResult<Node> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }

        let parent = self.resolve_parent(parent_id, principal).await?;
        self.perms
            .require(&parent, principal, FileAction::CreateFolder)
            .await?;

        let parent_remote = remote_id_of(&parent)?;
        let item = self.gateway.create_folder(name, Some(&parent_remote)).await?;

        let owner = principal.id.into_uuid();
        let node = self
            .node_repo
            .upsert_by_remote_id(&upsert_from_remote(
                owner,
                Some(parent.id),
                &item.name,
                NodeKind::Folder,
                0,
                item.id.as_str(),
                item.web_url.clone(),
                None,
            ))
            .await?;

        self.grant_repo
            .upsert(node.id, owner, GrantKind::Owner)
            .await?;
        self.audit
            .record(
                node.id,
                owner,
                "create_folder",
                Some(serde_json::json!({ "name": node.name })),
            )
            .await?;
        self.audit.notify(owner, "created", &node).await;

        info!(user_id = %principal.id, node_id = %node.id, name = %node.name, "Folder created");
        Ok(node)
    }

    /// Upload file content under `parent_id` (the principal's root when
    /// omitted). Not idempotent: a retry after an ambiguous timeout can
    /// duplicate the remote file, which the next sync pass adopts as a
    /// normal node.
    pub async fn upload_file(
        &self,
        parent_id: Option<NodeId>,
        blob: &dyn UploadBlob,
        principal: &Principal,
    ) -> AppResult<Node> {
        let parent = self.resolve_parent(parent_id, principal).await?;
        self.perms
            .require(&parent, principal, FileAction::Upload)
            .await?;

        let parent_remote = remote_id_of(&parent)?;
        let item = self
            .gateway
            .upload_content(blob, Some(&parent_remote))
            .await?;

        let owner = principal.id.into_uuid();
        let node = self
            .node_repo
            .upsert_by_remote_id(&upsert_from_remote(
                owner,
                Some(parent.id),
                &item.name,
                NodeKind::File,
                item.size_bytes,
                item.id.as_str(),
                item.web_url.clone(),
                item.download_url.clone(),
            ))
            .await?;

        self.grant_repo
            .upsert(node.id, owner, GrantKind::Owner)
            .await?;
        self.audit
            .record(
                node.id,
                owner,
                "upload",
                Some(serde_json::json!({ "name": node.name, "size": node.size_bytes })),
            )
            .await?;
        self.audit.notify(owner, "uploaded", &node).await;

        info!(user_id = %principal.id, node_id = %node.id, name = %node.name, "File uploaded");
        Ok(node)
    }

    /// Move a node under a new parent (the principal's root when
    /// omitted). A move that would place the node inside its own subtree
    /// is rejected before any remote call.
    pub async fn move_node(
        &self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        principal: &Principal,
    ) -> AppResult<Node> {
        let node = self.load(node_id).await?;
        self.perms
            .require(&node, principal, FileAction::Move)
            .await?;

        let target = self.resolve_parent(new_parent_id, principal).await?;
        if target.id == node.id {
            return Err(AppError::invalid_move("Cannot move a node into itself"));
        }
        let target_ancestors = self.node_repo.ancestor_ids(target.id).await?;
        if target_ancestors.contains(&node.id) {
            return Err(AppError::invalid_move(
                "Cannot move a node into one of its descendants",
            ));
        }

        let node_remote = remote_id_of(&node)?;
        let target_remote = remote_id_of(&target)?;
        let item = self.gateway.move_item(&node_remote, &target_remote).await?;

        let moved = self
            .node_repo
            .set_parent(node.id, target.id, item.web_url.as_deref())
            .await?;

        let owner = principal.id.into_uuid();
        self.audit
            .record(
                moved.id,
                owner,
                "move",
                Some(serde_json::json!({ "name": moved.name, "to": target.id })),
            )
            .await?;
        self.audit.notify(owner, "moved", &moved).await;

        info!(node_id = %node_id, target_id = %target.id, "Node moved");
        Ok(moved)
    }

    /// Rename a node: remote first, then the local record.
    pub async fn rename(
        &self,
        node_id: NodeId,
        new_name: &str,
        principal: &Principal,
    ) -> AppResult<Node> {
        if new_name.trim().is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }

        let node = self.load(node_id).await?;
        self.perms
            .require(&node, principal, FileAction::Edit)
            .await?;

        let node_remote = remote_id_of(&node)?;
        let item = self.gateway.rename(&node_remote, new_name).await?;

        let renamed = self.node_repo.set_name(node.id, &item.name).await?;

        let owner = principal.id.into_uuid();
        self.audit
            .record(
                renamed.id,
                owner,
                "rename",
                Some(serde_json::json!({ "from": node.name, "to": renamed.name })),
            )
            .await?;
        self.audit.notify(owner, "renamed", &renamed).await;

        info!(node_id = %node_id, name = %renamed.name, "Node renamed");
        Ok(renamed)
    }

    /// Permanently delete a node: the remote item first, then the whole
    /// local subtree (grants, history entries, rows) in one transaction.
    /// Distinct from trash: there is no way back.
    pub async fn hard_delete(&self, node_id: NodeId, principal: &Principal) -> AppResult<()> {
        let node = self.load(node_id).await?;
        self.perms
            .require(&node, principal, FileAction::Delete)
            .await?;

        if let Some(remote_id) = node.remote_id.as_deref() {
            self.gateway.delete(&RemoteItemId::new(remote_id)).await?;
        }

        self.tree.cascade_hard_delete(&node, principal).await?;
        Ok(())
    }

    /// Fetch a short-lived download URL for a file. The cached column is
    /// refreshed but the URL must not be stored long-term by callers.
    pub async fn download_url(
        &self,
        node_id: NodeId,
        principal: &Principal,
    ) -> AppResult<Option<String>> {
        let node = self.load(node_id).await?;
        if node.kind != NodeKind::File {
            return Err(AppError::validation("Only files have download URLs"));
        }
        self.perms
            .require(&node, principal, FileAction::Download)
            .await?;

        let node_remote = remote_id_of(&node)?;
        let url = self.gateway.download_url(&node_remote).await?;
        self.node_repo
            .set_download_url(node.id, url.as_deref())
            .await?;

        let owner = principal.id.into_uuid();
        self.audit
            .record(
                node.id,
                owner,
                "download",
                Some(serde_json::json!({ "name": node.name })),
            )
            .await?;
        self.audit.notify(owner, "downloaded", &node).await;

        Ok(url)
    }

    /// Storage usage for the principal plus the remote drive quota.
    pub async fn storage_usage(&self, principal: &Principal) -> AppResult<StorageUsage> {
        let owner = principal.id.into_uuid();
        let used_bytes = self.node_repo.sum_sizes(owner).await?;
        let node_count = self.node_repo.count_owned(owner).await?;
        let quota = self.gateway.quota().await?;
        Ok(StorageUsage {
            used_bytes,
            used_display: format_size(used_bytes),
            node_count,
            quota,
        })
    }

    async fn resolve_parent(
        &self,
        parent_id: Option<NodeId>,
        principal: &Principal,
    ) -> AppResult<Node> {
        let parent = match parent_id {
            Some(id) => self.load(id).await?,
            None => self.ensure_user_root(principal).await?,
        };
        if !parent.is_folder() {
            return Err(AppError::validation("Parent node is not a folder"));
        }
        Ok(parent)
    }

    async fn load(&self, node_id: NodeId) -> AppResult<Node> {
        self.node_repo
            .find_by_id(node_id.into_uuid())
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))
    }
}

fn remote_id_of(node: &Node) -> AppResult<RemoteItemId> {
    node.remote_id
        .as_deref()
        .map(RemoteItemId::new)
        .ok_or_else(|| {
            AppError::internal(format!("Node {} has no remote identity", node.id))
        })
}

/// Render a byte count as B/KB/MB/GB/TB with two decimals.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1 << 10;
    const MB: i64 = 1 << 20;
    const GB: i64 = 1 << 30;
    const TB: i64 = 1 << 40;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * (1 << 20)), "5.00 MB");
        assert_eq!(format_size(3 * (1 << 30)), "3.00 GB");
        assert_eq!(format_size(2 * (1 << 40)), "2.00 TB");
    }
}
