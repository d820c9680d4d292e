//! Read-only projections over the tree: permission-filtered listings,
//! recent activity, and the starred association.

use std::sync::Arc;

use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;
use drivehub_core::types::id::NodeId;
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::history::HistoryRepository;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_database::repositories::starred::StarredRepository;
use drivehub_entity::history::model::HistoryEntry;
use drivehub_entity::node::model::Node;
use drivehub_entity::permission::action::FileAction;

use crate::audit::AuditSink;
use crate::permission::{PermissionService, evaluate};

/// Contents of one folder, split the way clients render them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FolderListing {
    /// The folder being listed.
    pub parent: Node,
    /// Child folders the principal may view.
    pub folders: Vec<Node>,
    /// Child files the principal may view.
    pub files: Vec<Node>,
}

/// Read-only browsing over the local tree.
#[derive(Debug, Clone)]
pub struct BrowseService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Grant repository.
    grant_repo: Arc<GrantRepository>,
    /// History repository.
    history_repo: Arc<HistoryRepository>,
    /// Starred association repository.
    starred_repo: Arc<StarredRepository>,
    /// Permission checks.
    perms: Arc<PermissionService>,
    /// History + notifications.
    audit: Arc<AuditSink>,
}

impl BrowseService {
    /// Creates a new browse service.
    pub fn new(
        node_repo: Arc<NodeRepository>,
        grant_repo: Arc<GrantRepository>,
        history_repo: Arc<HistoryRepository>,
        starred_repo: Arc<StarredRepository>,
        perms: Arc<PermissionService>,
        audit: Arc<AuditSink>,
    ) -> Self {
        Self {
            node_repo,
            grant_repo,
            history_repo,
            starred_repo,
            perms,
            audit,
        }
    }

    /// List the children of a folder (the principal's root when
    /// omitted), excluding trashed nodes and anything the principal may
    /// not view. Records a deduplicated `view` action.
    pub async fn list_children(
        &self,
        parent_id: Option<NodeId>,
        principal: &Principal,
    ) -> AppResult<FolderListing> {
        let user = principal.id.into_uuid();
        let parent = match parent_id {
            Some(id) => self
                .node_repo
                .find_by_id(id.into_uuid())
                .await?
                .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?,
            None => self
                .node_repo
                .find_root(user)
                .await?
                .ok_or_else(|| AppError::not_found("User has no root folder"))?,
        };
        if !parent.is_folder() {
            return Err(AppError::validation("Node is not a folder"));
        }
        self.perms
            .require(&parent, principal, FileAction::View)
            .await?;

        let children = self.node_repo.find_children(parent.id, false).await?;
        let child_ids: Vec<_> = children.iter().map(|n| n.id).collect();
        let grants = self
            .grant_repo
            .find_for_user_on_many(&child_ids, user)
            .await?;

        let mut folders = Vec::new();
        let mut files = Vec::new();
        for child in children {
            if !evaluate(Some(&child), principal.id, FileAction::View, &grants) {
                continue;
            }
            if child.is_folder() {
                folders.push(child);
            } else {
                files.push(child);
            }
        }

        self.audit
            .record(
                parent.id,
                user,
                "view",
                Some(serde_json::json!({ "name": parent.name })),
            )
            .await?;

        Ok(FolderListing {
            parent,
            folders,
            files,
        })
    }

    /// The nodes behind the principal's most recent `view` history
    /// entries, newest first. Trashed and since-deleted nodes drop out.
    pub async fn list_recent(&self, principal: &Principal, limit: i64) -> AppResult<Vec<Node>> {
        let user = principal.id.into_uuid();
        let entries = self.history_repo.recent_for_user(user, "view", limit).await?;
        let ids: Vec<_> = entries.iter().map(|e| e.file_id).collect();
        let nodes = self.node_repo.find_by_ids(&ids).await?;

        // Preserve the history ordering.
        let mut ordered = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = nodes.iter().find(|n| n.id == id && !n.trashed) {
                ordered.push(node.clone());
            }
        }
        Ok(ordered)
    }

    /// The latest history rows across all users, for dashboards.
    pub async fn recent_activity(&self, limit: i64) -> AppResult<Vec<HistoryEntry>> {
        self.history_repo.recent(limit).await
    }

    /// Star a node for the principal. Requires view access. Idempotent;
    /// returns whether a row was added.
    pub async fn star(&self, node_id: NodeId, principal: &Principal) -> AppResult<bool> {
        let node = self
            .node_repo
            .find_by_id(node_id.into_uuid())
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;
        self.perms
            .require(&node, principal, FileAction::View)
            .await?;

        self.starred_repo
            .star(principal.id.into_uuid(), node.id)
            .await
    }

    /// Unstar a node. Idempotent; returns whether a row was removed.
    pub async fn unstar(&self, node_id: NodeId, principal: &Principal) -> AppResult<bool> {
        self.starred_repo
            .unstar(principal.id.into_uuid(), node_id.into_uuid())
            .await
    }

    /// The principal's starred nodes, excluding trashed ones.
    pub async fn list_starred(&self, principal: &Principal) -> AppResult<Vec<Node>> {
        self.starred_repo
            .find_for_user(principal.id.into_uuid())
            .await
    }
}
