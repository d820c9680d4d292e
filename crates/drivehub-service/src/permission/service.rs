//! Grant management and authorization over the repositories.

use std::sync::Arc;

use tracing::info;

use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;
use drivehub_core::types::id::{NodeId, UserId};
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_entity::node::model::Node;
use drivehub_entity::permission::action::{FileAction, GrantKind};
use drivehub_entity::permission::model::AccessGrant;

use super::engine::evaluate;

/// Authorization checks and grant administration.
#[derive(Debug, Clone)]
pub struct PermissionService {
    /// Node repository.
    node_repo: Arc<NodeRepository>,
    /// Grant repository.
    grant_repo: Arc<GrantRepository>,
}

impl PermissionService {
    /// Creates a new permission service.
    pub fn new(node_repo: Arc<NodeRepository>, grant_repo: Arc<GrantRepository>) -> Self {
        Self {
            node_repo,
            grant_repo,
        }
    }

    /// Check whether the principal may perform `action` on `node`.
    pub async fn check(
        &self,
        node: &Node,
        principal: &Principal,
        action: FileAction,
    ) -> AppResult<bool> {
        let grants = self
            .grant_repo
            .find_for_user_on(node.id, principal.id.into_uuid())
            .await?;
        Ok(evaluate(Some(node), principal.id, action, &grants))
    }

    /// Require a permission, surfacing a detail-free denial otherwise.
    pub async fn require(
        &self,
        node: &Node,
        principal: &Principal,
        action: FileAction,
    ) -> AppResult<()> {
        if self.check(node, principal, action).await? {
            Ok(())
        } else {
            Err(AppError::permission_denied())
        }
    }

    /// Assign (or refresh) a grant. Idempotent upsert keyed by
    /// `(file_id, user_id, permission)`.
    pub async fn assign(
        &self,
        file_id: NodeId,
        user_id: UserId,
        permission: GrantKind,
    ) -> AppResult<AccessGrant> {
        let node_id = file_id.into_uuid();
        self.node_repo
            .find_by_id(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {file_id} not found")))?;

        let grant = self
            .grant_repo
            .upsert(node_id, user_id.into_uuid(), permission)
            .await?;

        info!(file_id = %file_id, user_id = %user_id, permission = %permission, "Permission assigned");
        Ok(grant)
    }

    /// Revoke a grant. No-op when absent; returns whether a row was
    /// removed.
    pub async fn revoke(
        &self,
        file_id: NodeId,
        user_id: UserId,
        permission: GrantKind,
    ) -> AppResult<bool> {
        let removed = self
            .grant_repo
            .revoke(file_id.into_uuid(), user_id.into_uuid(), permission)
            .await?;

        if removed {
            info!(file_id = %file_id, user_id = %user_id, permission = %permission, "Permission revoked");
        }
        Ok(removed)
    }

    /// All grants on a node.
    pub async fn list_for_node(&self, file_id: NodeId) -> AppResult<Vec<AccessGrant>> {
        let node_id = file_id.into_uuid();
        self.node_repo
            .find_by_id(node_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Node {file_id} not found")))?;
        self.grant_repo.find_for_node(node_id).await
    }

    /// All grants held by a user, across nodes.
    pub async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<AccessGrant>> {
        self.grant_repo.find_for_user(user_id.into_uuid()).await
    }
}
