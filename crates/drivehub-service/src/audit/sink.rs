//! History recording and best-effort notification delivery.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use drivehub_core::result::AppResult;
use drivehub_core::types::id::UserId;
use drivehub_database::repositories::history::HistoryRepository;
use drivehub_database::repositories::notification::NotificationRepository;
use drivehub_entity::history::model::HistoryEntry;
use drivehub_entity::node::model::Node;
use drivehub_entity::notification::model::Notification;

/// Records every mutating action as a history entry and emits a
/// notification to the acting user.
///
/// History is part of the mutation and its failure propagates;
/// notification delivery is a side channel whose failure is logged and
/// swallowed, never failing or rolling back the triggering operation.
#[derive(Debug, Clone)]
pub struct AuditSink {
    /// History repository.
    history_repo: Arc<HistoryRepository>,
    /// Notification repository.
    notification_repo: Arc<NotificationRepository>,
}

impl AuditSink {
    /// Creates a new audit sink.
    pub fn new(
        history_repo: Arc<HistoryRepository>,
        notification_repo: Arc<NotificationRepository>,
    ) -> Self {
        Self {
            history_repo,
            notification_repo,
        }
    }

    /// Record an action in the history, collapsing same-day repeats.
    pub async fn record(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: &str,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<HistoryEntry> {
        self.history_repo
            .record(file_id, user_id, action, metadata)
            .await
    }

    /// Notify a user about an action on a node. Best-effort.
    pub async fn notify(&self, user_id: Uuid, action: &str, node: &Node) {
        if let Err(e) = self
            .notification_repo
            .insert(user_id, action, node.id, &node.name)
            .await
        {
            warn!(
                user_id = %user_id,
                node_id = %node.id,
                action,
                error = %e,
                "Notification delivery failed"
            );
        }
    }

    /// Notify a user about an action on several nodes. Best-effort.
    pub async fn notify_all(&self, user_id: Uuid, action: &str, nodes: &[Node]) {
        for node in nodes {
            self.notify(user_id, action, node).await;
        }
    }

    /// Unread notifications for a user, newest first.
    pub async fn unread_notifications(&self, user_id: UserId) -> AppResult<Vec<Notification>> {
        self.notification_repo
            .find_unread(user_id.into_uuid())
            .await
    }

    /// Mark a set of the user's notifications as read; returns how many
    /// unread rows matched.
    pub async fn mark_notifications_read(
        &self,
        user_id: UserId,
        ids: &[Uuid],
    ) -> AppResult<u64> {
        self.notification_repo
            .mark_read(user_id.into_uuid(), ids)
            .await
    }

    /// Delete a set of the user's notifications; returns how many matched.
    pub async fn delete_notifications(&self, user_id: UserId, ids: &[Uuid]) -> AppResult<u64> {
        self.notification_repo.delete(user_id.into_uuid(), ids).await
    }
}
