//! Access grant row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::action::GrantKind;

/// An access-control row binding a user, a node, and a permission kind.
///
/// Multiple grants per `(file_id, user_id)` pair are allowed, one row per
/// kind. Every node has at least one `owner` grant at all times, created
/// atomically with the node.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessGrant {
    /// Unique grant identifier.
    pub id: Uuid,
    /// The node this grant applies to.
    pub file_id: Uuid,
    /// The user holding the grant.
    pub user_id: Uuid,
    /// The permission kind granted.
    pub permission: GrantKind,
    /// When the grant was created.
    pub created_at: DateTime<Utc>,
    /// When the grant was last updated.
    pub updated_at: DateTime<Utc>,
}
