//! History entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An append-only audit row recording a user action on a node.
///
/// Repeated same-day actions collapse: an entry with the same
/// `(file_id, user_id, action)` created on the same calendar day is
/// updated in place (metadata + timestamp) instead of duplicated, so a
/// hundred views of one file read as one row per day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    /// Unique history entry identifier.
    pub id: Uuid,
    /// The node the action targeted. Kept after hard delete for audit.
    pub file_id: Uuid,
    /// The user who performed the action.
    pub user_id: Uuid,
    /// The action performed (e.g. `"view"`, `"upload"`, `"move"`).
    pub action: String,
    /// Additional details about the action (JSON).
    pub metadata: Option<serde_json::Value>,
    /// When the action first occurred that day.
    pub created_at: DateTime<Utc>,
    /// When the action last occurred that day.
    pub updated_at: DateTime<Utc>,
}
