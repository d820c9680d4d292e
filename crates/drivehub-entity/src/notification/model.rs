//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A notification delivered to a user's inbox after a tree mutation.
///
/// Delivery is a side channel: a failed insert is logged and swallowed,
/// never surfaced as a failure of the triggering operation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: Uuid,
    /// The recipient user.
    pub user_id: Uuid,
    /// The action that triggered the notification.
    pub action: String,
    /// The node involved (kept after hard delete).
    pub file_id: Uuid,
    /// The node's name at notification time.
    pub file_name: String,
    /// Human-readable message, e.g. `"File 'a.txt' was uploaded."`.
    pub message: String,
    /// When the user read the notification (null while unread).
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check whether the notification is still unread.
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Build the standard message line for an action on a named node.
    pub fn message_for(action: &str, file_name: &str) -> String {
        format!("File '{file_name}' was {action}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_for() {
        assert_eq!(
            Notification::message_for("trashed", "report.pdf"),
            "File 'report.pdf' was trashed."
        );
    }
}
