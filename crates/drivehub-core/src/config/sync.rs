//! Delta-sync configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settings for the periodic drive reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The user the scheduled sync acts as. Upserted nodes receive this
    /// user's owner grant. Normally the storage-account owner.
    pub principal_user_id: Uuid,
    /// Cron expression for the sync schedule (seconds-resolution).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Prefix for per-user root folder names on the remote drive.
    #[serde(default = "default_root_prefix")]
    pub root_folder_prefix: String,
}

fn default_schedule() -> String {
    // every 5 minutes
    "0 */5 * * * *".to_string()
}

fn default_root_prefix() -> String {
    "DriveHub".to_string()
}
