//! Grant kinds, checkable actions, and the accepted-grant table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use drivehub_core::AppError;

/// Permission kind held by an access grant.
///
/// A closed set: one row per `(node, user, kind)` triple. A user may hold
/// several kinds on the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grant_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Full control. Every node has at least one owner grant at all times.
    Owner,
    /// Read/list access.
    View,
    /// May upload files into this folder.
    Upload,
    /// May modify (rename) the node.
    Edit,
    /// May trash, restore, and hard-delete the node.
    Delete,
    /// May create subfolders in this folder.
    CreateFolder,
}

impl GrantKind {
    /// Return the grant kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::View => "view",
            Self::Upload => "upload",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::CreateFolder => "create_folder",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GrantKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "view" => Ok(Self::View),
            "upload" => Ok(Self::Upload),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "create_folder" => Ok(Self::CreateFolder),
            _ => Err(AppError::validation(format!("Invalid grant kind: '{s}'"))),
        }
    }
}

/// An action checked against a node's grants.
///
/// Restore deliberately maps to the same accepted set as delete: trash and
/// restore are two halves of the same reversible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// View/list a node.
    View,
    /// Upload a file into a folder.
    Upload,
    /// Create a subfolder in a folder.
    CreateFolder,
    /// Modify (rename) a node.
    Edit,
    /// Trash or hard-delete a node.
    Delete,
    /// Restore a trashed node.
    Restore,
    /// Fetch a download URL for a file.
    Download,
    /// Move a node to a new parent.
    Move,
}

impl FileAction {
    /// The grant kinds accepted for this action.
    ///
    /// A static table: an action with an empty set here is denied for
    /// everyone except through the owner fast path, which is evaluated
    /// before this table.
    pub fn accepted_grants(&self) -> &'static [GrantKind] {
        match self {
            Self::View => &[GrantKind::Owner, GrantKind::View],
            Self::Upload => &[GrantKind::Owner, GrantKind::Upload],
            Self::CreateFolder => &[GrantKind::Owner, GrantKind::CreateFolder],
            Self::Edit => &[GrantKind::Owner, GrantKind::Edit],
            Self::Delete => &[GrantKind::Owner, GrantKind::Delete],
            Self::Restore => &[GrantKind::Owner, GrantKind::Delete],
            Self::Download => &[GrantKind::Owner, GrantKind::View],
            Self::Move => &[GrantKind::Owner, GrantKind::Edit],
        }
    }

    /// The grant kind looked up for this action.
    ///
    /// The lookup key differs from the accepted set: a user holding only
    /// an `owner` row matches through the fast path, not here.
    pub fn lookup_grant(&self) -> GrantKind {
        match self {
            Self::View => GrantKind::View,
            Self::Upload => GrantKind::Upload,
            Self::CreateFolder => GrantKind::CreateFolder,
            Self::Edit => GrantKind::Edit,
            Self::Delete => GrantKind::Delete,
            Self::Restore => GrantKind::Delete,
            Self::Download => GrantKind::View,
            Self::Move => GrantKind::Edit,
        }
    }

    /// Return the action as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Upload => "upload",
            Self::CreateFolder => "create_folder",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Download => "download",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
