//! Node entity model.
//!
//! A node is a file or folder in the hierarchical tree. The remote
//! provider is authoritative for identity and content; a node row is the
//! local metadata+ACL record, created only as the result of a successful
//! remote-mirror operation (folder create or file upload), with the
//! per-user root as the one implicit exception.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whether a node is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "node_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A regular file with content.
    File,
    /// A folder that can contain children.
    Folder,
}

impl NodeKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which backend physically holds a node's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "storage_backend", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Stored on this system's own disk.
    Local,
    /// Mirrored on the external cloud drive.
    Remote,
}

impl StorageBackend {
    /// Return the backend as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// A file or folder in the tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Node {
    /// Unique node identifier.
    pub id: Uuid,
    /// The user who created the node.
    pub owner_id: Uuid,
    /// Parent node ID (null for a user's tree root). If non-null it must
    /// reference an existing folder; cycles are prevented at mutation time.
    pub parent_id: Option<Uuid>,
    /// Node name (file name including extension, or folder name).
    pub name: String,
    /// File or folder.
    pub kind: NodeKind,
    /// Size in bytes (0 for folders).
    pub size_bytes: i64,
    /// Which backend holds the content.
    pub storage_backend: StorageBackend,
    /// Opaque identifier on the remote provider; null until mirrored.
    pub remote_id: Option<String>,
    /// Browser URL on the remote provider. May go stale.
    pub web_url: Option<String>,
    /// Short-lived content download URL. May go stale.
    pub download_url: Option<String>,
    /// Soft-delete marker. Distinct from hard delete: a trashed node is
    /// hidden from listings but its row, grants, and remote item remain.
    pub trashed: bool,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Check if this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Check if this node is a user's tree root (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Data for inserting-or-updating a node keyed on its remote identity.
///
/// Both user-initiated mirror operations and the delta sync go through
/// this shape, so a sync race on the same remote item updates the row
/// instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertNode {
    /// The user who owns the record.
    pub owner_id: Uuid,
    /// Parent node (None for a tree root).
    pub parent_id: Option<Uuid>,
    /// Node name.
    pub name: String,
    /// File or folder.
    pub kind: NodeKind,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Which backend holds the content.
    pub storage_backend: StorageBackend,
    /// Remote provider identifier (the upsert key).
    pub remote_id: String,
    /// Browser URL, if known.
    pub web_url: Option<String>,
    /// Download URL, if known.
    pub download_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, kind: NodeKind) -> Node {
        Node {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            parent_id: None,
            name: name.to_string(),
            kind,
            size_bytes: 0,
            storage_backend: StorageBackend::Remote,
            remote_id: None,
            web_url: None,
            download_url: None,
            trashed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(
            node("Report.PDF", NodeKind::File).extension(),
            Some("pdf".to_string())
        );
        assert_eq!(node("Makefile", NodeKind::File).extension(), None);
    }

    #[test]
    fn test_is_root() {
        let mut n = node("root", NodeKind::Folder);
        assert!(n.is_root());
        n.parent_id = Some(Uuid::new_v4());
        assert!(!n.is_root());
    }
}
