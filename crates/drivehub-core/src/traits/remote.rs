//! Remote storage gateway trait for the external cloud drive.
//!
//! The [`RemoteStorage`] trait is defined here in `drivehub-core` and
//! implemented in `drivehub-remote`. The remote provider is the system of
//! record for file identity and content; the local store is a
//! permission+metadata cache reconciled against it.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::traits::blob::UploadBlob;

/// Opaque identifier of an item on the remote provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteItemId(pub String);

impl RemoteItemId {
    /// Wrap a provider-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RemoteItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Whether a remote item is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteItemKind {
    /// A regular file with content.
    File,
    /// A folder that can contain children.
    Folder,
}

/// Provider-neutral description of a remote item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Provider identifier.
    pub id: RemoteItemId,
    /// Item name.
    pub name: String,
    /// File or folder.
    pub kind: RemoteItemKind,
    /// Size in bytes (0 for folders).
    pub size_bytes: i64,
    /// Provider identifier of the parent, if any.
    pub parent_id: Option<RemoteItemId>,
    /// Browser URL for the item, if the provider exposes one.
    pub web_url: Option<String>,
    /// Short-lived content download URL (files only). May go stale;
    /// callers must not cache it long-term.
    pub download_url: Option<String>,
}

impl RemoteItem {
    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == RemoteItemKind::Folder
    }
}

/// One page of the delta feed.
///
/// `cursor == None` on the request side means "full initial snapshot";
/// subsequent requests pass the previous `next_cursor`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePage {
    /// Items created or changed since the last cursor.
    pub items: Vec<RemoteItem>,
    /// Remote ids removed since the last cursor.
    pub deleted: Vec<RemoteItemId>,
    /// Cursor to pass on the next call.
    pub next_cursor: String,
}

/// Remote storage quota snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageQuota {
    /// Total capacity in bytes.
    pub total: i64,
    /// Bytes used.
    pub used: i64,
    /// Bytes remaining.
    pub remaining: i64,
    /// Provider state string (e.g. `normal`, `nearing`, `exceeded`).
    pub state: String,
}

/// Abstract client for the external storage provider.
///
/// All network and auth concerns live behind this trait. Every operation
/// may fail with a transient error ([`crate::error::ErrorKind::RemoteTransient`],
/// retryable by the caller) or a permanent one
/// ([`crate::error::ErrorKind::RemotePermanent`]); the gateway classifies
/// but does not itself retry. Retry policy belongs to the reconciliation
/// service.
#[async_trait]
pub trait RemoteStorage: Send + Sync + fmt::Debug + 'static {
    /// Return the provider type name (e.g. `"onedrive"`).
    fn provider_type(&self) -> &str;

    /// Create a folder under the given parent (drive root when `None`).
    ///
    /// Idempotent: if an item with the same name already exists directly
    /// under the parent, the existing item is returned instead of creating
    /// a duplicate.
    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem>;

    /// Upload file content under the given parent (drive root when `None`).
    ///
    /// Not idempotent: a retry after an ambiguous timeout may produce a
    /// duplicate remote file, healed by a later sync pass.
    async fn upload_content(
        &self,
        blob: &dyn UploadBlob,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem>;

    /// Rename an item in place.
    async fn rename(&self, id: &RemoteItemId, new_name: &str) -> AppResult<RemoteItem>;

    /// Move an item under a new parent.
    async fn move_item(
        &self,
        id: &RemoteItemId,
        new_parent: &RemoteItemId,
    ) -> AppResult<RemoteItem>;

    /// Delete an item (and, provider-side, its children).
    async fn delete(&self, id: &RemoteItemId) -> AppResult<()>;

    /// Fetch a short-lived download URL for a file, if available.
    async fn download_url(&self, id: &RemoteItemId) -> AppResult<Option<String>>;

    /// Fetch the delta feed since `cursor` (full snapshot when `None`).
    ///
    /// Follows provider-side pagination internally and returns one
    /// aggregated page whose `next_cursor` resumes after everything
    /// returned here.
    async fn fetch_changes(&self, cursor: Option<&str>) -> AppResult<ChangePage>;

    /// Fetch the drive's storage quota.
    async fn quota(&self) -> AppResult<StorageQuota>;
}
