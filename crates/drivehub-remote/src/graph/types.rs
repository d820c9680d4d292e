//! Wire types for the Microsoft Graph drive API.

use serde::Deserialize;

use drivehub_core::traits::remote::{RemoteItem, RemoteItemId, RemoteItemKind};

/// OAuth2 token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// A drive item as returned by the Graph API.
///
/// Only the fields this integration reads are modeled; everything else
/// in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Item identifier.
    pub id: String,
    /// Item name. Absent on some tombstones.
    pub name: Option<String>,
    /// Size in bytes.
    pub size: Option<i64>,
    /// Present when the item is a folder.
    pub folder: Option<FolderFacet>,
    /// Present when the item is a file.
    pub file: Option<FileFacet>,
    /// Present when the item was deleted (delta tombstone).
    pub deleted: Option<DeletedFacet>,
    /// Present on the drive root item itself.
    pub root: Option<serde_json::Value>,
    /// Location of the item's parent.
    pub parent_reference: Option<ParentReference>,
    /// Browser URL.
    pub web_url: Option<String>,
    /// Short-lived content download URL (files only).
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    pub download_url: Option<String>,
}

/// Folder facet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    /// Number of direct children.
    pub child_count: Option<i64>,
}

/// File facet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    /// MIME type reported by the provider.
    pub mime_type: Option<String>,
}

/// Deleted facet on delta tombstones.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedFacet {
    /// Deletion state, e.g. `"deleted"`.
    pub state: Option<String>,
}

/// Parent location reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// Parent item identifier. Absent for the drive root's own entry.
    pub id: Option<String>,
    /// Path under the drive root.
    pub path: Option<String>,
}

impl DriveItem {
    /// Whether this entry is a delta tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// Whether this entry is the drive root itself.
    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }

    /// Convert into the provider-neutral item shape.
    pub fn to_remote_item(&self) -> RemoteItem {
        RemoteItem {
            id: RemoteItemId::new(self.id.clone()),
            name: self.name.clone().unwrap_or_default(),
            kind: if self.folder.is_some() {
                RemoteItemKind::Folder
            } else {
                RemoteItemKind::File
            },
            size_bytes: self.size.unwrap_or(0),
            parent_id: self
                .parent_reference
                .as_ref()
                .and_then(|p| p.id.clone())
                .map(RemoteItemId::new),
            web_url: self.web_url.clone(),
            download_url: self.download_url.clone(),
        }
    }
}

/// One page of a `/children` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildrenPage {
    /// Items on this page.
    pub value: Vec<DriveItem>,
    /// Continuation URL when more pages follow.
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// One page of a `/delta` feed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeltaPage {
    /// Changed items and tombstones on this page.
    pub value: Vec<DriveItem>,
    /// Continuation URL when more pages follow.
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
    /// Resumption URL delivered on the final page.
    #[serde(rename = "@odata.deltaLink")]
    pub delta_link: Option<String>,
}

/// Drive metadata response carrying the quota block.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveResponse {
    /// Storage quota numbers.
    pub quota: QuotaFacet,
}

/// Quota block of a drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaFacet {
    /// Total capacity in bytes.
    pub total: Option<i64>,
    /// Bytes used.
    pub used: Option<i64>,
    /// Bytes remaining.
    pub remaining: Option<i64>,
    /// Provider state string.
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folder_item() {
        let json = r#"{
            "id": "01ABC",
            "name": "Docs",
            "size": 0,
            "folder": { "childCount": 2 },
            "parentReference": { "id": "01ROOT", "path": "/drive/root:" },
            "webUrl": "https://contoso-my.sharepoint.com/Docs"
        }"#;
        let item: DriveItem = serde_json::from_str(json).expect("parse");
        assert!(!item.is_deleted());
        let remote = item.to_remote_item();
        assert_eq!(remote.id.as_str(), "01ABC");
        assert_eq!(remote.name, "Docs");
        assert!(remote.is_folder());
        assert_eq!(remote.parent_id.as_ref().map(|p| p.as_str()), Some("01ROOT"));
    }

    #[test]
    fn test_parse_file_item_with_download_url() {
        let json = r#"{
            "id": "01DEF",
            "name": "a.txt",
            "size": 10,
            "file": { "mimeType": "text/plain" },
            "parentReference": { "id": "01ABC" },
            "@microsoft.graph.downloadUrl": "https://download.example/a.txt"
        }"#;
        let item: DriveItem = serde_json::from_str(json).expect("parse");
        let remote = item.to_remote_item();
        assert!(!remote.is_folder());
        assert_eq!(remote.size_bytes, 10);
        assert_eq!(
            remote.download_url.as_deref(),
            Some("https://download.example/a.txt")
        );
    }

    #[test]
    fn test_parse_delta_page_with_tombstone() {
        let json = r#"{
            "value": [
                { "id": "01GONE", "deleted": { "state": "deleted" } },
                { "id": "01ROOT", "name": "root", "folder": {}, "root": {} },
                { "id": "01NEW", "name": "b.txt", "size": 4, "file": {},
                  "parentReference": { "id": "01ABC" } }
            ],
            "@odata.deltaLink": "https://graph.microsoft.com/v1.0/drive/root/delta?token=t2"
        }"#;
        let page: DeltaPage = serde_json::from_str(json).expect("parse");
        assert_eq!(page.value.len(), 3);
        assert!(page.value[0].is_deleted());
        assert!(page.value[1].is_root());
        assert!(page.next_link.is_none());
        assert!(page.delta_link.is_some());
    }

    #[test]
    fn test_parse_quota() {
        let json = r#"{
            "quota": { "total": 100, "used": 40, "remaining": 60, "state": "normal" }
        }"#;
        let drive: DriveResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(drive.quota.total, Some(100));
        assert_eq!(drive.quota.state.as_deref(), Some("normal"));
    }
}
