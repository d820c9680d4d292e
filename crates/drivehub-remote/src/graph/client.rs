//! Microsoft Graph drive client implementing [`RemoteStorage`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use drivehub_core::config::remote::RemoteConfig;
use drivehub_core::error::AppError;
use drivehub_core::result::AppResult;
use drivehub_core::traits::blob::UploadBlob;
use drivehub_core::traits::remote::{
    ChangePage, RemoteItem, RemoteItemId, RemoteStorage, StorageQuota,
};

use crate::auth::TokenCache;
use crate::graph::types::{ChildrenPage, DeltaPage, DriveItem, DriveResponse};

/// Remote storage adapter for a single OneDrive/SharePoint drive,
/// addressed through the storage account configured in
/// [`RemoteConfig::storage_user`].
#[derive(Debug)]
pub struct GraphDriveClient {
    http: reqwest::Client,
    config: RemoteConfig,
    token: TokenCache,
}

impl GraphDriveClient {
    /// Build a client from configuration. All requests share one bounded
    /// timeout.
    pub fn new(config: RemoteConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            token: TokenCache::new(),
        })
    }

    fn drive_url(&self) -> String {
        format!(
            "{}/users/{}/drive",
            self.config.graph_base_url, self.config.storage_user
        )
    }

    fn item_url(&self, id: &RemoteItemId) -> String {
        format!("{}/items/{}", self.drive_url(), id.as_str())
    }

    fn children_url(&self, parent: Option<&RemoteItemId>) -> String {
        match parent {
            Some(id) => format!("{}/items/{}/children", self.drive_url(), id.as_str()),
            None => format!("{}/root/children", self.drive_url()),
        }
    }

    async fn bearer(&self) -> AppResult<String> {
        self.token.access_token(&self.http, &self.config).await
    }

    /// Issue a GET and deserialize a JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, op: &str) -> AppResult<T> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(op, e))?;
        read_json(response, op).await
    }

    /// Find a direct child of `parent` by exact name.
    async fn find_child_by_name(
        &self,
        name: &str,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<Option<RemoteItem>> {
        // Single quotes double up inside OData string literals.
        let escaped = name.replace('\'', "''");
        let url = format!(
            "{}?$filter=name eq '{}'",
            self.children_url(parent),
            escaped
        );
        let page: ChildrenPage = self.get_json(&url, "list children").await?;
        Ok(page
            .value
            .iter()
            .find(|item| item.name.as_deref() == Some(name))
            .map(DriveItem::to_remote_item))
    }
}

#[async_trait]
impl RemoteStorage for GraphDriveClient {
    fn provider_type(&self) -> &str {
        "onedrive"
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem> {
        // Existence check precedes creation: a retried call finds the
        // folder made by the first attempt instead of duplicating it.
        if let Some(existing) = self.find_child_by_name(name, parent).await? {
            debug!(name, "Remote folder already exists, returning it");
            return Ok(existing);
        }

        let token = self.bearer().await?;
        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .http
            .post(self.children_url(parent))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("create folder", e))?;

        if response.status() == StatusCode::CONFLICT {
            // Lost a race with a concurrent creation; adopt the winner.
            return self
                .find_child_by_name(name, parent)
                .await?
                .ok_or_else(|| {
                    AppError::remote_permanent(format!(
                        "Folder '{name}' conflicted remotely but cannot be found"
                    ))
                });
        }

        let item: DriveItem = read_json(response, "create folder").await?;
        Ok(item.to_remote_item())
    }

    async fn upload_content(
        &self,
        blob: &dyn UploadBlob,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem> {
        let token = self.bearer().await?;
        let name = blob.original_name();
        let url = match parent {
            Some(id) => format!("{}/items/{}:/{}:/content", self.drive_url(), id.as_str(), name),
            None => format!("{}/root:/{}:/content", self.drive_url(), name),
        };

        let data = blob.read_bytes().await?;
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                blob.mime_type().unwrap_or("application/octet-stream"),
            )
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error("upload content", e))?;

        let item: DriveItem = read_json(response, "upload content").await?;
        Ok(item.to_remote_item())
    }

    async fn rename(&self, id: &RemoteItemId, new_name: &str) -> AppResult<RemoteItem> {
        let token = self.bearer().await?;
        let response = self
            .http
            .patch(self.item_url(id))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": new_name }))
            .send()
            .await
            .map_err(|e| transport_error("rename item", e))?;

        let item: DriveItem = read_json(response, "rename item").await?;
        Ok(item.to_remote_item())
    }

    async fn move_item(
        &self,
        id: &RemoteItemId,
        new_parent: &RemoteItemId,
    ) -> AppResult<RemoteItem> {
        let token = self.bearer().await?;
        let response = self
            .http
            .patch(self.item_url(id))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "parentReference": { "id": new_parent.as_str() }
            }))
            .send()
            .await
            .map_err(|e| transport_error("move item", e))?;

        let item: DriveItem = read_json(response, "move item").await?;
        Ok(item.to_remote_item())
    }

    async fn delete(&self, id: &RemoteItemId) -> AppResult<()> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.item_url(id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("delete item", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error("delete item", status, &body))
    }

    async fn download_url(&self, id: &RemoteItemId) -> AppResult<Option<String>> {
        let item: DriveItem = self.get_json(&self.item_url(id), "fetch item").await?;
        Ok(item.download_url)
    }

    async fn fetch_changes(&self, cursor: Option<&str>) -> AppResult<ChangePage> {
        // The stored cursor is the full deltaLink URL from the previous
        // run; a missing cursor starts a full snapshot.
        let mut url = cursor
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/root/delta", self.drive_url()));

        let mut page = ChangePage::default();
        loop {
            let delta: DeltaPage = self.get_json(&url, "fetch delta").await?;

            for entry in &delta.value {
                if entry.is_root() {
                    continue;
                }
                if entry.is_deleted() {
                    page.deleted.push(RemoteItemId::new(entry.id.clone()));
                } else {
                    page.items.push(entry.to_remote_item());
                }
            }

            match (delta.next_link, delta.delta_link) {
                (Some(next), _) => url = next,
                (None, Some(delta_link)) => {
                    page.next_cursor = delta_link;
                    return Ok(page);
                }
                (None, None) => {
                    return Err(AppError::remote_permanent(
                        "Delta feed ended without a delta link",
                    ));
                }
            }
        }
    }

    async fn quota(&self) -> AppResult<StorageQuota> {
        let drive: DriveResponse = self.get_json(&self.drive_url(), "fetch quota").await?;
        Ok(StorageQuota {
            total: drive.quota.total.unwrap_or(0),
            used: drive.quota.used.unwrap_or(0),
            remaining: drive.quota.remaining.unwrap_or(0),
            state: drive.quota.state.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Classify a reqwest transport failure. Timeouts and connection errors
/// are retryable.
fn transport_error(op: &str, err: reqwest::Error) -> AppError {
    AppError::remote_transient(format!("Remote {op} failed: {err}"))
}

/// Classify an HTTP error status as transient or permanent.
fn status_error(op: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("Remote {op} returned {status}: {body}");
    if is_transient_status(status) {
        AppError::remote_transient(message)
    } else {
        AppError::remote_permanent(message)
    }
}

/// Throttling, timeouts, and server errors are transient; everything
/// else (not-found, conflict, quota, auth rejection) is permanent.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Check the status and deserialize a JSON body.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    op: &str,
) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(op, status, &body));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::remote_transient(format!("Malformed {op} response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivehub_core::error::ErrorKind;

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(is_transient_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::CONFLICT));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_status_error_kinds() {
        let err = status_error("delete item", StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.kind, ErrorKind::RemoteTransient);

        let err = status_error("delete item", StatusCode::NOT_FOUND, "");
        assert_eq!(err.kind, ErrorKind::RemotePermanent);
    }
}
