//! In-memory [`RemoteStorage`] for consumer tests.
//!
//! Keeps a flat item map with parent links, a sequence-numbered event log
//! backing the delta feed, and a single-shot failure injection point.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use drivehub_core::error::{AppError, ErrorKind};
use drivehub_core::result::AppResult;
use drivehub_core::traits::blob::UploadBlob;
use drivehub_core::traits::remote::{
    ChangePage, RemoteItem, RemoteItemId, RemoteItemKind, RemoteStorage, StorageQuota,
};

/// Operations a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    /// `create_folder`
    CreateFolder,
    /// `upload_content`
    Upload,
    /// `rename`
    Rename,
    /// `move_item`
    Move,
    /// `delete`
    Delete,
    /// `download_url`
    DownloadUrl,
    /// `fetch_changes`
    FetchChanges,
    /// `quota`
    Quota,
}

#[derive(Debug, Clone)]
enum MockEvent {
    Upsert(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct MockState {
    items: HashMap<String, RemoteItem>,
    events: Vec<(u64, MockEvent)>,
    seq: u64,
    next_id: u64,
    fail_next: Option<(MockOp, ErrorKind)>,
}

impl MockState {
    fn take_failure(&mut self, op: MockOp) -> Option<AppError> {
        match self.fail_next {
            Some((fail_op, kind)) if fail_op == op => {
                self.fail_next = None;
                Some(AppError::new(kind, format!("injected failure in {op:?}")))
            }
            _ => None,
        }
    }

    fn record(&mut self, event: MockEvent) {
        self.seq += 1;
        self.events.push((self.seq, event));
    }

    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        format!("remote-{}-{}", uuid::Uuid::new_v4(), self.next_id)
    }

    fn descendants_of(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut frontier = vec![id.to_string()];
        while let Some(current) = frontier.pop() {
            for item in self.items.values() {
                if item.parent_id.as_ref().map(|p| p.as_str()) == Some(current.as_str()) {
                    frontier.push(item.id.as_str().to_string());
                    out.push(item.id.as_str().to_string());
                }
            }
        }
        out
    }
}

/// In-memory remote drive.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    /// Create an empty mock drive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure into the next call of the given operation.
    pub fn fail_next(&self, op: MockOp, kind: ErrorKind) {
        self.state.lock().expect("mock lock").fail_next = Some((op, kind));
    }

    /// Number of items currently on the drive.
    pub fn item_count(&self) -> usize {
        self.state.lock().expect("mock lock").items.len()
    }

    /// Look up an item by id.
    pub fn item(&self, id: &str) -> Option<RemoteItem> {
        self.state.lock().expect("mock lock").items.get(id).cloned()
    }

    /// Seed an item directly, bypassing the operations. Recorded in the
    /// delta log like any other change.
    pub fn seed_item(&self, item: RemoteItem) {
        let mut state = self.state.lock().expect("mock lock");
        let id = item.id.as_str().to_string();
        state.items.insert(id.clone(), item);
        state.record(MockEvent::Upsert(id));
    }
}

#[async_trait]
impl RemoteStorage for MockRemote {
    fn provider_type(&self) -> &str {
        "mock"
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::CreateFolder) {
            return Err(err);
        }

        let parent_str = parent.map(|p| p.as_str().to_string());
        if let Some(existing) = state.items.values().find(|item| {
            item.kind == RemoteItemKind::Folder
                && item.name == name
                && item.parent_id.as_ref().map(|p| p.as_str().to_string()) == parent_str
        }) {
            return Ok(existing.clone());
        }

        let id = state.mint_id();
        let item = RemoteItem {
            id: RemoteItemId::new(id.clone()),
            name: name.to_string(),
            kind: RemoteItemKind::Folder,
            size_bytes: 0,
            parent_id: parent.cloned(),
            web_url: Some(format!("https://mock.example/items/{id}")),
            download_url: None,
        };
        state.items.insert(id.clone(), item.clone());
        state.record(MockEvent::Upsert(id));
        Ok(item)
    }

    async fn upload_content(
        &self,
        blob: &dyn UploadBlob,
        parent: Option<&RemoteItemId>,
    ) -> AppResult<RemoteItem> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::Upload) {
            return Err(err);
        }

        // No existence check: uploads are not idempotent.
        let id = state.mint_id();
        let item = RemoteItem {
            id: RemoteItemId::new(id.clone()),
            name: blob.original_name().to_string(),
            kind: RemoteItemKind::File,
            size_bytes: blob.size_bytes(),
            parent_id: parent.cloned(),
            web_url: Some(format!("https://mock.example/items/{id}")),
            download_url: Some(format!("https://mock.example/download/{id}")),
        };
        state.items.insert(id.clone(), item.clone());
        state.record(MockEvent::Upsert(id));
        Ok(item)
    }

    async fn rename(&self, id: &RemoteItemId, new_name: &str) -> AppResult<RemoteItem> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::Rename) {
            return Err(err);
        }

        let item = state
            .items
            .get_mut(id.as_str())
            .ok_or_else(|| AppError::remote_permanent(format!("Item {id} not found")))?;
        item.name = new_name.to_string();
        let updated = item.clone();
        state.record(MockEvent::Upsert(id.as_str().to_string()));
        Ok(updated)
    }

    async fn move_item(
        &self,
        id: &RemoteItemId,
        new_parent: &RemoteItemId,
    ) -> AppResult<RemoteItem> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::Move) {
            return Err(err);
        }

        if !state.items.contains_key(new_parent.as_str()) {
            return Err(AppError::remote_permanent(format!(
                "Parent {new_parent} not found"
            )));
        }
        let item = state
            .items
            .get_mut(id.as_str())
            .ok_or_else(|| AppError::remote_permanent(format!("Item {id} not found")))?;
        item.parent_id = Some(new_parent.clone());
        let updated = item.clone();
        state.record(MockEvent::Upsert(id.as_str().to_string()));
        Ok(updated)
    }

    async fn delete(&self, id: &RemoteItemId) -> AppResult<()> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::Delete) {
            return Err(err);
        }

        if state.items.remove(id.as_str()).is_none() {
            return Err(AppError::remote_permanent(format!("Item {id} not found")));
        }
        // Children go with the item, but only the deleted item itself is
        // logged; consumers must cascade deletions defensively.
        for child in state.descendants_of(id.as_str()) {
            state.items.remove(&child);
        }
        state.record(MockEvent::Delete(id.as_str().to_string()));
        Ok(())
    }

    async fn download_url(&self, id: &RemoteItemId) -> AppResult<Option<String>> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::DownloadUrl) {
            return Err(err);
        }

        let item = state
            .items
            .get(id.as_str())
            .ok_or_else(|| AppError::remote_permanent(format!("Item {id} not found")))?;
        Ok(item.download_url.clone())
    }

    async fn fetch_changes(&self, cursor: Option<&str>) -> AppResult<ChangePage> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::FetchChanges) {
            return Err(err);
        }

        let since = match cursor {
            None => 0,
            Some(s) => s
                .parse::<u64>()
                .map_err(|_| AppError::remote_permanent(format!("Bad cursor '{s}'")))?,
        };

        let mut page = ChangePage {
            next_cursor: state.seq.to_string(),
            ..ChangePage::default()
        };

        if since == 0 {
            // Full snapshot.
            page.items = state.items.values().cloned().collect();
            return Ok(page);
        }

        let mut upserted: Vec<String> = Vec::new();
        for (seq, event) in &state.events {
            if *seq <= since {
                continue;
            }
            match event {
                MockEvent::Upsert(id) => {
                    if !upserted.contains(id) {
                        upserted.push(id.clone());
                    }
                }
                MockEvent::Delete(id) => {
                    upserted.retain(|u| u != id);
                    let deleted_id = RemoteItemId::new(id.clone());
                    if !page.deleted.contains(&deleted_id) {
                        page.deleted.push(deleted_id);
                    }
                }
            }
        }
        page.items = upserted
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect();
        Ok(page)
    }

    async fn quota(&self) -> AppResult<StorageQuota> {
        let mut state = self.state.lock().expect("mock lock");
        if let Some(err) = state.take_failure(MockOp::Quota) {
            return Err(err);
        }

        let used: i64 = state.items.values().map(|i| i.size_bytes).sum();
        Ok(StorageQuota {
            total: 1 << 40,
            used,
            remaining: (1 << 40) - used,
            state: "normal".to_string(),
        })
    }
}
