//! Delta-sync reconciliation against the mock remote drive.
//!
//! Everything lives in one test because the sync cursor is a single
//! durable slot; sequential steps exercise snapshot, resumption after a
//! transient failure, out-of-order pages, and deletion cascades.

mod common;

use drivehub_core::error::ErrorKind;
use drivehub_core::traits::remote::{RemoteItem, RemoteItemId, RemoteItemKind, RemoteStorage};
use drivehub_database::repositories::sync_cursor::DELTA_CURSOR_KEY;
use drivehub_entity::permission::action::GrantKind;
use drivehub_remote::mock::MockOp;
use uuid::Uuid;

fn remote_folder(id: &str, name: &str, parent: Option<&str>) -> RemoteItem {
    RemoteItem {
        id: RemoteItemId::new(id),
        name: name.to_string(),
        kind: RemoteItemKind::Folder,
        size_bytes: 0,
        parent_id: parent.map(RemoteItemId::new),
        web_url: None,
        download_url: None,
    }
}

fn remote_file(id: &str, name: &str, parent: &str, size: i64) -> RemoteItem {
    RemoteItem {
        id: RemoteItemId::new(id),
        name: name.to_string(),
        kind: RemoteItemKind::File,
        size_bytes: size,
        parent_id: Some(RemoteItemId::new(parent)),
        web_url: None,
        download_url: Some(format!("https://mock.example/download/{id}")),
    }
}

#[tokio::test]
async fn test_sync_drive_reconciles_remote_changes() {
    let Some(stack) = common::test_stack().await else {
        return;
    };

    // The cursor slot is shared state; start this run from a clean one.
    sqlx::query("DELETE FROM sync_state WHERE key = $1")
        .bind(DELTA_CURSOR_KEY)
        .execute(&stack.pool)
        .await
        .expect("reset cursor");

    let run = Uuid::new_v4();
    let x_id = format!("ext-{run}-x");
    let y_id = format!("ext-{run}-y");

    // Items created out-of-band on the drive: the file is seeded before
    // its folder, so the first page lists the child ahead of its parent
    // and the deferral path has to sort it out.
    stack
        .remote
        .seed_item(remote_file(&y_id, "notes.txt", &x_id, 9));
    stack
        .remote
        .seed_item(remote_folder(&x_id, "External", None));

    let report = stack.sync.sync_drive().await.expect("first sync");
    assert_eq!(report.synced, 2);
    assert_eq!(report.skipped, 0);

    let x = stack
        .nodes
        .find_by_remote_id(&x_id)
        .await
        .expect("query")
        .expect("folder synced");
    let y = stack
        .nodes
        .find_by_remote_id(&y_id)
        .await
        .expect("query")
        .expect("file synced");
    assert_eq!(y.parent_id, Some(x.id));
    assert_eq!(y.size_bytes, 9);

    // The sync principal got an idempotent owner grant on every node.
    let grants = stack
        .grants
        .find_for_user_on(y.id, stack.sync_user)
        .await
        .expect("grants");
    assert!(grants.iter().any(|g| g.permission == GrantKind::Owner));

    let cursor_after_first = stack
        .cursor
        .get(DELTA_CURSOR_KEY)
        .await
        .expect("cursor")
        .expect("cursor stored");

    // A transient fetch failure leaves the cursor exactly where it was.
    let z_id = format!("ext-{run}-z");
    stack
        .remote
        .seed_item(remote_file(&z_id, "late.txt", &x_id, 4));
    stack
        .remote
        .fail_next(MockOp::FetchChanges, ErrorKind::RemoteTransient);

    let err = stack.sync.sync_drive().await.expect_err("must fail");
    assert_eq!(err.kind, ErrorKind::RemoteTransient);
    let cursor_after_failure = stack
        .cursor
        .get(DELTA_CURSOR_KEY)
        .await
        .expect("cursor")
        .expect("cursor still stored");
    assert_eq!(cursor_after_first, cursor_after_failure);

    // The retry resumes from the same cursor and picks up the new file
    // (plus the sync root's own folder, created on the drive between
    // the two cursors).
    let report = stack.sync.sync_drive().await.expect("retry sync");
    assert!(report.synced >= 1, "got {report:?}");
    let z = stack
        .nodes
        .find_by_remote_id(&z_id)
        .await
        .expect("query")
        .expect("file synced");
    assert_eq!(z.parent_id, Some(x.id));

    // A remote deletion of the folder arrives as one tombstone; the
    // local cascade takes the children with it.
    stack
        .remote
        .delete(&RemoteItemId::new(x_id.clone()))
        .await
        .expect("remote delete");

    let report = stack.sync.sync_drive().await.expect("deletion sync");
    assert!(report.deleted >= 3, "expected subtree gone, got {report:?}");
    assert!(
        stack
            .nodes
            .find_by_remote_id(&x_id)
            .await
            .expect("query")
            .is_none()
    );
    assert!(
        stack
            .nodes
            .find_by_remote_id(&y_id)
            .await
            .expect("query")
            .is_none()
    );
    assert!(
        stack
            .nodes
            .find_by_remote_id(&z_id)
            .await
            .expect("query")
            .is_none()
    );

    // A no-change pass is a clean no-op.
    let report = stack.sync.sync_drive().await.expect("idle sync");
    assert_eq!(report.synced, 0);
    assert_eq!(report.deleted, 0);
}
