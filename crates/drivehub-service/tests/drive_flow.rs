//! End-to-end flows over the mock remote drive.

mod common;

use drivehub_core::error::ErrorKind;
use drivehub_core::traits::blob::MemoryBlob;
use drivehub_core::types::id::NodeId;
use drivehub_entity::permission::action::GrantKind;

#[tokio::test]
async fn test_folder_lifecycle_end_to_end() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    // Root is created exactly once, with an owner grant.
    let root = stack.drive.ensure_user_root(&u1).await.expect("ensure root");
    let again = stack.drive.ensure_user_root(&u1).await.expect("lookup root");
    assert_eq!(root.id, again.id);
    assert_eq!(stack.remote.item_count(), 1);

    let root_grants = stack
        .perms
        .list_for_node(NodeId::from_uuid(root.id))
        .await
        .expect("grants");
    assert!(
        root_grants
            .iter()
            .any(|g| g.user_id == u1.id.into_uuid() && g.permission == GrantKind::Owner)
    );

    // Folder creation is idempotent end to end: one remote folder, one
    // local node.
    let docs = stack
        .drive
        .create_folder("Docs", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("create folder");
    assert_eq!(docs.parent_id, Some(root.id));

    let docs_again = stack
        .drive
        .create_folder("Docs", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("create folder again");
    assert_eq!(docs.id, docs_again.id);
    assert_eq!(stack.remote.item_count(), 2);

    // Upload a file under Docs.
    let blob = MemoryBlob::new("a.txt", &b"0123456789"[..]).with_mime_type("text/plain");
    let file = stack
        .drive
        .upload_file(Some(NodeId::from_uuid(docs.id)), &blob, &u1)
        .await
        .expect("upload");
    assert_eq!(file.parent_id, Some(docs.id));
    assert_eq!(file.size_bytes, 10);

    // Trash cascades to the whole subtree.
    stack
        .tree
        .trash(NodeId::from_uuid(docs.id), &u1)
        .await
        .expect("trash");
    let docs_row = stack.nodes.find_by_id(docs.id).await.expect("load").expect("exists");
    let file_row = stack.nodes.find_by_id(file.id).await.expect("load").expect("exists");
    assert!(docs_row.trashed);
    assert!(file_row.trashed);

    // Trashed nodes disappear from listings; the trash listing shows
    // only the top-level trashed root, not its descendants.
    let listing = stack.browse.list_children(None, &u1).await.expect("list");
    assert!(listing.folders.is_empty());
    assert!(listing.files.is_empty());

    let trashed = stack.tree.list_trashed(&u1).await.expect("trashed");
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].id, docs.id);

    // Restore brings the whole subtree back.
    stack
        .tree
        .restore(NodeId::from_uuid(docs.id), &u1)
        .await
        .expect("restore");
    let docs_row = stack.nodes.find_by_id(docs.id).await.expect("load").expect("exists");
    let file_row = stack.nodes.find_by_id(file.id).await.expect("load").expect("exists");
    assert!(!docs_row.trashed);
    assert!(!file_row.trashed);

    let listing = stack.browse.list_children(None, &u1).await.expect("list");
    assert_eq!(listing.folders.len(), 1);
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let a = stack
        .drive
        .create_folder("A", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("A");
    let b = stack
        .drive
        .create_folder("B", Some(NodeId::from_uuid(a.id)), &u1)
        .await
        .expect("B");
    let c = stack
        .drive
        .create_folder("C", Some(NodeId::from_uuid(b.id)), &u1)
        .await
        .expect("C");

    let err = stack
        .drive
        .move_node(NodeId::from_uuid(a.id), Some(NodeId::from_uuid(c.id)), &u1)
        .await
        .expect_err("must reject");
    assert_eq!(err.kind, ErrorKind::InvalidMove);

    let err = stack
        .drive
        .move_node(NodeId::from_uuid(a.id), Some(NodeId::from_uuid(a.id)), &u1)
        .await
        .expect_err("must reject self");
    assert_eq!(err.kind, ErrorKind::InvalidMove);

    // Tree unchanged.
    let a_row = stack.nodes.find_by_id(a.id).await.expect("load").expect("exists");
    assert_eq!(a_row.parent_id, Some(root.id));

    // A legal move still works, remotely and locally.
    let moved = stack
        .drive
        .move_node(NodeId::from_uuid(c.id), Some(NodeId::from_uuid(a.id)), &u1)
        .await
        .expect("move C under A");
    assert_eq!(moved.parent_id, Some(a.id));
    let remote_c = stack
        .remote
        .item(c.remote_id.as_deref().expect("remote id"))
        .expect("remote item");
    assert_eq!(
        remote_c.parent_id.map(|p| p.as_str().to_string()),
        a.remote_id
    );
}

#[tokio::test]
async fn test_rename_updates_remote_then_local() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let folder = stack
        .drive
        .create_folder("Reports", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("create");

    let renamed = stack
        .drive
        .rename(NodeId::from_uuid(folder.id), "Archive", &u1)
        .await
        .expect("rename");
    assert_eq!(renamed.name, "Archive");

    let remote = stack
        .remote
        .item(folder.remote_id.as_deref().expect("remote id"))
        .expect("remote item");
    assert_eq!(remote.name, "Archive");
}

#[tokio::test]
async fn test_bulk_trash_is_scoped_to_owner() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();
    let u2 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let folder = stack
        .drive
        .create_folder("Mine", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("create");

    // A non-owner's bulk trash flips nothing.
    let count = stack
        .tree
        .bulk_trash(&[NodeId::from_uuid(folder.id)], &u2)
        .await
        .expect("bulk trash");
    assert_eq!(count, 0);
    let row = stack.nodes.find_by_id(folder.id).await.expect("load").expect("exists");
    assert!(!row.trashed);

    // The owner's does.
    let count = stack
        .tree
        .bulk_trash(&[NodeId::from_uuid(folder.id)], &u1)
        .await
        .expect("bulk trash");
    assert_eq!(count, 1);
    let row = stack.nodes.find_by_id(folder.id).await.expect("load").expect("exists");
    assert!(row.trashed);

    let count = stack
        .tree
        .bulk_restore(&[NodeId::from_uuid(folder.id)], &u1)
        .await
        .expect("bulk restore");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_permission_denied_without_grant() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();
    let u2 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");

    let err = stack
        .drive
        .create_folder("Intruder", Some(NodeId::from_uuid(root.id)), &u2)
        .await
        .expect_err("must deny");
    assert_eq!(err.kind, ErrorKind::Authorization);

    // Granting create_folder opens exactly that action.
    stack
        .perms
        .assign(NodeId::from_uuid(root.id), u2.id, GrantKind::CreateFolder)
        .await
        .expect("assign");
    stack
        .drive
        .create_folder("Guest", Some(NodeId::from_uuid(root.id)), &u2)
        .await
        .expect("create after grant");

    // Revoking closes it again; revoke is idempotent.
    assert!(
        stack
            .perms
            .revoke(NodeId::from_uuid(root.id), u2.id, GrantKind::CreateFolder)
            .await
            .expect("revoke")
    );
    assert!(
        !stack
            .perms
            .revoke(NodeId::from_uuid(root.id), u2.id, GrantKind::CreateFolder)
            .await
            .expect("revoke again")
    );
    let err = stack
        .drive
        .create_folder("Intruder2", Some(NodeId::from_uuid(root.id)), &u2)
        .await
        .expect_err("must deny again");
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_hard_delete_removes_subtree_and_remote_item() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let a = stack
        .drive
        .create_folder("A", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("A");
    let blob = MemoryBlob::new("f.bin", &b"data"[..]);
    let file = stack
        .drive
        .upload_file(Some(NodeId::from_uuid(a.id)), &blob, &u1)
        .await
        .expect("upload");

    stack
        .drive
        .hard_delete(NodeId::from_uuid(a.id), &u1)
        .await
        .expect("hard delete");

    assert!(stack.nodes.find_by_id(a.id).await.expect("load").is_none());
    assert!(stack.nodes.find_by_id(file.id).await.expect("load").is_none());
    assert!(stack.remote.item(a.remote_id.as_deref().expect("rid")).is_none());

    // Grants are gone; history keeps a delete entry per node.
    let grants = stack
        .grants
        .find_for_user_on(a.id, u1.id.into_uuid())
        .await
        .expect("grants");
    assert!(grants.is_empty());
    let deletes = stack
        .history
        .recent_for_user(u1.id.into_uuid(), "delete", 10)
        .await
        .expect("history");
    assert!(deletes.iter().any(|e| e.file_id == a.id));
    assert!(deletes.iter().any(|e| e.file_id == file.id));

    let err = stack
        .drive
        .hard_delete(NodeId::from_uuid(a.id), &u1)
        .await
        .expect_err("already gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_repeated_views_collapse_into_one_history_row() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    stack.browse.list_children(None, &u1).await.expect("list");
    stack.browse.list_children(None, &u1).await.expect("list");

    let views = stack
        .history
        .recent_for_user(u1.id.into_uuid(), "view", 50)
        .await
        .expect("history");
    let for_root: Vec<_> = views.iter().filter(|e| e.file_id == root.id).collect();
    assert_eq!(for_root.len(), 1);
}

#[tokio::test]
async fn test_download_url_is_for_files_only() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let blob = MemoryBlob::new("doc.pdf", &b"%PDF"[..]);
    let file = stack
        .drive
        .upload_file(Some(NodeId::from_uuid(root.id)), &blob, &u1)
        .await
        .expect("upload");

    let url = stack
        .drive
        .download_url(NodeId::from_uuid(file.id), &u1)
        .await
        .expect("url");
    assert!(url.is_some());

    let err = stack
        .drive
        .download_url(NodeId::from_uuid(root.id), &u1)
        .await
        .expect_err("folders have no content");
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_starred_listing_excludes_trashed() {
    let Some(stack) = common::test_stack().await else {
        return;
    };
    let u1 = stack.principal();

    let root = stack.drive.ensure_user_root(&u1).await.expect("root");
    let folder = stack
        .drive
        .create_folder("Fav", Some(NodeId::from_uuid(root.id)), &u1)
        .await
        .expect("create");

    assert!(stack.browse.star(NodeId::from_uuid(folder.id), &u1).await.expect("star"));
    assert!(!stack.browse.star(NodeId::from_uuid(folder.id), &u1).await.expect("star again"));

    let starred = stack.browse.list_starred(&u1).await.expect("starred");
    assert_eq!(starred.len(), 1);

    stack
        .tree
        .trash(NodeId::from_uuid(folder.id), &u1)
        .await
        .expect("trash");
    let starred = stack.browse.list_starred(&u1).await.expect("starred");
    assert!(starred.is_empty());

    assert!(stack.browse.unstar(NodeId::from_uuid(folder.id), &u1).await.expect("unstar"));
}
