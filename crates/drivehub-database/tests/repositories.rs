//! Repository-level tests over a live PostgreSQL database.
//!
//! Tests acquire a pool from `DATABASE_URL` and skip quietly when the
//! variable is unset. Each test works on its own freshly minted users
//! and remote ids, so the suite is safe to run concurrently against one
//! database.

use sqlx::PgPool;
use uuid::Uuid;

use drivehub_database::migration;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::history::HistoryRepository;
use drivehub_database::repositories::node::{NodeRepository, upsert_from_remote};
use drivehub_entity::node::model::{Node, NodeKind};
use drivehub_entity::permission::action::GrantKind;

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect test database");
    migration::run_migrations(&pool).await.expect("run migrations");
    Some(pool)
}

/// Build a root with a chain A -> B -> C under it, all for one fresh
/// owner. Returns (root, a, b, c).
async fn seed_chain(repo: &NodeRepository, owner: Uuid) -> (Node, Node, Node, Node) {
    let tag = Uuid::new_v4();
    let root = repo
        .create_root(owner, "Root", &format!("seed-{tag}-root"), None)
        .await
        .expect("root");
    let a = repo
        .upsert_by_remote_id(&upsert_from_remote(
            owner,
            Some(root.id),
            "A",
            NodeKind::Folder,
            0,
            &format!("seed-{tag}-a"),
            None,
            None,
        ))
        .await
        .expect("A");
    let b = repo
        .upsert_by_remote_id(&upsert_from_remote(
            owner,
            Some(a.id),
            "B",
            NodeKind::Folder,
            0,
            &format!("seed-{tag}-b"),
            None,
            None,
        ))
        .await
        .expect("B");
    let c = repo
        .upsert_by_remote_id(&upsert_from_remote(
            owner,
            Some(b.id),
            "C",
            NodeKind::File,
            7,
            &format!("seed-{tag}-c"),
            None,
            None,
        ))
        .await
        .expect("C");
    (root, a, b, c)
}

#[tokio::test]
async fn test_descendant_closure_covers_whole_subtree() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool);
    let owner = Uuid::new_v4();
    let (_root, a, b, c) = seed_chain(&repo, owner).await;

    let ids = repo.descendant_ids(&[a.id]).await.expect("closure");
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
    assert!(ids.contains(&c.id));
    assert_eq!(ids.len(), 3);

    let ancestors = repo.ancestor_ids(c.id).await.expect("ancestors");
    assert_eq!(ancestors.first(), Some(&b.id));
    assert!(ancestors.contains(&a.id));
}

#[tokio::test]
async fn test_hard_delete_rolls_back_without_commit() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool.clone());
    let owner = Uuid::new_v4();
    let (_root, a, b, c) = seed_chain(&repo, owner).await;

    // Run the cascade inside a transaction that never commits, as if a
    // failure had struck mid-cascade. Nothing may stick.
    {
        let mut tx = pool.begin().await.expect("begin");
        let deleted = NodeRepository::hard_delete_subtree_on(&mut tx, a.id, owner)
            .await
            .expect("cascade inside tx");
        assert_eq!(deleted.len(), 3);
        // Dropped without commit: rollback.
    }

    for id in [a.id, b.id, c.id] {
        assert!(
            repo.find_by_id(id).await.expect("query").is_some(),
            "node {id} must survive the rolled-back cascade"
        );
    }

    // The committed form removes everything, children first.
    let deleted = repo.hard_delete_subtree(a.id, owner).await.expect("cascade");
    assert_eq!(deleted.len(), 3);
    assert_eq!(deleted.first().map(|n| n.id), Some(c.id), "deepest first");
    for id in [a.id, b.id, c.id] {
        assert!(repo.find_by_id(id).await.expect("query").is_none());
    }
}

#[tokio::test]
async fn test_trashed_roots_lists_only_top_level() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool);
    let owner = Uuid::new_v4();
    let (_root, a, _b, _c) = seed_chain(&repo, owner).await;

    let ids = repo.descendant_ids(&[a.id]).await.expect("closure");
    repo.set_trashed_bulk(&ids, true).await.expect("trash");

    let trashed = repo.find_trashed_roots(owner).await.expect("list");
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].id, a.id);

    repo.set_trashed_bulk(&ids, false).await.expect("restore");
    let trashed = repo.find_trashed_roots(owner).await.expect("list");
    assert!(trashed.is_empty());
}

#[tokio::test]
async fn test_owned_bulk_update_excludes_other_users() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool);
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let (_root, a, _b, _c) = seed_chain(&repo, owner).await;

    let ids = repo.descendant_ids(&[a.id]).await.expect("closure");
    let affected = repo
        .set_trashed_bulk_owned(&ids, stranger, true)
        .await
        .expect("update");
    assert_eq!(affected, 0);

    let affected = repo
        .set_trashed_bulk_owned(&ids, owner, true)
        .await
        .expect("update");
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_upsert_by_remote_id_does_not_duplicate() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool);
    let owner = Uuid::new_v4();
    let (root, _a, _b, _c) = seed_chain(&repo, owner).await;

    let remote_id = format!("dup-{}", Uuid::new_v4());
    let first = repo
        .upsert_by_remote_id(&upsert_from_remote(
            owner,
            Some(root.id),
            "one.txt",
            NodeKind::File,
            1,
            &remote_id,
            None,
            None,
        ))
        .await
        .expect("insert");
    let second = repo
        .upsert_by_remote_id(&upsert_from_remote(
            owner,
            Some(root.id),
            "one-renamed.txt",
            NodeKind::File,
            2,
            &remote_id,
            None,
            None,
        ))
        .await
        .expect("update");

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "one-renamed.txt");
    assert_eq!(second.size_bytes, 2);
}

#[tokio::test]
async fn test_create_root_is_idempotent_per_user() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = NodeRepository::new(pool);
    let owner = Uuid::new_v4();

    let first = repo
        .create_root(owner, "Root", &format!("root-{}", Uuid::new_v4()), None)
        .await
        .expect("create");
    let second = repo
        .create_root(owner, "Root", &format!("root-{}", Uuid::new_v4()), None)
        .await
        .expect("re-create");
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_grant_upsert_and_revoke_are_idempotent() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let nodes = NodeRepository::new(pool.clone());
    let grants = GrantRepository::new(pool);
    let owner = Uuid::new_v4();
    let (root, ..) = seed_chain(&nodes, owner).await;

    grants
        .upsert(root.id, owner, GrantKind::View)
        .await
        .expect("grant");
    grants
        .upsert(root.id, owner, GrantKind::View)
        .await
        .expect("grant again");

    let rows = grants.find_for_user_on(root.id, owner).await.expect("list");
    let views: Vec<_> = rows
        .iter()
        .filter(|g| g.permission == GrantKind::View)
        .collect();
    assert_eq!(views.len(), 1);

    assert!(grants.revoke(root.id, owner, GrantKind::View).await.expect("revoke"));
    assert!(!grants.revoke(root.id, owner, GrantKind::View).await.expect("revoke again"));
}

#[tokio::test]
async fn test_history_dedup_updates_same_day_entry() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let history = HistoryRepository::new(pool);
    let file_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let first = history
        .record(file_id, user_id, "view", Some(serde_json::json!({"n": 1})))
        .await
        .expect("record");
    let second = history
        .record(file_id, user_id, "view", Some(serde_json::json!({"n": 2})))
        .await
        .expect("record again");

    assert_eq!(first.id, second.id, "same-day repeat must update in place");
    assert_eq!(second.metadata, Some(serde_json::json!({"n": 2})));
    assert!(second.updated_at >= first.updated_at);

    // A different action is a separate row.
    let other = history
        .record(file_id, user_id, "download", None)
        .await
        .expect("record other");
    assert_ne!(other.id, first.id);
}
