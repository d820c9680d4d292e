//! Shared test harness: a full service stack over a mock remote drive.
//!
//! Tests acquire a pool from `DATABASE_URL` and skip quietly when the
//! variable is unset.
#![allow(dead_code)]

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use drivehub_core::config::sync::SyncConfig;
use drivehub_core::traits::remote::RemoteStorage;
use drivehub_core::types::id::UserId;
use drivehub_core::types::principal::Principal;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::history::HistoryRepository;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_database::repositories::notification::NotificationRepository;
use drivehub_database::repositories::starred::StarredRepository;
use drivehub_database::repositories::sync_cursor::SyncCursorRepository;
use drivehub_remote::mock::MockRemote;
use drivehub_service::audit::AuditSink;
use drivehub_service::browse::BrowseService;
use drivehub_service::drive::{DriveService, SyncService};
use drivehub_service::permission::PermissionService;
use drivehub_service::tree::TreeService;

/// Everything a service test needs, wired over one mock drive.
pub struct TestStack {
    pub pool: PgPool,
    pub remote: Arc<MockRemote>,
    pub nodes: Arc<NodeRepository>,
    pub grants: Arc<GrantRepository>,
    pub history: Arc<HistoryRepository>,
    pub cursor: Arc<SyncCursorRepository>,
    pub perms: Arc<PermissionService>,
    pub audit: Arc<AuditSink>,
    pub tree: Arc<TreeService>,
    pub drive: Arc<DriveService>,
    pub sync: Arc<SyncService>,
    pub browse: Arc<BrowseService>,
    pub sync_user: Uuid,
}

impl TestStack {
    /// A fresh principal for this test.
    pub fn principal(&self) -> Principal {
        Principal::new(UserId::new())
    }
}

/// Build the stack, or `None` when no test database is configured.
pub async fn test_stack() -> Option<TestStack> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect test database");
    drivehub_database::migration::run_migrations(&pool)
        .await
        .expect("run migrations");

    let remote = Arc::new(MockRemote::new());
    let gateway: Arc<dyn RemoteStorage> = remote.clone();

    let sync_user = Uuid::new_v4();
    let config = SyncConfig {
        principal_user_id: sync_user,
        schedule: "0 */5 * * * *".to_string(),
        root_folder_prefix: "DriveHub".to_string(),
    };

    let nodes = Arc::new(NodeRepository::new(pool.clone()));
    let grants = Arc::new(GrantRepository::new(pool.clone()));
    let history = Arc::new(HistoryRepository::new(pool.clone()));
    let notifications = Arc::new(NotificationRepository::new(pool.clone()));
    let starred = Arc::new(StarredRepository::new(pool.clone()));
    let cursor = Arc::new(SyncCursorRepository::new(pool.clone()));

    let perms = Arc::new(PermissionService::new(Arc::clone(&nodes), Arc::clone(&grants)));
    let audit = Arc::new(AuditSink::new(Arc::clone(&history), Arc::clone(&notifications)));
    let tree = Arc::new(TreeService::new(
        Arc::clone(&nodes),
        Arc::clone(&perms),
        Arc::clone(&audit),
    ));
    let drive = Arc::new(DriveService::new(
        Arc::clone(&gateway),
        Arc::clone(&nodes),
        Arc::clone(&grants),
        Arc::clone(&perms),
        Arc::clone(&tree),
        Arc::clone(&audit),
        config.clone(),
    ));
    let sync = Arc::new(SyncService::new(
        Arc::clone(&gateway),
        pool.clone(),
        Arc::clone(&cursor),
        Arc::clone(&drive),
        Arc::clone(&audit),
        config,
    ));
    let browse = Arc::new(BrowseService::new(
        Arc::clone(&nodes),
        Arc::clone(&grants),
        Arc::clone(&history),
        Arc::clone(&starred),
        Arc::clone(&perms),
        Arc::clone(&audit),
    ));

    Some(TestStack {
        pool,
        remote,
        nodes,
        grants,
        history,
        cursor,
        perms,
        audit,
        tree,
        drive,
        sync,
        browse,
        sync_user,
    })
}
