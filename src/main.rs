//! DriveHub Server — multi-tenant file-management backend mirrored to a
//! remote cloud drive.
//!
//! Main entry point that wires configuration, the database, the remote
//! gateway, the services, and the sync scheduler together.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use drivehub_core::config::AppConfig;
use drivehub_core::error::AppError;
use drivehub_core::traits::remote::RemoteStorage;
use drivehub_database::repositories::grant::GrantRepository;
use drivehub_database::repositories::history::HistoryRepository;
use drivehub_database::repositories::node::NodeRepository;
use drivehub_database::repositories::notification::NotificationRepository;
use drivehub_database::repositories::sync_cursor::SyncCursorRepository;
use drivehub_database::{DatabasePool, migration};
use drivehub_remote::GraphDriveClient;
use drivehub_service::audit::AuditSink;
use drivehub_service::drive::{DriveService, SyncService};
use drivehub_service::permission::PermissionService;
use drivehub_service::tree::TreeService;
use drivehub_worker::SyncScheduler;

#[tokio::main]
async fn main() {
    let env = std::env::var("DRIVEHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DriveHub v{}", env!("CARGO_PKG_VERSION"));

    let db = DatabasePool::connect(&config.database).await?;
    migration::run_migrations(db.pool()).await?;

    let pool = db.pool().clone();
    let node_repo = Arc::new(NodeRepository::new(pool.clone()));
    let grant_repo = Arc::new(GrantRepository::new(pool.clone()));
    let history_repo = Arc::new(HistoryRepository::new(pool.clone()));
    let notification_repo = Arc::new(NotificationRepository::new(pool.clone()));
    let cursor_repo = Arc::new(SyncCursorRepository::new(pool.clone()));

    let gateway: Arc<dyn RemoteStorage> = Arc::new(GraphDriveClient::new(config.remote.clone())?);
    tracing::info!(provider = gateway.provider_type(), "Remote gateway ready");

    let perms = Arc::new(PermissionService::new(
        Arc::clone(&node_repo),
        Arc::clone(&grant_repo),
    ));
    let audit = Arc::new(AuditSink::new(
        Arc::clone(&history_repo),
        Arc::clone(&notification_repo),
    ));
    let tree = Arc::new(TreeService::new(
        Arc::clone(&node_repo),
        Arc::clone(&perms),
        Arc::clone(&audit),
    ));
    let drive = Arc::new(DriveService::new(
        Arc::clone(&gateway),
        Arc::clone(&node_repo),
        Arc::clone(&grant_repo),
        Arc::clone(&perms),
        Arc::clone(&tree),
        Arc::clone(&audit),
        config.sync.clone(),
    ));
    let sync = Arc::new(SyncService::new(
        Arc::clone(&gateway),
        pool.clone(),
        Arc::clone(&cursor_repo),
        Arc::clone(&drive),
        Arc::clone(&audit),
        config.sync.clone(),
    ));
    let mut scheduler = SyncScheduler::new(Arc::clone(&sync), &config.sync).await?;
    scheduler.start().await?;

    tracing::info!("DriveHub is running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown: {e}")))?;

    tracing::info!("Shutting down");
    scheduler.shutdown().await?;
    db.close().await;
    Ok(())
}
