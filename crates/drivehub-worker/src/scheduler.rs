//! Cron scheduler for the periodic drive sync.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use drivehub_core::config::sync::SyncConfig;
use drivehub_core::error::AppError;
use drivehub_service::drive::SyncService;

/// Cron-based scheduler that triggers the delta sync on a fixed
/// interval. The sync service holds its own run lock, so a tick that
/// fires while a run is still in flight simply queues behind it.
pub struct SyncScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// The sync service to trigger
    sync: Arc<SyncService>,
    /// Cron expression for the sync schedule
    schedule: String,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl SyncScheduler {
    /// Create a new scheduler for the given sync service.
    pub async fn new(sync: Arc<SyncService>, config: &SyncConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            sync,
            schedule: config.schedule.clone(),
        })
    }

    /// Register the drive-sync task and start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        let sync = Arc::clone(&self.sync);
        let job = CronJob::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let sync = Arc::clone(&sync);
            Box::pin(async move {
                tracing::debug!("Scheduled drive sync starting");
                match sync.sync_drive().await {
                    Ok(report) => {
                        tracing::info!(
                            synced = report.synced,
                            deleted = report.deleted,
                            skipped = report.skipped,
                            "Scheduled drive sync finished"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled drive sync failed");
                    }
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sync schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sync schedule: {e}")))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!(schedule = %self.schedule, "Registered: drive_sync");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Scheduler shut down");
        Ok(())
    }
}
