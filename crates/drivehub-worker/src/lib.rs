//! # drivehub-worker
//!
//! Periodic background jobs. The only scheduled task is the drive delta
//! sync; the scheduler fires it on a cron interval and the sync service
//! itself serializes overlapping runs.

pub mod scheduler;

pub use scheduler::SyncScheduler;
