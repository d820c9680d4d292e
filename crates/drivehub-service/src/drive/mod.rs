//! Reconciliation of local state against the remote drive.

pub mod service;
pub mod sync;

pub use service::{DriveService, StorageUsage};
pub use sync::{SyncReport, SyncService};
