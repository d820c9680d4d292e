//! # drivehub-remote
//!
//! Remote Storage Gateway implementations. The one real adapter speaks
//! the Microsoft Graph drive API for a fixed storage account; network
//! and auth concerns live here, behind the [`drivehub_core::traits::remote::RemoteStorage`]
//! trait. The gateway classifies failures as transient or permanent but
//! never retries; retry policy belongs to the reconciliation service.

pub mod auth;
pub mod graph;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use graph::client::GraphDriveClient;
