//! # drivehub-core
//!
//! Core crate for DriveHub. Contains the remote-storage gateway traits,
//! configuration schemas, typed identifiers, the authenticated-principal
//! type, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DriveHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
