//! Permission engine and grant management.

pub mod engine;
pub mod service;

pub use engine::evaluate;
pub use service::PermissionService;
