//! # drivehub-service
//!
//! Business logic for DriveHub. The permission engine evaluates per-node
//! grants, the tree service owns the cascading trash/restore/delete
//! operations, the audit sink records history and fans out notifications,
//! and the drive service binds local mutations to their remote
//! counterparts (remote first, local commit second) including the
//! periodic delta sync.

pub mod audit;
pub mod browse;
pub mod drive;
pub mod permission;
pub mod tree;
