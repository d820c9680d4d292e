//! # drivehub-entity
//!
//! Domain entity models for DriveHub: the node tree, access grants,
//! history entries, and notifications. All row types derive
//! `sqlx::FromRow` for PostgreSQL and `serde` for the API boundary.

pub mod history;
pub mod node;
pub mod notification;
pub mod permission;
