//! # drivehub-database
//!
//! PostgreSQL connection management, migrations, and repository
//! implementations for DriveHub. Repositories own the SQL; all tree
//! traversal is iterative (bulk frontier queries), never per-node
//! recursion.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
