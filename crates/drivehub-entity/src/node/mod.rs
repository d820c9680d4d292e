//! Node (file/folder tree) entities.

pub mod model;

pub use model::{Node, NodeKind, StorageBackend, UpsertNode};
