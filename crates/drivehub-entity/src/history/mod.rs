//! Audit history entities.

pub mod model;

pub use model::HistoryEntry;
