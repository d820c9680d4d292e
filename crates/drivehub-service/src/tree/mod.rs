//! Cascading tree operations over the local node store.

pub mod service;

pub use service::TreeService;
