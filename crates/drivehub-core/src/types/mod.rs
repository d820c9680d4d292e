//! Shared type definitions: typed identifiers and the authenticated principal.

pub mod id;
pub mod principal;

pub use id::{NodeId, UserId};
pub use principal::Principal;
