//! Microsoft Graph drive adapter.

pub mod client;
pub mod types;
