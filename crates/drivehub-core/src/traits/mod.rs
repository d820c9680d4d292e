//! Trait definitions consumed across DriveHub crates.

pub mod blob;
pub mod remote;

pub use blob::{MemoryBlob, UploadBlob};
pub use remote::{ChangePage, RemoteItem, RemoteItemId, RemoteItemKind, RemoteStorage, StorageQuota};
