//! Uploaded-content handle passed into upload operations.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// An opaque handle to content being uploaded.
///
/// The transport layer (multipart body, CLI file path, test fixture)
/// adapts its input to this trait; the core only reads the metadata and
/// the bytes.
#[async_trait]
pub trait UploadBlob: Send + Sync {
    /// The client-supplied file name, including extension.
    fn original_name(&self) -> &str;

    /// MIME type, if known.
    fn mime_type(&self) -> Option<&str>;

    /// Content length in bytes.
    fn size_bytes(&self) -> i64;

    /// Read the full content.
    async fn read_bytes(&self) -> AppResult<Bytes>;
}

/// An in-memory blob, used by tests and small uploads.
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    name: String,
    mime_type: Option<String>,
    data: Bytes,
}

impl MemoryBlob {
    /// Create a blob from a name and bytes.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data: data.into(),
        }
    }

    /// Attach a MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[async_trait]
impl UploadBlob for MemoryBlob {
    fn original_name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn size_bytes(&self) -> i64 {
        self.data.len() as i64
    }

    async fn read_bytes(&self) -> AppResult<Bytes> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_blob() {
        let blob = MemoryBlob::new("a.txt", &b"hello"[..]).with_mime_type("text/plain");
        assert_eq!(blob.original_name(), "a.txt");
        assert_eq!(blob.mime_type(), Some("text/plain"));
        assert_eq!(blob.size_bytes(), 5);
        assert_eq!(blob.read_bytes().await.expect("read"), Bytes::from("hello"));
    }
}
