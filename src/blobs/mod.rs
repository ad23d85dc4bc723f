//! Blob storage for uploaded files
//!
//! Resume documents, profile images, and testimonial videos are stored as
//! opaque blobs addressed by path. Metadata records keep the path alongside
//! the public URL so a later delete or replace can find the bytes.

mod local;

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::Result;

pub use local::LocalBlobStore;

/// Storage backend for uploaded binary content
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at the given path, returning a public download URL
    async fn put(&self, path: &str, data: Bytes) -> Result<String>;

    /// Read the blob at the given path, or None if it does not exist
    async fn get(&self, path: &str) -> Result<Option<Bytes>>;

    /// Delete the blob at the given path; missing blobs are not an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// The public download URL for a stored path
    fn url(&self, path: &str) -> String;
}

/// Build a collision-resistant blob path under a category directory,
/// e.g. `resumes/{user_id}/{timestamp}_{file_name}`
pub fn blob_path(category: &str, owner_id: &str, file_name: &str) -> String {
    let stamp = chrono::Utc::now().timestamp_millis();
    let safe_name: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{category}/{owner_id}/{stamp}_{safe_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_sanitizes_name() {
        let path = blob_path("resumes", "u1", "my resume (final).pdf");
        assert!(path.starts_with("resumes/u1/"));
        assert!(path.ends_with("_my_resume__final_.pdf"));
        assert!(!path.contains(' '));
    }
}
