//! Filesystem-backed blob store
//!
//! Writes blobs under a configured root directory and serves them from a
//! configured base URL. Paths are validated against traversal before any
//! filesystem access.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{AgoraError, Result};

use super::BlobStore;

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let traversal = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || traversal {
            return Err(AgoraError::Storage(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, data: Bytes) -> Result<String> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, &data).await?;
        debug!(path = %path, bytes = data.len(), "Stored blob");
        Ok(self.url(path))
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path, "Blob already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/files");

        let url = store
            .put("resumes/u1/1_cv.pdf", Bytes::from_static(b"pdf bytes"))
            .await
            .unwrap();
        assert_eq!(url, "/files/resumes/u1/1_cv.pdf");

        let on_disk = dir.path().join("resumes/u1/1_cv.pdf");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"pdf bytes");

        let fetched = store.get("resumes/u1/1_cv.pdf").await.unwrap();
        assert_eq!(fetched, Some(Bytes::from_static(b"pdf bytes")));
        assert_eq!(store.get("resumes/u1/missing.pdf").await.unwrap(), None);

        store.delete("resumes/u1/1_cv.pdf").await.unwrap();
        assert!(!on_disk.exists());

        // Deleting again is not an error
        store.delete("resumes/u1/1_cv.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/files");

        let result = store.put("../escape.pdf", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(AgoraError::Storage(_))));
    }
}
