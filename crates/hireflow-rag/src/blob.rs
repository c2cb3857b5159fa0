//! Raw file storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Where a blob ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Backend name, recorded on the document.
    pub provider: String,
    /// Path inside the backend.
    pub path: String,
    /// URL the blob is served from.
    pub public_url: String,
}

/// Stores raw uploaded files.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing blob.
    ///
    /// # Errors
    ///
    /// Returns `Blob` if the write fails or the path is not relative.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredBlob>;

    /// Delete the blob at `path`. Deleting a missing blob succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Blob` if the delete fails.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Reduce a client-supplied filename to a safe single path segment.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Blob storage on the local filesystem.
pub struct LocalBlobStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStorage {
    /// Backend name recorded on documents.
    pub const PROVIDER: &'static str = "local";

    /// Create storage rooted at `root`, serving files under `public_base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(RagError::Blob(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredBlob> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RagError::Blob(e.to_string()))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| RagError::Blob(e.to_string()))?;

        tracing::debug!(path = %full.display(), size = bytes.len(), "Stored blob");

        Ok(StoredBlob {
            provider: Self::PROVIDER.to_string(),
            path: path.to_string(),
            public_url: format!("{}/{path}", self.public_base_url),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %full.display(), "Blob already missing");
                Ok(())
            }
            Err(e) => Err(RagError::Blob(e.to_string())),
        }
    }
}

/// In-memory blob storage for testing. Records every delete.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: parking_lot::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    deleted: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryBlobStorage {
    /// Bytes stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(path).cloned()
    }

    /// Paths passed to `delete`, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<StoredBlob> {
        self.blobs.lock().insert(path.to_string(), bytes.to_vec());
        Ok(StoredBlob {
            provider: "memory".to_string(),
            path: path.to_string(),
            public_url: format!("memory://{path}"),
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.lock().remove(path);
        self.deleted.lock().push(path.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_strips_directories_and_symbols() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cv 2024.pdf"), "cv_2024.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[tokio::test]
    async fn local_put_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost:8080/files/");

        let blob = storage.put("user/doc/cv.txt", b"hello").await.unwrap();
        assert_eq!(blob.provider, "local");
        assert_eq!(blob.public_url, "http://localhost:8080/files/user/doc/cv.txt");
        assert_eq!(
            std::fs::read(dir.path().join("user/doc/cv.txt")).unwrap(),
            b"hello"
        );

        storage.delete("user/doc/cv.txt").await.unwrap();
        assert!(!dir.path().join("user/doc/cv.txt").exists());

        // Second delete is a no-op
        storage.delete("user/doc/cv.txt").await.unwrap();
    }

    #[tokio::test]
    async fn local_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path(), "http://localhost");

        assert!(storage.put("../outside.txt", b"x").await.is_err());
        assert!(storage.put("/abs.txt", b"x").await.is_err());
    }
}
