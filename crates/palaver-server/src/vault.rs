//! Content-addressed attachment vault.
//!
//! Bytes are stored once under their BLAKE3 hex digest; uploading the same
//! content again returns the existing handle without rewriting the file.
//! Display names and MIME types live in the database, so one stored file
//! can back many attachments.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info};

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AttachmentVault {
    base_path: PathBuf,
    max_size: usize,
}

impl AttachmentVault {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ApiError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ApiError::Internal(format!(
                "Failed to create vault directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Attachment vault initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Store attachment bytes, returning the content hash.  A second
    /// upload of identical bytes is a no-op returning the same hash.
    pub async fn store(&self, data: &[u8]) -> Result<String, ApiError> {
        if data.is_empty() {
            return Err(ApiError::BadRequest("Empty attachment".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ApiError::AttachmentTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let hash = blake3::hash(data).to_hex().to_string();
        let path = self.path_for(&hash)?;

        if path.exists() {
            debug!(hash = %hash, "Attachment already stored, deduplicated");
            return Ok(hash);
        }

        fs::write(&path, data).await.map_err(|e| {
            ApiError::Internal(format!("Failed to write attachment {hash}: {e}"))
        })?;

        debug!(hash = %hash, size = data.len(), "Stored attachment");
        Ok(hash)
    }

    /// Read attachment bytes by content hash.
    pub async fn read(&self, hash: &str) -> Result<Vec<u8>, ApiError> {
        let path = self.path_for(hash)?;

        if !path.exists() {
            return Err(ApiError::NotFound(format!("attachment {hash}")));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ApiError::Internal(format!("Failed to read attachment {hash}: {e}"))
        })?;

        debug!(hash = %hash, size = data.len(), "Retrieved attachment");
        Ok(data)
    }

    /// Remove stored bytes.  Callers must first confirm no message still
    /// references the hash.
    #[allow(dead_code)]
    pub async fn remove(&self, hash: &str) -> Result<(), ApiError> {
        let path = self.path_for(hash)?;

        if !path.exists() {
            return Err(ApiError::NotFound(format!("attachment {hash}")));
        }

        fs::remove_file(&path).await.map_err(|e| {
            ApiError::Internal(format!("Failed to delete attachment {hash}: {e}"))
        })?;

        debug!(hash = %hash, "Deleted attachment");
        Ok(())
    }

    /// Resolve a hash to its vault path, validating the hash format.
    /// Only lowercase hex of digest length is accepted, which also rules
    /// out any path traversal.
    fn path_for(&self, hash: &str) -> Result<PathBuf, ApiError> {
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ApiError::BadRequest(format!(
                "Invalid content hash '{hash}'"
            )));
        }
        Ok(self.base_path.join(hash.to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_vault() -> (AttachmentVault, TempDir) {
        let dir = TempDir::new().unwrap();
        let vault = AttachmentVault::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (vault, dir)
    }

    #[tokio::test]
    async fn store_and_read() {
        let (vault, _dir) = test_vault().await;
        let data = b"attachment-bytes";

        let hash = vault.store(data).await.unwrap();
        assert_eq!(hash, blake3::hash(data).to_hex().to_string());
        assert_eq!(vault.read(&hash).await.unwrap(), data);
    }

    #[tokio::test]
    async fn duplicate_upload_deduplicates() {
        let (vault, dir) = test_vault().await;

        let h1 = vault.store(b"same-bytes").await.unwrap();
        let h2 = vault.store(b"same-bytes").await.unwrap();
        assert_eq!(h1, h2);

        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_attachment_rejected() {
        let (vault, _dir) = test_vault().await;
        assert!(vault.store(b"").await.is_err());
    }

    #[tokio::test]
    async fn oversized_attachment_rejected() {
        let dir = TempDir::new().unwrap();
        let vault = AttachmentVault::new(dir.path().to_path_buf(), 8)
            .await
            .unwrap();

        let err = vault.store(b"way too many bytes").await.unwrap_err();
        assert!(matches!(err, ApiError::AttachmentTooLarge { .. }));
    }

    #[tokio::test]
    async fn malformed_hash_rejected() {
        let (vault, _dir) = test_vault().await;

        assert!(vault.read("../../etc/passwd").await.is_err());
        assert!(vault.read("abc123").await.is_err());
    }

    #[tokio::test]
    async fn missing_hash_is_not_found() {
        let (vault, _dir) = test_vault().await;
        let missing = "0".repeat(64);
        assert!(matches!(
            vault.read(&missing).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_deletes_bytes() {
        let (vault, _dir) = test_vault().await;
        let hash = vault.store(b"delete-me").await.unwrap();

        vault.remove(&hash).await.unwrap();
        assert!(vault.read(&hash).await.is_err());
    }
}
