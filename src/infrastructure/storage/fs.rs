//! Filesystem blob store for vehicle document uploads

use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use crate::application::ports::BlobStore;
use crate::domain::{DomainError, DomainResult};

/// Stores blobs under a base directory; the database only ever sees the
/// returned relative path.
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn extension_for(content_type: &str, filename_hint: &str) -> &'static str {
        match content_type {
            "application/pdf" => "pdf",
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => {
                // Fall back to the hint's extension family; unknown types
                // were already rejected upstream.
                if filename_hint.ends_with(".pdf") {
                    "pdf"
                } else {
                    "bin"
                }
            }
        }
    }

    /// Reject path traversal in stored relative paths.
    fn safe_relative(relative_path: &str) -> DomainResult<&str> {
        if relative_path.contains("..") || relative_path.starts_with('/') {
            return Err(DomainError::validation("INVALID_BLOB_PATH"));
        }
        Ok(relative_path)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(
        &self,
        filename_hint: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> DomainResult<String> {
        let name = format!(
            "{}.{}",
            Uuid::new_v4(),
            Self::extension_for(content_type, filename_hint)
        );
        let path = self.base_dir.join(&name);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::internal(format!("blob dir: {}", e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::internal(format!("blob write: {}", e)))?;

        debug!("Stored blob {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    async fn delete(&self, relative_path: &str) -> DomainResult<()> {
        let relative_path = Self::safe_relative(relative_path)?;
        let path = self.base_dir.join(relative_path);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DomainError::internal(format!("blob delete: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_paths_are_rejected() {
        assert!(FsBlobStore::safe_relative("../etc/passwd").is_err());
        assert!(FsBlobStore::safe_relative("/etc/passwd").is_err());
        assert!(FsBlobStore::safe_relative("abc123.pdf").is_ok());
    }

    #[test]
    fn extensions_follow_content_type() {
        assert_eq!(FsBlobStore::extension_for("application/pdf", "x"), "pdf");
        assert_eq!(FsBlobStore::extension_for("image/jpeg", "x"), "jpg");
        assert_eq!(FsBlobStore::extension_for("text/plain", "soat.pdf"), "pdf");
        assert_eq!(FsBlobStore::extension_for("text/plain", "weird"), "bin");
    }
}
