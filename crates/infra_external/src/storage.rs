//! Local photo storage
//!
//! Writes meter photos under a directory served read-only by the API at
//! `/photos`. Each upload gets a fresh random file name, so stored URLs
//! never change and never collide.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use core_kernel::PortError;
use domain_billing::{PhotoStorage, PhotoUpload};

/// Where photos are written and how they are addressed
#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    /// Directory photos are written to
    pub root: PathBuf,
    /// Public base URL of the API, without trailing slash
    pub public_base_url: String,
}

/// Photo storage on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    config: LocalStorageConfig,
}

impl LocalPhotoStorage {
    pub fn new(config: LocalStorageConfig) -> Self {
        Self { config }
    }

    /// Public URL of a stored file
    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/photos/{}", self.config.public_base_url.trim_end_matches('/'), file_name)
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    #[instrument(skip(self, photo), fields(size = photo.bytes.len()))]
    async fn store(&self, photo: PhotoUpload) -> Result<String, PortError> {
        if photo.is_empty() {
            return Err(PortError::validation_field("photo is empty", "photo"));
        }

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension(&photo));
        let path = self.config.root.join(&file_name);

        tokio::fs::create_dir_all(&self.config.root).await.map_err(|e| {
            error!(error = %e, root = %self.config.root.display(), "Cannot create photo directory");
            PortError::internal(format!("photo directory: {e}"))
        })?;
        tokio::fs::write(&path, &photo.bytes).await.map_err(|e| {
            error!(error = %e, path = %path.display(), "Cannot write photo");
            PortError::internal(format!("photo write: {e}"))
        })?;

        debug!(file = %file_name, "Photo stored");
        Ok(self.url_for(&file_name))
    }
}

/// Picks a safe extension from the upload's name or content type
fn extension(photo: &PhotoUpload) -> &'static str {
    let from_name = photo
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match from_name.as_deref().or(photo.content_type.as_deref()) {
        Some("jpg" | "jpeg" | "image/jpeg") => "jpg",
        Some("png" | "image/png") => "png",
        Some("webp" | "image/webp") => "webp",
        Some("heic" | "image/heic") => "heic",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: Option<&str>, content_type: Option<&str>) -> PhotoUpload {
        PhotoUpload {
            file_name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_extension_prefers_file_name() {
        assert_eq!(extension(&upload(Some("Meter.JPEG"), Some("image/png"))), "jpg");
        assert_eq!(extension(&upload(None, Some("image/png"))), "png");
        assert_eq!(extension(&upload(Some("../../etc/passwd"), None)), "bin");
    }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(LocalStorageConfig {
            root: dir.path().join("photos"),
            public_base_url: "http://localhost:5000/".to_string(),
        });

        let url = storage.store(upload(Some("m.jpg"), None)).await.unwrap();
        assert!(url.starts_with("http://localhost:5000/photos/"));
        assert!(url.ends_with(".jpg"));

        let file_name = url.rsplit('/').next().unwrap();
        let bytes = std::fs::read(dir.path().join("photos").join(file_name)).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_photo_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(LocalStorageConfig {
            root: dir.path().to_path_buf(),
            public_base_url: "http://localhost".to_string(),
        });
        let result = storage.store(PhotoUpload::default()).await;
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }
}
