//! Image storage collaborator.
//!
//! Category and product images are handed to an [`ImageStore`], which returns an
//! opaque reference that is stored on the record. [`LocalImageStore`] keeps the
//! files on disk under the upload directory and hands out `/uploads/...` paths.

use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs as tokio_fs;
use tracing::{debug, info};
use uuid::Uuid;

pub const CATEGORY_FOLDER: &str = "categories";
pub const PRODUCT_FOLDER: &str = "products";

const PUBLIC_PREFIX: &str = "/uploads/";

#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Error, Debug)]
pub enum ImageStoreError {
    #[error("unsupported content type `{0}`")]
    UnsupportedType(String),
    #[error("file is larger than {limit} bytes")]
    TooLarge { limit: usize },
    #[error("unknown image reference `{0}`")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageStoreError>;
    async fn delete(&self, reference: &str) -> Result<(), ImageStoreError>;
}

pub struct LocalImageStore {
    root: PathBuf,
    max_size: usize,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageStoreError> {
        let extension = allowed_content_types()
            .get(image.content_type.as_str())
            .copied()
            .ok_or_else(|| ImageStoreError::UnsupportedType(image.content_type.clone()))?;

        if image.bytes.len() > self.max_size {
            return Err(ImageStoreError::TooLarge {
                limit: self.max_size,
            });
        }

        let dir = self.root.join(folder);
        tokio_fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio_fs::write(dir.join(&stored_name), &image.bytes).await?;

        info!(
            original = %image.file_name,
            folder = %folder,
            stored = %stored_name,
            size = image.bytes.len(),
            "Stored image"
        );
        Ok(format!("{PUBLIC_PREFIX}{folder}/{stored_name}"))
    }

    async fn delete(&self, reference: &str) -> Result<(), ImageStoreError> {
        let relative = reference
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| ImageStoreError::NotFound(reference.to_string()))?;
        let path = resolve_upload_path(&self.root, relative)
            .ok_or_else(|| ImageStoreError::NotFound(reference.to_string()))?;

        tokio_fs::remove_file(&path).await?;
        debug!(reference = %reference, "Removed image");
        Ok(())
    }
}

/// Joins `relative` onto `root`, refusing anything that could escape it.
pub fn resolve_upload_path(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn allowed_content_types() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("image/jpeg", "jpg"),
        ("image/png", "png"),
        ("image/webp", "webp"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(bytes: &'static [u8]) -> ImageUpload {
        ImageUpload {
            file_name: "aloe.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[tokio::test]
    async fn upload_then_delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), 1024);

        let reference = store.upload(png(b"\x89PNG"), CATEGORY_FOLDER).await.unwrap();
        assert!(reference.starts_with("/uploads/categories/"));
        assert!(reference.ends_with(".png"));

        let on_disk = resolve_upload_path(dir.path(), &reference["/uploads/".len()..]).unwrap();
        assert!(on_disk.exists());

        store.delete(&reference).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn rejects_unknown_types_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), 2);

        let mut gif = png(b"G");
        gif.content_type = "image/gif".to_string();
        assert!(matches!(
            store.upload(gif, CATEGORY_FOLDER).await,
            Err(ImageStoreError::UnsupportedType(_))
        ));

        assert!(matches!(
            store.upload(png(b"too big"), CATEGORY_FOLDER).await,
            Err(ImageStoreError::TooLarge { limit: 2 })
        ));
    }

    #[tokio::test]
    async fn delete_of_foreign_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), 1024);

        assert!(matches!(
            store.delete("https://cdn.example.com/x.png").await,
            Err(ImageStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("/uploads/categories/missing.png").await,
            Err(ImageStoreError::Io(_))
        ));
    }

    #[test]
    fn upload_paths_cannot_escape_the_root() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve_upload_path(root, "categories/a.png"),
            Some(PathBuf::from("/srv/uploads/categories/a.png"))
        );
        assert_eq!(resolve_upload_path(root, "../etc/passwd"), None);
        assert_eq!(resolve_upload_path(root, "/etc/passwd"), None);
        assert_eq!(resolve_upload_path(root, ""), None);
    }
}
