//! Uploaded product image storage on the local filesystem.
//!
//! Files live under `<upload_dir>/products/` with random names and are served
//! back from `/uploads/products/<file>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Public URL prefix of uploaded product images.
pub const PUBLIC_PREFIX: &str = "/uploads/products/";

/// Largest accepted image (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Most images accepted in one request.
pub const MAX_IMAGES: usize = 10;

/// Errors from saving or deleting images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The upload is not an `image/*` content type.
    #[error("Only image files are allowed!")]
    NotAnImage,

    /// The upload exceeds [`MAX_IMAGE_BYTES`].
    #[error("Image is too large (max {max} bytes)")]
    TooLarge { max: usize },

    /// More than [`MAX_IMAGES`] files in one request.
    #[error("Too many images (max {max})")]
    TooMany { max: usize },

    /// Filesystem failure.
    #[error("image storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Whether the error was caused by the upload itself rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Stores product images under an upload directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at `upload_dir`.
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: upload_dir.into(),
        }
    }

    /// The upload root, served at `/uploads`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn products_dir(&self) -> PathBuf {
        self.root.join("products")
    }

    /// Create the products directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Io` if the directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<(), ImageError> {
        tokio::fs::create_dir_all(self.products_dir()).await?;
        Ok(())
    }

    /// Check an upload before accepting it.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::NotAnImage` or `ImageError::TooLarge`.
    pub fn validate(content_type: Option<&str>, len: usize) -> Result<(), ImageError> {
        if !content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/")) {
            return Err(ImageError::NotAnImage);
        }
        if len > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge {
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }

    /// Save an image and return its public URL.
    ///
    /// The extension comes from the original file name, or from the content
    /// type when the name has none.
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-images and oversized files, and
    /// `ImageError::Io` if the file cannot be written.
    pub async fn save(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ImageError> {
        Self::validate(content_type, bytes.len())?;
        self.ensure_dirs().await?;

        let name = format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for(file_name, content_type)
        );
        tokio::fs::write(self.products_dir().join(&name), bytes).await?;

        tracing::debug!(file = %name, size = bytes.len(), "Saved product image");
        Ok(format!("{PUBLIC_PREFIX}{name}"))
    }

    /// Delete an uploaded image by its public URL.
    ///
    /// URLs outside `/uploads/products/` (external or placeholder images) are
    /// left alone. Returns whether a file was removed; a file that is already
    /// gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Io` if the file exists but cannot be removed.
    pub async fn delete(&self, url: &str) -> Result<bool, ImageError> {
        let Some(path) = self.local_path(url) else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete several images, logging failures instead of returning them.
    pub async fn delete_all(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.delete(url).await {
                tracing::warn!(url = %url, error = %e, "Failed to delete product image");
            }
        }
    }

    /// Map a public URL to a file under the products directory.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(PUBLIC_PREFIX)?;
        let safe = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        safe.then(|| self.products_dir().join(name))
    }
}

fn extension_for(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }

    let subtype = content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|ct| ct.trim().strip_prefix("image/"))
        .map(str::to_ascii_lowercase);
    match subtype.as_deref() {
        Some("jpeg" | "pjpeg") => "jpg".to_string(),
        Some("svg+xml") => "svg".to_string(),
        Some(other) if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric()) => {
            other.to_string()
        }
        _ => "img".to_string(),
    }
}
