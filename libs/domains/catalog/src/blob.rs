use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};

/// Image persistence keyed by a generated id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy the file at `source` into the store
    async fn save(&self, source: &Path) -> CatalogResult<Uuid>;

    /// Store uploaded bytes under `file_name`
    async fn save_bytes(&self, file_name: &str, bytes: &[u8]) -> CatalogResult<Uuid>;

    /// Stable location of the stored image. Missing ids are `ImageNotFound`.
    async fn get_uri(&self, image_id: Uuid) -> CatalogResult<String>;
}

/// Stores each image as `{root}/{image_id}/{file_name}`
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> CatalogResult<Self> {
        let store = Self::new(root);
        tokio::fs::create_dir_all(&store.root)
            .await
            .map_err(|e| io_error(&store.root, e))?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn slot(&self) -> CatalogResult<(Uuid, PathBuf)> {
        let image_id = Uuid::new_v4();
        let dir = self.root.join(image_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        Ok((image_id, dir))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> CatalogError {
    CatalogError::upstream("blob store", format!("{}: {}", path.display(), err))
}

fn file_name_of(source: &Path) -> CatalogResult<&str> {
    source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            CatalogError::Validation(format!("{} does not name a file", source.display()))
        })
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn save(&self, source: &Path) -> CatalogResult<Uuid> {
        let file_name = file_name_of(source)?;
        match tokio::fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(CatalogError::Validation(format!(
                    "{} is not a regular file",
                    source.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CatalogError::Validation(format!(
                    "{} does not exist",
                    source.display()
                )));
            }
            Err(e) => return Err(io_error(source, e)),
        }

        let (image_id, dir) = self.slot().await?;
        let target = dir.join(file_name);
        tokio::fs::copy(source, &target)
            .await
            .map_err(|e| io_error(&target, e))?;

        debug!(%image_id, path = %target.display(), "Stored image");
        Ok(image_id)
    }

    async fn save_bytes(&self, file_name: &str, bytes: &[u8]) -> CatalogResult<Uuid> {
        let file_name = file_name_of(Path::new(file_name))?.to_string();
        let (image_id, dir) = self.slot().await?;
        let target = dir.join(file_name);
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| io_error(&target, e))?;

        debug!(%image_id, size = bytes.len(), "Stored upload");
        Ok(image_id)
    }

    async fn get_uri(&self, image_id: Uuid) -> CatalogResult<String> {
        let dir = self.root.join(image_id.to_string());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CatalogError::ImageNotFound(image_id));
            }
            Err(e) => return Err(io_error(&dir, e)),
        };

        let entry = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&dir, e))?
            .ok_or(CatalogError::ImageNotFound(image_id))?;

        let path = std::path::absolute(entry.path()).map_err(|e| io_error(&dir, e))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Load the image behind a blob store URI
pub async fn read_image(uri: &str) -> CatalogResult<Vec<u8>> {
    match tokio::fs::read(uri).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(CatalogError::Validation(format!(
            "image {} does not exist",
            uri
        ))),
        Err(e) => Err(io_error(Path::new(uri), e)),
    }
}

/// Guess a response content type from the stored file extension
pub fn content_type_for(uri: &str) -> &'static str {
    let extension = Path::new(uri)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
