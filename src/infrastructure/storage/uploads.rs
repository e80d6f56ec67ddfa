use std::path::{Component, Path, PathBuf};

use derive_more::Display;
use infer::Infer;
use tokio::fs;
use uuid::Uuid;

use crate::entities::{asset::AssetRef, document::UploadedFile};

/// Public URL prefix the upload directory is mounted under.
pub const PUBLIC_PREFIX: &str = "uploads";

const DOCUMENT_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const PLAIN_DOCUMENT_EXTENSIONS: [&str; 3] = ["txt", "md", "csv"];

#[derive(Debug, Display)]
pub enum StorageError {
    #[display("File of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[display("File type not allowed: {_0}")]
    RejectedType(String),

    #[display("Invalid asset path: {_0}")]
    InvalidPath(String),

    #[display("Asset not found: {_0}")]
    NotFound(String),

    #[display("Storage IO error: {_0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(err.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

/// Kinds of uploads, deciding the sub-directory and the accepted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadClass {
    Image,
    Document,
}

impl UploadClass {
    fn for_field(field: &str) -> Self {
        if field == "documents" { UploadClass::Document } else { UploadClass::Image }
    }

    fn directory(&self) -> &'static str {
        match self {
            UploadClass::Image => "images",
            UploadClass::Document => "documents",
        }
    }
}

/// Filesystem store behind the `/uploads` static mount.
///
/// Files land at `{root}/{images|documents}/{uuid}.{ext}` and are referenced
/// from documents as `uploads/{images|documents}/{uuid}.{ext}`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        UploadStore { root: root.into(), max_bytes }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates and writes one uploaded file, returning its stored reference.
    pub async fn save(&self, file: &UploadedFile) -> Result<AssetRef, StorageError> {
        if file.bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge { size: file.bytes.len(), limit: self.max_bytes });
        }

        let class = UploadClass::for_field(&file.field);
        let extension = accepted_extension(class, &file.file_name, &file.bytes)?;

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = self.root.join(class.directory());
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&stored_name), &file.bytes).await?;

        let url = format!("{}/{}/{}", PUBLIC_PREFIX, class.directory(), stored_name);
        tracing::info!("Stored upload '{}' as {}", file.file_name, url);

        Ok(AssetRef::named(url, file.file_name.clone()))
    }

    /// Removes a stored file. Missing files are not an error.
    pub async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let path = self.disk_path(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Removed upload {}", url);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Best-effort removal used after a document stops referencing files.
    pub async fn remove_all(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.remove(url).await {
                tracing::warn!("Failed to remove upload {}: {}", url, e);
            }
        }
    }

    /// Reads a stored file and its content type for static serving.
    pub async fn read(&self, url: &str) -> Result<(Vec<u8>, String), StorageError> {
        let path = self.disk_path(url)?;
        let bytes = fs::read(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound(url.to_string()),
                _ => StorageError::Io(e),
            })?;
        let mime = content_type_for(&path, &bytes);
        Ok((bytes, mime))
    }

    /// Maps a stored relative reference onto the upload directory, refusing traversal.
    fn disk_path(&self, url: &str) -> Result<PathBuf, StorageError> {
        let trimmed = url.trim_start_matches('/');
        let relative = trimmed
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath(url.to_string()))?;

        let candidate = Path::new(relative);
        if relative.is_empty()
            || candidate.components().any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(url.to_string()));
        }

        Ok(self.root.join(candidate))
    }
}

fn accepted_extension(class: UploadClass, file_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
    let sniffed = Infer::new().get(bytes);

    match (class, sniffed) {
        (_, Some(kind)) if kind.mime_type().starts_with("image/") => Ok(kind.extension().to_string()),
        (UploadClass::Document, Some(kind)) if DOCUMENT_MIME_TYPES.contains(&kind.mime_type()) => {
            Ok(kind.extension().to_string())
        }
        (UploadClass::Document, None) => {
            let ext = Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if PLAIN_DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
                Ok(ext)
            } else {
                Err(StorageError::RejectedType(format!("{} (unrecognized content)", file_name)))
            }
        }
        (_, Some(kind)) => Err(StorageError::RejectedType(kind.mime_type().to_string())),
        (UploadClass::Image, None) => {
            Err(StorageError::RejectedType(format!("{} is not an image", file_name)))
        }
    }
}

fn content_type_for(path: &Path, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        _ => "application/octet-stream",
    }
    .to_string()
}
