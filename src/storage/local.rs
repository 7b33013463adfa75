use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::{BlobStore, UploadPurpose};
use crate::error::{Error, Result};
use crate::models::attachment::UploadedFile;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "odt", "txt", "md", "rtf", "csv",
    "json", "zip", "png", "jpg", "jpeg", "gif", "webp", "svg", "mp3", "mp4", "webm", "py",
    "java", "c", "cpp", "h", "js", "ts", "html", "css", "ipynb",
];

/// Blobs on the local filesystem under `{root}/{purpose}/{uuid}.{ext}`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    max_size: usize,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::BadRequest(format!("Invalid blob path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        purpose: UploadPurpose,
        original_name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<UploadedFile> {
        if data.len() > self.max_size {
            return Err(Error::BadRequest(format!(
                "File {} exceeds the {} byte limit",
                original_name, self.max_size
            )));
        }
        let ext = extension_of(original_name)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                Error::BadRequest(format!("File type of {} is not allowed", original_name))
            })?;

        let dir = self.root.join(purpose.dir_name());
        fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
        let path = format!("{}/{}", purpose.dir_name(), stored_name);
        fs::write(dir.join(&stored_name), &data).await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Failed to write upload");
            Error::Storage(format!("Failed to save file: {}", e))
        })?;

        tracing::debug!(path = %path, size = data.len(), "Stored upload");
        Ok(UploadedFile {
            original_name: original_name.to_string(),
            stored_name,
            path,
            mime_type: mime_type.to_string(),
            size: data.len() as i64,
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        fs::remove_file(&full_path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to remove {}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_remove_round_trips_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), 1024);

        let file = store
            .store(
                UploadPurpose::Submissions,
                "Essay.PDF",
                "application/pdf",
                Bytes::from_static(b"%PDF-1.4"),
            )
            .await
            .unwrap();

        assert!(file.path.starts_with("submissions/"));
        assert!(file.stored_name.ends_with(".pdf"));
        assert_eq!(file.size, 8);
        assert!(dir.path().join(&file.path).exists());

        store.remove(&file.path).await.unwrap();
        assert!(!dir.path().join(&file.path).exists());
    }

    #[tokio::test]
    async fn rejects_disallowed_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), 4);

        let exe = store
            .store(UploadPurpose::Classwork, "tool.exe", "application/octet-stream", Bytes::from_static(b"MZ"))
            .await;
        assert!(matches!(exe, Err(Error::BadRequest(_))));

        let big = store
            .store(UploadPurpose::Classwork, "notes.txt", "text/plain", Bytes::from_static(b"too long"))
            .await;
        assert!(matches!(big, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn remove_refuses_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), 1024);
        assert!(matches!(
            store.remove("../etc/passwd").await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(store.remove("/etc/passwd").await, Err(Error::BadRequest(_))));
    }
}
