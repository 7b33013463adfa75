use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::models::attachment::UploadedFile;
use crate::storage::UploadPurpose;
use crate::AppState;

const FILE_FIELDS: &[&str] = &["files", "files[]", "file"];

async fn store_blob(
    state: &AppState,
    purpose: UploadPurpose,
    filename: &str,
    mime_type: &str,
    data: Bytes,
) -> Result<UploadedFile> {
    let timeout = state.config.blob_timeout;
    match tokio::time::timeout(timeout, state.blobs.store(purpose, filename, mime_type, data)).await {
        Ok(stored) => stored,
        Err(_) => {
            tracing::warn!(
                filename,
                timeout_ms = timeout.as_millis() as u64,
                "Timed out storing upload"
            );
            Err(Error::Storage(format!("Timed out storing {}", filename)))
        }
    }
}

/// Text fields and stored files of one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    /// Reads every part, writing file parts to the blob store as they arrive.
    /// Blobs already written are removed again if the body turns out bad.
    pub async fn read(
        state: &AppState,
        multipart: &mut Multipart,
        purpose: UploadPurpose,
    ) -> Result<Self> {
        let mut form = UploadForm::default();
        if let Err(e) = form.collect(state, multipart, purpose).await {
            form.discard(state).await;
            return Err(e);
        }
        Ok(form)
    }

    async fn collect(
        &mut self,
        state: &AppState,
        multipart: &mut Multipart,
        purpose: UploadPurpose,
    ) -> Result<()> {
        while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
            let name = field.name().unwrap_or("").to_string();
            if FILE_FIELDS.contains(&name.as_str()) {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(Error::Multipart)?;
                if data.is_empty() {
                    continue;
                }
                let stored = store_blob(state, purpose, &filename, &mime_type, data).await?;
                self.files.push(stored);
            } else if !name.is_empty() {
                let value = field.text().await.map_err(Error::Multipart)?;
                self.fields.insert(name, value);
            }
        }
        Ok(())
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// Parses a JSON-encoded text field. Blank counts as absent.
    pub fn json(&self, name: &str) -> Result<Option<JsonValue>> {
        match self.fields.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| Error::BadRequest(format!("{} is not valid JSON: {}", name, e))),
        }
    }

    /// Removes the blobs this form wrote. Used when the request fails after
    /// the body has been read.
    pub async fn discard(&self, state: &AppState) {
        if !self.files.is_empty() {
            state
                .submission_service
                .reconciler()
                .discard_uploads(&self.files)
                .await;
        }
    }
}
