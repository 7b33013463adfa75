pub mod local;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::attachment::UploadedFile;

pub use local::LocalBlobStore;

/// Directory a blob lands in, one per kind of owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    Submissions,
    Classwork,
}

impl UploadPurpose {
    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadPurpose::Submissions => "submissions",
            UploadPurpose::Classwork => "classwork",
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` under a fresh stored name and describes the result.
    async fn store(
        &self,
        purpose: UploadPurpose,
        original_name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<UploadedFile>;

    /// Removes the blob at a path previously returned by `store`.
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Public URL of a stored blob.
pub fn public_url(base_url: &str, path: &str) -> String {
    format!("{}/uploads/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
