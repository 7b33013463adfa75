//! Attachment reconciliation.
//!
//! One primitive serves both kinds of owner. A [`ReconcilePolicy`] decides
//! what happens to attachments already on the owner:
//!
//! * `Append` keeps all of them and only adds the new uploads (submissions).
//! * `ReplaceByKeepSet` keeps the listed ids and removes the rest; an empty
//!   set removes everything (activity classwork).
//!
//! Metadata changes are applied by the repository inside the owner's
//! transaction. Blob removal happens afterwards and never fails the call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::attachment::{
    sort_newest_first, AttachmentChanges, AttachmentOwner, AttachmentRecord, ClassworkMeta,
    NewAttachment, UploadedFile,
};
use crate::repositories::AttachmentRepository;
use crate::storage::BlobStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePolicy {
    Append,
    ReplaceByKeepSet(HashSet<i64>),
}

/// What a reconciliation will do, computed before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub keep: Vec<AttachmentRecord>,
    pub remove: Vec<AttachmentRecord>,
    pub insert: Vec<NewAttachment>,
}

/// The part of a plan still needed once the metadata changes are stored.
#[derive(Debug, Clone, Default)]
pub struct PendingReconcile {
    keep: Vec<AttachmentRecord>,
    remove: Vec<AttachmentRecord>,
}

impl ReconcilePlan {
    pub fn new(
        current: Vec<AttachmentRecord>,
        policy: &ReconcilePolicy,
        insert: Vec<NewAttachment>,
    ) -> Self {
        let (keep, remove) = match policy {
            ReconcilePolicy::Append => (current, Vec::new()),
            ReconcilePolicy::ReplaceByKeepSet(keep_ids) => current
                .into_iter()
                .partition(|record| keep_ids.contains(&record.id)),
        };
        Self { keep, remove, insert }
    }

    /// Append-only plan that needs no knowledge of what the owner holds.
    pub fn append(insert: Vec<NewAttachment>) -> Self {
        Self {
            insert,
            ..Default::default()
        }
    }

    pub fn split(self) -> (AttachmentChanges, PendingReconcile) {
        let changes = AttachmentChanges {
            delete_ids: self.remove.iter().map(|r| r.id).collect(),
            insert: self.insert,
        };
        let pending = PendingReconcile {
            keep: self.keep,
            remove: self.remove,
        };
        (changes, pending)
    }
}

/// Stamps freshly uploaded files with their descriptive fields and upload time.
pub fn new_attachments(files: Vec<UploadedFile>, meta: &ClassworkMeta) -> Vec<NewAttachment> {
    let uploaded_at = Utc::now();
    files
        .into_iter()
        .map(|file| NewAttachment {
            file,
            meta: meta.clone(),
            uploaded_at,
        })
        .collect()
}

#[derive(Clone)]
pub struct AttachmentReconciler {
    attachments: Arc<dyn AttachmentRepository>,
    blobs: Arc<dyn BlobStore>,
    blob_timeout: Duration,
}

impl AttachmentReconciler {
    pub fn new(
        attachments: Arc<dyn AttachmentRepository>,
        blobs: Arc<dyn BlobStore>,
        blob_timeout: Duration,
    ) -> Self {
        Self {
            attachments,
            blobs,
            blob_timeout,
        }
    }

    pub async fn list(&self, owner: AttachmentOwner) -> Result<Vec<AttachmentRecord>> {
        self.attachments.list_attachments(owner).await
    }

    pub async fn list_for_submissions(&self, submission_ids: &[i64]) -> Result<Vec<AttachmentRecord>> {
        self.attachments.list_submission_attachments(submission_ids).await
    }

    /// Loads the owner's current attachments and partitions them by `policy`.
    pub async fn plan(
        &self,
        owner: AttachmentOwner,
        policy: &ReconcilePolicy,
        insert: Vec<NewAttachment>,
    ) -> Result<ReconcilePlan> {
        let current = self.attachments.list_attachments(owner).await?;
        if let ReconcilePolicy::ReplaceByKeepSet(keep_ids) = policy {
            let unknown: Vec<i64> = keep_ids
                .iter()
                .filter(|id| !current.iter().any(|r| r.id == **id))
                .copied()
                .collect();
            if !unknown.is_empty() {
                debug!(?owner, ?unknown, "Ignoring keep ids that the owner does not hold");
            }
        }
        Ok(ReconcilePlan::new(current, policy, insert))
    }

    /// Removes blobs of dropped attachments and returns what the owner now
    /// holds, newest first.
    pub async fn finish(
        &self,
        pending: PendingReconcile,
        inserted: Vec<AttachmentRecord>,
    ) -> Vec<AttachmentRecord> {
        self.purge_blobs(&pending.remove).await;
        let mut result = pending.keep;
        result.extend(inserted);
        sort_newest_first(&mut result);
        result
    }

    /// Best-effort blob removal, each bounded by the configured timeout.
    pub async fn purge_blobs(&self, records: &[AttachmentRecord]) {
        for record in records {
            self.remove_blob(record.id, &record.path).await;
        }
    }

    /// Drops blobs written for a request whose metadata never got stored.
    pub async fn discard_uploads(&self, files: &[UploadedFile]) {
        for file in files {
            self.remove_blob(0, &file.path).await;
        }
    }

    async fn remove_blob(&self, attachment_id: i64, path: &str) {
        match tokio::time::timeout(self.blob_timeout, self.blobs.remove(path)).await {
            Ok(Ok(())) => debug!(attachment_id, path, "Removed attachment blob"),
            Ok(Err(e)) => warn!(attachment_id, path, error = %e, "Failed to remove attachment blob"),
            Err(_) => warn!(
                attachment_id,
                path,
                timeout_ms = self.blob_timeout.as_millis() as u64,
                "Timed out removing attachment blob"
            ),
        }
    }
}
